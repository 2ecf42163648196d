//! Machine-readable renderings of a finding list.

pub mod json;
pub mod sarif;

pub use json::{to_enriched_json, to_json};
pub use sarif::to_sarif;
