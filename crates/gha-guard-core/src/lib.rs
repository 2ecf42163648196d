pub mod config;
pub mod enrich;
pub mod error;
pub mod parser;
pub mod report;
pub mod rules;

pub use config::Config;
pub use enrich::{EnrichedFinding, EnrichmentClient};
pub use error::{ConfigError, WorkflowError};
pub use parser::{ActionRef, Job, Permissions, Step, Workflow, WorkflowParser};
pub use rules::{Finding, RuleRegistry, Severity};
