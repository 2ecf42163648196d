pub mod action_ref;
pub mod loader;
pub mod model;
pub mod workflow;

pub use action_ref::ActionRef;
pub use model::{Job, Permissions, Step, Workflow};
pub use workflow::WorkflowParser;
