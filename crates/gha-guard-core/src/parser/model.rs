use crate::parser::action_ref::ActionRef;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::{BTreeMap, HashMap};

/// Normalized `permissions:` block of a workflow or job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Permissions {
    /// Coarse grant written as a bare string, e.g. `permissions: write-all`.
    All(String),
    /// Per-scope access levels, e.g. `contents: read`.
    Scoped(BTreeMap<String, String>),
}

impl Permissions {
    pub fn is_write_all(&self) -> bool {
        matches!(self, Permissions::All(level) if level == "write-all")
    }
}

/// A single step within a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub name: Option<String>,
    pub uses: Option<ActionRef>,
    pub run: Option<String>,
    pub env: HashMap<String, String>,
    pub with_args: HashMap<String, Value>,
    pub raw: Value,
    pub line_number: Option<usize>,
}

impl Step {
    fn empty() -> Self {
        Self {
            name: None,
            uses: None,
            run: None,
            env: HashMap::new(),
            with_args: HashMap::new(),
            raw: Value::Null,
            line_number: None,
        }
    }

    /// A step running an inline shell script.
    pub fn run(name: Option<&str>, script: &str) -> Self {
        Self {
            name: name.map(String::from),
            run: Some(script.to_string()),
            ..Self::empty()
        }
    }

    /// A step invoking an action; unparseable references leave `uses` empty.
    pub fn uses(name: Option<&str>, reference: &str) -> Self {
        Self {
            name: name.map(String::from),
            uses: ActionRef::parse(reference),
            ..Self::empty()
        }
    }

    /// Name shown in findings for steps that have no `name:`.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("(unnamed step)")
    }
}

/// A single job within a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub name: Option<String>,
    pub runs_on: String,
    pub permissions: Option<Permissions>,
    pub steps: Vec<Step>,
    pub env: HashMap<String, String>,
    pub raw: Value,
    pub line_number: Option<usize>,
}

impl Job {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            name: None,
            runs_on: String::new(),
            permissions: None,
            steps: Vec::new(),
            env: HashMap::new(),
            raw: Value::Null,
            line_number: None,
        }
    }
}

/// A parsed GitHub Actions workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub source_file: String,
    pub name: Option<String>,
    /// Trigger events in declaration order, duplicates kept.
    pub triggers: Vec<String>,
    /// `None` when the workflow declares no `permissions:` at all.
    pub permissions: Option<Permissions>,
    pub env: HashMap<String, String>,
    pub jobs: Vec<Job>,
    pub raw: Value,
    pub line_number: Option<usize>,
}

impl Workflow {
    pub fn new(source_file: impl Into<String>) -> Self {
        Self {
            source_file: source_file.into(),
            name: None,
            triggers: Vec::new(),
            permissions: None,
            env: HashMap::new(),
            jobs: Vec::new(),
            raw: Value::Null,
            line_number: None,
        }
    }

    pub fn has_trigger(&self, event: &str) -> bool {
        self.triggers.iter().any(|t| t == event)
    }

    pub fn step_count(&self) -> usize {
        self.jobs.iter().map(|j| j.steps.len()).sum()
    }

    /// Every step paired with the job that owns it, in document order.
    pub fn steps(&self) -> impl Iterator<Item = (&Job, &Step)> {
        self.jobs
            .iter()
            .flat_map(|job| job.steps.iter().map(move |step| (job, step)))
    }
}
