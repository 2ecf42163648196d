use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading and normalizing a workflow file.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("workflow file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("not a directory: {}", path.display())]
    NotADirectory { path: PathBuf },

    #[error("failed to read '{}'", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not UTF-8 text.
    #[error("'{}' is not valid UTF-8", path.display())]
    Encoding {
        path: PathBuf,
        #[source]
        source: std::string::FromUtf8Error,
    },

    /// The text is not valid YAML.
    #[error("invalid YAML in {source_file}")]
    Format {
        source_file: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// The YAML parsed, but its root node is not a mapping.
    #[error("workflow root in {source_file} must be a mapping, found {found}")]
    Schema {
        source_file: String,
        found: &'static str,
    },
}

impl WorkflowError {
    /// Whether a batch scan may skip the offending file and carry on.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            WorkflowError::Encoding { .. } | WorkflowError::Format { .. } | WorkflowError::Schema { .. }
        )
    }
}

/// Errors raised while reading a `.gha-guard.yml` file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}'", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file '{}'", path.display())]
    Invalid {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}
