use crate::error::WorkflowError;
use crate::parser::action_ref::ActionRef;
use crate::parser::loader::{self, key_text, LineIndex, LoadedDocument, PathSegment};
use crate::parser::model::{Job, Permissions, Step, Workflow};
use serde_yaml::{Mapping, Value};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Parser for GitHub Actions workflow YAML files.
pub struct WorkflowParser;

impl WorkflowParser {
    /// Parse a single workflow file.
    pub fn parse_file(path: &Path) -> Result<Workflow, WorkflowError> {
        if !path.exists() {
            return Err(WorkflowError::NotFound {
                path: path.to_path_buf(),
            });
        }

        tracing::info!(file = %path.display(), "Parsing workflow");
        let bytes = std::fs::read(path).map_err(|source| WorkflowError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let content = String::from_utf8(bytes).map_err(|source| WorkflowError::Encoding {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path.to_string_lossy().to_string())
    }

    /// Parse workflow YAML content.
    pub fn parse(content: &str, source_file: String) -> Result<Workflow, WorkflowError> {
        let doc = loader::load(content, &source_file)?;
        Ok(Self::normalize(doc, source_file))
    }

    /// Parse every `.yml`/`.yaml` file directly inside `dir`, in path order.
    ///
    /// Files that are not UTF-8, not valid YAML, or whose root is not a
    /// mapping are skipped; any other failure aborts the batch.
    pub fn parse_dir(dir: &Path) -> Result<Vec<Workflow>, WorkflowError> {
        if !dir.exists() {
            return Err(WorkflowError::NotFound {
                path: dir.to_path_buf(),
            });
        }
        if !dir.is_dir() {
            return Err(WorkflowError::NotADirectory {
                path: dir.to_path_buf(),
            });
        }

        let io_err = |source: std::io::Error| WorkflowError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut files: Vec<PathBuf> = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.is_file() && is_workflow_file(&path) {
                files.push(path);
            }
        }
        files.sort();
        tracing::debug!(count = files.len(), dir = %dir.display(), "Found YAML files");

        let mut workflows = Vec::with_capacity(files.len());
        for file in &files {
            match Self::parse_file(file) {
                Ok(workflow) => workflows.push(workflow),
                Err(e) if e.is_recoverable() => {
                    tracing::info!(file = %file.display(), error = %e, "Skipping invalid workflow");
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(count = workflows.len(), dir = %dir.display(), "Parsed workflows");
        Ok(workflows)
    }

    /// Build the typed model from a loaded document.
    ///
    /// Never fails: absent or oddly-shaped optional fields fall back to
    /// defaults so that rules still run over partially valid files.
    pub fn normalize(doc: LoadedDocument, source_file: String) -> Workflow {
        let LoadedDocument { root, lines } = doc;

        let mut jobs = Vec::new();
        if let Some(job_map) = root.get("jobs").and_then(Value::as_mapping) {
            for (key, config) in job_map {
                let Some(job_id) = key_text(key) else {
                    continue;
                };
                let path = [PathSegment::key("jobs"), PathSegment::key(job_id.clone())];
                jobs.push(Self::parse_job(job_id, config, &lines, &path));
            }
        }

        // YAML 1.1 loaders read a bare `on` key as boolean true.
        let on = root.get("on").or_else(|| root.get(Value::Bool(true)));
        let triggers = Self::parse_triggers(on);
        let permissions = Self::parse_permissions(root.get("permissions"));
        let name = root.get("name").and_then(scalar_text);

        tracing::debug!(
            workflow = name.as_deref().unwrap_or("(unnamed)"),
            jobs = jobs.len(),
            ?triggers,
            declares_permissions = permissions.is_some(),
            "Normalized workflow"
        );

        Workflow {
            source_file,
            name,
            triggers,
            permissions,
            env: string_map(root.get("env")),
            jobs,
            line_number: lines.line_of(&[]),
            raw: Value::Mapping(root),
        }
    }

    /// Normalize the `on:` field into a list of trigger names.
    pub fn parse_triggers(on: Option<&Value>) -> Vec<String> {
        match on {
            Some(Value::String(event)) => vec![event.clone()],
            Some(Value::Sequence(events)) => events.iter().filter_map(scalar_text).collect(),
            Some(Value::Mapping(map)) => map.keys().filter_map(key_text).collect(),
            _ => Vec::new(),
        }
    }

    /// Normalize a `permissions:` field; `None` means it was not declared.
    ///
    /// Scopes are keyed by name, so their declaration order is not kept.
    /// A scope whose value is not a scalar keeps its YAML text.
    pub fn parse_permissions(field: Option<&Value>) -> Option<Permissions> {
        match field? {
            Value::String(level) => Some(Permissions::All(level.clone())),
            Value::Mapping(map) => {
                let scopes: BTreeMap<String, String> = map
                    .iter()
                    .filter_map(|(k, v)| {
                        let level = scalar_text(v).or_else(|| yaml_text(v))?;
                        Some((key_text(k)?, level))
                    })
                    .collect();
                Some(Permissions::Scoped(scopes))
            }
            _ => None,
        }
    }

    fn parse_job(
        job_id: String,
        config: &Value,
        lines: &LineIndex,
        path: &[PathSegment],
    ) -> Job {
        let empty = Mapping::new();
        let map = config.as_mapping().unwrap_or(&empty);

        let mut steps = Vec::new();
        if let Some(raw_steps) = map.get("steps").and_then(Value::as_sequence) {
            for (i, raw) in raw_steps.iter().enumerate() {
                let Some(step_map) = raw.as_mapping() else {
                    continue;
                };
                let mut step_path = path.to_vec();
                step_path.extend([PathSegment::key("steps"), PathSegment::Index(i)]);
                steps.push(Self::parse_step(step_map, lines.line_of(&step_path)));
            }
        }
        tracing::debug!(job = %job_id, steps = steps.len(), "Parsed job");

        Job {
            name: map.get("name").and_then(scalar_text),
            runs_on: map.get("runs-on").map(runner_label).unwrap_or_default(),
            permissions: Self::parse_permissions(map.get("permissions")),
            steps,
            env: string_map(map.get("env")),
            raw: config.clone(),
            line_number: lines.line_of(path),
            job_id,
        }
    }

    fn parse_step(map: &Mapping, line_number: Option<usize>) -> Step {
        let with_args: HashMap<String, Value> = map
            .get("with")
            .and_then(Value::as_mapping)
            .map(|m| {
                m.iter()
                    .filter_map(|(k, v)| Some((key_text(k)?, v.clone())))
                    .collect()
            })
            .unwrap_or_default();

        Step {
            name: map.get("name").and_then(scalar_text),
            uses: map.get("uses").and_then(Value::as_str).and_then(ActionRef::parse),
            run: map.get("run").and_then(scalar_text),
            env: string_map(map.get("env")),
            with_args,
            raw: Value::Mapping(map.clone()),
            line_number,
        }
    }
}

fn is_workflow_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yml") | Some("yaml")
    )
}

/// Text of a scalar node; collections and null yield `None`.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Serialized YAML for a non-scalar node, without the trailing newline.
fn yaml_text(value: &Value) -> Option<String> {
    serde_yaml::to_string(value)
        .ok()
        .map(|text| text.trim_end().to_string())
}

/// `runs-on` as a single string: labels in a list are joined.
fn runner_label(value: &Value) -> String {
    match value {
        Value::Sequence(labels) => labels
            .iter()
            .filter_map(scalar_text)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Mapping(map) => map
            .get("group")
            .and_then(scalar_text)
            .unwrap_or_default(),
        other => scalar_text(other).unwrap_or_default(),
    }
}

fn string_map(value: Option<&Value>) -> HashMap<String, String> {
    value
        .and_then(Value::as_mapping)
        .map(|m| {
            m.iter()
                .filter_map(|(k, v)| Some((key_text(k)?, scalar_text(v)?)))
                .collect()
        })
        .unwrap_or_default()
}
