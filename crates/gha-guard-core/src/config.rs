//! Project configuration loaded from `.gha-guard.yml`.
//!
//! ```yaml
//! # Minimum severity to report (critical, high, medium, low)
//! severity: high
//!
//! # Rules to ignore (by rule ID)
//! ignore_rules:
//!   - unpinned-action
//!   - manual-trigger
//!
//! # Workflow files to exclude (glob patterns relative to scan path)
//! exclude:
//!   - "test-*.yml"
//!   - "legacy.yml"
//! ```

use crate::error::ConfigError;
use crate::rules::finding::{Finding, Severity};
use glob::Pattern;
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILENAME: &str = ".gha-guard.yml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(deserialize_with = "deserialize_severity")]
    pub severity: Severity,
    pub ignore_rules: Vec<String>,
    pub exclude: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            severity: Severity::Low,
            ignore_rules: Vec::new(),
            exclude: Vec::new(),
        }
    }
}

fn deserialize_severity<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Severity, D::Error> {
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}

impl Config {
    /// Parse config YAML. A document whose root is not a mapping yields defaults.
    pub fn from_yaml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let invalid = |source| ConfigError::Invalid {
            path: path.to_path_buf(),
            source,
        };
        let raw: Value = serde_yaml::from_str(content).map_err(invalid)?;
        if !raw.is_mapping() {
            tracing::warn!(file = %path.display(), "Config file is not a YAML mapping, using defaults");
            return Ok(Self::default());
        }
        serde_yaml::from_value(raw).map_err(invalid)
    }

    /// Keep findings at or above the severity threshold whose rule is not ignored.
    pub fn filter_findings(&self, findings: Vec<Finding>) -> Vec<Finding> {
        findings
            .into_iter()
            .filter(|f| f.severity >= self.severity)
            .filter(|f| !self.ignore_rules.iter().any(|r| r == &f.rule_id))
            .collect()
    }

    /// Whether `file` matches an `exclude` pattern, tested against its path
    /// relative to `scan_root` and against its bare file name.
    pub fn is_excluded(&self, file: &Path, scan_root: &Path) -> bool {
        if self.exclude.is_empty() {
            return false;
        }
        let relative = file.strip_prefix(scan_root).unwrap_or(file);
        let file_name = file.file_name().map(Path::new);

        self.exclude.iter().any(|raw| match Pattern::new(raw) {
            Ok(pattern) => {
                pattern.matches_path(relative)
                    || pattern.matches_path(file)
                    || file_name.is_some_and(|name| pattern.matches_path(name))
            }
            Err(e) => {
                tracing::warn!(pattern = %raw, error = %e, "Ignoring invalid exclude pattern");
                false
            }
        })
    }
}

/// Locate and load the configuration; no file found means defaults.
pub fn load_config(
    explicit: Option<&Path>,
    scan_path: Option<&Path>,
) -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().ok();
    let Some(path) = find_config_file(explicit, scan_path, cwd.as_deref()) else {
        tracing::debug!("No config file found, using defaults");
        return Ok(Config::default());
    };

    tracing::info!(file = %path.display(), "Loading config");
    let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    Config::from_yaml(&content, &path)
}

/// Search order: the explicit path, then the scan directory (a file's parent)
/// and its ancestors, then `cwd`.
pub fn find_config_file(
    explicit: Option<&Path>,
    scan_path: Option<&Path>,
    cwd: Option<&Path>,
) -> Option<PathBuf> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Some(path.to_path_buf());
        }
        tracing::warn!(file = %path.display(), "Config file not found");
        return None;
    }

    if let Some(scan) = scan_path {
        let start = if scan.is_file() {
            scan.parent().unwrap_or(scan)
        } else {
            scan
        };
        for dir in start.ancestors() {
            let candidate = dir.join(DEFAULT_CONFIG_FILENAME);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }

    cwd.map(|dir| dir.join(DEFAULT_CONFIG_FILENAME))
        .filter(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_config(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join(DEFAULT_CONFIG_FILENAME);
        fs::write(&path, content).unwrap();
        path
    }

    fn finding(rule_id: &str, severity: Severity) -> Finding {
        Finding::new(rule_id, severity, "t", "d", "ci.yml")
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.severity, Severity::Low);
        assert!(config.ignore_rules.is_empty());
        assert!(config.exclude.is_empty());
    }

    #[test]
    fn test_loads_full_config() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_config(
            tmp.path(),
            "severity: HIGH\nignore_rules:\n  - manual-trigger\nexclude:\n  - \"legacy.yml\"\n",
        );
        let config = load_config(Some(&path), None).unwrap();
        assert_eq!(config.severity, Severity::High);
        assert_eq!(config.ignore_rules, vec!["manual-trigger"]);
        assert_eq!(config.exclude, vec!["legacy.yml"]);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = Config::from_yaml("ignore_rules: [unpinned-action]\n", Path::new("c.yml"))
            .unwrap();
        assert_eq!(config.severity, Severity::Low);
        assert_eq!(config.ignore_rules, vec!["unpinned-action"]);
    }

    #[test]
    fn test_non_mapping_yields_defaults() {
        let config = Config::from_yaml("just a string", Path::new("c.yml")).unwrap();
        assert_eq!(config, Config::default());
        let config = Config::from_yaml("", Path::new("c.yml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_unknown_severity_is_invalid() {
        let err = Config::from_yaml("severity: urgent\n", Path::new("c.yml")).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_missing_explicit_path_returns_none() {
        let tmp = tempfile::tempdir().unwrap();
        write_config(tmp.path(), "severity: high\n");
        let found = find_config_file(Some(&tmp.path().join("nope.yml")), Some(tmp.path()), None);
        assert!(found.is_none());
    }

    #[test]
    fn test_finds_config_in_scan_dir_and_parents() {
        let tmp = tempfile::tempdir().unwrap();
        let expected = write_config(tmp.path(), "severity: medium\n");
        let workflows = tmp.path().join(".github/workflows");
        fs::create_dir_all(&workflows).unwrap();

        assert_eq!(find_config_file(None, Some(tmp.path()), None), Some(expected.clone()));
        assert_eq!(find_config_file(None, Some(&workflows), None), Some(expected.clone()));

        let file = workflows.join("ci.yml");
        fs::write(&file, "on: push\n").unwrap();
        assert_eq!(find_config_file(None, Some(&file), None), Some(expected));
    }

    #[test]
    fn test_cwd_fallback() {
        let scan = tempfile::tempdir().unwrap();
        let cwd = tempfile::tempdir().unwrap();
        let expected = write_config(cwd.path(), "severity: critical\n");
        assert_eq!(
            find_config_file(None, Some(scan.path()), Some(cwd.path())),
            Some(expected)
        );
    }

    #[test]
    fn test_filter_by_severity_and_rule() {
        let config = Config {
            severity: Severity::High,
            ignore_rules: vec!["unpinned-action".into()],
            exclude: Vec::new(),
        };
        let kept = config.filter_findings(vec![
            finding("unpinned-action", Severity::High),
            finding("missing-permissions", Severity::Medium),
            finding("script-injection", Severity::Critical),
            finding("dangerous-trigger", Severity::High),
        ]);
        let ids: Vec<&str> = kept.iter().map(|f| f.rule_id.as_str()).collect();
        assert_eq!(ids, vec!["script-injection", "dangerous-trigger"]);
    }

    #[test]
    fn test_is_excluded() {
        let config = Config {
            exclude: vec!["test-*.yml".into(), "nested/legacy.yml".into(), "[".into()],
            ..Config::default()
        };
        let root = Path::new("/repo/.github/workflows");
        assert!(config.is_excluded(&root.join("test-matrix.yml"), root));
        assert!(config.is_excluded(&root.join("nested/legacy.yml"), root));
        assert!(!config.is_excluded(&root.join("ci.yml"), root));
        assert!(!Config::default().is_excluded(&root.join("test-a.yml"), root));
    }
}
