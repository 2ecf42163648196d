use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Severity level for security findings, ordered `Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// All levels, most severe first.
    pub const DESCENDING: [Severity; 4] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(format!(
                "unknown severity '{other}' (expected low, medium, high or critical)"
            )),
        }
    }
}

/// A single security finding produced by a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Stable rule identifier, e.g. `unpinned-action`.
    pub rule_id: String,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub file_path: String,
    /// Empty for workflow-level findings.
    pub job_id: String,
    /// Empty for job- or workflow-level findings.
    pub step_name: String,
    pub line_number: Option<usize>,
}

impl Finding {
    /// A workflow-level finding with no job, step or line attached.
    pub fn new(
        rule_id: &str,
        severity: Severity,
        title: impl Into<String>,
        description: impl Into<String>,
        file_path: &str,
    ) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            severity,
            title: title.into(),
            description: description.into(),
            file_path: file_path.to_string(),
            job_id: String::new(),
            step_name: String::new(),
            line_number: None,
        }
    }

    pub fn in_job(mut self, job_id: &str) -> Self {
        self.job_id = job_id.to_string();
        self
    }

    pub fn at_step(mut self, step_name: &str, line_number: Option<usize>) -> Self {
        self.step_name = step_name.to_string();
        self.line_number = line_number;
        self
    }
}

/// Count findings per severity, most severe first, skipping empty levels.
pub fn severity_counts(findings: &[Finding]) -> Vec<(Severity, usize)> {
    Severity::DESCENDING
        .iter()
        .map(|&sev| (sev, findings.iter().filter(|f| f.severity == sev).count()))
        .filter(|(_, n)| *n > 0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(severity: Severity) -> Finding {
        Finding::new("test-rule", severity, "t", "d", "ci.yml")
    }

    #[test]
    fn test_total_order() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
        let mut levels = Severity::DESCENDING.to_vec();
        levels.sort();
        assert_eq!(
            levels,
            vec![Severity::Low, Severity::Medium, Severity::High, Severity::Critical]
        );
    }

    #[test]
    fn test_threshold_filters_nest() {
        let findings: Vec<Finding> = [
            Severity::Low,
            Severity::Critical,
            Severity::High,
            Severity::Medium,
            Severity::Critical,
        ]
        .into_iter()
        .map(finding)
        .collect();

        let at_least = |min: Severity| -> Vec<Finding> {
            findings.iter().filter(|f| f.severity >= min).cloned().collect()
        };
        let high = at_least(Severity::High);
        let critical = at_least(Severity::Critical);

        assert_eq!(high.len(), 3);
        assert_eq!(critical.len(), 2);
        assert!(critical.iter().all(|f| high.contains(f)));
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("HIGH".parse::<Severity>().unwrap(), Severity::High);
        assert_eq!(" critical ".parse::<Severity>().unwrap(), Severity::Critical);
        assert!("urgent".parse::<Severity>().is_err());
        assert_eq!(Severity::Medium.to_string(), "MEDIUM");
        assert_eq!(Severity::Medium.as_str(), "medium");
    }

    #[test]
    fn test_serializes_lowercase() {
        let json = serde_json::to_string(&Severity::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
    }

    #[test]
    fn test_severity_counts() {
        let findings = vec![
            finding(Severity::High),
            finding(Severity::Low),
            finding(Severity::High),
        ];
        assert_eq!(
            severity_counts(&findings),
            vec![(Severity::High, 2), (Severity::Low, 1)]
        );
    }

    #[test]
    fn test_builder_fields() {
        let f = finding(Severity::High).in_job("build").at_step("Checkout", Some(7));
        assert_eq!(f.job_id, "build");
        assert_eq!(f.step_name, "Checkout");
        assert_eq!(f.line_number, Some(7));
    }
}
