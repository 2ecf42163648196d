use crate::enrich::EnrichedFinding;
use crate::rules::finding::Finding;
use serde_json::json;

/// Structured JSON report: the finding count plus every finding in order.
pub fn to_json(findings: &[Finding]) -> serde_json::Value {
    json!({
        "total": findings.len(),
        "findings": findings,
    })
}

/// Same shape as [`to_json`], with `explanation` and `suggested_fix` on
/// each finding.
pub fn to_enriched_json(findings: &[EnrichedFinding]) -> serde_json::Value {
    json!({
        "total": findings.len(),
        "findings": findings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::finding::Severity;

    #[test]
    fn test_empty_report() {
        let report = to_json(&[]);
        assert_eq!(report["total"], 0);
        assert_eq!(report["findings"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_finding_fields() {
        let findings = vec![
            Finding::new(
                "script-injection",
                Severity::Critical,
                "Script injection via 'github.event.issue.title'",
                "desc",
                "ci.yml",
            )
            .in_job("triage")
            .at_step("Greet", Some(12)),
            Finding::new("missing-permissions", Severity::Medium, "t", "d", "ci.yml"),
        ];
        let report = to_json(&findings);

        assert_eq!(report["total"], 2);
        let first = &report["findings"][0];
        assert_eq!(first["rule_id"], "script-injection");
        assert_eq!(first["severity"], "critical");
        assert_eq!(first["job_id"], "triage");
        assert_eq!(first["step_name"], "Greet");
        assert_eq!(first["line_number"], 12);
        assert_eq!(report["findings"][1]["severity"], "medium");
        assert!(report["findings"][1]["line_number"].is_null());
    }

    #[test]
    fn test_enriched_report() {
        let finding = Finding::new("manual-trigger", Severity::Low, "t", "d", "ci.yml");
        let enriched = EnrichedFinding {
            finding,
            explanation: "Anyone with write access can start it.".into(),
            suggested_fix: "on: push".into(),
        };
        let report = to_enriched_json(&[enriched]);
        assert_eq!(report["total"], 1);
        let first = &report["findings"][0];
        assert_eq!(first["rule_id"], "manual-trigger");
        assert_eq!(first["severity"], "low");
        assert_eq!(first["suggested_fix"], "on: push");
    }
}
