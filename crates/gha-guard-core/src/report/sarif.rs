use crate::rules::finding::{Finding, Severity};
use serde_json::json;

const TOOL_URI: &str = "https://github.com/chlete/gha-guard";
const SARIF_SCHEMA: &str =
    "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json";

/// Generate a SARIF 2.1.0 report from a list of findings.
/// Upload the output to GitHub Code Scanning to get annotations on the
/// pull request diff.
pub fn to_sarif(findings: &[Finding]) -> serde_json::Value {
    let results: Vec<serde_json::Value> = findings.iter().map(sarif_result).collect();

    let report = json!({
        "$schema": SARIF_SCHEMA,
        "version": "2.1.0",
        "runs": [{
            "tool": {
                "driver": {
                    "name": "gha-guard",
                    "version": env!("CARGO_PKG_VERSION"),
                    "informationUri": TOOL_URI,
                    "rules": sarif_rules(findings),
                }
            },
            "results": results,
        }]
    });
    tracing::info!(findings = findings.len(), "Built SARIF report");
    report
}

fn level(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical | Severity::High => "error",
        Severity::Medium => "warning",
        Severity::Low => "note",
    }
}

/// CVSS-like score GitHub uses to bucket code scanning alerts.
fn security_severity(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "9.0",
        Severity::High => "7.0",
        Severity::Medium => "5.0",
        Severity::Low => "3.0",
    }
}

/// `script-injection` -> `ScriptInjection`
fn rule_display_name(rule_id: &str) -> String {
    rule_id
        .split('-')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// One rule entry per distinct rule id, in first-seen order.
fn sarif_rules(findings: &[Finding]) -> Vec<serde_json::Value> {
    let mut seen: Vec<&str> = Vec::new();
    let mut rules = Vec::new();

    for finding in findings {
        if seen.contains(&finding.rule_id.as_str()) {
            continue;
        }
        seen.push(&finding.rule_id);
        rules.push(json!({
            "id": finding.rule_id,
            "name": rule_display_name(&finding.rule_id),
            "shortDescription": { "text": finding.title },
            "fullDescription": { "text": finding.title },
            "helpUri": format!("{TOOL_URI}#rule-{}", finding.rule_id),
            "properties": {
                "security-severity": security_severity(finding.severity),
                "tags": ["security", "github-actions"],
            }
        }));
    }

    rules
}

fn sarif_result(finding: &Finding) -> serde_json::Value {
    let mut logical = Vec::new();
    if !finding.job_id.is_empty() {
        logical.push(json!({ "name": finding.job_id, "kind": "job" }));
    }
    if !finding.step_name.is_empty() {
        logical.push(json!({ "name": finding.step_name, "kind": "step" }));
    }

    json!({
        "ruleId": finding.rule_id,
        "level": level(finding.severity),
        "message": {
            "text": finding.description,
        },
        "locations": [{
            "physicalLocation": {
                "artifactLocation": {
                    "uri": finding.file_path,
                    "uriBaseId": "%SRCROOT%",
                },
                "region": {
                    "startLine": finding.line_number.unwrap_or(1),
                }
            },
            "logicalLocations": logical,
        }],
    })
}
