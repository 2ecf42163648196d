use crate::parser::model::Workflow;
use crate::rules::finding::{Finding, Severity};

/// Flag triggers that run with elevated privileges or can be fired by hand.
pub fn check_dangerous_triggers(workflow: &Workflow) -> Vec<Finding> {
    let mut findings = Vec::new();

    if workflow.has_trigger("pull_request_target") {
        findings.push(Finding::new(
            "dangerous-trigger",
            Severity::High,
            "Workflow uses 'pull_request_target' trigger",
            "The 'pull_request_target' trigger runs with write access to the base repository \
             and has access to secrets. If this workflow checks out the PR head branch and runs \
             any code from it, an attacker can submit a malicious PR that executes arbitrary \
             code with elevated privileges. Consider using 'pull_request' instead, or ensure \
             you never check out or execute untrusted PR code.",
            &workflow.source_file,
        ));
    }

    if workflow.has_trigger("workflow_dispatch") {
        findings.push(Finding::new(
            "manual-trigger",
            Severity::Low,
            "Workflow can be triggered manually",
            "This workflow uses 'workflow_dispatch', allowing manual triggering. Ensure that \
             only authorized users can trigger it and that inputs are validated.",
            &workflow.source_file,
        ));
    }

    findings
}
