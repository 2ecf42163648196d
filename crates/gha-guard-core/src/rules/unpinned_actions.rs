use crate::parser::model::Workflow;
use crate::rules::finding::{Finding, Severity};

/// Flag steps that reference an action by tag or branch instead of a commit SHA.
///
/// Tags and branches can be moved by the action maintainer; only a full SHA
/// guarantees the reviewed code is what runs.
pub fn check_unpinned_actions(workflow: &Workflow) -> Vec<Finding> {
    let mut findings = Vec::new();

    for (job, step) in workflow.steps() {
        let Some(action) = &step.uses else {
            continue;
        };
        if action.is_pinned {
            continue;
        }

        findings.push(
            Finding::new(
                "unpinned-action",
                Severity::High,
                "Unpinned action reference",
                format!(
                    "Action '{}' is referenced by tag/branch '{}', not by a commit SHA. \
                     A compromised or force-pushed tag could inject malicious code into your workflow.\n\
                     Pin to a full SHA: `{}@<full-sha-hash>`.",
                    action.full_ref,
                    action.git_ref,
                    action.action_name()
                ),
                &workflow.source_file,
            )
            .in_job(&job.job_id)
            .at_step(
                step.name.as_deref().unwrap_or(&action.full_ref),
                step.line_number,
            ),
        );
    }

    findings
}
