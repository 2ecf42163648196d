use crate::parser::model::Workflow;
use crate::rules::finding::{Finding, Severity};

/// Audit workflow and job permissions for missing or overly broad grants.
pub fn check_permissions(workflow: &Workflow) -> Vec<Finding> {
    let mut findings = Vec::new();

    match &workflow.permissions {
        None => findings.push(Finding::new(
            "missing-permissions",
            Severity::Medium,
            "No top-level permissions defined",
            "This workflow does not declare a top-level 'permissions' block. \
             Without it, the default token may have broad read-write access. \
             Explicitly set permissions to the minimum required, e.g.:\n  \
             permissions:\n    contents: read",
            &workflow.source_file,
        )),
        Some(perms) if perms.is_write_all() => findings.push(Finding::new(
            "write-all-permissions",
            Severity::Critical,
            "Workflow uses 'permissions: write-all'",
            "This workflow grants write access to ALL scopes (contents, packages, \
             issues, pull-requests, etc.). If any step is compromised, the attacker \
             gets full write access to the repository.",
            &workflow.source_file,
        )),
        Some(_) => {}
    }

    for job in &workflow.jobs {
        if !job.permissions.as_ref().is_some_and(|p| p.is_write_all()) {
            continue;
        }
        findings.push(
            Finding::new(
                "write-all-permissions",
                Severity::Critical,
                format!("Job '{}' uses 'permissions: write-all'", job.job_id),
                format!(
                    "Job '{}' grants write access to ALL scopes. \
                     Restrict permissions to only what this job needs.",
                    job.job_id
                ),
                &workflow.source_file,
            )
            .in_job(&job.job_id),
        );
    }

    findings
}
