use crate::parser::model::Workflow;
use crate::rules::finding::{Finding, Severity};
use once_cell::sync::Lazy;
use regex::Regex;

static SECRET_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{\{\s*secrets\.\w+\s*\}\}").expect("secret pattern is valid")
});

/// Detect secrets interpolated straight into `run:` scripts.
///
/// Emits one finding per step, listing every secret expression it uses.
pub fn check_secret_handling(workflow: &Workflow) -> Vec<Finding> {
    let mut findings = Vec::new();

    for (job, step) in workflow.steps() {
        let Some(run) = &step.run else {
            continue;
        };

        let secrets: Vec<&str> = SECRET_REF.find_iter(run).map(|m| m.as_str()).collect();
        if secrets.is_empty() {
            continue;
        }

        findings.push(
            Finding::new(
                "secret-in-run",
                Severity::High,
                "Secret used directly in 'run:' block",
                format!(
                    "The step uses {} directly in a shell command. This risks exposing the \
                     secret in logs or to external processes. Pass secrets via environment \
                     variables instead:\n  \
                     env:\n    MY_SECRET: ${{{{ secrets.MY_SECRET }}}}\n  \
                     run: echo \"$MY_SECRET\"",
                    secrets.join(", ")
                ),
                &workflow.source_file,
            )
            .in_job(&job.job_id)
            .at_step(step.display_name(), step.line_number),
        );
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::model::{Job, Step};
    use std::collections::HashMap;

    fn workflow_with(step: Step) -> Workflow {
        let mut wf = Workflow::new("ci.yml");
        let mut job = Job::new("deploy");
        job.steps.push(step);
        wf.jobs.push(job);
        wf
    }

    #[test]
    fn test_detects_secret_in_run() {
        let wf = workflow_with(Step::run(
            Some("Call API"),
            "curl -H \"Authorization: Bearer ${{ secrets.TOKEN }}\" https://example.com",
        ));
        let findings = check_secret_handling(&wf);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule_id, "secret-in-run");
        assert_eq!(findings[0].severity, Severity::High);
        assert_eq!(findings[0].step_name, "Call API");
        assert!(findings[0].description.contains("${{ secrets.TOKEN }}"));
    }

    #[test]
    fn test_multiple_secrets_one_finding() {
        let wf = workflow_with(Step::run(
            None,
            "deploy --user ${{ secrets.USER }} --pass ${{secrets.PASS}}",
        ));
        let findings = check_secret_handling(&wf);
        assert_eq!(findings.len(), 1);
        assert!(findings[0]
            .description
            .contains("${{ secrets.USER }}, ${{secrets.PASS}}"));
        assert_eq!(findings[0].step_name, "(unnamed step)");
    }

    #[test]
    fn test_ignores_secret_in_env() {
        let mut step = Step::run(Some("Safe"), "curl -H \"Authorization: Bearer $TOKEN\"");
        step.env = HashMap::from([("TOKEN".to_string(), "${{ secrets.TOKEN }}".to_string())]);
        assert!(check_secret_handling(&workflow_with(step)).is_empty());
    }

    #[test]
    fn test_ignores_steps_without_run() {
        let wf = workflow_with(Step::uses(None, "actions/checkout@v4"));
        assert!(check_secret_handling(&wf).is_empty());
    }

    #[test]
    fn test_ignores_non_secret_contexts() {
        let wf = workflow_with(Step::run(None, "echo ${{ github.token }} ${{ env.SECRET }}"));
        assert!(check_secret_handling(&wf).is_empty());
    }
}
