use crate::parser::model::Workflow;
use crate::rules::finding::{Finding, Severity};
use once_cell::sync::Lazy;
use regex::Regex;

/// GitHub expression contexts that carry attacker-controlled input.
///
/// Matched as substrings of the expression body, so `pages.*.page_name` is
/// the object filter form as written in workflows.
const DANGEROUS_CONTEXTS: &[&str] = &[
    "github.event.issue.title",
    "github.event.issue.body",
    "github.event.pull_request.title",
    "github.event.pull_request.body",
    "github.event.comment.body",
    "github.event.review.body",
    "github.event.discussion.title",
    "github.event.discussion.body",
    "github.event.pages.*.page_name",
    "github.event.head_commit.message",
    "github.event.head_commit.author.name",
    "github.event.head_commit.author.email",
    "github.head_ref",
];

/// `${{ ... }}` expressions, non-greedy, spanning lines.
static EXPRESSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\$\{\{.*?\}\}").expect("expression pattern is valid")
});

/// Detect `run:` scripts that interpolate attacker-controlled contexts.
///
/// Emits one finding per offending expression in each step.
pub fn check_script_injection(workflow: &Workflow) -> Vec<Finding> {
    let mut findings = Vec::new();

    for (job, step) in workflow.steps() {
        let Some(run) = &step.run else {
            continue;
        };

        for expr in EXPRESSION.find_iter(run).map(|m| m.as_str()) {
            let Some(context) = dangerous_context(expression_body(expr)) else {
                continue;
            };

            findings.push(
                Finding::new(
                    "script-injection",
                    Severity::Critical,
                    "Potential script injection",
                    format!(
                        "The expression '{expr}' in a 'run:' block uses the user-controlled \
                         context '{context}'. An attacker could craft a malicious value that \
                         executes arbitrary shell commands. Use an environment variable instead:\n  \
                         env:\n    SAFE_VALUE: {expr}\n  \
                         run: echo \"$SAFE_VALUE\""
                    ),
                    &workflow.source_file,
                )
                .in_job(&job.job_id)
                .at_step(step.display_name(), step.line_number),
            );
        }
    }

    findings
}

/// Inner text of `${{ ... }}` with delimiters and surrounding whitespace removed.
fn expression_body(expr: &str) -> &str {
    expr.trim_matches(|c: char| matches!(c, '$' | '{' | '}') || c.is_whitespace())
}

fn dangerous_context(body: &str) -> Option<&'static str> {
    DANGEROUS_CONTEXTS
        .iter()
        .copied()
        .find(|context| body.contains(context))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::model::{Job, Step};

    fn workflow_with_run(script: &str) -> Workflow {
        let mut wf = Workflow::new("ci.yml");
        let mut job = Job::new("greet");
        job.steps.push(Step::run(Some("Echo"), script));
        wf.jobs.push(job);
        wf
    }

    #[test]
    fn test_detects_pr_title_injection() {
        let wf = workflow_with_run("echo \"${{ github.event.pull_request.title }}\"");
        let findings = check_script_injection(&wf);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule_id, "script-injection");
        assert_eq!(findings[0].severity, Severity::Critical);
        assert_eq!(findings[0].job_id, "greet");
        assert_eq!(findings[0].step_name, "Echo");
        assert!(findings[0]
            .description
            .contains("github.event.pull_request.title"));
    }

    #[test]
    fn test_detects_issue_body_without_spaces() {
        let wf = workflow_with_run("echo ${{github.event.issue.body}}");
        assert_eq!(check_script_injection(&wf).len(), 1);
    }

    #[test]
    fn test_ignores_safe_contexts() {
        let wf = workflow_with_run("echo \"${{ github.sha }}\" && echo ${{ github.ref_name }}");
        assert!(check_script_injection(&wf).is_empty());
    }

    #[test]
    fn test_one_finding_per_expression() {
        let wf = workflow_with_run(
            "echo \"${{ github.event.issue.title }}\"\n\
             echo \"${{ github.sha }}\"\n\
             git checkout ${{ github.head_ref }}",
        );
        let findings = check_script_injection(&wf);
        assert_eq!(findings.len(), 2);
        assert!(findings[1].description.contains("github.head_ref"));
    }

    #[test]
    fn test_expression_spanning_lines() {
        let wf = workflow_with_run("echo ${{\n  github.event.comment.body\n}}");
        assert_eq!(check_script_injection(&wf).len(), 1);
    }

    #[test]
    fn test_object_filter_context() {
        let wf = workflow_with_run("echo ${{ join(github.event.pages.*.page_name, ' ') }}");
        let findings = check_script_injection(&wf);
        assert_eq!(findings.len(), 1);
        assert!(findings[0]
            .description
            .contains("'github.event.pages.*.page_name'"));
    }

    #[test]
    fn test_context_list() {
        assert_eq!(DANGEROUS_CONTEXTS.len(), 13);
        for context in DANGEROUS_CONTEXTS {
            let wf = workflow_with_run(&format!("echo \"${{{{ {context} }}}}\""));
            assert_eq!(check_script_injection(&wf).len(), 1, "{context}");
        }
        for safe in ["github.event.pull_request.head.sha", "github.event.number"] {
            let wf = workflow_with_run(&format!("echo ${{{{ {safe} }}}}"));
            assert!(check_script_injection(&wf).is_empty(), "{safe}");
        }
    }

    #[test]
    fn test_ignores_steps_without_run() {
        let mut wf = Workflow::new("ci.yml");
        let mut job = Job::new("build");
        job.steps.push(Step::uses(None, "actions/checkout@v4"));
        wf.jobs.push(job);
        assert!(check_script_injection(&wf).is_empty());
    }

    #[test]
    fn test_unnamed_step_label() {
        let mut wf = Workflow::new("ci.yml");
        let mut job = Job::new("build");
        job.steps.push(Step::run(None, "echo ${{ github.event.issue.title }}"));
        wf.jobs.push(job);
        assert_eq!(check_script_injection(&wf)[0].step_name, "(unnamed step)");
    }

    #[test]
    fn test_expression_body() {
        assert_eq!(expression_body("${{ github.sha }}"), "github.sha");
        assert_eq!(expression_body("${{\n\tx\n}}"), "x");
    }
}
