pub mod dangerous_triggers;
pub mod finding;
pub mod permissions;
pub mod script_injection;
pub mod secret_handling;
pub mod unpinned_actions;

pub use finding::{Finding, Severity};

use crate::parser::model::Workflow;

/// A security check: reads a workflow, returns zero or more findings.
pub type RuleFn = fn(&Workflow) -> Vec<Finding>;

#[derive(Clone, Copy)]
struct RegisteredRule {
    name: &'static str,
    check: RuleFn,
}

impl std::fmt::Debug for RegisteredRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredRule").field("name", &self.name).finish()
    }
}

/// Ordered set of security checks.
///
/// Built once before any workflow is evaluated, then only read. The
/// registry holds plain function pointers, so a built registry can be
/// shared across threads.
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
    rules: Vec<RegisteredRule>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in check.
    pub fn builtin() -> Self {
        Self::new()
            .with_rule("unpinned-actions", unpinned_actions::check_unpinned_actions)
            .with_rule("permissions", permissions::check_permissions)
            .with_rule("script-injection", script_injection::check_script_injection)
            .with_rule("dangerous-triggers", dangerous_triggers::check_dangerous_triggers)
            .with_rule("secret-handling", secret_handling::check_secret_handling)
    }

    /// Append a check; it runs after every check registered before it.
    pub fn register(&mut self, name: &'static str, check: RuleFn) -> &mut Self {
        self.rules.push(RegisteredRule { name, check });
        self
    }

    pub fn with_rule(mut self, name: &'static str, check: RuleFn) -> Self {
        self.register(name, check);
        self
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Run every check in registration order and concatenate the results.
    ///
    /// Findings are neither sorted, deduplicated nor filtered here.
    pub fn evaluate(&self, workflow: &Workflow) -> Vec<Finding> {
        let mut findings = Vec::new();
        for rule in &self.rules {
            let produced = (rule.check)(workflow);
            tracing::debug!(
                rule = rule.name,
                file = %workflow.source_file,
                count = produced.len(),
                "Rule evaluated"
            );
            findings.extend(produced);
        }
        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::model::{Job, Step};

    fn always_low(wf: &Workflow) -> Vec<Finding> {
        vec![Finding::new("first", Severity::Low, "a", "", &wf.source_file)]
    }

    fn always_critical(wf: &Workflow) -> Vec<Finding> {
        vec![
            Finding::new("second", Severity::Critical, "b", "", &wf.source_file),
            Finding::new("second", Severity::Critical, "c", "", &wf.source_file),
        ]
    }

    #[test]
    fn test_concatenates_in_registration_order() {
        let registry = RuleRegistry::new()
            .with_rule("low", always_low)
            .with_rule("critical", always_critical);
        let findings = registry.evaluate(&Workflow::new("ci.yml"));

        let titles: Vec<&str> = findings.iter().map(|f| f.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_empty_registry_yields_nothing() {
        let registry = RuleRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.evaluate(&Workflow::new("ci.yml")).is_empty());
    }

    #[test]
    fn test_single_rule_registry() {
        let mut registry = RuleRegistry::new();
        registry.register("dangerous-triggers", dangerous_triggers::check_dangerous_triggers);

        let mut wf = Workflow::new("ci.yml");
        wf.triggers = vec!["pull_request_target".into()];
        let findings = registry.evaluate(&wf);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule_id, "dangerous-trigger");
    }

    #[test]
    fn test_builtin_order() {
        assert_eq!(
            RuleRegistry::builtin().rule_names(),
            vec![
                "unpinned-actions",
                "permissions",
                "script-injection",
                "dangerous-triggers",
                "secret-handling"
            ]
        );
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let mut wf = Workflow::new("ci.yml");
        wf.triggers = vec!["pull_request_target".into(), "workflow_dispatch".into()];
        let mut job = Job::new("build");
        job.steps.push(Step::uses(None, "actions/checkout@v3"));
        job.steps.push(Step::run(
            Some("Greet"),
            "echo \"${{ github.event.issue.title }}\" ${{ secrets.TOKEN }}",
        ));
        wf.jobs.push(job);

        let registry = RuleRegistry::builtin();
        let first = registry.evaluate(&wf);
        let second = registry.evaluate(&wf);
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn test_registry_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RuleRegistry>();
    }
}
