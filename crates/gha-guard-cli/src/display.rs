use colored::*;
use gha_guard_core::rules::finding::{severity_counts, Finding, Severity};
use gha_guard_core::EnrichedFinding;

fn severity_tag(severity: Severity) -> String {
    let label = format!(" {:<8} ", severity.symbol());
    match severity {
        Severity::Critical => label.on_red().white().bold().to_string(),
        Severity::High => label.on_yellow().black().bold().to_string(),
        Severity::Medium => label.on_blue().white().bold().to_string(),
        Severity::Low => label.dimmed().to_string(),
    }
}

fn print_header(title: &str, target: &str) {
    println!();
    println!(" {}", "=".repeat(60).dimmed());
    println!(
        " {}",
        format!("gha-guard v{} | {}", env!("CARGO_PKG_VERSION"), title).bold()
    );
    if !target.is_empty() {
        println!(" {} {}", "Target:".dimmed(), target);
    }
    println!(" {}", "=".repeat(60).dimmed());
    println!();
}

/// Print a security report for one or more workflow files to the terminal.
pub fn print_findings(findings: &[Finding], target: &str) {
    print_header("GitHub Actions Security Report", target);

    if findings.is_empty() {
        println!(" {} No security issues found!", "OK".green().bold());
        println!();
        return;
    }

    println!(" Found {} issue(s):", findings.len().to_string().bold());
    for (severity, count) in severity_counts(findings) {
        println!("   {} x {}", severity_tag(severity), count);
    }
    println!();
    println!(" {}", "-".repeat(60).dimmed());

    for (i, finding) in findings.iter().enumerate() {
        println!();
        print_finding(i + 1, finding);
    }

    println!();
    println!(" {}", "=".repeat(60).dimmed());
    println!();
}

/// Print findings with their model-written explanation and fix.
pub fn print_enriched(enriched: &[EnrichedFinding], target: &str) {
    print_header("GitHub Actions Security Report (AI-Enhanced)", target);

    if enriched.is_empty() {
        println!(" {} No security issues found!", "OK".green().bold());
        println!();
        return;
    }

    println!(" Found {} issue(s):", enriched.len().to_string().bold());
    println!(" {}", "-".repeat(60).dimmed());

    for (i, item) in enriched.iter().enumerate() {
        println!();
        print_finding(i + 1, &item.finding);
        println!("   {}", "|".dimmed());
        println!("   {} {}", "|".dimmed(), "Why this matters:".yellow().bold());
        for line in item.explanation.lines() {
            println!("   {}   {}", "|".dimmed(), line);
        }
        println!("   {}", "|".dimmed());
        println!("   {} {}", "|".dimmed(), "Suggested fix:".green().bold());
        for line in item.suggested_fix.lines() {
            println!("   {}   {}", "|".dimmed(), line.green());
        }
    }

    println!();
    println!(" {}", "=".repeat(60).dimmed());
    println!();
}

fn print_finding(index: usize, finding: &Finding) {
    println!(
        " {} #{}: {}",
        severity_tag(finding.severity),
        index,
        finding.title.bold()
    );
    println!("   {} Rule:  {}", "|".dimmed(), finding.rule_id.cyan());
    println!("   {} File:  {}", "|".dimmed(), finding.file_path);
    if !finding.job_id.is_empty() {
        println!("   {} Job:   {}", "|".dimmed(), finding.job_id);
    }
    if !finding.step_name.is_empty() {
        println!("   {} Step:  {}", "|".dimmed(), finding.step_name);
    }
    if let Some(line) = finding.line_number {
        println!("   {} Line:  {}", "|".dimmed(), line);
    }
    println!("   {}", "|".dimmed());
    for line in finding.description.lines() {
        println!("   {} {}", "|".dimmed(), line);
    }
}
