mod display;
mod logging;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use gha_guard_core::config::{self, Config};
use gha_guard_core::report;
use gha_guard_core::{
    EnrichedFinding, EnrichmentClient, Finding, RuleRegistry, Severity, Workflow, WorkflowParser,
};
use std::collections::{BTreeSet, HashMap};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "gha-guard",
    version,
    about = "gha-guard: GitHub Actions security scanner",
    long_about = "Scan GitHub Actions workflow files for unpinned actions, broad token permissions, \
                  script injection, dangerous triggers and leaked secrets."
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan workflow files for security issues
    Scan(ScanArgs),
}

#[derive(clap::Args, Debug, Clone)]
struct ScanArgs {
    /// Path to a workflow file or a directory containing workflow files
    #[arg(default_value = ".github/workflows/")]
    path: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Minimum severity to report (low, medium, high, critical)
    #[arg(short, long)]
    severity: Option<Severity>,

    /// Rule id to ignore (repeatable)
    #[arg(long = "ignore-rule", value_name = "RULE_ID")]
    ignore_rules: Vec<String>,

    /// Glob of workflow files to skip, relative to the scan path (repeatable)
    #[arg(long = "exclude", value_name = "GLOB")]
    exclude: Vec<String>,

    /// Config file (defaults to the nearest .gha-guard.yml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Ask Claude to explain each finding and suggest a fix (needs ANTHROPIC_API_KEY)
    #[arg(long)]
    enrich: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Sarif,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(
        &logging::LogConfig::from_verbosity(cli.verbose).with_ansi(std::io::stderr().is_terminal()),
    );

    let result = match cli.command {
        Commands::Scan(args) => cmd_scan(&args),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::from(2)
        }
    }
}

/// What a scan produced, before rendering.
struct ScanOutcome {
    workflows: usize,
    findings: Vec<Finding>,
}

fn cmd_scan(args: &ScanArgs) -> Result<ExitCode> {
    if args.enrich && args.format == OutputFormat::Sarif {
        anyhow::bail!("--enrich supports text and json output only");
    }
    let client = if args.enrich {
        Some(EnrichmentClient::from_env()?)
    } else {
        None
    };

    let config = resolve_config(args)?;
    let outcome = scan(&args.path, &config)?;

    if outcome.workflows == 0 {
        println!("No workflow files found.");
        return Ok(ExitCode::SUCCESS);
    }

    let enriched = match &client {
        Some(client) => Some(enrich_findings(client, &outcome.findings)?),
        None => None,
    };

    let target = args.path.display().to_string();
    let rendered = match (args.format, &enriched) {
        (OutputFormat::Text, None) => {
            display::print_findings(&outcome.findings, &target);
            None
        }
        (OutputFormat::Text, Some(enriched)) => {
            display::print_enriched(enriched, &target);
            None
        }
        (OutputFormat::Json, None) => Some(serde_json::to_string_pretty(&report::to_json(
            &outcome.findings,
        ))?),
        (OutputFormat::Json, Some(enriched)) => Some(serde_json::to_string_pretty(
            &report::to_enriched_json(enriched),
        )?),
        (OutputFormat::Sarif, _) => Some(serde_json::to_string_pretty(&report::to_sarif(
            &outcome.findings,
        ))?),
    };

    match (rendered, &args.output) {
        (None, _) => {}
        (Some(text), Some(out)) => {
            std::fs::write(out, text)
                .with_context(|| format!("Failed to write report to {}", out.display()))?;
            eprintln!("Report written to {}", out.display());
        }
        (Some(text), None) => println!("{}", text),
    }

    Ok(ExitCode::from(exit_code(&outcome.findings)))
}

/// Load the config file, then layer command-line flags over it.
fn resolve_config(args: &ScanArgs) -> Result<Config> {
    let mut config = config::load_config(args.config.as_deref(), Some(&args.path))?;
    if let Some(severity) = args.severity {
        config.severity = severity;
    }
    config.ignore_rules.extend(args.ignore_rules.iter().cloned());
    config.exclude.extend(args.exclude.iter().cloned());
    tracing::debug!(?config, "Effective configuration");
    Ok(config)
}

fn scan(path: &Path, config: &Config) -> Result<ScanOutcome> {
    let (workflows, scan_root): (Vec<Workflow>, &Path) = if path.is_file() {
        let workflow = WorkflowParser::parse_file(path)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        (vec![workflow], path.parent().unwrap_or(path))
    } else if path.is_dir() {
        let workflows = WorkflowParser::parse_dir(path)
            .with_context(|| format!("Failed to scan {}", path.display()))?;
        (workflows, path)
    } else {
        anyhow::bail!("'{}' is not a file or directory", path.display());
    };

    let workflows: Vec<Workflow> = workflows
        .into_iter()
        .filter(|wf| {
            let excluded = config.is_excluded(Path::new(&wf.source_file), scan_root);
            if excluded {
                tracing::info!(file = %wf.source_file, "Excluded by config");
            }
            !excluded
        })
        .collect();

    let registry = RuleRegistry::builtin();
    let mut findings = Vec::new();
    for workflow in &workflows {
        findings.extend(registry.evaluate(workflow));
    }
    let total = findings.len();
    let findings = config.filter_findings(findings);
    tracing::info!(
        workflows = workflows.len(),
        total,
        reported = findings.len(),
        "Scan complete"
    );

    Ok(ScanOutcome {
        workflows: workflows.len(),
        findings,
    })
}

/// Explain each finding with the workflow text it came from.
fn enrich_findings(client: &EnrichmentClient, findings: &[Finding]) -> Result<Vec<EnrichedFinding>> {
    let sources = read_sources(findings);
    tracing::info!(findings = findings.len(), model = client.model(), "Enriching findings");
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime.block_on(client.enrich_all(findings, &sources))
}

/// Raw text of every file a finding points at, keyed by its path.
/// Files that cannot be re-read are logged and left out.
fn read_sources(findings: &[Finding]) -> HashMap<String, String> {
    let paths: BTreeSet<&str> = findings.iter().map(|f| f.file_path.as_str()).collect();
    paths
        .into_iter()
        .filter_map(|path| match std::fs::read_to_string(path) {
            Ok(text) => Some((path.to_string(), text)),
            Err(e) => {
                tracing::warn!(file = path, error = %e, "Cannot re-read workflow for enrichment");
                None
            }
        })
        .collect()
}

/// 0 when nothing is reported, 1 otherwise. Errors exit with 2 from `main`.
fn exit_code(findings: &[Finding]) -> u8 {
    u8::from(!findings.is_empty())
}
