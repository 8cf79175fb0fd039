use anyhow::{Context, Result};
use clap::Parser;
use fmc_agent::audit;
use fmc_agent::cli::{Command, LogArgs, PlanArgs, RootArgs, RunArgs, ValidateArgs};
use fmc_agent::config::{self, AgentConfig};
use fmc_agent::exec::{execute, ExecutionResult, ShellRunner};
use fmc_agent::plan::{plan, PlanDocument};
use fmc_agent::registry::Registry;
use fmc_agent::validate::{validate, ValidationReport};
use fmc_agent::workbook::Workbook;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Exit code for blocking validation failures, distinct from general errors.
const EXIT_VALIDATION: u8 = 2;

fn main() -> ExitCode {
    init_tracing();
    let args = RootArgs::parse();
    match dispatch(args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn dispatch(args: RootArgs) -> Result<ExitCode> {
    match args.command {
        Command::Validate(args) => cmd_validate(args),
        Command::Plan(args) => cmd_plan(args),
        Command::Run(args) => cmd_run(args),
        Command::Log(args) => cmd_log(args),
    }
}

fn load_setup(file: &Path) -> Result<(AgentConfig, Registry, Workbook)> {
    let config = config::load(Path::new("."))?;
    let registry = Registry::standard(&config.im_program);
    let workbook = Workbook::load(file)?;
    Ok((config, registry, workbook))
}

fn cmd_validate(args: ValidateArgs) -> Result<ExitCode> {
    let (_, registry, workbook) = load_setup(&args.file)?;
    let report = validate(&workbook, &registry);

    for summary in &report.summaries {
        if summary.present {
            println!("{}: {} rows, {} columns", summary.sheet, summary.rows, summary.columns);
        } else {
            println!("{}: missing", summary.sheet);
        }
    }
    if report.is_valid() {
        println!("workbook is valid");
        return Ok(ExitCode::SUCCESS);
    }
    report_issues(&report);
    Ok(ExitCode::from(EXIT_VALIDATION))
}

fn cmd_plan(args: PlanArgs) -> Result<ExitCode> {
    let (_, registry, workbook) = load_setup(&args.file)?;
    let selection = resolve_selection(&registry, &args.ops)?;
    let report = validate(&workbook, &registry);
    if !report.is_valid() {
        report_issues(&report);
        return Ok(ExitCode::from(EXIT_VALIDATION));
    }

    let outcome = plan(&workbook, &registry, selection.as_ref(), &report)?;
    let document = PlanDocument {
        operations: outcome.operations,
    };
    let json = serde_json::to_string_pretty(&document).context("serialize plan")?;
    match &args.out {
        Some(path) => {
            std::fs::write(path, &json)
                .with_context(|| format!("write plan {}", path.display()))?;
            println!("wrote plan with {} operation(s) to {}", document.operations.len(), path.display());
        }
        None => println!("{json}"),
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_run(args: RunArgs) -> Result<ExitCode> {
    let (config, registry, mut workbook) = load_setup(&args.file)?;
    let selection = resolve_selection(&registry, &args.ops)?;
    let report = validate(&workbook, &registry);
    if !report.is_valid() {
        report_issues(&report);
        return Ok(ExitCode::from(EXIT_VALIDATION));
    }

    let planned = plan(&workbook, &registry, selection.as_ref(), &report)?;
    if planned.operations.is_empty() {
        println!("no eligible rows ({} skipped)", planned.skipped);
        return Ok(ExitCode::SUCCESS);
    }

    let dry_run = args.dry_run || config.dry_run;
    let runner = ShellRunner::new(Duration::from_secs(config.timeout_seconds));
    let outcome = execute(&planned.operations, dry_run, &runner);
    for result in &outcome.results {
        println!(
            "{} row {}: {}",
            result.operation.sheet,
            result.operation.row,
            result.status.label()
        );
    }

    let wwid = args.wwid.clone().unwrap_or_else(|| config.resolve_wwid());
    let records = audit::build_records(&outcome.results, &wwid);
    audit::append_to_workbook(&mut workbook, &records);
    if let Err(err) = workbook.save(&args.file) {
        // The external operations may already have taken effect; keep the
        // results so only the audit step needs retrying.
        stash_pending_audit(&args.file, &outcome.results)?;
        return Err(err.context("append audit entries to workbook"));
    }
    println!("appended {} audit entries", records.len());

    if let Some(reason) = outcome.fatal {
        anyhow::bail!("execution aborted: {reason}");
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_log(args: LogArgs) -> Result<ExitCode> {
    let workbook = Workbook::load(&args.file)?;
    let entries = audit::recent(&workbook, args.count);
    if entries.is_empty() {
        println!("audit ledger is empty");
        return Ok(ExitCode::SUCCESS);
    }
    for row in entries {
        println!(
            "{} | {} | {} | {}",
            row.field("Timestamp"),
            row.field("Operation"),
            row.field("Status"),
            row.field("Details (generated id)")
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn resolve_selection(registry: &Registry, ops: &[String]) -> Result<Option<BTreeSet<String>>> {
    if ops.is_empty() {
        return Ok(None);
    }
    let mut selected = BTreeSet::new();
    for name in ops {
        registry.by_name(name)?;
        selected.insert(name.clone());
    }
    Ok(Some(selected))
}

fn report_issues(report: &ValidationReport) {
    eprintln!("validation failed with {} issue(s):", report.issues.len());
    for issue in &report.issues {
        eprintln!("  {}", issue.message);
    }
}

fn pending_audit_path(file: &Path) -> PathBuf {
    file.with_extension("pending-audit.json")
}

fn stash_pending_audit(file: &Path, results: &[ExecutionResult]) -> Result<()> {
    let path = pending_audit_path(file);
    let json = serde_json::to_string_pretty(results).context("serialize execution results")?;
    std::fs::write(&path, json)
        .with_context(|| format!("write pending audit {}", path.display()))?;
    eprintln!(
        "audit append failed; execution results saved to {}",
        path.display()
    );
    Ok(())
}
