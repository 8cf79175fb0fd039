//! CLI argument parsing for the workbook pipeline.
//!
//! The CLI is intentionally thin: commands wire the validate/plan/execute/
//! audit stages together without embedding any policy of their own.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "fmc",
    version,
    about = "Workbook-driven automation for RV&S change-tracking operations",
    after_help = "Examples:\n  fmc validate --file workbook.json\n  fmc plan --file workbook.json --ops 'Create Fail Mode' --out plan.json\n  fmc run --file workbook.json --dry-run\n  fmc run --file workbook.json --wwid xz0417\n  fmc log --file workbook.json --count 20",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate workbook structure and row completeness
    Validate(ValidateArgs),
    /// Produce a side-effect-free execution plan as JSON
    Plan(PlanArgs),
    /// Execute planned operations and append audit ledger entries
    Run(RunArgs),
    /// Show recent audit ledger entries
    Log(LogArgs),
}

#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Workbook file (JSON tables)
    #[arg(long, value_name = "FILE")]
    pub file: PathBuf,
}

#[derive(Parser, Debug)]
pub struct PlanArgs {
    /// Workbook file (JSON tables)
    #[arg(long, value_name = "FILE")]
    pub file: PathBuf,

    /// Restrict planning to these operation names (repeatable)
    #[arg(long = "ops", value_name = "NAME")]
    pub ops: Vec<String>,

    /// Write the plan JSON here instead of stdout
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Workbook file (JSON tables)
    #[arg(long, value_name = "FILE")]
    pub file: PathBuf,

    /// Restrict execution to these operation names (repeatable)
    #[arg(long = "ops", value_name = "NAME")]
    pub ops: Vec<String>,

    /// Simulate command execution without invoking the external CLI
    #[arg(long)]
    pub dry_run: bool,

    /// Operator identity recorded in the audit ledger
    #[arg(long, value_name = "ID")]
    pub wwid: Option<String>,
}

#[derive(Parser, Debug)]
pub struct LogArgs {
    /// Workbook file (JSON tables)
    #[arg(long, value_name = "FILE")]
    pub file: PathBuf,

    /// Number of most-recent entries to show
    #[arg(long, default_value_t = 10)]
    pub count: usize,
}
