//! CLI argument definitions
//!
//! All Clap derive structs for `phasekeeper` command-line parsing.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::observability::LogFormat;

// ============================================================================
// Root CLI
// ============================================================================

/// Combat phase and engagement tracker.
#[derive(Parser, Debug)]
#[command(name = "phasekeeper", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log output format.
    #[arg(long, default_value = "human", global = true, env = "PHASEKEEPER_LOG_FORMAT")]
    pub log_format: LogFormat,
}

// ============================================================================
// Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print an encounter's phase grouping and engagement groups.
    Show(ShowArgs),

    /// Replay an action script against an encounter.
    Apply(ApplyArgs),

    /// Generate shell completion scripts.
    Completions(CompletionsArgs),

    /// Display version information.
    Version(VersionArgs),
}

/// Arguments for `show`.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Encounter file (YAML or JSON).
    #[arg(short, long, env = "PHASEKEEPER_ENCOUNTER")]
    pub encounter: PathBuf,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

/// Arguments for `apply`.
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Encounter file (YAML or JSON).
    #[arg(short, long, env = "PHASEKEEPER_ENCOUNTER")]
    pub encounter: PathBuf,

    /// Action script (YAML or JSON).
    #[arg(short, long)]
    pub script: PathBuf,

    /// Tracker configuration file.
    #[arg(short, long, env = "PHASEKEEPER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Write the updated encounter here instead of printing the grouping.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write change events as JSONL to this file (`-` for stderr).
    #[arg(long)]
    pub events_file: Option<PathBuf>,

    /// Print Prometheus metrics after the run.
    #[arg(long)]
    pub metrics: bool,

    /// Output format for the printed grouping.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

/// Arguments for shell completion generation.
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Target shell for completion script.
    pub shell: Shell,
}

/// Arguments for version display.
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// CLI-Local Enums
// ============================================================================

/// Output format for structured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

/// Shell type for completion generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    /// Bash shell.
    Bash,
    /// Zsh shell.
    Zsh,
    /// Fish shell.
    Fish,
    /// `PowerShell`.
    #[value(name = "powershell")]
    PowerShell,
    /// Elvish shell.
    Elvish,
}
