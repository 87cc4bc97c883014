//! CLI argument parsing via `clap`.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "xfi",
    version,
    about = "Reconcile x-fidelity analysis results",
    long_about = "xfi turns a raw x-fidelity analysis result into validated per-file diagnostics, an issue tree, and a status summary.\n\nConfiguration precedence: CLI > xfi.toml > defaults.",
    after_help = "Examples:\n  xfi reconcile --input .xfiResults/XFI_RESULT.json\n  x-fidelity . --output json | xfi reconcile --input - --output json",
    arg_required_else_help = true
)]
/// Top-level CLI options and subcommands.
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand)]
/// Supported subcommands.
pub enum Commands {
    /// Show version
    #[command(about = "Show version", long_about = "Print the current xfi version.")]
    Version,
    /// Reconcile one analysis result
    #[command(
        about = "Reconcile an analysis result",
        long_about = "Read a raw analysis result, convert every rule failure into a diagnostic, and report the reconciled totals. Error-severity issues contribute to CI exits.",
        after_help = "Examples:\n  xfi reconcile --input result.json\n  xfi reconcile --input - --output json --no-source"
    )]
    Reconcile {
        #[arg(long, help = "Repository root (default: current dir)")]
        repo_root: Option<String>,
        #[arg(long, help = "Analysis result JSON file, or '-' for stdin (default: stdin)")]
        input: Option<String>,
        #[arg(long, help = "Output mode: human|json (default: human)")]
        output: Option<String>,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Do not read source files when validating ranges")]
        no_source: bool,
    },
}
