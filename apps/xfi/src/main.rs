//! xfi CLI binary entry point.
//! Reads a raw analysis result, reconciles it and prints the views.

mod cli;
mod config;
mod consumers;
mod coordinator;
mod enhanced;
mod error;
mod location;
mod models;
mod output;
mod range;
mod utils;

use clap::Parser;
use cli::{Cli, Commands};
use consumers::{DiagnosticsView, IssueTreeView, ResultConsumer, StatusBar};
use coordinator::{FsSourceReader, ResultCoordinator};
use models::RawAnalysisResult;
use std::fs;
use std::io::Read;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_env("XFI_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Read the analysis JSON from a file, or stdin for `-`/none.
fn read_input(input: Option<&str>) -> error::Result<serde_json::Value> {
    let text = match input {
        None | Some("-") => {
            let mut s = String::new();
            std::io::stdin().read_to_string(&mut s)?;
            s
        }
        Some(path) => fs::read_to_string(path)?,
    };
    Ok(serde_json::from_str(&text)?)
}

/// Returns true when the analysis holds at least one error-severity issue.
fn run_reconcile(
    repo_root: Option<&str>,
    input: Option<&str>,
    output: Option<&str>,
    no_source: bool,
) -> error::Result<bool> {
    let eff = config::resolve_effective(repo_root, output, no_source)?;
    let human = eff.output != "json";
    // Friendly note if no xfi config was found
    if human && eff.config_path.is_none() {
        eprintln!(
            "{} No xfi.toml found; using defaults.",
            utils::note_prefix()
        );
    }

    let raw = RawAnalysisResult::from_json(read_input(input)?);
    if human && raw.xfi_result().is_none() {
        eprintln!(
            "{} Input carries no XFI_RESULT; reporting zero issues.",
            utils::info_prefix()
        );
    }

    let span = tracing::info_span!("reconcile", root = %eff.repo_root.display());
    let mut coordinator = ResultCoordinator::new(eff.coordinator_options(), span);
    if eff.read_source {
        coordinator = coordinator.with_source_reader(Box::new(FsSourceReader));
    }

    let diagnostics = Arc::new(DiagnosticsView::new());
    let tree = Arc::new(IssueTreeView::new());
    let status = Arc::new(StatusBar::new());
    let consumers: Vec<Arc<dyn ResultConsumer>> =
        vec![diagnostics.clone(), tree.clone(), status.clone()];

    let result = coordinator.process_and_distribute_results(&raw, &consumers)?;
    tracing::debug!(
        files = diagnostics.files().len(),
        diagnostics = diagnostics.diagnostic_count(),
        "views updated"
    );
    output::print_reconcile(&result, &tree, &status, &eff.output)?;
    Ok(result.issue_breakdown.error > 0)
}

fn main() {
    let cli = Cli::parse();
    init_tracing();
    match cli.cmd {
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Reconcile {
            repo_root,
            input,
            output,
            no_source,
        } => match run_reconcile(
            repo_root.as_deref(),
            input.as_deref(),
            output.as_deref(),
            no_source,
        ) {
            Ok(true) => std::process::exit(1),
            Ok(false) => {}
            Err(e) => {
                eprintln!("{} {}", utils::error_prefix(), e);
                std::process::exit(2);
            }
        },
    }
}
