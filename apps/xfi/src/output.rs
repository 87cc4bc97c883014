//! Output rendering for the reconcile command.
//!
//! Supports `human` (default) and `json` outputs. The JSON form carries the
//! full processed result plus what each built-in view would display.

use crate::consumers::{IssueTreeView, StatusBar};
use crate::error::Result;
use crate::models::{ProcessedAnalysisResult, ProcessedIssue, Severity};
use owo_colors::OwoColorize;
use serde_json::json;
use serde_json::Value as JsonVal;
use std::collections::BTreeMap;
use std::fmt::Write as _;

fn use_colors(output: &str) -> bool {
    output != "json" && std::env::var_os("NO_COLOR").is_none()
}

/// Print a reconciled result in the requested format.
pub fn print_reconcile(
    res: &ProcessedAnalysisResult,
    tree: &IssueTreeView,
    status: &StatusBar,
    output: &str,
) -> Result<()> {
    match output {
        "json" => {
            let out = compose_reconcile_json(res, tree, status)?;
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        _ => print!("{}", render_human(res, tree, status, use_colors(output))),
    }
    Ok(())
}

fn severity_tag(sev: Severity, color: bool) -> String {
    let (icon, tag) = match sev {
        Severity::Error => ("✖", "⟦error⟧"),
        Severity::Warning => ("▲", "⟦warn⟧"),
        Severity::Info => ("◆", "⟦info⟧"),
        Severity::Hint => ("·", "⟦hint⟧"),
        Severity::Exempt => ("○", "⟦exempt⟧"),
    };
    if !color {
        return format!("{icon} {tag}");
    }
    match sev {
        Severity::Error => format!("{} {}", icon.red(), tag.red().bold()),
        Severity::Warning => format!("{} {}", icon.yellow(), tag.yellow().bold()),
        Severity::Info => format!("{} {}", icon.blue(), tag.blue().bold()),
        Severity::Hint | Severity::Exempt => {
            format!("{} {}", icon.bright_black(), tag.bright_black())
        }
    }
}

fn issue_line(is: &ProcessedIssue, color: bool) -> String {
    let mut line = format!(
        "  {} {}:{} ❲{}❳ — {}",
        severity_tag(is.severity, color),
        is.line,
        is.column,
        is.rule,
        is.message
    );
    if is.exempted {
        line.push_str(" (exempted)");
    }
    if let Some(ed) = &is.enhanced_details {
        let _ = write!(line, "\n      ↳ {}", ed.summary);
        for item in &ed.items {
            let _ = write!(line, "\n        • {}: {}", item.label, item.description);
        }
    }
    line
}

/// Render the human report (pure) for testing purposes.
pub fn render_human(
    res: &ProcessedAnalysisResult,
    tree: &IssueTreeView,
    status: &StatusBar,
    color: bool,
) -> String {
    let mut out = String::new();

    let mut by_file: BTreeMap<&str, Vec<&ProcessedIssue>> = BTreeMap::new();
    for is in &res.processed_issues {
        by_file.entry(is.file.as_str()).or_default().push(is);
    }
    for (file, issues) in by_file {
        if color {
            let _ = writeln!(out, "{}", file.bold());
        } else {
            let _ = writeln!(out, "{file}");
        }
        for is in issues {
            let _ = writeln!(out, "{}", issue_line(is, color));
        }
    }

    let nodes = tree.tree();
    if !nodes.is_empty() {
        let _ = writeln!(out, "By severity:");
        for node in nodes {
            let _ = writeln!(out, "  {} ({})", node.severity.as_str(), node.count);
            for rule in node.rules {
                let _ = writeln!(out, "    {} ({})", rule.rule, rule.issues.len());
            }
        }
    }

    for f in &res.failed_issues {
        let file = if f.file_path.trim().is_empty() {
            "<no file>"
        } else {
            f.file_path.as_str()
        };
        let head = if color {
            "⚠ unhandled:".yellow().bold().to_string()
        } else {
            "⚠ unhandled:".to_string()
        };
        let _ = writeln!(
            out,
            "{} {} ❲{}❳ — {} ({})",
            head, file, f.rule_id, f.message, f.failure_reason
        );
    }

    let summary = status.text();
    if color {
        let _ = writeln!(out, "{}", summary.bold());
    } else {
        let _ = writeln!(out, "{summary}");
    }
    out
}

/// Compose the reconcile JSON object (pure) for testing/snapshot purposes.
pub fn compose_reconcile_json(
    res: &ProcessedAnalysisResult,
    tree: &IssueTreeView,
    status: &StatusBar,
) -> Result<JsonVal> {
    Ok(json!({
        "result": serde_json::to_value(res)?,
        "views": {
            "issueTree": serde_json::to_value(tree.tree())?,
            "statusBar": status.text(),
        }
    }))
}
