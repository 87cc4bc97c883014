//! Consumers of processed results.
//!
//! A consumer receives the coordinator's `Arc` as-is and must derive its view
//! from it alone; the three built-in views below keep the `Arc` so that
//! identical-object delivery can be checked.

use crate::error::ConsumerError;
use crate::models::{Diagnostic, ProcessedAnalysisResult, ProcessedIssue, Severity};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Capability exposed by every display surface.
pub trait ResultConsumer: Send + Sync {
    fn name(&self) -> &str;

    /// Replace the consumer's state with `result`.
    ///
    /// The default reports `Unsupported`, which the coordinator tolerates.
    fn update_from_processed_result(
        &self,
        _result: &Arc<ProcessedAnalysisResult>,
    ) -> Result<(), ConsumerError> {
        Err(ConsumerError::Unsupported)
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicking consumer must not wedge later updates.
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Default)]
/// Per-file diagnostics, as an editor's problem list would show them.
pub struct DiagnosticsView {
    current: Mutex<Option<Arc<ProcessedAnalysisResult>>>,
}

impl DiagnosticsView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Arc<ProcessedAnalysisResult>> {
        lock(&self.current).clone()
    }

    /// Snapshot of the diagnostics map; empty before the first update.
    pub fn files(&self) -> BTreeMap<String, Vec<Diagnostic>> {
        self.current()
            .map(|r| r.diagnostics.clone())
            .unwrap_or_default()
    }

    pub fn diagnostic_count(&self) -> usize {
        self.current()
            .map(|r| r.diagnostics.values().map(Vec::len).sum())
            .unwrap_or(0)
    }
}

impl ResultConsumer for DiagnosticsView {
    fn name(&self) -> &str {
        "diagnostics"
    }

    fn update_from_processed_result(
        &self,
        result: &Arc<ProcessedAnalysisResult>,
    ) -> Result<(), ConsumerError> {
        *lock(&self.current) = Some(Arc::clone(result));
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleNode {
    pub rule: String,
    pub issues: Vec<ProcessedIssue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeverityNode {
    pub severity: Severity,
    pub count: usize,
    pub rules: Vec<RuleNode>,
}

#[derive(Default)]
/// Issues grouped by severity, then by rule.
pub struct IssueTreeView {
    current: Mutex<Option<Arc<ProcessedAnalysisResult>>>,
}

impl IssueTreeView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Arc<ProcessedAnalysisResult>> {
        lock(&self.current).clone()
    }

    /// Build the grouped tree. Severity groups follow `Severity` order and
    /// rules are sorted by id; empty groups are omitted.
    pub fn tree(&self) -> Vec<SeverityNode> {
        let Some(res) = self.current() else {
            return Vec::new();
        };
        let mut grouped: BTreeMap<Severity, BTreeMap<String, Vec<ProcessedIssue>>> =
            BTreeMap::new();
        for is in &res.processed_issues {
            grouped
                .entry(is.severity)
                .or_default()
                .entry(is.rule.clone())
                .or_default()
                .push(is.clone());
        }
        grouped
            .into_iter()
            .map(|(severity, rules)| SeverityNode {
                severity,
                count: rules.values().map(Vec::len).sum(),
                rules: rules
                    .into_iter()
                    .map(|(rule, issues)| RuleNode { rule, issues })
                    .collect(),
            })
            .collect()
    }

    pub fn issue_count(&self) -> usize {
        self.tree().iter().map(|n| n.count).sum()
    }
}

impl ResultConsumer for IssueTreeView {
    fn name(&self) -> &str {
        "issue-tree"
    }

    fn update_from_processed_result(
        &self,
        result: &Arc<ProcessedAnalysisResult>,
    ) -> Result<(), ConsumerError> {
        *lock(&self.current) = Some(Arc::clone(result));
        Ok(())
    }
}

#[derive(Default)]
/// One-line summary built only from the issue breakdown.
pub struct StatusBar {
    current: Mutex<Option<Arc<ProcessedAnalysisResult>>>,
}

impl StatusBar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Arc<ProcessedAnalysisResult>> {
        lock(&self.current).clone()
    }

    pub fn text(&self) -> String {
        let Some(res) = self.current() else {
            return "xfi: no analysis".to_string();
        };
        let b = &res.issue_breakdown;
        let mut s = format!(
            "xfi: ✖ {} ▲ {} ◆ {}",
            b.error,
            b.warning,
            b.info + b.hint + b.exempt
        );
        if b.unhandled > 0 {
            s.push_str(&format!(" ⚠ {} unhandled", b.unhandled));
        }
        s
    }
}

impl ResultConsumer for StatusBar {
    fn name(&self) -> &str {
        "status-bar"
    }

    fn update_from_processed_result(
        &self,
        result: &Arc<ProcessedAnalysisResult>,
    ) -> Result<(), ConsumerError> {
        *lock(&self.current) = Some(Arc::clone(result));
        Ok(())
    }
}
