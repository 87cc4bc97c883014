//! Reconciliation of raw rules-engine output into one canonical result.
//!
//! `ResultCoordinator` converts a `RawAnalysisResult` into a
//! `ProcessedAnalysisResult`, fans the same `Arc` out to every consumer and
//! keeps the last successfully distributed result for re-display.
//!
//! Input defects are handled at two levels:
//! - structural (a scan entry without `filePath`/`errors`, a failure without
//!   `ruleFailure`): logged and skipped, never counted;
//! - conversion (a well-formed failure that cannot be placed): recorded as a
//!   `FailedIssue` and counted as `unhandled`.

use crate::consumers::ResultConsumer;
use crate::enhanced::extract_enhanced_details;
use crate::error::{ConsumerError, ConversionError, Error, Result};
use crate::location::{extract_location, validate_location, RawLocation};
use crate::models::{
    DetailType, Diagnostic, DiagnosticRange, EnhancedIssueDetails, FailedIssue, IssueBreakdown,
    ProcessedAnalysisResult, ProcessedIssue, RawAnalysisResult, RuleFailure, ScanResult, Severity,
};
use crate::range::{validate_range, RangeOptions};
use crate::utils;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn, Span};

/// File reference used by rules that check the repository as a whole.
pub const GLOBAL_CHECK_MARKER: &str = "REPO_GLOBAL_CHECK";

/// Default `source` tag stamped on every diagnostic.
pub const DEFAULT_SOURCE_TAG: &str = "X-Fidelity";

/// Access to file text for line-aware range validation.
pub trait SourceReader: Send + Sync {
    fn read(&self, path: &Path) -> Option<String>;
}

/// Reads source text straight from disk.
pub struct FsSourceReader;

impl SourceReader for FsSourceReader {
    fn read(&self, path: &Path) -> Option<String> {
        if path.is_file() {
            fs::read_to_string(path).ok()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct CoordinatorOptions {
    /// Base for relative file references. Without it relative paths fail
    /// resolution.
    pub workspace_root: Option<PathBuf>,
    pub range: RangeOptions,
    pub source_tag: String,
    pub global_check_marker: String,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            workspace_root: None,
            range: RangeOptions::default(),
            source_tag: DEFAULT_SOURCE_TAG.to_string(),
            global_check_marker: GLOBAL_CHECK_MARKER.to_string(),
        }
    }
}

/// True when `file_path` names the repo-wide pseudo file rather than a real one.
pub fn is_global_check_reference(file_path: &str, marker: &str) -> bool {
    !marker.is_empty() && file_path.trim_end().ends_with(marker)
}

/// Coarse grouping shown next to each issue.
pub fn categorize(rule_id: &str, kind: Option<DetailType>) -> String {
    let by_kind = match kind {
        Some(DetailType::Dependency) => Some("dependency"),
        Some(DetailType::Complexity) => Some("complexity"),
        Some(DetailType::SensitiveData) => Some("security"),
        Some(DetailType::PatternMatch) => Some("pattern"),
        Some(DetailType::Validation) => Some("validation"),
        Some(DetailType::Generic) | None => None,
    };
    if let Some(c) = by_kind {
        return c.to_string();
    }
    let r = rule_id.to_ascii_lowercase();
    let c = if r.contains("sensitive") || r.contains("secret") {
        "security"
    } else if r.contains("complexity") {
        "complexity"
    } else if r.contains("dependency") || r.contains("outdated") || r.contains("framework") {
        "dependency"
    } else if r.contains("database") || r.contains("pattern") {
        "pattern"
    } else {
        "general"
    };
    c.to_string()
}

pub struct ResultCoordinator {
    options: CoordinatorOptions,
    reader: Option<Box<dyn SourceReader>>,
    span: Span,
    last_processed: Option<Arc<ProcessedAnalysisResult>>,
}

/// Per-run scratch state.
#[derive(Default)]
struct RunState {
    diagnostics: BTreeMap<String, Vec<Diagnostic>>,
    processed: Vec<ProcessedIssue>,
    failed: Vec<FailedIssue>,
    ids: HashSet<String>,
    sources: HashMap<PathBuf, Option<String>>,
}

/// A successfully placed failure.
struct Placed {
    key: String,
    diagnostic: Diagnostic,
    issue: ProcessedIssue,
}

impl ResultCoordinator {
    /// `span` is the parent of every event the coordinator logs.
    pub fn new(options: CoordinatorOptions, span: Span) -> Self {
        Self {
            options,
            reader: None,
            span,
            last_processed: None,
        }
    }

    /// Enable line-aware ranges by giving the coordinator access to file text.
    pub fn with_source_reader(mut self, reader: Box<dyn SourceReader>) -> Self {
        self.reader = Some(reader);
        self
    }

    pub fn is_global_check_reference(&self, file_path: &str) -> bool {
        is_global_check_reference(file_path, &self.options.global_check_marker)
    }

    /// Convert `raw`, hand the result to every consumer, then cache it.
    ///
    /// Consumers run in parallel and all of them are attempted; if any
    /// rejects the update, the first rejection (in consumer order) is returned
    /// and the cache is left untouched.
    pub fn process_and_distribute_results(
        &mut self,
        raw: &RawAnalysisResult,
        consumers: &[Arc<dyn ResultConsumer>],
    ) -> Result<Arc<ProcessedAnalysisResult>> {
        let span = self.span.clone();
        let _enter = span.enter();

        let processed = Arc::new(self.process(raw));
        self.distribute(&processed, consumers)?;
        self.last_processed = Some(Arc::clone(&processed));
        Ok(processed)
    }

    /// Redistribute the cached result. `false` when nothing is cached or a
    /// consumer rejects the update.
    pub fn restore_diagnostics_from_cache(&self, consumers: &[Arc<dyn ResultConsumer>]) -> bool {
        let _enter = self.span.enter();
        let Some(cached) = self.last_processed.as_ref() else {
            info!("no cached analysis result to restore");
            return false;
        };
        match self.distribute(cached, consumers) {
            Ok(()) => {
                debug!(issues = cached.total_issues, "restored diagnostics from cache");
                true
            }
            Err(e) => {
                warn!(error = %e, "restoring cached diagnostics failed");
                false
            }
        }
    }

    pub fn get_last_processed_result(&self) -> Option<Arc<ProcessedAnalysisResult>> {
        self.last_processed.clone()
    }

    pub fn has_cached_results(&self) -> bool {
        self.last_processed.is_some()
    }

    /// Drop the cached result.
    pub fn dispose(&mut self) {
        self.last_processed = None;
    }

    /// Build the canonical result without distributing or caching it.
    pub fn process(&self, raw: &RawAnalysisResult) -> ProcessedAnalysisResult {
        let xfi = raw.xfi_result();
        if xfi.is_none() {
            info!("analysis result carries no XFI_RESULT; reporting zero issues");
        }
        let xfi = xfi.unwrap_or_default();

        let mut st = RunState::default();
        for (idx, entry) in xfi.issue_details.iter().enumerate() {
            let Some(scan) = ScanResult::from_json(entry) else {
                warn!(index = idx, "skipping scan result without filePath/errors");
                continue;
            };
            for (j, err) in scan.errors.iter().enumerate() {
                let Some(failure) = RuleFailure::from_json(err) else {
                    warn!(file = %scan.file_path, index = j, "skipping rule failure without ruleFailure id");
                    continue;
                };
                self.convert_failure(&scan.file_path, &failure, raw.timestamp, &mut st);
            }
        }

        let successful = st.processed.len();
        let failed = st.failed.len();
        let total = successful + failed;
        let out = ProcessedAnalysisResult {
            total_issues: total,
            successful_issues: successful,
            failed_issues_count: failed,
            issue_breakdown: IssueBreakdown::tally(&st.processed, failed),
            diagnostics: st.diagnostics,
            processed_issues: st.processed,
            failed_issues: st.failed,
            metadata: raw.metadata.clone(),
            timestamp: raw.timestamp,
            duration: raw.duration,
            operation_id: raw.operation_id.clone(),
        };

        match xfi.total_issues {
            Some(reported) if reported != total as u64 => warn!(
                reported,
                computed = total,
                "reported issue total differs from reconciled total"
            ),
            Some(_) => debug!(total, "issue totals reconciled"),
            None => debug!(total, "no self-reported issue total to reconcile"),
        }
        info!(
            archetype = xfi.archetype.as_deref().unwrap_or("unknown"),
            scanned_files = xfi.file_count.unwrap_or(0),
            total,
            successful,
            failed,
            files = out.diagnostics.len(),
            "processed analysis result"
        );
        out
    }

    fn convert_failure(&self, file_path: &str, failure: &RuleFailure, found_at: u64, st: &mut RunState) {
        let severity = Severity::from_level(&failure.level);
        let message = failure
            .details
            .as_ref()
            .and_then(|d| d.message.as_deref())
            .map(utils::clean_message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("Rule '{}' failed", failure.rule_id));
        let enhanced = extract_enhanced_details(
            failure.details.as_ref().map(|d| &d.raw),
            &failure.rule_id,
        );
        let category = categorize(&failure.rule_id, enhanced.as_ref().map(|e| e.kind));

        match self.place(file_path, failure, severity, &message, &category, enhanced, found_at, st) {
            Ok(placed) => {
                st.diagnostics
                    .entry(placed.key)
                    .or_default()
                    .push(placed.diagnostic);
                st.processed.push(placed.issue);
            }
            Err(e) => {
                warn!(file = %file_path, rule = %failure.rule_id, reason = %e, "rule failure could not be converted");
                st.failed.push(FailedIssue {
                    original_data: failure.raw.clone(),
                    file_path: file_path.to_string(),
                    rule_id: failure.rule_id.clone(),
                    message,
                    severity,
                    failure_reason: e.to_string(),
                    raw_error: Some(format!("{e:?}")),
                    category: Some(category),
                });
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn place(
        &self,
        file_path: &str,
        failure: &RuleFailure,
        severity: Severity,
        message: &str,
        category: &str,
        enhanced: Option<EnhancedIssueDetails>,
        found_at: u64,
        st: &mut RunState,
    ) -> std::result::Result<Placed, ConversionError> {
        let is_global = self.is_global_check_reference(file_path);
        let extracted = extract_location(failure).location;

        // Repo-wide dependency findings are shown in the manifest itself.
        let manifest_target = if is_global {
            enhanced
                .as_ref()
                .filter(|e| e.kind == DetailType::Dependency)
                .and_then(|e| e.items.first())
                .and_then(|it| it.location.as_ref())
                .and_then(|loc| {
                    let file = loc.file.clone()?;
                    let line = i64::from(loc.line);
                    let column = i64::from(loc.column.unwrap_or(1));
                    Some((
                        file,
                        RawLocation {
                            start_line: line,
                            start_column: column,
                            end_line: line,
                            end_column: column,
                            ..extracted.clone()
                        },
                    ))
                })
        } else {
            None
        };
        let (target, location) = match manifest_target {
            Some((file, loc)) => (file, loc),
            None => (file_path.to_string(), extracted),
        };

        let path = self.resolve_file(&target)?;
        let range = self.diagnostic_range(&path, &location, st)?;
        let display = match self.options.workspace_root.as_deref() {
            Some(root) => utils::rel_to_root(&path, root),
            None => path.to_string_lossy().replace('\\', "/"),
        };

        let line = range.start_line + 1;
        let base_id = format!("{}:{}:{}", display, failure.rule_id, line);
        let mut id = base_id.clone();
        let mut n = 1;
        while !st.ids.insert(id.clone()) {
            n += 1;
            id = format!("{base_id}#{n}");
        }

        let details = failure.details.as_ref();
        Ok(Placed {
            key: path.to_string_lossy().to_string(),
            diagnostic: Diagnostic {
                range,
                message: message.to_string(),
                severity,
                source: self.options.source_tag.clone(),
                code: failure.rule_id.clone(),
            },
            issue: ProcessedIssue {
                id,
                file: display,
                rule: failure.rule_id.clone(),
                severity,
                message: message.to_string(),
                line,
                column: range.start_column + 1,
                category: category.to_string(),
                fixable: details.map(|d| d.fixable).unwrap_or(false),
                exempted: failure.level.trim().eq_ignore_ascii_case("exempt"),
                date_found: found_at,
                is_global_check: is_global,
                enhanced_details: enhanced,
            },
        })
    }

    /// Absolute paths are used as-is, relative ones join the workspace root;
    /// both are lexically normalized so one file always yields one key.
    fn resolve_file(&self, file_path: &str) -> std::result::Result<PathBuf, ConversionError> {
        let trimmed = file_path.trim();
        let fail = || ConversionError::FileResolution {
            path: file_path.to_string(),
        };
        if trimmed.is_empty() || trimmed.contains('\0') {
            return Err(fail());
        }
        let p = Path::new(trimmed);
        if p.is_absolute() {
            return Ok(utils::normalize_path(p));
        }
        self.options
            .workspace_root
            .as_ref()
            .map(|root| utils::normalize_path(&root.join(p)))
            .ok_or_else(fail)
    }

    /// Turn a 1-based extracted location into a validated 0-based range.
    ///
    /// Point locations are handed to the range validator as zero-width
    /// requests so the line text, when available, decides their width.
    fn diagnostic_range(
        &self,
        path: &Path,
        extracted: &RawLocation,
        st: &mut RunState,
    ) -> std::result::Result<DiagnosticRange, ConversionError> {
        let is_point = extracted.start_line == extracted.end_line
            && extracted.start_column == extracted.end_column;
        for (what, v) in [("line", extracted.start_line), ("column", extracted.start_column)] {
            if v > i64::from(u32::MAX) {
                return Err(ConversionError::DiagnosticCreation(format!(
                    "{what} {v} is out of range"
                )));
            }
        }
        let loc = validate_location(extracted.clone());
        let (end_line, end_column) = if is_point {
            (loc.start_line, loc.start_column)
        } else {
            (loc.end_line, loc.end_column)
        };

        let text = match self.reader.as_ref() {
            Some(reader) => st
                .sources
                .entry(path.to_path_buf())
                .or_insert_with(|| reader.read(path))
                .as_deref(),
            None => None,
        };
        let r = validate_range(
            loc.start_line - 1,
            loc.start_column - 1,
            end_line - 1,
            end_column - 1,
            text,
            &self.options.range,
        );
        if r.was_adjusted {
            debug!(file = %path.display(), reason = r.reason.as_str(), "adjusted diagnostic range");
        }
        Ok(DiagnosticRange {
            start_line: r.start_line,
            start_column: r.start_column,
            end_line: r.end_line,
            end_column: r.end_column,
        })
    }

    /// Hand `result` to every consumer in parallel.
    fn distribute(
        &self,
        result: &Arc<ProcessedAnalysisResult>,
        consumers: &[Arc<dyn ResultConsumer>],
    ) -> Result<()> {
        let span = &self.span;
        let outcomes: Vec<(String, std::result::Result<(), ConsumerError>)> = consumers
            .par_iter()
            .map(|c| {
                span.in_scope(|| {
                    debug!(consumer = c.name(), "updating consumer");
                    (c.name().to_string(), c.update_from_processed_result(result))
                })
            })
            .collect();

        let mut first_err = None;
        for (name, outcome) in outcomes {
            match outcome {
                Ok(()) => {}
                Err(ConsumerError::Unsupported) => {
                    warn!(consumer = %name, "consumer does not accept processed results; skipped");
                }
                Err(e) => {
                    warn!(consumer = %name, error = %e, "consumer update failed");
                    if first_err.is_none() {
                        first_err = Some(Error::ConsumerUpdate {
                            consumer: name,
                            source: e,
                        });
                    }
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
