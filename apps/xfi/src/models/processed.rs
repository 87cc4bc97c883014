//! Canonical, renderer-agnostic output of the reconciliation pipeline.
//!
//! Every consumer receives the same `ProcessedAnalysisResult` behind an `Arc`;
//! nothing here is mutated after construction.

use serde::Serialize;
use serde_json::Value as Json;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
    Exempt,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
            Severity::Hint => "hint",
            Severity::Exempt => "exempt",
        }
    }

    /// Map a free-text rule level onto a display severity.
    ///
    /// Only `Error`, `Warning` and `Info` are reachable: `exempt` and every
    /// unknown level land on `Info`.
    pub fn from_level(level: &str) -> Self {
        match level.trim().to_ascii_lowercase().as_str() {
            "error" | "critical" | "high" | "fatality" | "fatal" => Severity::Error,
            "warning" | "warn" | "medium" | "moderate" => Severity::Warning,
            _ => Severity::Info,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
/// Per-severity counts; `unhandled` counts failed conversions.
pub struct IssueBreakdown {
    pub error: usize,
    pub warning: usize,
    pub info: usize,
    pub hint: usize,
    pub exempt: usize,
    pub unhandled: usize,
}

impl IssueBreakdown {
    pub fn tally(issues: &[ProcessedIssue], failed: usize) -> Self {
        let mut out = IssueBreakdown {
            unhandled: failed,
            ..Default::default()
        };
        for is in issues {
            match is.severity {
                Severity::Error => out.error += 1,
                Severity::Warning => out.warning += 1,
                Severity::Info => out.info += 1,
                Severity::Hint => out.hint += 1,
                Severity::Exempt => out.exempt += 1,
            }
        }
        out
    }

    /// Sum of the five display buckets (excludes `unhandled`).
    pub fn handled(&self) -> usize {
        self.error + self.warning + self.info + self.hint + self.exempt
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
/// 0-based, end-exclusive range.
pub struct DiagnosticRange {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub range: DiagnosticRange,
    pub message: String,
    pub severity: Severity,
    pub source: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedIssue {
    pub id: String,
    pub file: String,
    pub rule: String,
    pub severity: Severity,
    pub message: String,
    /// 1-based
    pub line: u32,
    /// 1-based
    pub column: u32,
    pub category: String,
    pub fixable: bool,
    pub exempted: bool,
    pub date_found: u64,
    pub is_global_check: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enhanced_details: Option<EnhancedIssueDetails>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
/// A rule failure that could not be turned into a diagnostic.
pub struct FailedIssue {
    pub original_data: Json,
    pub file_path: String,
    pub rule_id: String,
    pub message: String,
    pub severity: Severity,
    pub failure_reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetailType {
    Dependency,
    Complexity,
    SensitiveData,
    PatternMatch,
    Validation,
    Generic,
}

impl DetailType {
    pub fn as_str(self) -> &'static str {
        match self {
            DetailType::Dependency => "dependency",
            DetailType::Complexity => "complexity",
            DetailType::SensitiveData => "sensitive-data",
            DetailType::PatternMatch => "pattern-match",
            DetailType::Validation => "validation",
            DetailType::Generic => "generic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemSeverity {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
/// Location of a sub-item; `file` is set when it differs from the issue's file.
pub struct ItemLocation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// 1-based
    pub line: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnhancedIssueItem {
    pub label: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<ItemLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<ItemSeverity>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedIssueDetails {
    #[serde(rename = "type")]
    pub kind: DetailType,
    pub summary: String,
    pub actionable: bool,
    pub items: Vec<EnhancedIssueItem>,
    pub raw_details: Json,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
/// Result of one analysis run after reconciliation.
pub struct ProcessedAnalysisResult {
    pub total_issues: usize,
    pub successful_issues: usize,
    pub failed_issues_count: usize,
    pub issue_breakdown: IssueBreakdown,
    /// Keyed by resolved file path; never holds an empty list.
    pub diagnostics: BTreeMap<String, Vec<Diagnostic>>,
    pub processed_issues: Vec<ProcessedIssue>,
    pub failed_issues: Vec<FailedIssue>,
    pub metadata: Json,
    pub timestamp: u64,
    pub duration: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
}

impl ProcessedAnalysisResult {
    /// Check the counting invariants every consumer relies on.
    pub fn is_consistent(&self) -> bool {
        self.total_issues == self.successful_issues + self.failed_issues_count
            && self.successful_issues == self.processed_issues.len()
            && self.failed_issues_count == self.failed_issues.len()
            && self.issue_breakdown.unhandled == self.failed_issues_count
            && self.issue_breakdown.handled() == self.successful_issues
            && self.diagnostics.values().all(|d| !d.is_empty())
            && self.diagnostics.values().map(Vec::len).sum::<usize>() == self.successful_issues
            && self.diagnostics.keys().all(|key| {
                self.processed_issues
                    .iter()
                    .any(|is| key_names_file(key, &is.file))
            })
    }
}

/// Whether a diagnostics key (resolved path) is the file an issue displays,
/// which is either the key itself or a root-relative suffix of it.
fn key_names_file(key: &str, file: &str) -> bool {
    let key = key.replace('\\', "/");
    !file.is_empty() && (key == file || key.ends_with(&format!("/{file}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_mapping_table() {
        for lvl in ["error", "critical", "high", "fatality", "fatal", "FATALITY", " Error "] {
            assert_eq!(Severity::from_level(lvl), Severity::Error, "{lvl}");
        }
        for lvl in ["warning", "warn", "medium", "moderate"] {
            assert_eq!(Severity::from_level(lvl), Severity::Warning, "{lvl}");
        }
        for lvl in ["info", "", "low", "something-else"] {
            assert_eq!(Severity::from_level(lvl), Severity::Info, "{lvl}");
        }
    }

    #[test]
    fn test_exempt_level_maps_to_info() {
        // The exempt bucket is not reachable from a raw level today.
        assert_eq!(Severity::from_level("exempt"), Severity::Info);
    }

    #[test]
    fn test_detail_type_serializes_kebab_case() {
        let s = serde_json::to_string(&DetailType::SensitiveData).unwrap();
        assert_eq!(s, "\"sensitive-data\"");
        assert_eq!(DetailType::PatternMatch.as_str(), "pattern-match");
    }

    fn one_issue_result(key: &str, file: &str) -> ProcessedAnalysisResult {
        let issue = ProcessedIssue {
            id: format!("{file}:r:1"),
            file: file.into(),
            rule: "r".into(),
            severity: Severity::Error,
            message: "m".into(),
            line: 1,
            column: 1,
            category: "general".into(),
            fixable: false,
            exempted: false,
            date_found: 0,
            is_global_check: false,
            enhanced_details: None,
        };
        let diag = Diagnostic {
            range: DiagnosticRange {
                start_line: 0,
                start_column: 0,
                end_line: 0,
                end_column: 1,
            },
            message: "m".into(),
            severity: Severity::Error,
            source: "X-Fidelity".into(),
            code: "r".into(),
        };
        ProcessedAnalysisResult {
            total_issues: 1,
            successful_issues: 1,
            failed_issues_count: 0,
            issue_breakdown: IssueBreakdown::tally(std::slice::from_ref(&issue), 0),
            diagnostics: BTreeMap::from([(key.to_string(), vec![diag])]),
            processed_issues: vec![issue],
            failed_issues: Vec::new(),
            metadata: Json::Null,
            timestamp: 0,
            duration: 0,
            operation_id: None,
        }
    }

    #[test]
    fn test_consistency_links_keys_to_issue_files() {
        assert!(one_issue_result("/repo/src/a.ts", "src/a.ts").is_consistent());
        assert!(one_issue_result("/abs/b.ts", "/abs/b.ts").is_consistent());
        // a key no issue points at
        assert!(!one_issue_result("/repo/src/other.ts", "src/a.ts").is_consistent());
        assert!(!one_issue_result("/repo/xsrc/a.ts", "src/a.ts").is_consistent());
    }

    #[test]
    fn test_breakdown_tally() {
        let b = IssueBreakdown::tally(&[], 2);
        assert_eq!(b.unhandled, 2);
        assert_eq!(b.handled(), 0);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        /// Arbitrary levels never produce hint or exempt, and anything outside
        /// the error/warning vocabularies lands on info.
        #[test]
        fn prop_level_mapping_is_closed(level in "[a-zA-Z ]{0,12}") {
            let sev = Severity::from_level(&level);
            prop_assert!(matches!(sev, Severity::Error | Severity::Warning | Severity::Info));
            let norm = level.trim().to_ascii_lowercase();
            let is_error = ["error", "critical", "high", "fatality", "fatal"].contains(&norm.as_str());
            let is_warning = ["warning", "warn", "medium", "moderate"].contains(&norm.as_str());
            if !is_error && !is_warning {
                prop_assert_eq!(sev, Severity::Info);
            }
        }

        #[test]
        fn prop_exempt_spelling_maps_to_info(pad_l in " {0,3}", pad_r in " {0,3}", upper in any::<bool>()) {
            let word = if upper { "EXEMPT" } else { "exempt" };
            let level = format!("{pad_l}{word}{pad_r}");
            prop_assert_eq!(Severity::from_level(&level), Severity::Info);
        }
    }
}
