//! Data models: the raw rules-engine input and the canonical processed output.

pub mod processed;
pub mod raw;

pub use processed::{
    DetailType, Diagnostic, DiagnosticRange, EnhancedIssueDetails, EnhancedIssueItem, FailedIssue,
    IssueBreakdown, ItemLocation, ItemSeverity, ProcessedAnalysisResult, ProcessedIssue, Severity,
};
pub use raw::{RawAnalysisResult, RuleFailure, ScanResult};
