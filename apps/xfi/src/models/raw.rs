//! Lenient adapters over the rules engine's raw JSON output.
//!
//! Nothing in here fails: every accessor degrades to `None`/defaults so the
//! coordinator can decide whether a piece of input is structurally usable.
//! `XFI_RESULT` is accepted both nested under `metadata` and at the top level;
//! `RawAnalysisResult::xfi_result` is the only place that knows about that.

use serde_json::Value as Json;

pub const XFI_RESULT_KEY: &str = "XFI_RESULT";

#[derive(Debug, Clone, Default)]
/// Raw analysis result as produced by the rules engine.
pub struct RawAnalysisResult {
    /// Opaque metadata, passed through unmodified.
    pub metadata: Json,
    /// Legacy shape: `XFI_RESULT` placed next to `metadata`.
    pub top_level_result: Json,
    pub timestamp: u64,
    pub duration: u64,
    pub operation_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Normalized view over `XFI_RESULT`.
pub struct XfiResult {
    pub archetype: Option<String>,
    pub file_count: Option<u64>,
    /// Self-reported total, used only for the reconciliation check.
    pub total_issues: Option<u64>,
    pub issue_details: Vec<Json>,
}

#[derive(Debug, Clone, PartialEq)]
/// One file entry of `issueDetails`.
pub struct ScanResult {
    pub file_path: String,
    pub errors: Vec<Json>,
}

#[derive(Debug, Clone, PartialEq)]
/// One rule failure reported against a file.
pub struct RuleFailure {
    pub rule_id: String,
    pub level: String,
    pub details: Option<FailureDetails>,
    /// The failure exactly as received.
    pub raw: Json,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FailureDetails {
    pub message: Option<String>,
    pub line_number: Option<i64>,
    pub column_number: Option<i64>,
    /// Polymorphic `details.details` payload.
    pub payload: Option<Json>,
    pub file_level: bool,
    pub fixable: bool,
    pub raw: Json,
}

impl RawAnalysisResult {
    /// Build from any JSON value. Non-object input yields an empty result.
    pub fn from_json(value: Json) -> Self {
        let Json::Object(mut obj) = value else {
            return Self::default();
        };
        Self {
            metadata: obj.remove("metadata").unwrap_or(Json::Null),
            top_level_result: obj.remove(XFI_RESULT_KEY).unwrap_or(Json::Null),
            timestamp: obj.get("timestamp").and_then(json_u64).unwrap_or(0),
            duration: obj.get("duration").and_then(json_u64).unwrap_or(0),
            operation_id: obj
                .get("operationId")
                .and_then(Json::as_str)
                .map(str::to_string),
        }
    }

    /// Locate and normalize `XFI_RESULT`.
    ///
    /// Returns `None` when neither shape carries an object. A malformed
    /// `issueDetails` (not an array) normalizes to an empty list.
    pub fn xfi_result(&self) -> Option<XfiResult> {
        let nested = self.metadata.get(XFI_RESULT_KEY).filter(|v| v.is_object());
        let node = nested.or_else(|| Some(&self.top_level_result).filter(|v| v.is_object()))?;
        Some(XfiResult {
            archetype: node
                .get("archetype")
                .and_then(Json::as_str)
                .map(str::to_string),
            file_count: node.get("fileCount").and_then(json_u64),
            total_issues: node.get("totalIssues").and_then(json_u64),
            issue_details: node
                .get("issueDetails")
                .and_then(Json::as_array)
                .cloned()
                .unwrap_or_default(),
        })
    }
}

impl ScanResult {
    /// Requires a string `filePath` and an array `errors`.
    pub fn from_json(value: &Json) -> Option<Self> {
        let file_path = value.get("filePath")?.as_str()?.to_string();
        let errors = value.get("errors")?.as_array()?.clone();
        Some(Self { file_path, errors })
    }
}

impl RuleFailure {
    /// Requires a string `ruleFailure`; everything else is optional.
    pub fn from_json(value: &Json) -> Option<Self> {
        let rule_id = value.get("ruleFailure")?.as_str()?.to_string();
        let level = value
            .get("level")
            .and_then(Json::as_str)
            .unwrap_or_default()
            .to_string();
        let details = value
            .get("details")
            .filter(|d| d.is_object())
            .map(FailureDetails::from_json);
        Some(Self {
            rule_id,
            level,
            details,
            raw: value.clone(),
        })
    }

    pub fn payload(&self) -> Option<&Json> {
        self.details.as_ref().and_then(|d| d.payload.as_ref())
    }
}

impl FailureDetails {
    fn from_json(value: &Json) -> Self {
        Self {
            message: value
                .get("message")
                .and_then(Json::as_str)
                .map(str::to_string),
            line_number: value.get("lineNumber").and_then(json_i64),
            column_number: value.get("columnNumber").and_then(json_i64),
            payload: value.get("details").filter(|v| !v.is_null()).cloned(),
            file_level: value
                .get("fileLevel")
                .and_then(Json::as_bool)
                .unwrap_or(false),
            fixable: value.get("fixable").and_then(Json::as_bool).unwrap_or(false),
            raw: value.clone(),
        }
    }
}

/// Read an integer, truncating finite floats.
pub fn json_i64(value: &Json) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
}

/// Read a non-negative integer, truncating finite floats.
pub fn json_u64(value: &Json) -> Option<u64> {
    json_i64(value).and_then(|n| u64::try_from(n).ok())
}
