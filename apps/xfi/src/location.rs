//! Source location extraction for single rule failures.
//!
//! Resolution order, first applicable wins:
//! 1. explicit `lineNumber`/`columnNumber` on `details` (high confidence)
//! 2. the first dependency's manifest coordinates (high)
//! 3. known file-level rules pinned to line 1 (medium)
//! 4. line 1, column 1 fallback (low)
//!
//! Lines and columns here are 1-based, as reported by rule authors.

use crate::models::RuleFailure;
use crate::utils;
use serde::Serialize;

/// Rule ids that always report against the whole file.
const FILE_LEVEL_RULES: &[&str] = &[
    "missingRequiredFiles",
    "invalidSystemIdConfigured",
    "outdatedFramework",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LocationSource {
    Explicit,
    DependencyLocation,
    FileLevelRule,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLocation {
    pub start_line: i64,
    pub start_column: i64,
    pub end_line: i64,
    pub end_column: i64,
    pub source: LocationSource,
    /// Set when the location points into another file (a dependency manifest).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationResult {
    pub found: bool,
    pub confidence: Confidence,
    pub location: RawLocation,
}

impl RawLocation {
    fn point(line: i64, column: i64, source: LocationSource) -> Self {
        Self {
            start_line: line,
            start_column: column,
            end_line: line,
            end_column: column,
            source,
            file: None,
        }
    }
}

/// Determine the best-available location for a rule failure.
pub fn extract_location(failure: &RuleFailure) -> LocationResult {
    let details = failure.details.as_ref();

    if let Some(line) = details.and_then(|d| d.line_number) {
        let column = details.and_then(|d| d.column_number).unwrap_or(1);
        return LocationResult {
            found: true,
            confidence: Confidence::High,
            location: RawLocation::point(line, column, LocationSource::Explicit),
        };
    }

    if let Some(loc) = failure.payload().and_then(dependency_location) {
        return LocationResult {
            found: true,
            confidence: Confidence::High,
            location: loc,
        };
    }

    if is_file_level_rule(&failure.rule_id) || details.map(|d| d.file_level).unwrap_or(false) {
        return LocationResult {
            found: true,
            confidence: Confidence::Medium,
            location: RawLocation::point(1, 1, LocationSource::FileLevelRule),
        };
    }

    LocationResult {
        found: false,
        confidence: Confidence::Low,
        location: RawLocation::point(1, 1, LocationSource::Fallback),
    }
}

/// Clamp a location into a renderable, non-degenerate span.
pub fn validate_location(loc: RawLocation) -> RawLocation {
    let start_line = loc.start_line.max(0);
    let start_column = loc.start_column.max(0);
    let end_line = loc.end_line.max(start_line);
    let mut end_column = loc.end_column.max(0);
    if end_line == start_line && end_column <= start_column {
        end_column = start_column.saturating_add(1);
    }
    RawLocation {
        start_line,
        start_column,
        end_line,
        end_column,
        ..loc
    }
}

/// File-level rules report no coordinates of their own.
pub fn is_file_level_rule(rule_id: &str) -> bool {
    rule_id.ends_with("-global")
        || FILE_LEVEL_RULES
            .iter()
            .any(|name| rule_id == *name || rule_id.starts_with(&format!("{name}-")))
}

/// Manifest location of the first dependency entry, if the payload has one.
fn dependency_location(payload: &serde_json::Value) -> Option<RawLocation> {
    let first = payload.as_array()?.first()?;
    let loc = first.get("location")?;
    let line = utils::get_json_i64(loc, "lineNumber")?;
    let column = utils::get_json_i64(loc, "columnNumber").unwrap_or(1);
    let manifest = loc.get("manifestPath")?.as_str()?;
    let mut out = RawLocation::point(line, column, LocationSource::DependencyLocation);
    out.file = Some(manifest.to_string());
    Some(out)
}
