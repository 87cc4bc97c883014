//! Classification of free-form failure payloads into structured details.
//!
//! `CLASSIFIERS` is an ordered table. For each entry the rule-id predicate is
//! checked first, then the extractor; the first entry yielding at least one
//! item decides the `type`. The order is part of the contract: a payload can
//! satisfy more than one shape (a dependency list is also a generic array).

use crate::models::{DetailType, EnhancedIssueDetails, EnhancedIssueItem, ItemLocation, ItemSeverity};
use crate::utils::{compact_json, first_str, get_json_i64};
use regex::Regex;
use serde_json::Value as Json;
use std::sync::LazyLock;

/// Items kept by the generic classifier.
pub const GENERIC_ITEM_LIMIT: usize = 10;

/// Database checks whose ids do not mention `database` or `pattern`.
const DATABASE_CHECK_RULES: &[&str] = &["noDatabases"];

static SENSITIVE_RULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)sensitive|logging|secret").expect("valid regex"));
static PATTERN_RULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)database|pattern").expect("valid regex"));
static VALIDATION_RULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)validation|invalid|extracted").expect("valid regex"));

struct Classifier {
    kind: DetailType,
    applies: fn(&str) -> bool,
    extract: fn(&Json) -> Option<Extracted>,
}

struct Extracted {
    summary: String,
    actionable: bool,
    items: Vec<EnhancedIssueItem>,
}

const CLASSIFIERS: &[Classifier] = &[
    Classifier {
        kind: DetailType::Dependency,
        applies: any_rule,
        extract: extract_dependencies,
    },
    Classifier {
        kind: DetailType::Complexity,
        applies: any_rule,
        extract: extract_complexity,
    },
    Classifier {
        kind: DetailType::SensitiveData,
        applies: is_sensitive_rule,
        extract: extract_sensitive,
    },
    Classifier {
        kind: DetailType::PatternMatch,
        applies: is_pattern_rule,
        extract: extract_pattern_matches,
    },
    Classifier {
        kind: DetailType::Validation,
        applies: is_validation_rule,
        extract: extract_validation,
    },
    Classifier {
        kind: DetailType::Generic,
        applies: any_rule,
        extract: extract_generic,
    },
];

/// Classify a failure's `details` object.
///
/// Returns `None` when details are absent or no classifier recognizes them;
/// the issue is still reported, only without the item breakdown.
pub fn extract_enhanced_details(details: Option<&Json>, rule_id: &str) -> Option<EnhancedIssueDetails> {
    let details = details.filter(|d| d.is_object())?;
    CLASSIFIERS
        .iter()
        .filter(|c| (c.applies)(rule_id))
        .find_map(|c| {
            let found = (c.extract)(details).filter(|e| !e.items.is_empty())?;
            Some(EnhancedIssueDetails {
                kind: c.kind,
                summary: found.summary,
                actionable: found.actionable,
                items: found.items,
                raw_details: details.get("details").cloned().unwrap_or(Json::Null),
            })
        })
}

fn any_rule(_: &str) -> bool {
    true
}

fn is_sensitive_rule(rule_id: &str) -> bool {
    SENSITIVE_RULE.is_match(rule_id)
}

fn is_pattern_rule(rule_id: &str) -> bool {
    PATTERN_RULE.is_match(rule_id)
        || DATABASE_CHECK_RULES
            .iter()
            .any(|name| rule_id == *name || rule_id.starts_with(&format!("{name}-")))
}

fn is_validation_rule(rule_id: &str) -> bool {
    VALIDATION_RULE.is_match(rule_id)
}

fn line_of(obj: &Json, keys: &[&str]) -> Option<u32> {
    keys.iter()
        .find_map(|k| get_json_i64(obj, k))
        .and_then(|n| u32::try_from(n).ok())
}

fn plural(n: usize, one: &str, many: &str) -> String {
    format!("{} {}", n, if n == 1 { one } else { many })
}

fn extract_dependencies(details: &Json) -> Option<Extracted> {
    let entries = details.get("details")?.as_array()?;
    let items: Vec<EnhancedIssueItem> = entries
        .iter()
        .filter_map(|dep| {
            let name = dep.get("dependency")?.as_str()?;
            let loc = dep.get("location")?;
            let manifest = loc.get("manifestPath")?.as_str()?;
            let line = line_of(loc, &["lineNumber"])?;
            let current = first_str(dep, &["currentVersion"]).unwrap_or_else(|| "unknown".into());
            let required = first_str(dep, &["requiredVersion"]).unwrap_or_else(|| "unknown".into());
            Some(EnhancedIssueItem {
                label: name.to_string(),
                description: format!("{current} → {required}"),
                location: Some(ItemLocation {
                    file: Some(manifest.to_string()),
                    line,
                    column: line_of(loc, &["columnNumber"]),
                }),
                severity: None,
            })
        })
        .collect();
    Some(Extracted {
        summary: format!("{} need updating", plural(items.len(), "dependency", "dependencies")),
        actionable: true,
        items,
    })
}

/// Threshold classification of one function's metrics.
pub fn complexity_severity(cyclomatic: i64, cognitive: i64, nesting: i64) -> ItemSeverity {
    if cyclomatic > 50 || cognitive > 100 || nesting > 10 {
        ItemSeverity::High
    } else if cyclomatic > 25 || cognitive > 50 || nesting > 6 {
        ItemSeverity::Medium
    } else {
        ItemSeverity::Low
    }
}

fn extract_complexity(details: &Json) -> Option<Extracted> {
    let list = details
        .get("details")
        .and_then(|d| d.get("complexities"))
        .or_else(|| details.get("complexities"))?
        .as_array()?;
    let items: Vec<EnhancedIssueItem> = list
        .iter()
        .filter_map(|f| {
            let m = f.get("metrics")?;
            if !m.is_object() {
                return None;
            }
            let metric = |k: &str| get_json_i64(m, k).unwrap_or(0);
            let (cyc, cog, nest) = (
                metric("cyclomaticComplexity"),
                metric("cognitiveComplexity"),
                metric("nestingDepth"),
            );
            let location = f.get("location").and_then(|loc| {
                Some(ItemLocation {
                    file: None,
                    line: line_of(loc, &["startLine"])?,
                    column: line_of(loc, &["startColumn"]),
                })
            });
            Some(EnhancedIssueItem {
                label: first_str(f, &["name"]).unwrap_or_else(|| "anonymous".into()),
                description: format!(
                    "cyclomatic {cyc}, cognitive {cog}, nesting {nest}, params {}, returns {}",
                    metric("parameterCount"),
                    metric("returnCount")
                ),
                location,
                severity: Some(complexity_severity(cyc, cog, nest)),
            })
        })
        .collect();
    Some(Extracted {
        summary: format!("{} over complexity thresholds", plural(items.len(), "function", "functions")),
        actionable: true,
        items,
    })
}

/// Collect `{line|lineNumber, pattern|match}` records from the payload.
///
/// Accepted shapes: a single record, `{matches: [records]}`, or `[records]`.
fn match_items(payload: &Json, severity: ItemSeverity) -> Vec<EnhancedIssueItem> {
    let records: Vec<&Json> = match payload {
        Json::Array(items) => items.iter().collect(),
        Json::Object(_) => match payload.get("matches").and_then(Json::as_array) {
            Some(items) => items.iter().collect(),
            None => vec![payload],
        },
        _ => Vec::new(),
    };
    records
        .into_iter()
        .filter_map(|r| {
            let line = line_of(r, &["line", "lineNumber"])?;
            let text = first_str(r, &["pattern", "match"])?;
            Some(EnhancedIssueItem {
                label: format!("Line {line}"),
                description: text,
                location: Some(ItemLocation {
                    file: None,
                    line,
                    column: line_of(r, &["column", "columnNumber"]),
                }),
                severity: Some(severity),
            })
        })
        .collect()
}

fn extract_sensitive(details: &Json) -> Option<Extracted> {
    let items = match_items(details.get("details")?, ItemSeverity::High);
    Some(Extracted {
        summary: format!(
            "{} of sensitive data",
            plural(items.len(), "possible exposure", "possible exposures")
        ),
        actionable: true,
        items,
    })
}

fn extract_pattern_matches(details: &Json) -> Option<Extracted> {
    let items = match_items(details.get("details")?, ItemSeverity::Medium);
    Some(Extracted {
        summary: format!("{} found", plural(items.len(), "pattern match", "pattern matches")),
        actionable: true,
        items,
    })
}

fn extract_validation(details: &Json) -> Option<Extracted> {
    let payload = details.get("details")?;
    if let Some(results) = payload.get("validationResults").and_then(Json::as_array) {
        let items: Vec<EnhancedIssueItem> = results
            .iter()
            .filter(|r| r.get("valid").and_then(Json::as_bool) == Some(false))
            .map(|r| EnhancedIssueItem {
                label: first_str(r, &["value", "name", "key"]).unwrap_or_else(|| "value".into()),
                description: first_str(r, &["message", "reason", "error"])
                    .unwrap_or_else(|| "failed validation".into()),
                location: line_of(r, &["line", "lineNumber"]).map(|line| ItemLocation {
                    file: None,
                    line,
                    column: None,
                }),
                severity: None,
            })
            .collect();
        return Some(Extracted {
            summary: format!("{} failed validation", plural(items.len(), "value", "values")),
            actionable: true,
            items,
        });
    }
    let values = payload.get("extractedValues")?.as_array()?;
    let items: Vec<EnhancedIssueItem> = values
        .iter()
        .map(|v| EnhancedIssueItem {
            label: first_str(v, &["value", "name", "key"]).unwrap_or_else(|| compact_json(v, 60)),
            description: first_str(v, &["source", "context"]).unwrap_or_default(),
            location: line_of(v, &["line", "lineNumber"]).map(|line| ItemLocation {
                file: None,
                line,
                column: None,
            }),
            severity: None,
        })
        .collect();
    Some(Extracted {
        summary: format!("{} extracted", plural(items.len(), "value", "values")),
        actionable: false,
        items,
    })
}

fn generic_label(item: &Json) -> String {
    match item {
        Json::Object(map) => first_str(item, &["name", "id", "key", "label"])
            .or_else(|| map.keys().next().cloned())
            .unwrap_or_else(|| "item".to_string()),
        other => compact_json(other, 60),
    }
}

fn extract_generic(details: &Json) -> Option<Extracted> {
    let list = details.get("details")?.as_array()?;
    let items: Vec<EnhancedIssueItem> = list
        .iter()
        .take(GENERIC_ITEM_LIMIT)
        .map(|it| EnhancedIssueItem {
            label: generic_label(it),
            description: first_str(it, &["message", "description"])
                .unwrap_or_else(|| if it.is_object() { compact_json(it, 120) } else { String::new() }),
            location: line_of(it, &["line", "lineNumber"]).map(|line| ItemLocation {
                file: None,
                line,
                column: None,
            }),
            severity: None,
        })
        .collect();
    let summary = if list.len() > GENERIC_ITEM_LIMIT {
        format!(
            "{} (showing first {})",
            plural(list.len(), "related item", "related items"),
            GENERIC_ITEM_LIMIT
        )
    } else {
        plural(list.len(), "related item", "related items")
    };
    Some(Extracted {
        summary,
        actionable: false,
        items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dependency_items_use_manifest_location() {
        let d = json!({"message": "outdated", "details": [
            {"dependency": "react", "currentVersion": "16.0.0", "requiredVersion": "18.0.0",
             "location": {"manifestPath": "package.json", "lineNumber": 15, "columnNumber": 5}},
            {"dependency": "lodash", "currentVersion": "3.0.0", "requiredVersion": "4.17.0",
             "location": {"manifestPath": "package.json", "lineNumber": 22}}
        ]});
        let out = extract_enhanced_details(Some(&d), "outdatedFramework-global").unwrap();
        assert_eq!(out.kind, DetailType::Dependency);
        assert!(out.actionable);
        assert_eq!(out.items.len(), 2);
        assert_eq!(out.items[0].label, "react");
        assert_eq!(out.items[0].description, "16.0.0 → 18.0.0");
        let loc = out.items[0].location.as_ref().unwrap();
        assert_eq!((loc.file.as_deref(), loc.line, loc.column), (Some("package.json"), 15, Some(5)));
        assert_eq!(out.summary, "2 dependencies need updating");
        assert_eq!(out.raw_details, d["details"]);
    }

    #[test]
    fn test_complexity_nested_and_direct() {
        let nested = json!({"details": {"complexities": [
            {"name": "parse", "metrics": {"cyclomaticComplexity": 60, "cognitiveComplexity": 10,
              "nestingDepth": 2, "parameterCount": 3, "returnCount": 1},
             "location": {"startLine": 42, "startColumn": 3}},
            {"name": "walk", "metrics": {"cyclomaticComplexity": 30}, "location": {"startLine": 90}},
            {"metrics": {"cyclomaticComplexity": 5}}
        ]}});
        let out = extract_enhanced_details(Some(&nested), "functionComplexity-iterative").unwrap();
        assert_eq!(out.kind, DetailType::Complexity);
        let sev: Vec<_> = out.items.iter().map(|i| i.severity.unwrap()).collect();
        assert_eq!(sev, vec![ItemSeverity::High, ItemSeverity::Medium, ItemSeverity::Low]);
        assert_eq!(out.items[0].location.as_ref().unwrap().line, 42);
        assert_eq!(out.items[2].label, "anonymous");
        assert!(out.items[2].location.is_none());

        let direct = json!({"complexities": [{"name": "f", "metrics": {"nestingDepth": 7}}]});
        let out = extract_enhanced_details(Some(&direct), "functionComplexity-iterative").unwrap();
        assert_eq!(out.items[0].severity, Some(ItemSeverity::Medium));
    }

    #[test]
    fn test_complexity_thresholds_are_strict() {
        assert_eq!(complexity_severity(50, 100, 10), ItemSeverity::Medium);
        assert_eq!(complexity_severity(25, 50, 6), ItemSeverity::Low);
        assert_eq!(complexity_severity(0, 101, 0), ItemSeverity::High);
        assert_eq!(complexity_severity(0, 0, 11), ItemSeverity::High);
    }

    #[test]
    fn test_sensitive_data_only_for_matching_rules() {
        let d = json!({"details": {"matches": [
            {"lineNumber": 4, "pattern": "password"},
            {"line": 9, "match": "api_key=abc"},
            {"pattern": "no line"}
        ]}});
        let out = extract_enhanced_details(Some(&d), "sensitiveLogging-iterative").unwrap();
        assert_eq!(out.kind, DetailType::SensitiveData);
        assert_eq!(out.items.len(), 2);
        assert_eq!(out.items[0].label, "Line 4");
        assert_eq!(out.items[1].description, "api_key=abc");
        assert_eq!(out.items[0].severity, Some(ItemSeverity::High));

        // Same payload under an unrelated rule has no array under details.details.
        assert!(extract_enhanced_details(Some(&d), "someOtherRule").is_none());
    }

    #[test]
    fn test_pattern_match_for_database_rules() {
        let d = json!({"details": [{"lineNumber": 12, "match": "SELECT * FROM users"}]});
        let out = extract_enhanced_details(Some(&d), "noDatabases-iterative").unwrap();
        assert_eq!(out.kind, DetailType::PatternMatch);
        assert_eq!(out.items[0].severity, Some(ItemSeverity::Medium));
        assert_eq!(out.items[0].location.as_ref().unwrap().line, 12);
    }

    #[test]
    fn test_validation_keeps_only_invalid_results() {
        let d = json!({"details": {"validationResults": [
            {"value": "ABC-1", "valid": true},
            {"value": "bogus", "valid": false, "message": "unknown system id", "line": 3}
        ]}});
        let out = extract_enhanced_details(Some(&d), "invalidSystemIdConfigured-iterative").unwrap();
        assert_eq!(out.kind, DetailType::Validation);
        assert_eq!(out.items.len(), 1);
        assert_eq!(out.items[0].label, "bogus");
        assert_eq!(out.items[0].description, "unknown system id");

        let d = json!({"details": {"extractedValues": [{"value": "x1"}, "raw"]}});
        let out = extract_enhanced_details(Some(&d), "extractedValueCheck").unwrap();
        assert_eq!(out.items.len(), 2);
        assert!(!out.actionable);
        assert_eq!(out.items[1].label, "raw");
    }

    #[test]
    fn test_generic_caps_items_and_derives_labels() {
        let many: Vec<_> = (0..14).map(|i| json!({"zeta": i})).collect();
        let d = json!({"details": many});
        let out = extract_enhanced_details(Some(&d), "anything").unwrap();
        assert_eq!(out.kind, DetailType::Generic);
        assert_eq!(out.items.len(), GENERIC_ITEM_LIMIT);
        assert_eq!(out.items[0].label, "zeta");
        assert!(out.summary.contains("showing first 10"));

        let d = json!({"details": [{"id": "A1", "name": ""}, 5, "text"]});
        let out = extract_enhanced_details(Some(&d), "anything").unwrap();
        let labels: Vec<_> = out.items.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, vec!["A1", "5", "text"]);
    }

    #[test]
    fn test_unrecognized_or_absent_details() {
        assert!(extract_enhanced_details(None, "r").is_none());
        assert!(extract_enhanced_details(Some(&json!("str")), "r").is_none());
        assert!(extract_enhanced_details(Some(&json!({"message": "m"})), "r").is_none());
        assert!(extract_enhanced_details(Some(&json!({"details": []})), "r").is_none());
        assert!(extract_enhanced_details(Some(&json!({"details": {"k": 1}})), "r").is_none());
    }

    #[test]
    fn test_priority_dependency_before_generic() {
        // A dependency list is also an array; dependency must win.
        let d = json!({"details": [{"dependency": "a", "location": {"manifestPath": "p.json", "lineNumber": 1}}]});
        let out = extract_enhanced_details(Some(&d), "sensitiveLogging").unwrap();
        assert_eq!(out.kind, DetailType::Dependency);
    }
}
