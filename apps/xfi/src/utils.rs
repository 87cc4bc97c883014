//! Small shared helpers: colored CLI prefixes, path display, JSON lookups.

use owo_colors::OwoColorize;
use serde_json::Value as Json;
use std::path::{Component, Path, PathBuf};

fn colors_enabled() -> bool {
    std::env::var_os("NO_COLOR").is_none()
}

pub fn error_prefix() -> String {
    if colors_enabled() {
        "error:".red().bold().to_string()
    } else {
        "error:".to_string()
    }
}

pub fn note_prefix() -> String {
    if colors_enabled() {
        "note:".cyan().bold().to_string()
    } else {
        "note:".to_string()
    }
}

pub fn info_prefix() -> String {
    if colors_enabled() {
        "info:".blue().bold().to_string()
    } else {
        "info:".to_string()
    }
}

/// Display form of `path`: relative to `root` when it lives underneath it,
/// otherwise unchanged. Separators are normalized to `/`.
pub fn rel_to_root(path: &Path, root: &Path) -> String {
    let shown = match pathdiff::diff_paths(path, root) {
        Some(rel) if !rel.starts_with("..") && !rel.as_os_str().is_empty() => rel,
        _ => path.to_path_buf(),
    };
    shown.to_string_lossy().replace('\\', "/")
}

/// Lexically fold `.` and `..` components. `..` above the root is dropped.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else if !out.has_root() {
                    out.push(comp);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Integer field of an object, truncating finite floats.
pub fn get_json_i64(obj: &Json, key: &str) -> Option<i64> {
    obj.get(key).and_then(crate::models::raw::json_i64)
}

/// First of `keys` holding a non-empty string (numbers are stringified).
pub fn first_str(obj: &Json, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match obj.get(*k)? {
        Json::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Json::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Trim and collapse every whitespace run (including newlines) to one space.
pub fn clean_message(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Short single-line rendering of an arbitrary JSON value.
pub fn compact_json(value: &Json, max_chars: usize) -> String {
    let s = match value {
        Json::String(s) => s.clone(),
        other => other.to_string(),
    };
    if s.chars().count() <= max_chars {
        s
    } else {
        let cut: String = s.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    #[test]
    fn test_clean_message_collapses_whitespace() {
        assert_eq!(clean_message("  too\n\n many   spaces\t here "), "too many spaces here");
        assert_eq!(clean_message("   "), "");
    }

    #[test]
    fn test_rel_to_root() {
        let root = PathBuf::from("/repo");
        assert_eq!(rel_to_root(Path::new("/repo/src/a.ts"), &root), "src/a.ts");
        assert_eq!(rel_to_root(Path::new("/elsewhere/b.ts"), &root), "/elsewhere/b.ts");
    }

    #[test]
    fn test_normalize_path_folds_dots() {
        assert_eq!(normalize_path(Path::new("/repo/./src/../a.ts")), PathBuf::from("/repo/a.ts"));
        assert_eq!(normalize_path(Path::new("/../a.ts")), PathBuf::from("/a.ts"));
        assert_eq!(normalize_path(Path::new("../x/./y")), PathBuf::from("../x/y"));
    }

    #[test]
    fn test_first_str_and_compact() {
        let v = json!({"id": 7, "name": "  ", "key": "k"});
        assert_eq!(first_str(&v, &["name", "id", "key"]).as_deref(), Some("7"));
        assert_eq!(compact_json(&json!("abcdef"), 4), "abc…");
        assert_eq!(compact_json(&json!({"a": 1}), 40), "{\"a\":1}");
    }
}
