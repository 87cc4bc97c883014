//! Configuration discovery and effective settings resolution.
//!
//! xfi reads `xfi.toml|yaml|yml` from the repository root (or closest
//! ancestor) and merges it with CLI flags to produce an `Effective` config.
//! Defaults:
//! - `output`: `human`
//! - `source`: `X-Fidelity`
//! - `globalCheckMarker`: `REPO_GLOBAL_CHECK`
//! - `readSource`: true
//! - `[range] preserveZeroWidth|maxExpansion|fallbackExpansion`: true, 1, 1
//!
//! Overrides precedence: CLI > config file > defaults.

use crate::coordinator::{CoordinatorOptions, DEFAULT_SOURCE_TAG, GLOBAL_CHECK_MARKER};
use crate::error::{Error, Result};
use crate::range::RangeOptions;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILES: [&str; 3] = ["xfi.toml", "xfi.yaml", "xfi.yml"];

#[derive(Debug, Default, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
/// Root configuration loaded from `xfi.toml|yaml`.
pub struct XfiConfig {
    pub output: Option<String>,
    /// Diagnostic `source` tag.
    pub source: Option<String>,
    pub global_check_marker: Option<String>,
    pub read_source: Option<bool>,
    pub range: Option<RangeOptions>,
}

#[derive(Debug, Clone)]
/// Fully-resolved configuration used by commands after applying precedence.
pub struct Effective {
    pub repo_root: PathBuf,
    pub output: String,
    pub source_tag: String,
    pub global_check_marker: String,
    pub read_source: bool,
    pub range: RangeOptions,
    /// Config file that was loaded, if any.
    pub config_path: Option<PathBuf>,
}

impl Effective {
    pub fn coordinator_options(&self) -> CoordinatorOptions {
        CoordinatorOptions {
            workspace_root: Some(self.repo_root.clone()),
            range: self.range,
            source_tag: self.source_tag.clone(),
            global_check_marker: self.global_check_marker.clone(),
        }
    }
}

/// Walk upward from `start` to detect the repository root.
///
/// Stops when an `xfi.toml|yaml|yml` or a `.git` directory is found.
pub fn detect_repo_root(start: &Path) -> PathBuf {
    let mut cur = start;
    loop {
        if CONFIG_FILES.iter().any(|f| cur.join(f).exists()) || cur.join(".git").exists() {
            return cur.to_path_buf();
        }
        match cur.parent() {
            Some(p) => cur = p,
            None => return start.to_path_buf(),
        }
    }
}

/// Load `XfiConfig` from `xfi.toml` or `xfi.yaml|yml` if present.
///
/// A present but unparsable file is an error rather than silently ignored.
pub fn load_config(root: &Path) -> Result<Option<(PathBuf, XfiConfig)>> {
    for name in CONFIG_FILES {
        let p = root.join(name);
        if !p.exists() {
            continue;
        }
        let s = fs::read_to_string(&p)?;
        let cfg = if name.ends_with(".toml") {
            toml::from_str::<XfiConfig>(&s).map_err(|e| bad_config(&p, e))?
        } else {
            serde_yaml::from_str::<XfiConfig>(&s).map_err(|e| bad_config(&p, e))?
        };
        return Ok(Some((p, cfg)));
    }
    Ok(None)
}

fn bad_config(path: &Path, e: impl std::fmt::Display) -> Error {
    Error::Config(format!("{}: {}", path.to_string_lossy(), e))
}

/// Resolve `Effective` by merging CLI flags, discovered config, and defaults.
pub fn resolve_effective(
    cli_repo_root: Option<&str>,
    cli_output: Option<&str>,
    cli_no_source: bool,
) -> Result<Effective> {
    let start = PathBuf::from(cli_repo_root.unwrap_or("."));
    let start = start.canonicalize().unwrap_or(start);
    let repo_root = detect_repo_root(&start);
    let (config_path, cfg) = match load_config(&repo_root)? {
        Some((p, c)) => (Some(p), c),
        None => (None, XfiConfig::default()),
    };

    let output = cli_output
        .map(|s| s.to_string())
        .or(cfg.output)
        .unwrap_or_else(|| "human".to_string());
    if output != "human" && output != "json" {
        return Err(Error::Config(format!(
            "unknown output mode '{output}' (expected human|json)"
        )));
    }

    let read_source = !cli_no_source && cfg.read_source.unwrap_or(true);

    Ok(Effective {
        repo_root,
        output,
        source_tag: cfg
            .source
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SOURCE_TAG.to_string()),
        global_check_marker: cfg
            .global_check_marker
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| GLOBAL_CHECK_MARKER.to_string()),
        read_source,
        range: cfg.range.unwrap_or_default(),
        config_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_detect_and_load_toml() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let mut f = fs::File::create(root.join("xfi.toml")).unwrap();
        writeln!(
            f,
            "{}",
            r#"
output = "json"
source = "xfi-ci"
globalCheckMarker = "::repo::"
[range]
preserveZeroWidth = false
maxExpansion = 4
    "#
        )
        .unwrap();

        // Resolve using explicit repo_root to avoid global CWD races
        let eff = resolve_effective(root.to_str(), None, false).unwrap();
        assert_eq!(eff.output, "json");
        assert_eq!(eff.source_tag, "xfi-ci");
        assert_eq!(eff.global_check_marker, "::repo::");
        assert!(!eff.range.preserve_zero_width);
        assert_eq!(eff.range.max_expansion, 4);
        // unspecified range keys keep their defaults
        assert_eq!(eff.range.fallback_expansion, 1);
        assert!(eff.read_source);
        assert!(eff.config_path.is_some());
    }

    #[test]
    fn test_load_yaml_and_defaults() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let mut f = fs::File::create(root.join("xfi.yaml")).unwrap();
        writeln!(
            f,
            "{}",
            r#"
output: human
readSource: false
            "#
        )
        .unwrap();

        let eff = resolve_effective(root.to_str(), None, false).unwrap();
        assert_eq!(eff.output, "human");
        assert!(!eff.read_source);
        assert_eq!(eff.source_tag, "X-Fidelity");
        assert_eq!(eff.global_check_marker, "REPO_GLOBAL_CHECK");
        assert_eq!(eff.range, RangeOptions::default());
    }

    #[test]
    fn test_cli_takes_precedence() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("xfi.toml"), "output = \"json\"\nreadSource = true\n").unwrap();
        let eff = resolve_effective(root.to_str(), Some("human"), true).unwrap();
        assert_eq!(eff.output, "human");
        assert!(!eff.read_source);
    }

    #[test]
    fn test_discovery_walks_up_to_config() {
        let dir = tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::write(root.join("xfi.toml"), "source = \"up\"\n").unwrap();
        let nested = root.join("packages/app");
        fs::create_dir_all(&nested).unwrap();
        let eff = resolve_effective(nested.to_str(), None, false).unwrap();
        assert_eq!(eff.repo_root, root);
        assert_eq!(eff.source_tag, "up");
        assert_eq!(eff.coordinator_options().workspace_root, Some(root));
    }

    #[test]
    fn test_git_dir_stops_discovery() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("repo/.git")).unwrap();
        fs::create_dir_all(root.join("repo/src")).unwrap();
        let found = detect_repo_root(&root.join("repo/src"));
        assert_eq!(found, root.join("repo"));
    }

    #[test]
    fn test_invalid_config_is_reported() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("xfi.toml"), "output = [").unwrap();
        match resolve_effective(root.to_str(), None, false) {
            Err(Error::Config(msg)) => assert!(msg.contains("xfi.toml")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_output_mode_is_rejected() {
        let dir = tempdir().unwrap();
        let err = resolve_effective(dir.path().to_str(), Some("xml"), false).unwrap_err();
        assert!(err.to_string().contains("xml"));
    }
}
