//! Collects per-file coverage for the files changed by `HEAD`.
//!
//! The coverage sidecar (`coverage.json`) is a flat JSON object mapping a
//! repository-relative path to its coverage string, as written by
//! `phabci convert`.

use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::model::{CoverageMap, Status, TestResult};
use crate::vcs::Vcs;

pub const DEFAULT_COVERAGE_FILE: &str = "coverage.json";
pub const DEFAULT_SOURCE_SUFFIX: &str = ".java";

/// Read the coverage sidecar.
///
/// Returns `None` when the file is missing or unreadable. A file that
/// exists but does not hold a JSON object yields an empty map, so every
/// changed file is reported without coverage. Entries whose value is not
/// a string are skipped.
pub fn load_coverage_map(path: &Path) -> Option<CoverageMap> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("{} does not exist or is not readable: {}", path.display(), e);
            return None;
        }
    };
    let entries = match serde_json::from_str::<Map<String, Value>>(&raw) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("{} is not a coverage map: {}", path.display(), e);
            return Some(CoverageMap::new());
        }
    };
    let map = entries
        .into_iter()
        .filter_map(|(file, value)| match value {
            Value::String(codes) => Some((file, codes)),
            other => {
                debug!("Ignoring coverage of {} in {}: {}", file, path.display(), other);
                None
            }
        })
        .collect();
    Some(map)
}

/// Keep the changed files ending in one of `suffixes`, each mapped to its
/// coverage string or `""` when the map has no entry for it.
pub fn select_coverage(files: &[String], map: &CoverageMap, suffixes: &[String]) -> CoverageMap {
    files
        .iter()
        .filter(|f| suffixes.iter().any(|s| f.ends_with(s.as_str())))
        .map(|f| (f.clone(), map.get(f).cloned().unwrap_or_default()))
        .collect()
}

/// Builds the coverage-only result for a build.
#[derive(Debug)]
pub struct CoverageCollector {
    pub name: String,
    pub coverage_file: PathBuf,
    pub suffixes: Vec<String>,
}

impl CoverageCollector {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            coverage_file: PathBuf::from(DEFAULT_COVERAGE_FILE),
            suffixes: vec![DEFAULT_SOURCE_SUFFIX.to_string()],
        }
    }

    /// One result named after the build carrying the coverage of every
    /// eligible changed file, or nothing when no coverage file exists.
    ///
    /// The status is always `pass`: the sidecar says which lines ran, not
    /// whether any test failed.
    pub fn collect(&self, vcs: &dyn Vcs) -> Result<Vec<TestResult>> {
        let Some(map) = load_coverage_map(&self.coverage_file) else {
            return Ok(Vec::new());
        };
        let files = vcs.changed_files()?;
        let coverage = select_coverage(&files, &map, &self.suffixes);
        info!(
            "Collected coverage for {} of {} changed files",
            coverage.len(),
            files.len()
        );
        Ok(vec![
            TestResult::new(self.name.clone(), Status::Pass).with_coverage(coverage)
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_select_coverage() {
        let map: CoverageMap =
            serde_json::from_str(r#"{"a.java": "CN", "b.txt": "X"}"#).unwrap();
        let selected = select_coverage(
            &files(&["a.java", "b.txt", "c.java"]),
            &map,
            &[".java".to_string()],
        );

        assert_eq!(selected.len(), 2);
        assert_eq!(selected["a.java"], "CN");
        assert_eq!(selected["c.java"], "");
        assert!(!selected.contains_key("b.txt"));
    }

    #[test]
    fn test_select_coverage_multiple_suffixes() {
        let selected = select_coverage(
            &files(&["A.java", "b.scala", "c.py"]),
            &CoverageMap::new(),
            &[".java".to_string(), ".scala".to_string()],
        );
        assert_eq!(selected.keys().collect::<Vec<_>>(), vec!["A.java", "b.scala"]);
    }

    #[test]
    fn test_suffix_must_be_at_end() {
        let selected = select_coverage(
            &files(&["Foo.java.orig", "Foo.javascript"]),
            &CoverageMap::new(),
            &[".java".to_string()],
        );
        assert!(selected.is_empty());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_coverage_map(&dir.path().join("coverage.json")).is_none());
    }

    #[test]
    fn test_load_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coverage.json");
        std::fs::write(&path, "not json").unwrap();
        assert_eq!(load_coverage_map(&path), Some(CoverageMap::new()));
    }

    #[test]
    fn test_load_skips_non_string_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coverage.json");
        std::fs::write(&path, r#"{"a.java": "CN", "b.java": null, "c.java": 3}"#).unwrap();

        let map = load_coverage_map(&path).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map["a.java"], "CN");
    }
}
