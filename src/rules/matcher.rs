// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Condition matching against files on disk

use std::path::Path;
use tracing::trace;

use super::{Condition, SizeRange};
use crate::Result;

/// Bytes per mebibyte
pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Check whether a file satisfies every clause of a condition.
///
/// Clauses are checked in order extension, name pattern, size, stopping at
/// the first one that fails. The file size is read from disk on every call
/// that reaches the size clause.
pub fn matches(path: &Path, condition: &Condition) -> Result<bool> {
    let filename = file_name(path);

    if let Some(extensions) = condition.extension.as_ref().filter(|e| !e.is_empty()) {
        let ext = dotted_extension(path);
        if !extensions.iter().any(|e| e.to_lowercase() == ext) {
            trace!("{:?}: extension {:?} not in {:?}", filename, ext, extensions);
            return Ok(false);
        }
    }

    if let Some(ref pattern) = condition.name_pattern {
        if !pattern.is_match(&filename) {
            trace!("{:?}: name does not match {}", filename, pattern.as_str());
            return Ok(false);
        }
    }

    if let Some(ref range) = condition.size_mb {
        let size_mb = std::fs::metadata(path)?.len() as f64 / BYTES_PER_MB;
        if !size_in_range(size_mb, range) {
            trace!("{:?}: size {:.3} MB outside {:?}", filename, size_mb, range);
            return Ok(false);
        }
    }

    Ok(true)
}

/// Both bounds are exclusive
pub fn size_in_range(size_mb: f64, range: &SizeRange) -> bool {
    if let Some(min) = range.greater_than {
        if size_mb <= min {
            return false;
        }
    }
    if let Some(max) = range.less_than {
        if size_mb >= max {
            return false;
        }
    }
    true
}

/// Lowercased extension with its leading dot, or an empty string
pub fn dotted_extension(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

/// Base filename as a string
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleSet;
    use std::fs::File;

    fn condition(json: &str) -> Condition {
        let doc = format!(
            r#"{{"rules": [{{"name": "t", "condition": {json}, "action": {{"type": "delete"}}}}]}}"#
        );
        RuleSet::from_json(&doc).unwrap().rules[0].condition.clone()
    }

    fn sized_file(dir: &Path, name: &str, bytes: u64) -> std::path::PathBuf {
        let path = dir.join(name);
        File::create(&path).unwrap().set_len(bytes).unwrap();
        path
    }

    #[test]
    fn test_empty_condition_matches() {
        let dir = tempfile::tempdir().unwrap();
        let path = sized_file(dir.path(), "anything.bin", 10);
        assert!(matches(&path, &Condition::default()).unwrap());
    }

    #[test]
    fn test_extension_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let path = sized_file(dir.path(), "Holiday.JPG", 10);

        assert!(matches(&path, &condition(r#"{"extension": ".jpg"}"#)).unwrap());
        assert!(matches(&path, &condition(r#"{"extension": [".png", ".Jpg"]}"#)).unwrap());
        assert!(!matches(&path, &condition(r#"{"extension": "jpg"}"#)).unwrap());
        assert!(!matches(&path, &condition(r#"{"extension": [".png"]}"#)).unwrap());
    }

    #[test]
    fn test_empty_extension_list_is_no_constraint() {
        let dir = tempfile::tempdir().unwrap();
        let path = sized_file(dir.path(), "a.txt", 10);

        let empty = condition(r#"{"extension": []}"#);
        assert!(empty.extension.is_none());
        assert!(matches(&path, &empty).unwrap());

        let built = Condition { extension: Some(Vec::new()), ..Condition::default() };
        assert!(matches(&path, &built).unwrap());
    }

    #[test]
    fn test_file_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = sized_file(dir.path(), "Makefile", 10);

        assert_eq!(dotted_extension(&path), "");
        assert!(matches(&path, &condition(r#"{"extension": ""}"#)).unwrap());
        assert!(!matches(&path, &condition(r#"{"extension": ".txt"}"#)).unwrap());
    }

    #[test]
    fn test_name_pattern_searches_base_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = sized_file(dir.path(), "Scan_Invoice_42.pdf", 10);

        assert!(matches(&path, &condition(r#"{"namePattern": "invoice_\\d+"}"#)).unwrap());
        // search, not full match
        assert!(matches(&path, &condition(r#"{"namePattern": "42"}"#)).unwrap());
        assert!(!matches(&path, &condition(r#"{"namePattern": "^invoice"}"#)).unwrap());

        // the directory part is never inspected
        let dir_name = dir.path().file_name().unwrap().to_string_lossy().into_owned();
        let pattern = serde_json::json!({ "namePattern": format!("^{}$", regex::escape(&dir_name)) });
        assert!(!matches(&path, &condition(&pattern.to_string())).unwrap());
    }

    #[test]
    fn test_size_bounds_are_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let path = sized_file(dir.path(), "five.bin", 5 * 1024 * 1024);

        assert!(!matches(&path, &condition(r#"{"sizeMb": {"greaterThan": 5}}"#)).unwrap());
        assert!(!matches(&path, &condition(r#"{"sizeMb": {"lessThan": 5}}"#)).unwrap());
        assert!(matches(&path, &condition(r#"{"sizeMb": {"greaterThan": 4.99, "lessThan": 5.01}}"#)).unwrap());
    }

    #[test]
    fn test_all_clauses_must_hold() {
        let dir = tempfile::tempdir().unwrap();
        let path = sized_file(dir.path(), "report_1.pdf", 2 * 1024 * 1024);

        let both = r#"{"extension": ".pdf", "namePattern": "report", "sizeMb": {"greaterThan": 1}}"#;
        assert!(matches(&path, &condition(both)).unwrap());

        let too_small = r#"{"extension": ".pdf", "namePattern": "report", "sizeMb": {"greaterThan": 3}}"#;
        assert!(!matches(&path, &condition(too_small)).unwrap());
    }

    #[test]
    fn test_missing_file_only_fails_on_size_clause() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.txt");

        assert!(matches(&path, &condition(r#"{"extension": ".txt"}"#)).unwrap());
        assert!(matches(&path, &condition(r#"{"sizeMb": {"lessThan": 1}}"#)).is_err());
    }

    #[test]
    fn test_size_in_range() {
        let open = SizeRange::default();
        assert!(size_in_range(0.0, &open));

        let band = SizeRange { greater_than: Some(1.0), less_than: Some(2.0) };
        assert!(size_in_range(1.5, &band));
        assert!(!size_in_range(1.0, &band));
        assert!(!size_in_range(2.0, &band));
    }
}
