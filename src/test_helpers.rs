//! Shared test utilities for the quiet-logos test suite.
//!
//! Provides fixture setup, entry lookups, and output-tree snapshots.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let discovery = discover(tmp.path(), &SiteConfig::default()).unwrap();
//!
//! let entry = find_entry(&discovery.entries, "2025-01-01");
//! assert_eq!(entry.title, "Prolog and silence");
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

use crate::types::Entry;

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/log/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/log");
    for entry in fs::read_dir(&fixtures).unwrap() {
        let entry = entry.unwrap();
        if entry.file_type().unwrap().is_file() {
            fs::copy(entry.path(), tmp.path().join(entry.file_name())).unwrap();
        }
    }
    tmp
}

/// Write `<dir>/<date>.md` and return its path.
pub fn write_entry(dir: &Path, date: &str, body: &str) -> PathBuf {
    let path = dir.join(format!("{date}.md"));
    fs::write(&path, body).unwrap();
    path
}

// =========================================================================
// Entry lookups: panic with a clear message on miss
// =========================================================================

/// Find an entry by ISO date. Panics if not found.
pub fn find_entry<'a>(entries: &'a [Entry], date: &str) -> &'a Entry {
    entries
        .iter()
        .find(|e| e.date.as_str() == date)
        .unwrap_or_else(|| panic!("entry '{date}' not found. Available: {:?}", entry_dates(entries)))
}

/// Dates of `entries`, in order.
pub fn entry_dates(entries: &[Entry]) -> Vec<&str> {
    entries.iter().map(|e| e.date.as_str()).collect()
}

// =========================================================================
// Output assertions
// =========================================================================

/// Assert that `rel` exists as a file under `root`.
pub fn assert_file_exists(root: &Path, rel: &str) {
    let path = root.join(rel);
    assert!(path.is_file(), "expected file {}", path.display());
}

/// Every file under `root`, keyed by relative path with `/` separators.
pub fn read_tree(root: &Path) -> BTreeMap<String, Vec<u8>> {
    WalkDir::new(root)
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e.path().strip_prefix(root).unwrap();
            let key = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            (key, fs::read(e.path()).unwrap())
        })
        .collect()
}
