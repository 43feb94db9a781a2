//! Entry discovery and parsing.
//!
//! First stage of the build. Reads the source root and turns every
//! `YYYY-MM-DD.<ext>` file into an [`Entry`]. The loader is read-only: it
//! never writes to the source tree.
//!
//! ## Source Layout
//!
//! ```text
//! log/                      # Source root
//! ├── config.toml           # Site configuration (optional)
//! ├── _template.html        # Page template (service file, never an entry)
//! ├── 2025-01-01.md         # Entry
//! ├── 2025-01-02.md
//! └── notes.md              # Not date-named, silently ignored
//! ```
//!
//! ## Entry Format
//!
//! ```text
//! # Prolog and silence          ← optional title (first non-blank line)
//!
//! ## quiet                      ← recognized section
//! The morning was slow.
//!
//! ## tech                       ← recognized section
//! Rewrote the parser.
//!
//! ## links                      ← unrecognized: stays in the body only
//! ```
//!
//! Section names are matched case-insensitively. When a recognized section
//! appears more than once, the last occurrence wins.
//!
//! ## Errors
//!
//! Files that don't follow the naming convention are skipped without a
//! diagnostic. Files that do but can't be read (permissions, invalid UTF-8)
//! or that duplicate an already-loaded date are reported in
//! [`Discovery::skipped`] and the scan continues.

use crate::commentary::extract_keywords;
use crate::config::SiteConfig;
use crate::naming::{self, EntryDate};
use crate::types::{Entry, SectionKey, Sections};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Source root not found: {0}")]
    SourceRootMissing(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
}

/// A single entry file that could not be loaded.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Not an entry file: {0}")]
    NotAnEntry(PathBuf),
    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Duplicate entry for {date}: {path}")]
    DuplicateDate { date: EntryDate, path: PathBuf },
}

/// Result of scanning a source root.
#[derive(Debug, Default)]
pub struct Discovery {
    /// Loaded entries, newest first
    pub entries: Vec<Entry>,
    /// Entry files that were skipped, in filename order
    pub skipped: Vec<ParseError>,
}

/// Load every entry in `root`, newest first.
///
/// Only the top level of the source root is scanned.
pub fn discover(root: &Path, config: &SiteConfig) -> Result<Discovery, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::SourceRootMissing(root.to_path_buf()));
    }

    let mut discovery = Discovery::default();
    let mut seen: HashSet<EntryDate> = HashSet::new();

    for dir_entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let dir_entry = dir_entry?;
        if !dir_entry.file_type().is_file() {
            continue;
        }
        match parse_entry(dir_entry.path(), config) {
            Ok(entry) => {
                if seen.insert(entry.date.clone()) {
                    discovery.entries.push(entry);
                } else {
                    discovery.skipped.push(ParseError::DuplicateDate {
                        date: entry.date,
                        path: dir_entry.path().to_path_buf(),
                    });
                }
            }
            Err(ParseError::NotAnEntry(_)) => {}
            Err(err) => discovery.skipped.push(err),
        }
    }

    discovery.entries.sort_by(|a, b| b.date.cmp(&a.date));
    Ok(discovery)
}

/// Load a single entry file.
///
/// Returns [`ParseError::NotAnEntry`] when the filename doesn't follow the
/// `YYYY-MM-DD.<ext>` convention; callers scanning a directory treat that as
/// "skip quietly".
pub fn parse_entry(path: &Path, config: &SiteConfig) -> Result<Entry, ParseError> {
    let date = naming::parse_entry_filename(path, &config.source_extension)
        .ok_or_else(|| ParseError::NotAnEntry(path.to_path_buf()))?;
    let body = fs::read_to_string(path).map_err(|source| ParseError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let source_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(parse_source(date, source_name, body, &config.site_name))
}

/// Build an [`Entry`] from already-read source text.
pub fn parse_source(date: EntryDate, source_name: String, body: String, site_name: &str) -> Entry {
    let (heading, rest) = split_title(&body);
    let title = match heading {
        Some(h) if !h.is_empty() => h.to_string(),
        _ => fallback_title(site_name, &date),
    };
    let sections = extract_sections(rest);
    let keywords = extract_keywords(&body);
    Entry {
        date,
        source_name,
        body,
        title,
        sections,
        keywords,
    }
}

/// Title used when an entry has no usable `# heading`.
pub fn fallback_title(site_name: &str, date: &EntryDate) -> String {
    format!("{} — {}", site_name, date)
}

/// Split off a leading level-1 heading.
///
/// Looks only at the first non-blank line. Returns the heading text (possibly
/// empty, for a bare `#`) and the text after that line; when the first line is
/// not a level-1 heading, returns `None` and the whole body.
pub fn split_title(body: &str) -> (Option<&str>, &str) {
    let mut offset = 0;
    for line in body.split_inclusive('\n') {
        let next = offset + line.len();
        if line.trim().is_empty() {
            offset = next;
            continue;
        }
        return match heading_text(line, 1) {
            Some(text) => (Some(text), &body[next..]),
            None => (None, body),
        };
    }
    (None, body)
}

/// Extract recognized level-2 sections from `text`.
///
/// Each `## name` line starts a new section that runs to the next `## ` line.
/// Unrecognized names end the current section but are not collected.
pub fn extract_sections(text: &str) -> Sections {
    let mut sections = Sections::new();
    let mut current: Option<SectionKey> = None;
    let mut lines: Vec<&str> = Vec::new();

    for line in text.lines() {
        if let Some(heading) = heading_text(line, 2) {
            if let Some(key) = current {
                sections.insert(key, lines.join("\n").trim().to_string());
            }
            current = SectionKey::from_heading(heading);
            lines.clear();
        } else {
            lines.push(line);
        }
    }
    if let Some(key) = current {
        sections.insert(key, lines.join("\n").trim().to_string());
    }

    sections
}

/// Text of an ATX heading of exactly `level`, or `None` for any other line.
///
/// `"## quiet"` at level 2 → `Some("quiet")`; `"##"` → `Some("")`;
/// `"###"` or `"##quiet"` → `None`.
pub(crate) fn heading_text(line: &str, level: usize) -> Option<&str> {
    let line = line.trim();
    let hashes = line.bytes().take_while(|&b| b == b'#').count();
    if hashes != level {
        return None;
    }
    let rest = &line[level..];
    if rest.is_empty() {
        Some("")
    } else if rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use tempfile::TempDir;

    fn date(s: &str) -> EntryDate {
        EntryDate::parse(s).unwrap()
    }

    fn parse(body: &str) -> Entry {
        parse_source(
            date("2025-01-02"),
            "2025-01-02.md".to_string(),
            body.to_string(),
            "quiet_logos",
        )
    }

    // =========================================================================
    // Title extraction
    // =========================================================================

    #[test]
    fn title_from_first_heading() {
        let entry = parse("# Prolog and silence\n\n## quiet\nslow morning");
        assert_eq!(entry.title, "Prolog and silence");
    }

    #[test]
    fn title_skips_leading_blank_lines() {
        let entry = parse("\n\n   \n# Late start\n");
        assert_eq!(entry.title, "Late start");
    }

    #[test]
    fn title_falls_back_when_heading_is_empty() {
        let entry = parse("#\n## quiet\nx");
        assert_eq!(entry.title, "quiet_logos — 2025-01-02");
    }

    #[test]
    fn title_falls_back_when_first_line_is_not_a_heading() {
        let entry = parse("Just text.\n# Not the title");
        assert_eq!(entry.title, "quiet_logos — 2025-01-02");
    }

    #[test]
    fn title_falls_back_for_level_two_first_line() {
        let entry = parse("## quiet\nA");
        assert_eq!(entry.title, "quiet_logos — 2025-01-02");
        assert_eq!(entry.section(SectionKey::Quiet), "A");
    }

    #[test]
    fn title_falls_back_for_empty_body() {
        let entry = parse("");
        assert_eq!(entry.title, "quiet_logos — 2025-01-02");
        assert!(entry.sections.is_empty());
        assert!(entry.keywords.is_empty());
    }

    // =========================================================================
    // Section extraction
    // =========================================================================

    #[test]
    fn last_occurrence_wins() {
        let entry = parse("# T\n## quiet\nA\n## tech\nB\n## quiet\nC");
        assert_eq!(entry.section(SectionKey::Quiet), "C");
        assert_eq!(entry.section(SectionKey::Tech), "B");
    }

    #[test]
    fn section_names_are_case_insensitive() {
        let sections = extract_sections("## Quiet\nhush\n## TECH\nrustc");
        assert_eq!(sections.get(&SectionKey::Quiet).unwrap(), "hush");
        assert_eq!(sections.get(&SectionKey::Tech).unwrap(), "rustc");
    }

    #[test]
    fn unrecognized_heading_ends_section() {
        let sections = extract_sections("## quiet\nhush\n## links\nhttps://example.com");
        assert_eq!(sections.get(&SectionKey::Quiet).unwrap(), "hush");
        assert_eq!(sections.len(), 1);
    }

    #[test]
    fn multi_line_section_bodies_are_trimmed() {
        let sections = extract_sections("## tech\n\n- one\n- two\n\n");
        assert_eq!(sections.get(&SectionKey::Tech).unwrap(), "- one\n- two");
    }

    #[test]
    fn level_three_heading_stays_inside_section() {
        let sections = extract_sections("## tech\n### detail\nmore");
        assert_eq!(sections.get(&SectionKey::Tech).unwrap(), "### detail\nmore");
    }

    #[test]
    fn text_before_first_section_is_not_collected() {
        let sections = extract_sections("preamble\n## quiet\nhush");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections.get(&SectionKey::Quiet).unwrap(), "hush");
    }

    #[test]
    fn heading_text_levels() {
        assert_eq!(heading_text("## quiet", 2), Some("quiet"));
        assert_eq!(heading_text("##", 2), Some(""));
        assert_eq!(heading_text("### quiet", 2), None);
        assert_eq!(heading_text("##quiet", 2), None);
        assert_eq!(heading_text("# Title ", 1), Some("Title"));
    }

    // =========================================================================
    // Discovery
    // =========================================================================

    #[test]
    fn discover_sorts_newest_first() {
        let tmp = TempDir::new().unwrap();
        write_entry(tmp.path(), "2025-01-01", "# One");
        write_entry(tmp.path(), "2025-01-03", "# Three");
        write_entry(tmp.path(), "2025-01-02", "# Two");

        let discovery = discover(tmp.path(), &SiteConfig::default()).unwrap();
        assert_eq!(
            entry_dates(&discovery.entries),
            vec!["2025-01-03", "2025-01-02", "2025-01-01"]
        );
        assert!(discovery.skipped.is_empty());
    }

    #[test]
    fn discover_ignores_non_entry_files_silently() {
        let tmp = TempDir::new().unwrap();
        write_entry(tmp.path(), "2025-01-01", "# One");
        fs::write(tmp.path().join("notes.md"), "# Notes").unwrap();
        fs::write(tmp.path().join("2025-01-02.txt"), "# Text").unwrap();
        fs::write(tmp.path().join("_template.html"), "<html>").unwrap();
        fs::create_dir_all(tmp.path().join("2025-01-03.md")).unwrap();

        let discovery = discover(tmp.path(), &SiteConfig::default()).unwrap();
        assert_eq!(entry_dates(&discovery.entries), vec!["2025-01-01"]);
        assert!(discovery.skipped.is_empty());
    }

    #[test]
    fn discover_skips_unreadable_entry_and_continues() {
        let tmp = TempDir::new().unwrap();
        write_entry(tmp.path(), "2025-01-01", "# One");
        fs::write(tmp.path().join("2025-01-02.md"), [0xff, 0xfe, 0x00, 0x9f]).unwrap();

        let discovery = discover(tmp.path(), &SiteConfig::default()).unwrap();
        assert_eq!(entry_dates(&discovery.entries), vec!["2025-01-01"]);
        assert_eq!(discovery.skipped.len(), 1);
        assert!(matches!(discovery.skipped[0], ParseError::Read { .. }));
    }

    #[test]
    fn discover_skips_duplicate_date() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("2025-01-01.MD"), "# Upper").unwrap();
        write_entry(tmp.path(), "2025-01-01", "# Lower");

        let discovery = discover(tmp.path(), &SiteConfig::default()).unwrap();
        assert_eq!(entry_dates(&discovery.entries), vec!["2025-01-01"]);
        // Files are visited in name order, so the uppercase extension wins
        assert_eq!(discovery.entries[0].title, "Upper");
        assert_eq!(discovery.skipped.len(), 1);
        match &discovery.skipped[0] {
            ParseError::DuplicateDate { date, path } => {
                assert_eq!(date.as_str(), "2025-01-01");
                assert_eq!(path.file_name().unwrap(), "2025-01-01.md");
            }
            other => panic!("expected DuplicateDate, got {other:?}"),
        }
    }

    #[test]
    fn discover_does_not_descend_into_subdirectories() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("archive");
        fs::create_dir_all(&nested).unwrap();
        write_entry(&nested, "2024-05-05", "# Old");

        let discovery = discover(tmp.path(), &SiteConfig::default()).unwrap();
        assert!(discovery.entries.is_empty());
    }

    #[test]
    fn discover_missing_root_is_error() {
        let tmp = TempDir::new().unwrap();
        let result = discover(&tmp.path().join("missing"), &SiteConfig::default());
        assert!(matches!(result, Err(ScanError::SourceRootMissing(_))));
    }

    #[test]
    fn discover_uses_configured_extension() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("2025-01-01.txt"), "# Plain").unwrap();
        write_entry(tmp.path(), "2025-01-02", "# Markdown");

        let mut config = SiteConfig::default();
        config.source_extension = "txt".to_string();
        let discovery = discover(tmp.path(), &config).unwrap();
        assert_eq!(entry_dates(&discovery.entries), vec!["2025-01-01"]);
    }

    #[test]
    fn parse_entry_rejects_bad_name() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("2025-02-30.md");
        fs::write(&path, "# Nope").unwrap();
        let result = parse_entry(&path, &SiteConfig::default());
        assert!(matches!(result, Err(ParseError::NotAnEntry(_))));
    }

    #[test]
    fn parse_entry_records_source_name_and_keywords() {
        let tmp = TempDir::new().unwrap();
        let path = write_entry(
            tmp.path(),
            "2025-01-05",
            "# Day\n## quiet\nтишина тишина практика",
        );
        let entry = parse_entry(&path, &SiteConfig::default()).unwrap();
        assert_eq!(entry.source_name, "2025-01-05.md");
        assert_eq!(entry.keywords, vec!["тишина", "практика"]);
    }

    #[test]
    fn fixtures_load() {
        let tmp = setup_fixtures();
        let discovery = discover(tmp.path(), &SiteConfig::default()).unwrap();
        assert_eq!(
            entry_dates(&discovery.entries),
            vec!["2025-01-03", "2025-01-02", "2025-01-01"]
        );
        let first = find_entry(&discovery.entries, "2025-01-01");
        assert_eq!(first.title, "Prolog and silence");
    }
}
