//! CLI output formatting for the `check` and `build` commands.
//!
//! # Information-First Display
//!
//! Output is **entry-centric, not file-centric**. Each entry leads with its
//! date and title; source files, sections and commentary status follow as
//! indented context lines. Diagnostics go to stderr as `warning:` lines so
//! they survive `quiet-logos build > build.log`.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! Entries
//! 2025-01-02 Parser day
//!     Source: 2025-01-02.md
//!     Sections: quiet, tech
//!     Keywords: parser, tests, section
//! 2025-01-01 Prolog and silence
//!     Source: 2025-01-01.md
//!     Sections: quiet, tech
//!
//! 2 entries
//! ```
//!
//! ## Build
//!
//! ```text
//! 2025-01-02 Parser day → 2025-01-02.html
//!     Commentary: local → comments/2025-01-02.html
//! 2025-01-01 Prolog and silence → 2025-01-01.html
//!     Commentary: reused, stale (entry edited since it was generated)
//! Index → index.html
//!
//! Built 2 entries (policy latest-only, mode stub)
//! Commentary: 1 generated, 1 reused, 0 placeholder (2 total), 1 stale
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to the terminal. Format
//! functions are pure: no I/O, no side effects.

use crate::generate::{BuildReport, CheckReport, EntryRecord};
use crate::scan::ParseError;
use crate::types::{Entry, Origin};

// ============================================================================
// Shared entity display helpers
// ============================================================================

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Format an entry header: date + title.
///
/// ```text
/// 2025-01-01 Prolog and silence
/// ```
fn entry_header(date: &str, title: &str) -> String {
    format!("{} {}", date, title)
}

fn entry_count(n: usize) -> String {
    if n == 1 {
        "1 entry".to_string()
    } else {
        format!("{n} entries")
    }
}

// ============================================================================
// check
// ============================================================================

/// Format the entry inventory of a source root.
pub fn format_check_output(report: &CheckReport) -> Vec<String> {
    let mut lines = vec!["Entries".to_string()];
    for entry in &report.entries {
        lines.extend(entry_lines(entry));
    }
    lines.push(String::new());
    lines.push(entry_count(report.entries.len()));
    lines
}

fn entry_lines(entry: &Entry) -> Vec<String> {
    let mut lines = vec![entry_header(entry.date.as_str(), &entry.title)];
    lines.push(format!("{}Source: {}", indent(1), entry.source_name));
    if !entry.sections.is_empty() {
        let names: Vec<&str> = entry.sections.keys().map(|k| k.as_str()).collect();
        lines.push(format!("{}Sections: {}", indent(1), names.join(", ")));
    }
    if !entry.keywords.is_empty() {
        lines.push(format!("{}Keywords: {}", indent(1), entry.keywords.join(", ")));
    }
    lines
}

/// Print check output to stdout and its diagnostics to stderr.
pub fn print_check_output(report: &CheckReport) {
    for line in format_check_output(report) {
        println!("{}", line);
    }
    print_warnings(&report.skipped, &report.warnings);
}

// ============================================================================
// build
// ============================================================================

/// Format the result of a build.
pub fn format_build_output(report: &BuildReport) -> Vec<String> {
    let mut lines = Vec::new();
    for record in &report.entries {
        lines.extend(record_lines(record));
    }
    lines.push("Index → index.html".to_string());
    lines.push(String::new());
    lines.push(format!(
        "Built {} (policy {}, mode {})",
        entry_count(report.entries.len()),
        report.policy,
        report.mode
    ));
    lines.push(format!("Commentary: {}", report.stats));
    lines
}

fn record_lines(record: &EntryRecord) -> Vec<String> {
    let date = record.date.as_str();
    let mut lines = vec![format!(
        "{} → {}.html",
        entry_header(date, &record.title),
        date
    )];
    let status = match record.origin {
        Origin::Local | Origin::Remote => {
            format!("{} → comments/{}.html", record.origin, date)
        }
        Origin::Reused if record.stale => {
            "reused, stale (entry edited since it was generated)".to_string()
        }
        Origin::Reused => "reused".to_string(),
        Origin::Placeholder => "placeholder (no earlier commentary on disk)".to_string(),
    };
    lines.push(format!("{}Commentary: {}", indent(1), status));
    lines
}

/// Print build output to stdout and its diagnostics to stderr.
pub fn print_build_output(report: &BuildReport) {
    for line in format_build_output(report) {
        println!("{}", line);
    }
    print_warnings(&report.skipped, &report.warnings);
}

// ============================================================================
// Diagnostics
// ============================================================================

/// One `warning:` line per skipped entry file and per build warning.
pub fn format_warnings(skipped: &[ParseError], warnings: &[String]) -> Vec<String> {
    skipped
        .iter()
        .map(|err| format!("warning: skipped {err}"))
        .chain(warnings.iter().map(|w| format!("warning: {w}")))
        .collect()
}

/// Print diagnostics to stderr.
pub fn print_warnings(skipped: &[ParseError], warnings: &[String]) {
    for line in format_warnings(skipped, warnings) {
        eprintln!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CommentaryStats;
    use crate::config::{Mode, RegenerationPolicy};
    use crate::naming::EntryDate;
    use crate::scan::parse_source;
    use std::path::PathBuf;

    fn record(date: &str, title: &str, origin: Origin, stale: bool) -> EntryRecord {
        EntryRecord {
            date: EntryDate::parse(date).unwrap(),
            title: title.to_string(),
            origin,
            stale,
        }
    }

    fn report(entries: Vec<EntryRecord>) -> BuildReport {
        let mut stats = CommentaryStats::default();
        for r in &entries {
            stats.count(r.origin);
            if r.stale {
                stats.stale += 1;
            }
        }
        BuildReport {
            output: PathBuf::from("site"),
            mode: Mode::Stub,
            policy: RegenerationPolicy::LatestOnly,
            entries,
            skipped: vec![],
            warnings: vec![],
            stats,
        }
    }

    // =========================================================================
    // Helper tests
    // =========================================================================

    #[test]
    fn indent_four_spaces_per_level() {
        assert_eq!(indent(0), "");
        assert_eq!(indent(2), "        ");
    }

    #[test]
    fn entry_header_date_then_title() {
        assert_eq!(entry_header("2025-01-01", "Prolog"), "2025-01-01 Prolog");
    }

    // =========================================================================
    // check
    // =========================================================================

    #[test]
    fn check_lists_entries_with_context() {
        let entry = parse_source(
            EntryDate::parse("2025-01-01").unwrap(),
            "2025-01-01.md".to_string(),
            "# Prolog\n## tech\nparser parser\n## quiet\nhush".to_string(),
            "quiet_logos",
        );
        let lines = format_check_output(&CheckReport {
            entries: vec![entry],
            skipped: vec![],
            warnings: vec![],
        });
        assert_eq!(
            lines,
            vec![
                "Entries",
                "2025-01-01 Prolog",
                "    Source: 2025-01-01.md",
                "    Sections: quiet, tech",
                "    Keywords: parser, prolog, hush",
                "",
                "1 entry",
            ]
        );
    }

    #[test]
    fn check_counts_plural_entries() {
        let lines = format_check_output(&CheckReport {
            entries: vec![],
            skipped: vec![],
            warnings: vec![],
        });
        assert_eq!(lines.last().unwrap(), "0 entries");
    }

    // =========================================================================
    // build
    // =========================================================================

    #[test]
    fn build_output_shows_origin_per_entry() {
        let lines = format_build_output(&report(vec![
            record("2025-01-03", "Snow", Origin::Local, false),
            record("2025-01-02", "Parser day", Origin::Reused, true),
            record("2025-01-01", "Prolog", Origin::Placeholder, false),
        ]));
        assert_eq!(lines[0], "2025-01-03 Snow → 2025-01-03.html");
        assert_eq!(lines[1], "    Commentary: local → comments/2025-01-03.html");
        assert_eq!(
            lines[3],
            "    Commentary: reused, stale (entry edited since it was generated)"
        );
        assert!(lines[5].contains("placeholder"));
        assert!(lines.contains(&"Index → index.html".to_string()));
        assert!(lines.contains(&"Built 3 entries (policy latest-only, mode stub)".to_string()));
        assert_eq!(
            lines.last().unwrap(),
            "Commentary: 1 generated, 1 reused, 1 placeholder (3 total), 1 stale"
        );
    }

    #[test]
    fn build_output_remote_origin() {
        let lines = format_build_output(&report(vec![record(
            "2025-01-03",
            "Snow",
            Origin::Remote,
            false,
        )]));
        assert_eq!(lines[1], "    Commentary: remote → comments/2025-01-03.html");
        assert!(lines.contains(&"Built 1 entry (policy latest-only, mode stub)".to_string()));
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    #[test]
    fn warnings_prefix_each_line() {
        let skipped = vec![ParseError::DuplicateDate {
            date: EntryDate::parse("2025-01-01").unwrap(),
            path: PathBuf::from("log/2025-01-01.MD"),
        }];
        let warnings = vec!["template has no {{ css }} placeholder".to_string()];
        let lines = format_warnings(&skipped, &warnings);
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "warning: skipped Duplicate entry for 2025-01-01: log/2025-01-01.MD"
        );
        assert_eq!(lines[1], "warning: template has no {{ css }} placeholder");
    }
}
