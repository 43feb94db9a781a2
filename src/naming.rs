//! Filename parsing for the `YYYY-MM-DD.<ext>` entry convention.
//!
//! Every diary entry lives in a file named after its calendar date. The date
//! is the entry's identity: it is unique within the source root, it names the
//! generated pages, and because the format is fixed-width and zero-padded,
//! ordering the strings lexicographically orders the entries chronologically.
//!
//! - `2025-01-03.md` → date `2025-01-03`
//! - `2025-1-3.md` → not an entry (components must be zero-padded)
//! - `2025-02-30.md` → not an entry (no such calendar day)
//! - `_template.html`, `notes.md` → not entries

use std::fmt;
use std::path::Path;

/// A calendar date taken from an entry filename, stored in ISO form.
///
/// Ordering is derived from the ISO string, which matches calendar order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryDate(String);

impl EntryDate {
    /// Parse a strict `YYYY-MM-DD` string naming a real calendar day.
    pub fn parse(s: &str) -> Option<Self> {
        let bytes = s.as_bytes();
        if !s.is_ascii() || bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
            return None;
        }
        let digits = |range: std::ops::Range<usize>| -> Option<u32> {
            let part = &s[range];
            if part.bytes().all(|b| b.is_ascii_digit()) {
                part.parse().ok()
            } else {
                None
            }
        };
        let year = digits(0..4)?;
        let month = digits(5..7)?;
        let day = digits(8..10)?;
        if !(1..=12).contains(&month) || day == 0 || day > days_in_month(year, month) {
            return None;
        }
        Some(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The date as `DD.MM.YYYY`, used for page subtitles.
    pub fn dotted(&self) -> String {
        let s = &self.0;
        format!("{}.{}.{}", &s[8..10], &s[5..7], &s[0..4])
    }
}

impl fmt::Display for EntryDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn days_in_month(year: u32, month: u32) -> u32 {
    match month {
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 31,
    }
}

fn is_leap_year(year: u32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Parse an entry filename, returning its date when the name is exactly
/// `YYYY-MM-DD.<extension>`.
///
/// The extension comparison is case-insensitive; anything else (wrong
/// extension, extra stem segments, service files like `_template.html`)
/// yields `None`.
pub fn parse_entry_filename(path: &Path, extension: &str) -> Option<EntryDate> {
    let ext_matches = path
        .extension()
        .map(|e| e.to_string_lossy().eq_ignore_ascii_case(extension))
        .unwrap_or(false);
    if !ext_matches {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    EntryDate::parse(stem)
}
