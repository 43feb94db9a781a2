//! Shared types passed between the loader, the commentary engine, and the
//! orchestrator.

use crate::naming::EntryDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The closed set of level-2 section names the loader extracts.
///
/// Declaration order is the iteration order of [`Entry::sections`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SectionKey {
    Quiet,
    Tech,
}

impl SectionKey {
    pub const ALL: [SectionKey; 2] = [SectionKey::Quiet, SectionKey::Tech];

    /// Match a heading's text, ignoring case and surrounding whitespace.
    pub fn from_heading(text: &str) -> Option<Self> {
        match text.trim().to_lowercase().as_str() {
            "quiet" => Some(SectionKey::Quiet),
            "tech" => Some(SectionKey::Tech),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SectionKey::Quiet => "quiet",
            SectionKey::Tech => "tech",
        }
    }
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recognized section bodies, keyed by section. Last occurrence wins.
pub type Sections = BTreeMap<SectionKey, String>;

/// One dated diary entry, as loaded from the source root.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub date: EntryDate,
    /// Source filename relative to the source root (e.g. `2025-01-03.md`)
    pub source_name: String,
    /// Raw file contents
    pub body: String,
    /// First `# heading`, or `"<site-name> — <date>"` as fallback
    pub title: String,
    pub sections: Sections,
    /// Most frequent words of the body, most frequent first
    pub keywords: Vec<String>,
}

impl Entry {
    /// Body of a recognized section, or `""` when the entry lacks it.
    pub fn section(&self, key: SectionKey) -> &str {
        self.sections.get(&key).map(String::as_str).unwrap_or("")
    }
}

/// Chronological neighbors of one entry.
///
/// `prev` is the next-older entry, `next` the next-newer one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Neighbors {
    pub prev: Option<EntryDate>,
    pub next: Option<EntryDate>,
}

/// Where an entry's commentary fragment came from in a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Local commentary engine
    Local,
    /// Remote generation provider
    Remote,
    /// Fragment file written by an earlier build
    Reused,
    /// No earlier fragment on disk; neutral notice used instead
    Placeholder,
}

impl Origin {
    pub fn as_str(self) -> &'static str {
        match self {
            Origin::Local => "local",
            Origin::Remote => "remote",
            Origin::Reused => "reused",
            Origin::Placeholder => "placeholder",
        }
    }

    /// Whether the fragment was generated during this build.
    pub fn is_fresh(self) -> bool {
        matches!(self, Origin::Local | Origin::Remote)
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
