//! Local commentary engine.
//!
//! Produces the short reflective note attached to every entry. The engine is a
//! pure function of its input: no I/O, no clock, no randomness, so the same
//! entry always yields the same fragment byte for byte.
//!
//! Two signals drive the note:
//!
//! - **Keywords**: the most frequent words of the entry (alphabetic runs of at
//!   least four letters, any script, lower-cased). Title and heading text
//!   count like any other line; only the `## quiet` / `## tech` section
//!   markers themselves are left out.
//! - **Balance**: how the `quiet` and `tech` sections relate in length.
//!
//! The fragment is rendered with maud, so every piece of entry text that ends
//! up in it (title, date, keywords, link target) is HTML-escaped.

use crate::scan::{extract_sections, heading_text, split_title};
use crate::types::SectionKey;
use maud::{Markup, html};
use std::collections::HashMap;

/// Upper bound on the keywords mentioned in a fragment.
pub const KEYWORD_LIMIT: usize = 5;

/// Shortest token (in characters) considered a keyword.
pub const MIN_KEYWORD_CHARS: usize = 4;

/// How the two recognized sections of an entry relate in length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Balance {
    /// Both sections present, neither more than twice the other
    Balanced,
    QuietDominant,
    TechDominant,
    QuietOnly,
    TechOnly,
    /// Neither section present
    Minimal,
}

impl Balance {
    /// Classify by character counts of the trimmed section bodies.
    ///
    /// Dominance needs strictly more than twice the other side: 100 vs 50 is
    /// balanced, 101 vs 50 is dominant.
    pub fn classify(quiet: &str, tech: &str) -> Self {
        let q = quiet.trim().chars().count();
        let t = tech.trim().chars().count();
        match (q, t) {
            (0, 0) => Balance::Minimal,
            (_, 0) => Balance::QuietOnly,
            (0, _) => Balance::TechOnly,
            (q, t) if q > 2 * t => Balance::QuietDominant,
            (q, t) if t > 2 * q => Balance::TechDominant,
            _ => Balance::Balanced,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Balance::Balanced => "balanced",
            Balance::QuietDominant => "quiet-dominant",
            Balance::TechDominant => "tech-dominant",
            Balance::QuietOnly => "quiet-only",
            Balance::TechOnly => "tech-only",
            Balance::Minimal => "minimal",
        }
    }

    fn observations(self) -> &'static [&'static str] {
        match self {
            Balance::Balanced => &[
                "Both threads are here today, the quiet one and the technical one.",
                "Neither voice drowns the other.",
            ],
            Balance::QuietDominant => &[
                "The quiet thread carries most of this day.",
                "The technical notes stay in the background, and that is fine.",
            ],
            Balance::TechDominant => &[
                "Most of the day went into the work of the hands.",
                "The quiet thread is brief. It is still there.",
            ],
            Balance::QuietOnly => &["Only the quiet thread today. Nothing had to be built."],
            Balance::TechOnly => &["Only the technical thread today. The quiet can wait."],
            Balance::Minimal => &["The entry keeps a minimal form. Silence is also an answer."],
        }
    }
}

/// The most frequent words of `text`, most frequent first.
///
/// Tokens are maximal runs of alphabetic characters (Unicode letters
/// included) of at least [`MIN_KEYWORD_CHARS`] characters, lower-cased. Ties
/// keep first-seen order. At most [`KEYWORD_LIMIT`] words are returned.
///
/// Lines that are exactly a recognized section marker (`## quiet`,
/// `## tech`) are skipped; every other line, headings included, is counted.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for line in text.lines().filter(|l| !is_section_marker(l)) {
        for token in line.split(|c: char| !c.is_alphabetic()) {
            if token.chars().count() < MIN_KEYWORD_CHARS {
                continue;
            }
            let word = token.to_lowercase();
            match positions.get(&word) {
                Some(&idx) => counts[idx].1 += 1,
                None => {
                    positions.insert(word.clone(), counts.len());
                    counts.push((word, 1));
                }
            }
        }
    }

    // sort_by is stable, so equal counts stay in first-seen order
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .take(KEYWORD_LIMIT)
        .map(|(word, _)| word)
        .collect()
}

fn is_section_marker(line: &str) -> bool {
    heading_text(line, 2).and_then(SectionKey::from_heading).is_some()
}

/// Compose the commentary fragment for one entry.
///
/// Never fails: an empty or unstructured body lands in the
/// [`Balance::Minimal`] branch with no keyword sentence.
pub fn compose(title: &str, date: &str, body: &str, comment_href: Option<&str>) -> String {
    let (_, rest) = split_title(body);
    let sections = extract_sections(rest);
    let section = |key: SectionKey| sections.get(&key).map(String::as_str).unwrap_or("");
    let balance = Balance::classify(section(SectionKey::Quiet), section(SectionKey::Tech));
    let keywords = extract_keywords(body);

    render_fragment(title, date, balance, &keywords, comment_href).into_string()
}

fn render_fragment(
    title: &str,
    date: &str,
    balance: Balance,
    keywords: &[String],
    comment_href: Option<&str>,
) -> Markup {
    html! {
        aside.agent-comment data-balance=(balance.as_str()) {
            p.agent-comment-identity { (title) " · " (date) }
            @for sentence in balance.observations() {
                p { (sentence) }
            }
            @if !keywords.is_empty() {
                p.agent-comment-keywords {
                    "Words that keep returning: "
                    @for (i, word) in keywords.iter().enumerate() {
                        @if i > 0 { ", " }
                        em { (word) }
                    }
                    "."
                }
            }
            @if let Some(href) = comment_href {
                p.agent-comment-link {
                    a href=(href) { "Read the commentary on its own page" }
                }
            }
        }
    }
}

/// Neutral stand-in for an entry whose commentary was produced by an earlier
/// build but is no longer on disk.
pub fn placeholder_notice(title: &str, date: &str) -> String {
    html! {
        aside.agent-comment.agent-comment-archived {
            p.agent-comment-identity { (title) " · " (date) }
            p { "The commentary for this entry was generated in an earlier build." }
        }
    }
    .into_string()
}
