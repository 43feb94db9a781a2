//! # quiet-logos
//!
//! A static site generator for a personal diary. Every `YYYY-MM-DD.md` file
//! in the source directory becomes a page with a short reflective commentary
//! attached, chronological prev/next links, and a line in the index.
//!
//! # Architecture: One Sequential Pass
//!
//! ```text
//! 1. Load      log/_template.html, log/YYYY-MM-DD.md  →  Template, [Entry]
//! 2. Comment   Entry  →  commentary fragment            (local engine or remote)
//! 3. Compose   Template + body + fragment + nav  →  site/<date>.html
//! 4. Index     [Entry]  →  site/index.html
//! ```
//!
//! The build is single-threaded and processes entries newest first, so
//! navigation and index output never depend on timing. Every build recomputes
//! the whole site from source; the only thing carried between builds is the
//! commentary of older entries under the `latest-only` policy.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Source loader: discovers entry files, extracts title and sections |
//! | [`commentary`] | Local commentary engine: keywords, section balance, fragment HTML |
//! | [`provider`] | Commentary strategy: local engine, remote provider, fallback wrapper |
//! | [`template`] | Page template loading and placeholder substitution |
//! | [`generate`] | Build orchestrator: regeneration policy, page writes, index |
//! | [`cache`] | Commentary ledger: which fragment came from which entry version |
//! | [`config`] | `config.toml` loading, validation, and environment overrides |
//! | [`types`] | Shared types (`Entry`, `SectionKey`, `Neighbors`, `Origin`) |
//! | [`naming`] | `YYYY-MM-DD.<ext>` filename convention parser |
//! | [`output`] | CLI output formatting for `check` and `build` |
//!
//! # Design Decisions
//!
//! ## The Filename Is the Identity
//!
//! An entry is identified by the date in its filename, nothing else. The
//! format is fixed-width and zero-padded, so sorting the strings sorts the
//! entries by calendar. No front-matter, no database, no ordering file.
//!
//! ## Deterministic Commentary
//!
//! The local engine is a pure function of the entry text: no clock, no
//! randomness. Together with a timestamp-free page layout this makes builds
//! reproducible: an unchanged diary builds to byte-identical files, which
//! keeps deploy diffs empty when nothing was written.
//!
//! ## Remote Generation Is Optional
//!
//! A network model can write the commentary instead, but it is never
//! required. The remote provider gets one attempt per entry under a bounded
//! timeout; anything short of a usable reply (no credential, timeout, HTTP
//! error, empty text) silently falls back to the local engine. A build never
//! fails because of it.
//!
//! ## Maud for Owned HTML, a Plain Template for the Page
//!
//! HTML the crate owns (commentary, navigation, index) is generated with
//! [Maud](https://maud.lambda.xyz/), so every piece of diary text is escaped
//! at the splice site. The entry page skeleton stays a plain HTML file the
//! author edits freely, filled in by literal placeholder substitution.

pub mod cache;
pub mod commentary;
pub mod config;
pub mod generate;
pub mod naming;
pub mod output;
pub mod provider;
pub mod scan;
pub mod template;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
