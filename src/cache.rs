//! Commentary artifact ledger.
//!
//! Under the `latest-only` policy most entries keep the fragment written by
//! an earlier build. This module records, for every fragment on disk, a hash
//! of the entry source it was generated from, so a build can tell when a
//! reused fragment no longer matches its entry.
//!
//! # Design
//!
//! The ledger is a JSON file at `<output_dir>/.commentary-manifest.json`,
//! keyed by entry date:
//!
//! ```json
//! {
//!   "version": 1,
//!   "entries": {
//!     "2025-01-02": { "source_hash": "9f2c…", "origin": "local" }
//!   }
//! }
//! ```
//!
//! - **`source_hash`**: SHA-256 of the entry file contents at the time the
//!   fragment was generated. Content-based rather than mtime-based so it
//!   survives `git checkout`.
//! - **`origin`**: which provider produced the fragment.
//!
//! The ledger is rebuilt from scratch each build: fresh fragments get a new
//! record, reused fragments carry their old record forward, and entries that
//! disappeared from the source drop out. Keys are sorted, so an unchanged
//! build rewrites the file byte for byte.
//!
//! A missing file, a parse failure or a version mismatch all load as an
//! empty ledger. The ledger is advisory: losing it never breaks a build, it
//! only hides staleness until the next full regeneration.

use crate::generate::write_atomic;
use crate::types::Origin;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Name of the ledger file within the output directory.
const MANIFEST_FILENAME: &str = ".commentary-manifest.json";

/// Version of the ledger format. Bump this to discard existing ledgers when
/// the format or hash input changes.
const MANIFEST_VERSION: u32 = 1;

/// Provenance of one fragment on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactRecord {
    pub source_hash: String,
    pub origin: Origin,
}

/// On-disk ledger mapping entry dates to fragment provenance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommentaryManifest {
    pub version: u32,
    pub entries: BTreeMap<String, ArtifactRecord>,
}

impl CommentaryManifest {
    pub fn empty() -> Self {
        Self {
            version: MANIFEST_VERSION,
            entries: BTreeMap::new(),
        }
    }

    /// Load from the output directory. Returns an empty ledger if the
    /// file doesn't exist or can't be parsed (version mismatch, corruption).
    pub fn load(output_dir: &Path) -> Self {
        let content = match std::fs::read_to_string(manifest_path(output_dir)) {
            Ok(c) => c,
            Err(_) => return Self::empty(),
        };
        let manifest: Self = match serde_json::from_str(&content) {
            Ok(m) => m,
            Err(_) => return Self::empty(),
        };
        if manifest.version != MANIFEST_VERSION {
            return Self::empty();
        }
        manifest
    }

    /// Save to the output directory.
    pub fn save(&self, output_dir: &Path) -> io::Result<()> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        write_atomic(&manifest_path(output_dir), json.as_bytes())
    }

    pub fn get(&self, date: &str) -> Option<&ArtifactRecord> {
        self.entries.get(date)
    }

    /// Record a fragment generated from source with hash `source_hash`.
    pub fn record(&mut self, date: &str, source_hash: String, origin: Origin) {
        self.entries.insert(
            date.to_string(),
            ArtifactRecord {
                source_hash,
                origin,
            },
        );
    }

    /// Copy the record for `date` from `previous`, if it has one.
    ///
    /// Returns whether a record was carried forward.
    pub fn carry_over(&mut self, previous: &CommentaryManifest, date: &str) -> bool {
        match previous.get(date) {
            Some(record) => {
                self.entries.insert(date.to_string(), record.clone());
                true
            }
            None => false,
        }
    }

    /// Whether the fragment for `date` was generated from different source
    /// text than `source_hash`. Unknown dates are not stale.
    pub fn is_stale(&self, date: &str, source_hash: &str) -> bool {
        self.get(date)
            .is_some_and(|record| record.source_hash != source_hash)
    }
}

/// SHA-256 of an entry's source text, as a hex string.
pub fn hash_source(body: &str) -> String {
    format!("{:x}", Sha256::digest(body.as_bytes()))
}

/// Resolve the ledger path for an output directory.
pub fn manifest_path(output_dir: &Path) -> PathBuf {
    output_dir.join(MANIFEST_FILENAME)
}

/// Summary of commentary work for a build run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CommentaryStats {
    pub generated: u32,
    pub reused: u32,
    pub placeholders: u32,
    /// Reused fragments whose entry changed since they were generated
    pub stale: u32,
}

impl CommentaryStats {
    pub fn count(&mut self, origin: Origin) {
        match origin {
            Origin::Local | Origin::Remote => self.generated += 1,
            Origin::Reused => self.reused += 1,
            Origin::Placeholder => self.placeholders += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.generated + self.reused + self.placeholders
    }
}

impl fmt::Display for CommentaryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reused == 0 && self.placeholders == 0 {
            return write!(f, "{} generated", self.generated);
        }
        write!(
            f,
            "{} generated, {} reused, {} placeholder ({} total)",
            self.generated,
            self.reused,
            self.placeholders,
            self.total()
        )?;
        if self.stale > 0 {
            write!(f, ", {} stale", self.stale)?;
        }
        Ok(())
    }
}
