//! Persisted record of media already downloaded for a group.
//!
//! One `downloaded.json` per group directory, holding the set of media
//! identities written to disk by earlier runs. Loaded at the start of an
//! extraction, mutated as downloads land, and flushed atomically at the
//! end — including aborted runs, so the next run never refetches what
//! this one already wrote.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::PipelineError;

/// Ledger record file name inside the group directory
pub const LEDGER_FILE: &str = "downloaded.json";

pub struct MediaLedger {
    path: PathBuf,
    entries: HashSet<String>,
}

impl MediaLedger {
    /// Load the ledger for a group directory. A missing record means a
    /// first run (empty set); an unreadable or unparsable record is a
    /// hard error — resetting it to empty would redownload every image
    /// and duplicate prior work.
    pub fn load(group_dir: &Path) -> Result<Self, PipelineError> {
        let path = group_dir.join(LEDGER_FILE);
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str::<HashSet<String>>(&raw).map_err(|e| {
                PipelineError::LedgerCorrupt {
                    path: path.clone(),
                    reason: e.to_string(),
                }
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => HashSet::new(),
            Err(e) => {
                return Err(PipelineError::LedgerCorrupt {
                    path,
                    reason: e.to_string(),
                });
            }
        };
        Ok(Self { path, entries })
    }

    /// Whether this identity was already downloaded. The ledger is the
    /// sole source of truth: files deleted out-of-band are still treated
    /// as downloaded. Reconciling against the filesystem would change
    /// observable behavior and is left as an extension point.
    pub fn contains(&self, identity: &str) -> bool {
        self.entries.contains(identity)
    }

    /// Record an identity. Call only after its bytes are on disk.
    pub fn record(&mut self, identity: String) {
        self.entries.insert(identity);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the full set back, via tmp-file-then-rename so a crash
    /// mid-write cannot leave a half-written record.
    pub fn persist(&self) -> Result<(), PipelineError> {
        let mut ids: Vec<&str> = self.entries.iter().map(String::as_str).collect();
        ids.sort_unstable();
        let raw = serde_json::to_string_pretty(&ids).map_err(|e| PipelineError::Storage {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, raw).map_err(|e| PipelineError::Storage {
            path: tmp.clone(),
            reason: e.to_string(),
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|e| PipelineError::Storage {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        Ok(())
    }
}
