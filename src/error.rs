//! Pipeline error kinds.
//!
//! Individual media download/write failures are deliberately not
//! represented here: the extractor logs and skips them per item.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the retrieval/classification/extraction pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Message retrieval aborted. Partial pages are discarded — a partial
    /// history would silently bias the flagged-message statistics and the
    /// dedup time window.
    #[error("message fetch failed: {reason}")]
    Fetch { reason: String },

    /// The external classification service failed or returned an
    /// unusable verdict. Never mapped to "not aggressive".
    #[error("classification service failed: {reason}")]
    Classification { reason: String },

    /// The persisted ledger record exists but cannot be read or parsed.
    /// Hard stop: resetting to an empty set would redownload everything.
    #[error("media ledger at {path} is corrupt: {reason}")]
    LedgerCorrupt { path: PathBuf, reason: String },

    /// Local storage failure outside the per-item download path
    /// (group directory creation, ledger persist).
    #[error("storage failure at {path}: {reason}")]
    Storage { path: PathBuf, reason: String },
}
