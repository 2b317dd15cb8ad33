//! Deduplicated image extraction.
//!
//! Walks the fetched message sequence, keeps the messages inside the
//! requested time window, and downloads every image attachment whose
//! identity the group's ledger has not seen. Downloads are best-effort
//! per item: one bad URL never sinks the batch.

use std::path::Path;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::PipelineError;
use crate::groupme::{Attachment, GroupMeClient, Message};
use crate::ledger::MediaLedger;

/// Extension appended to downloaded image files
pub const IMAGE_EXT: &str = "jpg";

// ── Time window ─────────────────────────────────────────────────────────────

/// Inclusive `[start, end]` interval in epoch seconds.
///
/// `start <= end` is a precondition validated at the CLI boundary, not
/// here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: i64,
    pub end: i64,
}

impl TimeWindow {
    pub fn contains(&self, ts: i64) -> bool {
        self.start <= ts && ts <= self.end
    }
}

// ── Media identity ──────────────────────────────────────────────────────────

/// Deduplication key for an attachment: the final path segment of its
/// source URL, which GroupMe's CDN keeps stable per resource. Query and
/// fragment are stripped first.
pub fn media_identity(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/')
        .find(|segment| !segment.is_empty())
        .filter(|segment| !segment.contains(':'))
        .map(String::from)
}

// ── Media fetcher seam ──────────────────────────────────────────────────────

/// Byte download for a single media URL. Per-item failures are reported
/// as plain errors; the extractor decides they are non-fatal.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> anyhow::Result<Vec<u8>>;
}

#[async_trait]
impl MediaFetcher for GroupMeClient {
    async fn fetch(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        let resp = self.http().get(url).send().await?;
        if !resp.status().is_success() {
            anyhow::bail!("media host returned {}", resp.status());
        }
        Ok(resp.bytes().await?.to_vec())
    }
}

// ── Extractor ───────────────────────────────────────────────────────────────

/// Download every new image attachment in `window` into `group_dir` and
/// return the count of files written by this run.
///
/// The ledger is loaded before any download is attempted (a corrupt
/// record aborts here) and persisted on every exit path — normal finish
/// and cancellation alike — so it always reflects exactly what reached
/// disk. Cancellation is honored before each attachment request.
pub async fn extract_images(
    messages: &[Message],
    fetcher: &dyn MediaFetcher,
    group_dir: &Path,
    window: TimeWindow,
    cancel: &CancellationToken,
) -> Result<u32, PipelineError> {
    std::fs::create_dir_all(group_dir).map_err(|e| PipelineError::Storage {
        path: group_dir.to_path_buf(),
        reason: e.to_string(),
    })?;
    let mut ledger = MediaLedger::load(group_dir)?;
    let mut count = 0u32;

    'messages: for message in messages {
        if !window.contains(message.created_at) {
            continue;
        }
        for attachment in &message.attachments {
            let Attachment::Image { url } = attachment else {
                continue;
            };
            if cancel.is_cancelled() {
                warn!(downloaded = count, "extraction cancelled, flushing ledger");
                break 'messages;
            }
            let Some(identity) = media_identity(url) else {
                warn!(%url, "image attachment with unusable url, skipping");
                continue;
            };
            if ledger.contains(&identity) {
                debug!(%identity, "already downloaded, skipping");
                continue;
            }

            let target = group_dir.join(format!("{identity}.{IMAGE_EXT}"));
            match fetcher.fetch(url).await {
                Ok(bytes) => match std::fs::write(&target, &bytes) {
                    Ok(()) => {
                        ledger.record(identity);
                        count += 1;
                    }
                    Err(err) => {
                        warn!(path = %target.display(), %err, "failed to write image, skipping");
                    }
                },
                Err(err) => {
                    warn!(%url, %err, "failed to download image, skipping");
                }
            }
        }
    }

    ledger.persist()?;
    info!(
        downloaded = count,
        ledger_size = ledger.len(),
        dir = %group_dir.display(),
        "extraction finished"
    );
    Ok(count)
}
