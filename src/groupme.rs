//! GroupMe REST API client and backward cursor pagination.
//!
//! The v3 API wraps every payload in a `{"response": ...}` envelope and
//! authenticates with a `token` query parameter. Message pages come back
//! newest-first, up to 100 per request; the next page is addressed with a
//! `before_id` cursor set to the oldest message of the previous page.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::PipelineError;

/// GroupMe v3 API base URL
pub const GROUPME_API_BASE: &str = "https://api.groupme.com/v3";

/// Maximum messages per page accepted by the API
pub const PAGE_SIZE: usize = 100;

// ── Wire models ─────────────────────────────────────────────────────────────

/// A message as returned by the groups/:id/messages endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub id: String,
    /// Author display name
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub text: Option<String>,
    /// Creation time, seconds since epoch
    pub created_at: i64,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// A message attachment. Only images carry a source URL we care about;
/// everything else (video, mentions, locations, emoji) falls through to
/// the catch-all and is ignored downstream.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Attachment {
    Image { url: String },
    #[serde(other)]
    Other,
}

/// A group chat from the /groups listing.
#[derive(Debug, Clone, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub members: Vec<Member>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Member {
    #[serde(default)]
    pub nickname: String,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    response: T,
}

#[derive(Debug, Deserialize)]
struct MessagePage {
    messages: Vec<Message>,
}

// ── Client ──────────────────────────────────────────────────────────────────

/// GroupMe API client holding the bearer credential.
pub struct GroupMeClient {
    http: reqwest::Client,
    api_base: String,
    token: String,
}

impl GroupMeClient {
    pub fn new(token: String, api_base: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base,
            token,
        }
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Fetch the credential owner's group chats.
    pub async fn fetch_groups(&self) -> Result<Vec<Group>, PipelineError> {
        let url = format!("{}/groups", self.api_base);
        let resp = self
            .http
            .get(&url)
            .query(&[("token", self.token.as_str())])
            .send()
            .await
            .map_err(|e| PipelineError::Fetch {
                reason: format!("request to {url} failed: {e}"),
            })?;

        if !resp.status().is_success() {
            return Err(PipelineError::Fetch {
                reason: format!("GroupMe returned {} for {url}", resp.status()),
            });
        }

        let envelope: Envelope<Vec<Group>> =
            resp.json().await.map_err(|e| PipelineError::Fetch {
                reason: format!("malformed group listing: {e}"),
            })?;
        Ok(envelope.response)
    }
}

// ── Message source seam ─────────────────────────────────────────────────────

/// One page of a group's message history. The HTTP client is the real
/// implementation; tests script their own.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Fetch up to `limit` messages older than `before_id` (newest first).
    /// An empty page is the normal end-of-history signal.
    async fn fetch_page(
        &self,
        group_id: &str,
        before_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Message>, PipelineError>;
}

#[async_trait]
impl MessageSource for GroupMeClient {
    async fn fetch_page(
        &self,
        group_id: &str,
        before_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Message>, PipelineError> {
        let url = format!("{}/groups/{}/messages", self.api_base, group_id);
        let limit = limit.to_string();
        let mut req = self
            .http
            .get(&url)
            .query(&[("token", self.token.as_str()), ("limit", limit.as_str())]);
        if let Some(cursor) = before_id {
            req = req.query(&[("before_id", cursor)]);
        }

        let resp = req.send().await.map_err(|e| PipelineError::Fetch {
            reason: format!("request to {url} failed: {e}"),
        })?;

        // GroupMe answers 304 once the cursor is past the oldest message.
        if resp.status() == reqwest::StatusCode::NOT_MODIFIED {
            return Ok(Vec::new());
        }
        if !resp.status().is_success() {
            return Err(PipelineError::Fetch {
                reason: format!("GroupMe returned {} for {url}", resp.status()),
            });
        }

        let envelope: Envelope<MessagePage> =
            resp.json().await.map_err(|e| PipelineError::Fetch {
                reason: format!("malformed message page: {e}"),
            })?;
        Ok(envelope.response.messages)
    }
}

// ── Retrieval engine ────────────────────────────────────────────────────────

/// Walk the group's history backward until `max_messages` have accumulated
/// or a page comes back empty. Checked in that order each iteration, so a
/// run capped mid-history never issues the extra request that would hit
/// the empty page.
///
/// Any transport failure or malformed body aborts the whole fetch and
/// discards pages already accumulated.
pub async fn fetch_all_messages(
    source: &dyn MessageSource,
    group_id: &str,
    max_messages: usize,
) -> Result<Vec<Message>, PipelineError> {
    let mut messages: Vec<Message> = Vec::new();
    let mut before_id: Option<String> = None;

    while messages.len() < max_messages {
        let page = source
            .fetch_page(group_id, before_id.as_deref(), PAGE_SIZE)
            .await?;
        if page.is_empty() {
            break;
        }
        before_id = page.last().map(|m| m.id.clone());
        messages.extend(page);
    }

    messages.truncate(max_messages);
    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn msg(id: &str) -> Message {
        Message {
            id: id.to_string(),
            name: "tester".to_string(),
            text: Some("hello".to_string()),
            created_at: 1_700_000_000,
            attachments: Vec::new(),
        }
    }

    /// Scripted source that serves canned pages and records cursors.
    struct ScriptedSource {
        pages: Mutex<Vec<Vec<Message>>>,
        cursors: Mutex<Vec<Option<String>>>,
    }

    impl ScriptedSource {
        fn new(pages: Vec<Vec<Message>>) -> Self {
            Self {
                pages: Mutex::new(pages),
                cursors: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl MessageSource for ScriptedSource {
        async fn fetch_page(
            &self,
            _group_id: &str,
            before_id: Option<&str>,
            _limit: usize,
        ) -> Result<Vec<Message>, PipelineError> {
            self.cursors
                .lock()
                .unwrap()
                .push(before_id.map(String::from));
            let mut pages = self.pages.lock().unwrap();
            if pages.is_empty() {
                Ok(Vec::new())
            } else {
                Ok(pages.remove(0))
            }
        }
    }

    struct FailingSource;

    #[async_trait]
    impl MessageSource for FailingSource {
        async fn fetch_page(
            &self,
            _group_id: &str,
            _before_id: Option<&str>,
            _limit: usize,
        ) -> Result<Vec<Message>, PipelineError> {
            Err(PipelineError::Fetch {
                reason: "boom".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn stops_at_first_empty_page() {
        let page: Vec<Message> = (0..100).map(|i| msg(&format!("m{i}"))).collect();
        let source = ScriptedSource::new(vec![page]);
        let messages = fetch_all_messages(&source, "g1", 10_000).await.unwrap();
        assert_eq!(messages.len(), 100);
        // Second request carried the oldest id of the first page.
        let cursors = source.cursors.lock().unwrap();
        assert_eq!(*cursors, vec![None, Some("m99".to_string())]);
    }

    #[tokio::test]
    async fn never_exceeds_the_cap() {
        let pages = (0..4)
            .map(|p| (0..3).map(|i| msg(&format!("p{p}m{i}"))).collect())
            .collect();
        let source = ScriptedSource::new(pages);
        let messages = fetch_all_messages(&source, "g1", 5).await.unwrap();
        assert_eq!(messages.len(), 5);
        // Cap reached after the second page; no third request issued.
        assert_eq!(source.cursors.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn fetch_failure_is_all_or_nothing() {
        let result = fetch_all_messages(&FailingSource, "g1", 100).await;
        assert!(matches!(result, Err(PipelineError::Fetch { .. })));
    }

    #[test]
    fn image_attachments_deserialize_others_fall_through() {
        let raw = r#"{
            "id": "123",
            "name": "alice",
            "text": "look",
            "created_at": 1700000000,
            "attachments": [
                {"type": "image", "url": "https://i.groupme.com/800x600.jpeg.abc123"},
                {"type": "video", "url": "https://v.groupme.com/clip.mp4"},
                {"type": "mentions", "user_ids": ["1"], "loci": [[0, 4]]}
            ]
        }"#;
        let message: Message = serde_json::from_str(raw).unwrap();
        assert_eq!(message.attachments.len(), 3);
        assert!(matches!(
            &message.attachments[0],
            Attachment::Image { url } if url.ends_with("abc123")
        ));
        assert!(matches!(message.attachments[1], Attachment::Other));
        assert!(matches!(message.attachments[2], Attachment::Other));
    }

    #[test]
    fn message_without_text_or_attachments_deserializes() {
        let raw = r#"{"id": "9", "name": "bob", "text": null, "created_at": 5}"#;
        let message: Message = serde_json::from_str(raw).unwrap();
        assert!(message.text.is_none());
        assert!(message.attachments.is_empty());
    }
}
