//! Aggression classification strategies.
//!
//! Two interchangeable strategies sit behind the `Classifier` trait: a
//! pure lexical term match and a remote model call. Which one runs is a
//! configuration decision made once at startup, never a branch inside
//! retrieval.

use async_trait::async_trait;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use crate::error::PipelineError;
use crate::groupme::Message;

// ── Strategy selection ──────────────────────────────────────────────────────

/// Which classification strategy to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierKind {
    /// Case-insensitive term match; pure, no network
    #[default]
    Lexical,
    /// Remote model verdict via an OpenAI-compatible endpoint
    Model,
}

/// What to do when the external strategy fails on a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ClassifyErrorPolicy {
    /// Propagate the first failure and stop scanning
    #[default]
    Abort,
    /// Log the failure and leave the message unclassified
    Skip,
}

// ── Classifier trait ────────────────────────────────────────────────────────

#[async_trait]
pub trait Classifier: Send + Sync {
    fn name(&self) -> &str;

    /// Judge a single message body. A service failure must surface as an
    /// error, never as a false verdict.
    async fn is_aggressive(&self, text: &str) -> Result<bool, PipelineError>;
}

// ── Lexical strategy ────────────────────────────────────────────────────────

/// Substring match against a fixed flagged-term set. Deterministic and
/// infallible; multi-word phrases match as written ("shut up").
pub struct LexicalClassifier {
    terms: Vec<String>,
}

impl LexicalClassifier {
    pub fn new(terms: &[String]) -> Self {
        Self {
            terms: terms.iter().map(|t| t.to_lowercase()).collect(),
        }
    }
}

#[async_trait]
impl Classifier for LexicalClassifier {
    fn name(&self) -> &str {
        "lexical"
    }

    async fn is_aggressive(&self, text: &str) -> Result<bool, PipelineError> {
        let lowered = text.to_lowercase();
        Ok(self.terms.iter().any(|term| lowered.contains(term)))
    }
}

// ── Model strategy ──────────────────────────────────────────────────────────

const VERDICT_PROMPT: &str = "You are a content moderator. Answer with a single \
word, yes or no: is the following chat message aggressive or hostile toward \
another person?";

/// Remote verdict from an OpenAI-compatible `/chat/completions` endpoint.
pub struct ModelClassifier {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl ModelClassifier {
    pub fn new(api_key: String, api_base: String, model: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base,
            api_key,
            model,
        }
    }
}

#[async_trait]
impl Classifier for ModelClassifier {
    fn name(&self) -> &str {
        "model"
    }

    async fn is_aggressive(&self, text: &str) -> Result<bool, PipelineError> {
        let url = format!("{}/chat/completions", self.api_base.trim_end_matches('/'));
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": VERDICT_PROMPT },
                { "role": "user", "content": text },
            ],
            "temperature": 0,
            "max_tokens": 3,
        });

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::Classification {
                reason: format!("request to {url} failed: {e}"),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let detail = resp.text().await.unwrap_or_default();
            return Err(PipelineError::Classification {
                reason: format!("service returned {status} — {detail}"),
            });
        }

        let data: serde_json::Value =
            resp.json().await.map_err(|e| PipelineError::Classification {
                reason: format!("invalid JSON from service: {e}"),
            })?;
        let verdict = data["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| PipelineError::Classification {
                reason: "response carried no verdict text".to_string(),
            })?;
        Ok(verdict.trim().to_lowercase().starts_with("yes"))
    }
}

// ── Filter ──────────────────────────────────────────────────────────────────

/// Scan the message sequence in order and return the flagged subsequence.
/// A message is included iff its text is non-empty and the strategy says
/// yes. `on_error` decides how a per-call service failure is handled; the
/// lexical strategy never takes that path.
pub async fn find_aggressive_messages<'a>(
    messages: &'a [Message],
    classifier: &dyn Classifier,
    on_error: ClassifyErrorPolicy,
) -> Result<Vec<&'a Message>, PipelineError> {
    let mut flagged = Vec::new();
    for message in messages {
        let Some(text) = message.text.as_deref().filter(|t| !t.is_empty()) else {
            continue;
        };
        match classifier.is_aggressive(text).await {
            Ok(true) => flagged.push(message),
            Ok(false) => {}
            Err(err) => match on_error {
                ClassifyErrorPolicy::Abort => return Err(err),
                ClassifyErrorPolicy::Skip => {
                    warn!(message_id = %message.id, %err, "classification failed, leaving message unclassified");
                }
            },
        }
    }
    Ok(flagged)
}
