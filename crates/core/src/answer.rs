//! Answer contract — what the client renders, and the generator behind it.
//!
//! The model is instructed to reply with bare JSON. In practice it sometimes
//! wraps the JSON in a markdown fence, so [`parse_model_answer`] strips that
//! before parsing and validates the shape strictly.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::ProviderError;
use crate::message::Message;

/// Structured answer returned to the chat client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxAnswer {
    /// The user's question, echoed back
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,

    /// Main answer, plain text
    pub answer: String,

    /// Worked examples, markdown
    #[serde(default)]
    pub examples: Vec<String>,

    /// Regulation names and numbers
    #[serde(default)]
    pub regulations: Vec<String>,

    /// Reference URLs
    #[serde(default)]
    pub references: Vec<String>,
}

impl TaxAnswer {
    /// A canned answer with empty supplementary fields.
    pub fn canned(question: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            question: Some(question.into()),
            answer: message.into(),
            examples: Vec::new(),
            regulations: Vec::new(),
            references: Vec::new(),
        }
    }

    /// The out-of-scope reply.
    pub fn refusal(question: impl Into<String>, message: impl Into<String>) -> Self {
        Self::canned(question, message)
    }
}

/// Raw output of an answer generator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedAnswer {
    /// Model text, expected to be a JSON object
    pub text: String,

    /// Citation URIs attached by the provider
    pub citations: Vec<String>,
}

/// Why model output could not be turned into a [`TaxAnswer`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnswerFormatError {
    #[error("model output is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("model output is not a JSON object")]
    NotAnObject,

    #[error("model output is missing or has a mistyped field: {0}")]
    MissingField(&'static str),
}

const FENCE_OPEN: &str = "```json";
const FENCE_CLOSE: &str = "```";

/// Remove a leading ```` ```json ```` fence and a trailing ```` ``` ```` fence.
pub fn strip_code_fence(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix(FENCE_OPEN) {
        text = rest.trim_start();
    }
    if let Some(rest) = text.strip_suffix(FENCE_CLOSE) {
        text = rest.trim_end();
    }
    text.trim()
}

fn string_array(
    object: &serde_json::Map<String, serde_json::Value>,
    field: &'static str,
) -> Result<Vec<String>, AnswerFormatError> {
    let values = object
        .get(field)
        .and_then(|v| v.as_array())
        .ok_or(AnswerFormatError::MissingField(field))?;

    // Models occasionally emit `{"uri": "..."}` objects for references.
    values
        .iter()
        .map(|v| match v {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(o) => o.get("uri").and_then(|u| u.as_str()).map(String::from),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()
        .ok_or(AnswerFormatError::MissingField(field))
}

/// Parse model text into a [`TaxAnswer`], merging citations into references.
///
/// `answer` must be a string and `examples`, `regulations` and `references`
/// must be arrays of strings or `{"uri": "..."}` objects. References and
/// citations are deduplicated, first
/// occurrence wins.
pub fn parse_model_answer(
    raw: &str,
    citations: &[String],
) -> Result<TaxAnswer, AnswerFormatError> {
    let cleaned = strip_code_fence(raw);
    let value: serde_json::Value =
        serde_json::from_str(cleaned).map_err(|e| AnswerFormatError::InvalidJson(e.to_string()))?;
    let object = value.as_object().ok_or(AnswerFormatError::NotAnObject)?;

    let answer = object
        .get("answer")
        .and_then(|v| v.as_str())
        .ok_or(AnswerFormatError::MissingField("answer"))?
        .to_string();
    let examples = string_array(object, "examples")?;
    let regulations = string_array(object, "regulations")?;
    let references = string_array(object, "references")?;

    let mut seen = HashSet::new();
    let references = references
        .into_iter()
        .chain(citations.iter().cloned())
        .filter(|r| !r.is_empty() && seen.insert(r.clone()))
        .collect();

    Ok(TaxAnswer {
        question: object
            .get("question")
            .and_then(|v| v.as_str())
            .map(String::from),
        answer,
        examples,
        regulations,
        references,
    })
}

/// A backend that answers a conversation.
///
/// Only called for histories the scope gate lets through.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// A human-readable name (e.g., "gemini").
    fn name(&self) -> &str;

    /// Answer the conversation. The last message is the user's newest turn.
    async fn generate(&self, history: &[Message]) -> Result<GeneratedAnswer, ProviderError>;

    /// Can we reach the backend?
    async fn health_check(&self) -> Result<bool, ProviderError> {
        Ok(true)
    }
}
