//! Google Gemini provider implementation.
//!
//! Uses the `generateContent` REST endpoint directly.
//!
//! Features:
//! - `x-goog-api-key` header authentication
//! - System instruction as a top-level field
//! - Full conversation history as `contents`
//! - Citation URIs collected from `citationMetadata`

use async_trait::async_trait;
use pajakgate_core::answer::{AnswerGenerator, GeneratedAnswer};
use pajakgate_core::error::ProviderError;
use pajakgate_core::message::{Message, Role};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::instructions::SYSTEM_INSTRUCTION;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Gemini `generateContent` provider.
pub struct GeminiProvider {
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_output_tokens: Option<u32>,
    system_instruction: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// Create a new Gemini provider.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            model: if model.is_empty() {
                DEFAULT_MODEL.into()
            } else {
                model
            },
            temperature: 0.7,
            max_output_tokens: None,
            system_instruction: SYSTEM_INSTRUCTION.into(),
            client: build_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
        }
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = instruction.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = build_client(timeout);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    /// Convert history to Gemini `contents`.
    fn to_api_contents(history: &[Message]) -> Vec<GeminiContent> {
        history
            .iter()
            .map(|m| GeminiContent {
                role: match m.role {
                    Role::User => "user".into(),
                    Role::Model => "model".into(),
                },
                parts: m
                    .parts
                    .iter()
                    .map(|p| GeminiPart {
                        text: p.text.clone(),
                    })
                    .collect(),
            })
            .collect()
    }

    fn build_request(&self, history: &[Message]) -> GenerateContentRequest {
        GenerateContentRequest {
            system_instruction: (!self.system_instruction.is_empty()).then(|| {
                GeminiSystemInstruction {
                    parts: vec![GeminiPart {
                        text: self.system_instruction.clone(),
                    }],
                }
            }),
            contents: Self::to_api_contents(history),
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
        }
    }

    /// Pull answer text and citation URIs out of the first candidate.
    fn response_to_answer(
        response: GenerateContentResponse,
    ) -> Result<GeneratedAnswer, ProviderError> {
        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or(ProviderError::EmptyResponse)?;

        let text = candidate
            .content
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ProviderError::EmptyResponse);
        }

        let citations = candidate
            .citation_metadata
            .map(|m| {
                m.citation_sources
                    .into_iter()
                    .filter_map(|s| s.uri)
                    .filter(|u| !u.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(GeneratedAnswer { text, citations })
    }
}

fn build_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            warn!(error = %e, "Falling back to default HTTP client");
            reqwest::Client::new()
        })
}

#[async_trait]
impl AnswerGenerator for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, history: &[Message]) -> Result<GeneratedAnswer, ProviderError> {
        let body = self.build_request(history);

        debug!(provider = "gemini", model = %self.model, turns = history.len(), "Sending generateContent request");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            });
        }
        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid Gemini API key".into(),
            ));
        }
        if status == 404 {
            return Err(ProviderError::ModelNotFound(self.model.clone()));
        }
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Gemini API error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_resp: GenerateContentResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse Gemini response: {e}"),
            })?;

        let answer = Self::response_to_answer(api_resp)?;
        debug!(
            chars = answer.text.len(),
            citations = answer.citations.len(),
            "Gemini answer received"
        );
        Ok(answer)
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        Ok(!self.api_key.is_empty())
    }
}

// --- Gemini API types ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiSystemInstruction>,
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiSystemInstruction {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    citation_metadata: Option<CitationMetadata>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CitationMetadata {
    #[serde(default)]
    citation_sources: Vec<CitationSource>,
}

#[derive(Debug, Deserialize)]
struct CitationSource {
    #[serde(default)]
    uri: Option<String>,
}
