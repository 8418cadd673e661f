//! `POST /api/chat` — scope-gated question answering.
//!
//! The client sends its whole conversation on every request. The handler
//! validates the shape, runs the scope gate, and only calls the answer
//! generator for in-scope conversations.

use axum::{
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use pajakgate_core::answer::{TaxAnswer, parse_model_answer};
use pajakgate_core::error::Error;
use pajakgate_core::message::Message;
use pajakgate_core::scope::ScopeVerdict;

use crate::{GatewayState, SharedState};

const INVALID_HISTORY: &str = "Invalid or empty conversation history provided.";
const HISTORY_TOO_LONG: &str = "Conversation history is too long.";
const INTERNAL_ERROR: &str =
    "Terjadi kesalahan internal saat memproses permintaan Anda. Silakan coba lagi nanti.";

#[derive(Debug, Deserialize, Serialize)]
pub struct ChatRequest {
    pub history: Vec<Message>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ChatError = (StatusCode, Json<ErrorResponse>);

fn reject(status: StatusCode, message: &str) -> ChatError {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

/// The newest user query, or `None` when the history is unusable.
///
/// Requires a non-empty history whose last message is from the user and has
/// non-empty first-part text.
pub fn latest_user_query(history: &[Message]) -> Option<&str> {
    let last = history.last()?;
    if !last.is_user() {
        return None;
    }
    last.first_text().filter(|t| !t.is_empty())
}

pub async fn chat_handler(
    State(state): State<SharedState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<TaxAnswer>, ChatError> {
    let request_id = uuid::Uuid::new_v4();

    let Json(request) = payload.map_err(|e| {
        warn!(%request_id, error = %e, "Rejected malformed chat payload");
        reject(StatusCode::BAD_REQUEST, INVALID_HISTORY)
    })?;
    let history = request.history;

    let query = latest_user_query(&history)
        .ok_or_else(|| reject(StatusCode::BAD_REQUEST, INVALID_HISTORY))?
        .to_string();

    if history.len() > state.max_history_messages {
        warn!(%request_id, turns = history.len(), max = state.max_history_messages, "History over limit");
        return Err(reject(StatusCode::BAD_REQUEST, HISTORY_TOO_LONG));
    }

    let verdict = state.matcher.evaluate(&history, &state.lexicon);
    let ScopeVerdict::InScope(matched) = verdict else {
        info!(%request_id, turns = history.len(), in_scope = false, "Out-of-scope query refused");
        return Ok(Json(TaxAnswer::refusal(query, &state.refusal_message)));
    };
    info!(%request_id, turns = history.len(), in_scope = true, matched = %matched, "Forwarding query");

    match generate_answer(&state, &history).await {
        Ok(mut answer) => {
            if answer.question.is_none() {
                answer.question = Some(query);
            }
            Ok(Json(answer))
        }
        Err(Error::AnswerFormat(e)) => {
            warn!(%request_id, error = %e, "Model answer had an unexpected format");
            Ok(Json(TaxAnswer::canned(query, &state.format_error_message)))
        }
        Err(e) => {
            error!(%request_id, generator = state.generator.name(), error = %e, "Answer generation failed");
            Err(reject(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR))
        }
    }
}

async fn generate_answer(
    state: &GatewayState,
    history: &[Message],
) -> pajakgate_core::Result<TaxAnswer> {
    let generated = state.generator.generate(history).await?;
    debug!(raw = %generated.text, "Raw model answer");
    Ok(parse_model_answer(&generated.text, &generated.citations)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_query_requires_user_turn() {
        assert_eq!(latest_user_query(&[]), None);
        assert_eq!(latest_user_query(&[Message::model("hai")]), None);
        assert_eq!(latest_user_query(&[Message::user("")]), None);
        assert_eq!(
            latest_user_query(&[Message::model("hai"), Message::user("PPN?")]),
            Some("PPN?")
        );
    }

    #[test]
    fn latest_query_uses_first_part() {
        let msg = Message::with_parts(pajakgate_core::Role::User, ["satu", "dua"]);
        assert_eq!(latest_user_query(&[msg]), Some("satu"));
    }
}
