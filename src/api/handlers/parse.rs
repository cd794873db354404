//! Payment-text parsing handler.

use axum::{extract::State, response::Json};
use chrono::Utc;

use crate::{
    AppState,
    api::models::parse::ParseRequest,
    errors::{Error, Result},
    gemini::{GeminiError, ParsedSubscription},
};

#[utoipa::path(
    post,
    path = "/parse",
    tag = "parse",
    summary = "Parse a payment message",
    description = "Extract subscription fields from a free-text payment notification. Nothing is persisted.",
    request_body = ParseRequest,
    responses(
        (status = 200, description = "Extracted subscription fields", body = ParsedSubscription),
        (status = 400, description = "Empty input text"),
        (status = 412, description = "No generative API key configured"),
        (status = 502, description = "Generative API failed or returned unusable output"),
    )
)]
pub async fn parse_payment_text(State(state): State<AppState>, Json(data): Json<ParseRequest>) -> Result<Json<ParsedSubscription>> {
    if data.text.trim().is_empty() {
        return Err(Error::BadRequest {
            message: "text cannot be empty".to_string(),
        });
    }

    let today = Utc::now().date_naive();
    let parsed = state.gemini.parse_subscription(&data.text, today).await.map_err(|e| match e {
        GeminiError::MissingApiKey => Error::PreconditionFailed {
            message: "Generative API key is not configured".to_string(),
        },
        other => Error::Upstream {
            service: "Gemini".to_string(),
            message: other.to_string(),
        },
    })?;

    Ok(Json(parsed))
}
