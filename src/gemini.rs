//! Generative-language API client for payment message parsing.
//!
//! Free-text payment notifications ("넷플릭스 17,000원 결제 예정...") are sent
//! to the model with an extraction prompt. The model replies with a JSON
//! object, often wrapped in markdown code fences, which is stripped, parsed,
//! and validated before anything touches the database.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error as ThisError;
use tracing::{debug, instrument};
use url::Url;
use utoipa::ToSchema;

use crate::config::GeminiConfig;
use crate::types::BillingCycle;

#[derive(ThisError, Debug)]
pub enum GeminiError {
    #[error("no API key configured")]
    MissingApiKey,

    #[error("generative API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("generative API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("model response was not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("model response missing candidates")]
    EmptyResponse,

    #[error("parsed subscription is incomplete: {0}")]
    Incomplete(&'static str),

    #[error("next_billing_date is not a valid YYYY-MM-DD date: {0}")]
    InvalidDate(String),
}

/// Subscription fields extracted from a payment message.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ParsedSubscription {
    pub service_name: String,
    pub amount: Decimal,
    #[serde(default)]
    pub currency: Option<String>,
    pub cycle: BillingCycle,
    pub next_billing_date: String,
    #[serde(default)]
    pub billing_email: Option<String>,
}

#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: Url,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create generative API HTTP client");

        Self {
            http,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.clone(),
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Extract subscription fields from a free-text payment message.
    #[instrument(skip(self, text), fields(model = %self.model, text_len = text.len()), err)]
    pub async fn parse_subscription(&self, text: &str, today: NaiveDate) -> Result<ParsedSubscription, GeminiError> {
        let api_key = self.api_key.as_deref().ok_or(GeminiError::MissingApiKey)?;

        let url = format!(
            "{}v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, api_key
        );

        let body = json!({
            "contents": [{
                "parts": [{ "text": extraction_prompt(text, today) }]
            }]
        });

        let response = self.http.post(&url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(GeminiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let generated: GenerateContentResponse = response.json().await?;
        let text_response = generated
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or(GeminiError::EmptyResponse)?;

        let json_text = strip_code_fences(&text_response);
        debug!(response_len = json_text.len(), "Model returned candidate JSON");

        let parsed: ParsedSubscription = serde_json::from_str(json_text)?;
        validate(parsed)
    }
}

fn extraction_prompt(text: &str, today: NaiveDate) -> String {
    format!(
        r#"다음은 정기구독 결제 알림 텍스트입니다. 이 텍스트에서 다음 정보를 추출하여 JSON 형식으로 응답해주세요:

1. service_name: 서비스명 (예: 넷플릭스, 스포티파이, 유튜브 프리미엄 등)
2. amount: 결제 금액 (숫자만, 소수점 포함 가능)
3. currency: 통화 (KRW, USD, EUR 등, 기본값은 KRW)
4. cycle: 결제 주기 ('monthly', 'yearly', 'weekly', 'quarterly' 중 하나)
5. next_billing_date: 다음 결제 예정일 (YYYY-MM-DD 형식)
6. billing_email: 결제 이메일 주소 (있는 경우만)

만약 날짜가 명시되어 있지 않다면, 오늘 날짜({today})를 기준으로 주기에 맞춰 계산해주세요.

응답은 반드시 유효한 JSON 형식이어야 하며, 다른 설명 없이 JSON만 반환해주세요.

텍스트:
{text}
"#,
        today = today.format("%Y-%m-%d"),
        text = text
    )
}

/// Strip markdown code fences the model often wraps its JSON in.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open.strip_suffix("```").unwrap_or(without_open).trim()
}

fn validate(mut parsed: ParsedSubscription) -> Result<ParsedSubscription, GeminiError> {
    if parsed.service_name.trim().is_empty() {
        return Err(GeminiError::Incomplete("service_name"));
    }
    if parsed.amount <= Decimal::ZERO {
        return Err(GeminiError::Incomplete("amount"));
    }

    if NaiveDate::parse_from_str(&parsed.next_billing_date, "%Y-%m-%d").is_err() {
        return Err(GeminiError::InvalidDate(parsed.next_billing_date));
    }

    if parsed.currency.as_deref().is_none_or(|c| c.trim().is_empty()) {
        parsed.currency = Some("KRW".to_string());
    }

    Ok(parsed)
}

// Generative-language API wire format, trimmed to what we read.

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, api_key: Option<&str>) -> GeminiClient {
        GeminiClient::new(&GeminiConfig {
            api_key: api_key.map(String::from),
            model: "gemini-2.0-flash".to_string(),
            base_url: Url::parse(&format!("{}/", server.uri())).unwrap(),
            timeout_secs: 5,
        })
    }

    fn generation_response(text: &str) -> serde_json::Value {
        json!({
            "candidates": [{
                "content": { "parts": [{ "text": text }], "role": "model" },
                "finishReason": "STOP"
            }]
        })
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 29).unwrap()
    }

    #[test]
    fn strips_json_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("{\"a\": 1}"), "{\"a\": 1}");
    }

    #[tokio::test]
    async fn parses_fenced_model_output() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(generation_response(
                "```json\n{\"service_name\": \"넷플릭스\", \"amount\": 17000, \"cycle\": \"monthly\", \"next_billing_date\": \"2026-09-15\"}\n```",
            )))
            .expect(1)
            .mount(&server)
            .await;

        let parsed = client_for(&server, Some("test-key"))
            .parse_subscription("넷플릭스 17,000원 결제 예정", today())
            .await
            .unwrap();

        assert_eq!(parsed.service_name, "넷플릭스");
        assert_eq!(parsed.amount, dec!(17000));
        assert_eq!(parsed.cycle, BillingCycle::Monthly);
        // Currency was missing, defaults to KRW
        assert_eq!(parsed.currency.as_deref(), Some("KRW"));
    }

    #[tokio::test]
    async fn rejects_invalid_date() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(generation_response(
                "{\"service_name\": \"Spotify\", \"amount\": 11900, \"cycle\": \"monthly\", \"next_billing_date\": \"next month\"}",
            )))
            .mount(&server)
            .await;

        let err = client_for(&server, Some("test-key"))
            .parse_subscription("spotify", today())
            .await
            .unwrap_err();
        assert!(matches!(err, GeminiError::InvalidDate(_)));
    }

    #[tokio::test]
    async fn missing_api_key_is_an_error() {
        let server = MockServer::start().await;
        let err = client_for(&server, None)
            .parse_subscription("spotify", today())
            .await
            .unwrap_err();
        assert!(matches!(err, GeminiError::MissingApiKey));
    }

    #[tokio::test]
    async fn upstream_error_is_reported_with_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let err = client_for(&server, Some("test-key"))
            .parse_subscription("spotify", today())
            .await
            .unwrap_err();
        match err {
            GeminiError::Status { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "quota exceeded");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
