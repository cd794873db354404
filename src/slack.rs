//! Slack incoming-webhook client for renewal reminders.
//!
//! Messages use the Block Kit layout: a header block, a field grid with the
//! subscription details, and a closing call-to-action section. Delivery is
//! retried with linear backoff; the caller records the outcome in the
//! notification history ledger.

use std::time::Duration;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use thiserror::Error as ThisError;
use tracing::{debug, instrument, warn};

use crate::config::SlackConfig;
use crate::currency::format_amount;

#[derive(ThisError, Debug)]
pub enum SlackError {
    #[error("slack webhook returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("slack webhook request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Details rendered into a renewal reminder message.
#[derive(Debug, Clone)]
pub struct ReminderMessage {
    pub service_name: String,
    pub amount: Decimal,
    pub currency: String,
    pub next_billing_date: NaiveDate,
    pub days_until_billing: i64,
}

#[derive(Clone)]
pub struct SlackClient {
    http: reqwest::Client,
    max_attempts: u32,
    retry_delay: Duration,
}

impl SlackClient {
    pub fn new(config: &SlackConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create Slack HTTP client");

        Self {
            http,
            max_attempts: config.max_attempts.max(1),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }

    /// Send a reminder, retrying up to the configured attempt count. The wait
    /// before attempt N+1 is `retry_delay * N`.
    #[instrument(skip(self, message), fields(service = %message.service_name), err)]
    pub async fn send_reminder(&self, webhook_url: &str, message: &ReminderMessage) -> Result<(), SlackError> {
        self.send_with_retry(webhook_url, &reminder_payload(message)).await
    }

    /// Send a plain text message. Used by the test-notification endpoint.
    #[instrument(skip(self, text), err)]
    pub async fn send_text(&self, webhook_url: &str, text: &str) -> Result<(), SlackError> {
        self.send_with_retry(webhook_url, &json!({ "text": text })).await
    }

    async fn send_with_retry(&self, webhook_url: &str, payload: &Value) -> Result<(), SlackError> {
        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            match self.send_once(webhook_url, payload).await {
                Ok(()) => {
                    debug!(attempt, "Slack delivery succeeded");
                    return Ok(());
                }
                Err(e) => {
                    warn!(attempt, max_attempts = self.max_attempts, error = %e, "Slack delivery attempt failed");
                    last_error = Some(e);
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.retry_delay * attempt).await;
                    }
                }
            }
        }

        // max_attempts >= 1, so at least one attempt ran
        Err(last_error.unwrap_or(SlackError::Status {
            status: 0,
            body: "no attempts made".to_string(),
        }))
    }

    async fn send_once(&self, webhook_url: &str, payload: &Value) -> Result<(), SlackError> {
        let response = self.http.post(webhook_url).json(payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(SlackError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

/// Block Kit payload for a renewal reminder.
fn reminder_payload(message: &ReminderMessage) -> Value {
    let title = format!("⚠️ 구독 해지 알림: {}", message.service_name);
    let amount_text = format_amount(message.amount, &message.currency);
    let billing_date = message.next_billing_date.format("%Y-%m-%d").to_string();

    json!({
        "text": title,
        "blocks": [
            {
                "type": "header",
                "text": { "type": "plain_text", "text": title }
            },
            {
                "type": "section",
                "fields": [
                    { "type": "mrkdwn", "text": format!("*서비스명:*\n{}", message.service_name) },
                    { "type": "mrkdwn", "text": format!("*결제 금액:*\n{}", amount_text) },
                    { "type": "mrkdwn", "text": format!("*다음 결제일:*\n{}", billing_date) },
                    { "type": "mrkdwn", "text": format!("*남은 일수:*\n{}일", message.days_until_billing) }
                ]
            },
            {
                "type": "section",
                "text": {
                    "type": "mrkdwn",
                    "text": format!(
                        "다음 결제일까지 *{}일* 남았습니다. 해지가 필요하시면 지금 처리하세요!",
                        message.days_until_billing
                    )
                }
            }
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config() -> SlackConfig {
        SlackConfig {
            timeout_secs: 5,
            max_attempts: 3,
            retry_delay_ms: 10,
        }
    }

    fn netflix_reminder() -> ReminderMessage {
        ReminderMessage {
            service_name: "Netflix".to_string(),
            amount: dec!(17000),
            currency: "KRW".to_string(),
            next_billing_date: NaiveDate::from_ymd_opt(2026, 9, 15).unwrap(),
            days_until_billing: 3,
        }
    }

    #[test]
    fn reminder_payload_has_header_and_fields() {
        let payload = reminder_payload(&netflix_reminder());

        assert_eq!(payload["text"], "⚠️ 구독 해지 알림: Netflix");
        assert_eq!(payload["blocks"][0]["type"], "header");

        let fields = payload["blocks"][1]["fields"].as_array().unwrap();
        assert_eq!(fields.len(), 4);
        assert!(fields[1]["text"].as_str().unwrap().contains("17,000원"));
        assert!(fields[2]["text"].as_str().unwrap().contains("2026-09-15"));
        assert!(fields[3]["text"].as_str().unwrap().contains("3일"));
    }

    #[test]
    fn reminder_payload_converts_foreign_currency() {
        let mut message = netflix_reminder();
        message.amount = dec!(15.99);
        message.currency = "USD".to_string();

        let payload = reminder_payload(&message);
        let amount_field = payload["blocks"][1]["fields"][1]["text"].as_str().unwrap();
        assert!(amount_field.contains("15.99 USD"));
        assert!(amount_field.contains("약"));
    }

    #[tokio::test]
    async fn send_succeeds_on_first_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/services/T0/B0/x"))
            .and(body_partial_json(json!({ "text": "⚠️ 구독 해지 알림: Netflix" })))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let client = SlackClient::new(&test_config());
        let url = format!("{}/services/T0/B0/x", server.uri());
        client.send_reminder(&url, &netflix_reminder()).await.unwrap();
    }

    #[tokio::test]
    async fn send_retries_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let client = SlackClient::new(&test_config());
        client.send_text(&server.uri(), "hello").await.unwrap();
    }

    #[tokio::test]
    async fn send_gives_up_after_max_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(3)
            .mount(&server)
            .await;

        let client = SlackClient::new(&test_config());
        let err = client.send_text(&server.uri(), "hello").await.unwrap_err();
        match err {
            SlackError::Status { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
