//! Renewal reminder checks.
//!
//! A check runs against one user on a given date: load their upcoming active
//! subscriptions, match calendar-day offsets against their configured
//! `days_before` list, and deliver one Slack reminder per match. Every attempt
//! lands in `notification_history`; its unique constraint is the guard that
//! makes concurrent and repeated sweeps idempotent.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::AppState;
use crate::db::handlers::notification_history::NotificationHistory;
use crate::db::handlers::settings::UserSettingsRepo;
use crate::db::handlers::subscriptions::Subscriptions;
use crate::db::models::notification_history::NotificationRecordCreateDBRequest;
use crate::db::models::subscriptions::Subscription;
use crate::errors::{Error, Result};
use crate::slack::ReminderMessage;
use crate::types::{NotificationStatus, UserId, abbrev_uuid};

/// Result of a single-user check.
#[derive(Debug, Default, Serialize, ToSchema)]
pub struct CheckOutcome {
    /// Reminders delivered to Slack
    pub sent: u32,
    /// Matches suppressed because a `sent` history row already existed
    pub skipped: u32,
    /// Total day-offset matches considered
    pub total: u32,
    /// Per-subscription failures, none of which abort the check
    pub errors: Vec<String>,
}

/// Aggregate result of a cron sweep over all notifiable users.
#[derive(Debug, Serialize, ToSchema)]
pub struct CronSummary {
    pub total_users: u32,
    pub successful_users: u32,
    pub failed_users: u32,
    pub total_notifications_sent: u32,
    pub total_notifications_skipped: u32,
    pub errors: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Run a reminder check for one user.
///
/// Returns an empty outcome when the user has notifications disabled; errors
/// when they have no webhook URL configured. `days_override` is only consulted
/// when the stored offsets list is empty.
#[instrument(skip(state, days_override), fields(user_id = %abbrev_uuid(&user_id)), err)]
pub async fn check_user(
    state: &AppState,
    user_id: UserId,
    today: NaiveDate,
    days_override: Option<Vec<i32>>,
) -> Result<CheckOutcome> {
    let mut conn = state.db.acquire().await.map_err(crate::db::errors::DbError::from)?;

    let settings = UserSettingsRepo::new(&mut conn).get_by_user(user_id).await?;

    let Some(settings) = settings else {
        return Err(Error::PreconditionFailed {
            message: "Slack webhook URL is not configured".to_string(),
        });
    };

    if !settings.notification_enabled {
        info!("Notifications disabled, skipping check");
        return Ok(CheckOutcome::default());
    }

    let Some(webhook_url) = settings.slack_webhook_url.clone() else {
        return Err(Error::PreconditionFailed {
            message: "Slack webhook URL is not configured".to_string(),
        });
    };

    let offsets = if !settings.notification_days_before.is_empty() {
        settings.notification_days_before.clone()
    } else {
        days_override
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| state.config.notifications.default_days_before.clone())
    };

    let subscriptions = Subscriptions::new(&mut conn).list_upcoming(user_id, today).await?;

    let mut outcome = CheckOutcome::default();

    for subscription in &subscriptions {
        let days_until = (subscription.next_billing_date - today).num_days();

        for &offset in &offsets {
            if days_until != i64::from(offset) {
                continue;
            }
            outcome.total += 1;

            let already_sent = NotificationHistory::new(&mut conn)
                .was_sent(subscription.id, today, offset)
                .await?;
            if already_sent {
                outcome.skipped += 1;
                continue;
            }

            match deliver(state, &mut conn, subscription, &webhook_url, today, offset, days_until).await {
                Ok(()) => outcome.sent += 1,
                Err(message) => {
                    warn!(service = %subscription.service_name, error = %message, "Reminder delivery failed");
                    outcome.errors.push(format!("{}: {}", subscription.service_name, message));
                }
            }
        }
    }

    info!(
        sent = outcome.sent,
        skipped = outcome.skipped,
        total = outcome.total,
        errors = outcome.errors.len(),
        "Reminder check finished"
    );
    Ok(outcome)
}

/// Send one reminder and record the attempt. Returns the error message on
/// delivery failure so the caller can collect it without aborting the sweep.
async fn deliver(
    state: &AppState,
    conn: &mut sqlx::PgConnection,
    subscription: &Subscription,
    webhook_url: &str,
    today: NaiveDate,
    offset: i32,
    days_until: i64,
) -> std::result::Result<(), String> {
    let message = ReminderMessage {
        service_name: subscription.service_name.clone(),
        amount: subscription.amount,
        currency: subscription.currency.clone(),
        next_billing_date: subscription.next_billing_date,
        days_until_billing: days_until,
    };

    let send_result = state.slack.send_reminder(webhook_url, &message).await;

    let record = match &send_result {
        Ok(()) => NotificationRecordCreateDBRequest {
            user_id: subscription.user_id,
            subscription_id: subscription.id,
            notification_date: today,
            days_before_billing: offset,
            status: NotificationStatus::Sent,
            slack_webhook_url: Some(webhook_url.to_string()),
            error_message: None,
            retry_count: 0,
        },
        Err(e) => NotificationRecordCreateDBRequest {
            user_id: subscription.user_id,
            subscription_id: subscription.id,
            notification_date: today,
            days_before_billing: offset,
            status: NotificationStatus::Failed,
            slack_webhook_url: Some(webhook_url.to_string()),
            error_message: Some(e.to_string()),
            retry_count: state.config.slack.max_attempts as i32,
        },
    };

    // A unique violation here means a concurrent check already recorded this
    // reminder; the send itself still happened, so report its outcome.
    if let Err(e) = NotificationHistory::new(conn).record(&record).await {
        warn!(error = %e, "Failed to record notification attempt");
    }

    send_result.map_err(|e| e.to_string())
}

/// Run reminder checks for every user with notifications enabled and a webhook
/// configured. Used by the cron trigger endpoint.
#[instrument(skip(state), err)]
pub async fn check_all_users(state: &AppState, today: NaiveDate) -> Result<CronSummary> {
    let users = {
        let mut conn = state.db.acquire().await.map_err(crate::db::errors::DbError::from)?;
        UserSettingsRepo::new(&mut conn).list_notifiable().await?
    };

    let mut summary = CronSummary {
        total_users: users.len() as u32,
        successful_users: 0,
        failed_users: 0,
        total_notifications_sent: 0,
        total_notifications_skipped: 0,
        errors: Vec::new(),
        timestamp: Utc::now(),
    };

    for settings in users {
        match check_user(state, settings.user_id, today, None).await {
            // A completed check counts as successful even when some deliveries
            // failed; those failures are still surfaced in `errors`.
            Ok(outcome) => {
                summary.successful_users += 1;
                summary.total_notifications_sent += outcome.sent;
                summary.total_notifications_skipped += outcome.skipped;
                summary.errors.extend(
                    outcome
                        .errors
                        .into_iter()
                        .map(|e| format!("user {}: {e}", abbrev_uuid(&settings.user_id))),
                );
            }
            Err(e) => {
                summary.failed_users += 1;
                summary
                    .errors
                    .push(format!("user {}: {e}", abbrev_uuid(&settings.user_id)));
            }
        }
    }

    info!(
        total_users = summary.total_users,
        sent = summary.total_notifications_sent,
        skipped = summary.total_notifications_skipped,
        failed_users = summary.failed_users,
        "Cron sweep finished"
    );
    Ok(summary)
}
