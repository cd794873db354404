//! OpenAPI documentation for the subscription-tracking API.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::api;
use crate::api::models;
use crate::currency::CurrencyInfo;
use crate::gemini::ParsedSubscription;
use crate::notifications::{CheckOutcome, CronSummary};
use crate::types::{BillingCycle, NotificationStatus, PaymentStatus, SubscriptionStatus};

struct CronSecurityAddon;

impl Modify for CronSecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "cron_secret",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "subtrack",
        description = "Subscription tracking with Slack renewal reminders and payment-text parsing"
    ),
    servers(
        (url = "/api/v1", description = "Main API")
    ),
    modifiers(&CronSecurityAddon),
    paths(
        api::handlers::subscriptions::list_subscriptions,
        api::handlers::subscriptions::create_subscription,
        api::handlers::subscriptions::get_subscription,
        api::handlers::subscriptions::update_subscription,
        api::handlers::subscriptions::delete_subscription,
        api::handlers::subscriptions::export_subscriptions,
        api::handlers::parse::parse_payment_text,
        api::handlers::settings::get_settings,
        api::handlers::settings::put_settings,
        api::handlers::notifications::list_notifications,
        api::handlers::notifications::check_notifications,
        api::handlers::notifications::test_notification,
        api::handlers::notifications::cron_check_notifications,
        api::handlers::payments::list_payments,
        api::handlers::payments::create_payment,
        api::handlers::payments::delete_payment,
        api::handlers::currencies::list_currencies,
    ),
    components(
        schemas(
            models::subscriptions::SubscriptionCreate,
            models::subscriptions::SubscriptionUpdate,
            models::subscriptions::SubscriptionResponse,
            models::subscriptions::SortBy,
            models::subscriptions::SortOrder,
            models::subscriptions::ExportFormat,
            models::settings::UserSettingsUpdate,
            models::settings::UserSettingsResponse,
            models::notifications::NotificationResponse,
            models::notifications::CheckRequest,
            models::notifications::TestNotificationResponse,
            models::payments::PaymentCreate,
            models::payments::PaymentResponse,
            models::parse::ParseRequest,
            ParsedSubscription,
            CheckOutcome,
            CronSummary,
            CurrencyInfo,
            BillingCycle,
            SubscriptionStatus,
            NotificationStatus,
            PaymentStatus,
        )
    ),
    tags(
        (name = "subscriptions", description = "Subscription management"),
        (name = "parse", description = "Payment-text parsing"),
        (name = "settings", description = "Notification settings"),
        (name = "notifications", description = "Renewal reminders"),
        (name = "payments", description = "Payment ledger"),
        (name = "currencies", description = "Currency table"),
    )
)]
pub struct ApiDoc;
