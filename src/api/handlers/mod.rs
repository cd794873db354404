//! HTTP request handlers for all API endpoints.
//!
//! Handlers validate request data, run business logic through the database
//! repositories and outbound clients, and serialize responses. Errors are
//! returned as [`crate::errors::Error`], which converts to the right HTTP
//! status and JSON body.
//!
//! - [`subscriptions`]: Subscription CRUD and CSV/JSON export
//! - [`settings`]: Per-user notification settings
//! - [`notifications`]: History, on-demand checks, webhook test, cron sweep
//! - [`payments`]: Informational payment ledger
//! - [`parse`]: Payment-text extraction via the generative API
//! - [`currencies`]: Fixed KRW conversion table

pub mod currencies;
pub mod notifications;
pub mod parse;
pub mod payments;
pub mod settings;
pub mod subscriptions;
