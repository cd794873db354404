//! Database record structures matching table schemas.

pub mod notification_history;
pub mod payments;
pub mod settings;
pub mod subscriptions;
