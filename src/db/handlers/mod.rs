pub mod notification_history;
pub mod payments;
pub mod repository;
pub mod settings;
pub mod subscriptions;
