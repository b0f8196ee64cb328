pub mod admin;
pub mod payment_errors;
pub mod payment_webhook;
pub mod purchases;
pub mod subscriptions;
