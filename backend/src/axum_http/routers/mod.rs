pub mod admin;
pub mod payments;
pub mod subscriptions;
