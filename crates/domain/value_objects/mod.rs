pub mod enums;
pub mod order_codes;
pub mod pagination;
pub mod payments;
pub mod subscriptions;
