pub mod payment_orders;
pub mod subscription_packages;
pub mod user_subscriptions;
