pub mod extension_units;
pub mod payment_statuses;
