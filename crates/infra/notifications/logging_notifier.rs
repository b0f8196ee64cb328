use anyhow::Result;
use tracing::info;

use crate::domain::interfaces::notifier::{
    ExtensionNotice, PurchaseConfirmation, SubscriptionNotifier,
};

/// Writes customer notifications to the log stream. Stands in until a mail or push
/// channel is wired up.
#[derive(Debug, Default, Clone)]
pub struct LoggingNotifier;

impl LoggingNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl SubscriptionNotifier for LoggingNotifier {
    fn send_confirmation(&self, confirmation: PurchaseConfirmation) -> Result<()> {
        info!(
            user_id = %confirmation.user_id,
            package = %confirmation.package_name,
            amount = confirmation.amount,
            expired_at = %confirmation.expired_at,
            "Purchase confirmation sent"
        );
        Ok(())
    }

    fn send_extension(&self, notice: ExtensionNotice) -> Result<()> {
        info!(
            user_id = %notice.user_id,
            expired_at = %notice.expired_at,
            "Subscription extension notice sent"
        );
        Ok(())
    }
}
