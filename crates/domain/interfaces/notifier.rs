use anyhow::Result;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseConfirmation {
    pub user_id: Uuid,
    pub package_name: String,
    pub amount: i64,
    pub expired_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionNotice {
    pub user_id: Uuid,
    pub expired_at: DateTime<Utc>,
}

/// Customer-facing notifications. Implementations hand the message off and return
/// immediately; delivery failures are never allowed to affect committed state.
#[automock]
pub trait SubscriptionNotifier: Send + Sync {
    fn send_confirmation(&self, confirmation: PurchaseConfirmation) -> Result<()>;

    fn send_extension(&self, notice: ExtensionNotice) -> Result<()>;
}
