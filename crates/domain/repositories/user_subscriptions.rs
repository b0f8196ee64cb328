use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::user_subscriptions::UserSubscriptionEntity,
    value_objects::subscriptions::SubscriptionExtension,
};

#[automock]
#[async_trait]
pub trait SubscriptionLedgerRepository: Send + Sync {
    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<UserSubscriptionEntity>>;

    /// Locks (creating if needed) the user's entry and applies the accrual rule.
    async fn extend(
        &self,
        user_id: Uuid,
        extension: SubscriptionExtension,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>>;
}
