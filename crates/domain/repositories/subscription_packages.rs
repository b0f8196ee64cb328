use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::subscription_packages::SubscriptionPackageEntity;

#[automock]
#[async_trait]
pub trait SubscriptionPackageRepository: Send + Sync {
    async fn find_active_by_code(&self, code: &str) -> Result<Option<SubscriptionPackageEntity>>;

    /// Looks a package up regardless of `is_active`; settled orders must still resolve
    /// the package they were bought for.
    async fn find_by_id(&self, package_id: Uuid) -> Result<Option<SubscriptionPackageEntity>>;

    async fn list_active(&self) -> Result<Vec<SubscriptionPackageEntity>>;

    /// Returns `false` when no package carries `code`.
    async fn deactivate(&self, code: &str) -> Result<bool>;
}
