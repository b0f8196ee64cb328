use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{
    entities::payment_orders::{InsertPaymentOrderEntity, PaymentOrderEntity},
    value_objects::{
        enums::extension_units::ExtensionUnit,
        pagination::{Page, PageRequest},
        payments::{
            CallbackOutcome, GatewayCallback, PackageRevenue, PaymentFilter, PaymentHistoryItem,
            PaymentUpdate, RevenueBucket,
        },
    },
};

/// Raised by stores when a row lock could not be taken in time.
#[derive(Debug, Error)]
#[error("row is locked by another writer")]
pub struct RowLockConflict;

#[automock]
#[async_trait]
pub trait PaymentOrderRepository: Send + Sync {
    /// Inserts a PENDING order. `Ok(None)` means the order code is already taken.
    async fn create_pending(
        &self,
        order: InsertPaymentOrderEntity,
    ) -> Result<Option<PaymentOrderEntity>>;

    async fn attach_gateway_link(&self, order_id: Uuid, payment_link_id: String) -> Result<()>;

    /// Applies a verified callback atomically: locks the order by code, skips it when
    /// already settled, writes the new status, and on success extends the owner's
    /// ledger entry inside the same transaction.
    async fn apply_callback(
        &self,
        callback: GatewayCallback,
        now: DateTime<Utc>,
    ) -> Result<CallbackOutcome>;

    async fn find_by_id(&self, order_id: Uuid) -> Result<Option<PaymentOrderEntity>>;

    /// Partial update under the order's row lock. `Ok(None)` when the order is unknown.
    async fn admin_update(
        &self,
        order_id: Uuid,
        update: PaymentUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<PaymentOrderEntity>>;

    async fn list_success_history(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<PaymentHistoryItem>>;

    async fn list_payments(
        &self,
        filter: PaymentFilter,
        page: PageRequest,
        now: DateTime<Utc>,
    ) -> Result<Page<PaymentOrderEntity>>;

    /// Successful revenue per package for `[start, end)`.
    async fn revenue_by_package(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PackageRevenue>>;

    /// Successful revenue for `[start, end)` grouped by UTC day or month. Buckets
    /// without revenue are absent; the result is ordered oldest first.
    async fn revenue_by_bucket(
        &self,
        unit: ExtensionUnit,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RevenueBucket>>;

    async fn total_revenue(&self) -> Result<i64>;
}
