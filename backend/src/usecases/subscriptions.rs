use std::sync::Arc;

use chrono::Utc;
use crates::domain::{
    repositories::{
        payment_orders::PaymentOrderRepository,
        subscription_packages::SubscriptionPackageRepository,
        user_subscriptions::SubscriptionLedgerRepository,
    },
    value_objects::{
        pagination::{Page, PageRequest},
        payments::PaymentHistoryItem,
        subscriptions::{PackageDto, SubscriptionStatusDto},
    },
};
use tracing::{error, info};
use uuid::Uuid;

use super::payment_errors::{PaymentError, UseCaseResult};

/// Read side for customers: packages on sale, their subscription state and history.
pub struct SubscriptionUseCase<Pkg, Ledger, Ord>
where
    Pkg: SubscriptionPackageRepository + Send + Sync + 'static,
    Ledger: SubscriptionLedgerRepository + Send + Sync + 'static,
    Ord: PaymentOrderRepository + Send + Sync + 'static,
{
    package_repo: Arc<Pkg>,
    ledger_repo: Arc<Ledger>,
    order_repo: Arc<Ord>,
}

impl<Pkg, Ledger, Ord> SubscriptionUseCase<Pkg, Ledger, Ord>
where
    Pkg: SubscriptionPackageRepository + Send + Sync + 'static,
    Ledger: SubscriptionLedgerRepository + Send + Sync + 'static,
    Ord: PaymentOrderRepository + Send + Sync + 'static,
{
    pub fn new(package_repo: Arc<Pkg>, ledger_repo: Arc<Ledger>, order_repo: Arc<Ord>) -> Self {
        Self {
            package_repo,
            ledger_repo,
            order_repo,
        }
    }

    pub async fn list_packages(&self) -> UseCaseResult<Vec<PackageDto>> {
        let packages = self.package_repo.list_active().await.map_err(|err| {
            error!(db_error = ?err, "subscriptions: failed to list active packages");
            PaymentError::Internal(err)
        })?;
        info!(package_count = packages.len(), "subscriptions: active packages loaded");
        Ok(packages.into_iter().map(PackageDto::from).collect())
    }

    pub async fn get_status(&self, user_id: Uuid) -> UseCaseResult<SubscriptionStatusDto> {
        let entry = self
            .ledger_repo
            .find_by_user_id(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "subscriptions: failed to load ledger entry");
                PaymentError::Internal(err)
            })?;

        Ok(SubscriptionStatusDto::from_expiry(
            entry.and_then(|entry| entry.expired_at),
            Utc::now(),
        ))
    }

    pub async fn payment_history(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> UseCaseResult<Page<PaymentHistoryItem>> {
        self.order_repo
            .list_success_history(user_id, page)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "subscriptions: failed to load payment history");
                PaymentError::Internal(err)
            })
    }
}
