use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveTime, Utc};
use crates::domain::{
    entities::payment_orders::PaymentOrderEntity,
    interfaces::{
        notifier::{ExtensionNotice, SubscriptionNotifier},
        payment_gateway::PaymentGateway,
    },
    repositories::{
        payment_orders::PaymentOrderRepository,
        subscription_packages::SubscriptionPackageRepository,
        user_subscriptions::SubscriptionLedgerRepository,
    },
    value_objects::{
        enums::extension_units::ExtensionUnit,
        pagination::{Page, PageRequest},
        payments::{
            PaymentFilter, PaymentUpdate, RevenueQuery, RevenueReport, RevenueSeries,
            RevenueTotal,
        },
        subscriptions::{
            ExtendSubscriptionRequest, ExtendSubscriptionResponse, SubscriptionExtension,
        },
    },
};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::payment_errors::{PaymentError, UseCaseResult};

/// Days covered by the revenue report when no range is given, today included.
const DEFAULT_REVENUE_WINDOW_DAYS: u64 = 7;
/// Upper bound on chart points per request (ten years of days).
const MAX_SERIES_BUCKETS: usize = 3660;

pub struct AdminUseCase<Pkg, Ord, Ledger, Gw, N>
where
    Pkg: SubscriptionPackageRepository + Send + Sync + 'static,
    Ord: PaymentOrderRepository + Send + Sync + 'static,
    Ledger: SubscriptionLedgerRepository + Send + Sync + 'static,
    Gw: PaymentGateway + Send + Sync + 'static,
    N: SubscriptionNotifier + Send + Sync + 'static,
{
    package_repo: Arc<Pkg>,
    order_repo: Arc<Ord>,
    ledger_repo: Arc<Ledger>,
    gateway: Arc<Gw>,
    notifier: Arc<N>,
    webhook_url: Option<String>,
}

impl<Pkg, Ord, Ledger, Gw, N> AdminUseCase<Pkg, Ord, Ledger, Gw, N>
where
    Pkg: SubscriptionPackageRepository + Send + Sync + 'static,
    Ord: PaymentOrderRepository + Send + Sync + 'static,
    Ledger: SubscriptionLedgerRepository + Send + Sync + 'static,
    Gw: PaymentGateway + Send + Sync + 'static,
    N: SubscriptionNotifier + Send + Sync + 'static,
{
    pub fn new(
        package_repo: Arc<Pkg>,
        order_repo: Arc<Ord>,
        ledger_repo: Arc<Ledger>,
        gateway: Arc<Gw>,
        notifier: Arc<N>,
        webhook_url: Option<String>,
    ) -> Self {
        Self {
            package_repo,
            order_repo,
            ledger_repo,
            gateway,
            notifier,
            webhook_url,
        }
    }

    /// Manual correction of an order. Writes exactly what was asked, under the order
    /// lock, and never touches the subscription ledger.
    pub async fn update_payment(
        &self,
        order_id: Uuid,
        changes: PaymentUpdate,
    ) -> UseCaseResult<PaymentOrderEntity> {
        if let Some(amount) = changes.amount {
            if amount <= 0 {
                return Err(PaymentError::InvalidRequest(format!(
                    "amount must be positive, got {amount}"
                )));
            }
        }

        let updated = self
            .order_repo
            .admin_update(order_id, changes.clone(), Utc::now())
            .await
            .map_err(|err| {
                error!(%order_id, db_error = ?err, "admin: failed to update payment");
                PaymentError::from_store(err)
            })?
            .ok_or(PaymentError::OrderNotFound)?;

        info!(
            %order_id,
            status = %updated.status,
            amount = updated.amount,
            status_changed = changes.status.is_some(),
            amount_changed = changes.amount.is_some(),
            "admin: payment updated"
        );

        Ok(updated)
    }

    pub async fn extend_subscription(
        &self,
        request: ExtendSubscriptionRequest,
    ) -> UseCaseResult<ExtendSubscriptionResponse> {
        let extension = SubscriptionExtension::from_unit(request.unit, request.amount)
            .map_err(|err| PaymentError::InvalidRequest(err.to_string()))?;
        let user_id = request.user_id;

        let expired_at = self
            .ledger_repo
            .extend(user_id, extension, Utc::now())
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "admin: failed to extend subscription");
                PaymentError::from_store(err)
            })?;

        info!(
            %user_id,
            unit = %request.unit,
            amount = request.amount,
            %expired_at,
            "admin: subscription extended"
        );

        if let Err(err) = self.notifier.send_extension(ExtensionNotice {
            user_id,
            expired_at,
        }) {
            warn!(%user_id, error = ?err, "admin: extension notification failed");
        }

        Ok(ExtendSubscriptionResponse {
            user_id,
            expired_at,
        })
    }

    pub async fn list_payments(
        &self,
        filter: PaymentFilter,
        page: PageRequest,
    ) -> UseCaseResult<Page<PaymentOrderEntity>> {
        if let (Some(start), Some(end)) = (filter.start_date, filter.end_date) {
            if start > end {
                return Err(PaymentError::InvalidRequest(
                    "start_date must not be after end_date".to_string(),
                ));
            }
        }

        self.order_repo
            .list_payments(filter, page, Utc::now())
            .await
            .map_err(|err| {
                error!(db_error = ?err, "admin: failed to list payments");
                PaymentError::Internal(err)
            })
    }

    pub async fn revenue_report(&self, query: RevenueQuery) -> UseCaseResult<RevenueReport> {
        let (start_date, end_date) = revenue_window(query, Utc::now().date_naive())?;

        let start = start_date.and_time(NaiveTime::MIN).and_utc();
        let end = end_date
            .checked_add_days(Days::new(1))
            .ok_or_else(|| PaymentError::InvalidRequest("end_date is out of range".to_string()))?
            .and_time(NaiveTime::MIN)
            .and_utc();

        let by_package = self
            .order_repo
            .revenue_by_package(start, end)
            .await
            .map_err(|err| {
                error!(db_error = ?err, "admin: failed to compute revenue");
                PaymentError::Internal(err)
            })?;

        let total = by_package.iter().map(|entry| entry.amount).sum();

        Ok(RevenueReport {
            start_date,
            end_date,
            total,
            by_package,
        })
    }

    /// Revenue per day or calendar month over the requested range, with empty
    /// buckets reported as zero.
    pub async fn revenue_series(
        &self,
        unit: ExtensionUnit,
        query: RevenueQuery,
    ) -> UseCaseResult<RevenueSeries> {
        let (start_date, end_date) = revenue_window(query, Utc::now().date_naive())?;
        let buckets = series_buckets(unit, start_date, end_date)?;

        let (Some(&first), Some(&last)) = (buckets.first(), buckets.last()) else {
            return Err(PaymentError::InvalidRequest("empty date range".to_string()));
        };
        let start = midnight(first);
        let end = midnight(next_bucket(unit, last)?);

        let amounts: HashMap<NaiveDate, i64> = self
            .order_repo
            .revenue_by_bucket(unit, start, end)
            .await
            .map_err(|err| {
                error!(%unit, db_error = ?err, "admin: failed to compute revenue series");
                PaymentError::Internal(err)
            })?
            .into_iter()
            .map(|bucket| (bucket.bucket_start, bucket.amount))
            .collect();

        let label_format = match unit {
            ExtensionUnit::Day => "%d/%m",
            ExtensionUnit::Month => "%m/%Y",
        };
        let labels = buckets
            .iter()
            .map(|bucket| bucket.format(label_format).to_string())
            .collect();
        let data: Vec<i64> = buckets
            .iter()
            .map(|bucket| amounts.get(bucket).copied().unwrap_or(0))
            .collect();
        let total = data.iter().sum();

        Ok(RevenueSeries {
            unit,
            start_date,
            end_date,
            labels,
            data,
            total,
        })
    }

    pub async fn total_revenue(&self) -> UseCaseResult<RevenueTotal> {
        let total_revenue = self.order_repo.total_revenue().await.map_err(|err| {
            error!(db_error = ?err, "admin: failed to compute total revenue");
            PaymentError::Internal(err)
        })?;

        Ok(RevenueTotal { total_revenue })
    }

    pub async fn deactivate_package(&self, code: &str) -> UseCaseResult<()> {
        let deactivated = self.package_repo.deactivate(code).await.map_err(|err| {
            error!(package_code = %code, db_error = ?err, "admin: failed to deactivate package");
            PaymentError::Internal(err)
        })?;

        if !deactivated {
            return Err(PaymentError::PackageNotFound(code.to_string()));
        }

        info!(package_code = %code, "admin: package deactivated");
        Ok(())
    }

    /// Points the gateway's callbacks at the configured webhook URL.
    pub async fn register_webhook(&self) -> UseCaseResult<String> {
        let webhook_url = self.webhook_url.clone().ok_or_else(|| {
            PaymentError::InvalidRequest("PAYOS_WEBHOOK_URL is not configured".to_string())
        })?;

        self.gateway
            .register_webhook(&webhook_url)
            .await
            .map_err(|err| {
                error!(gateway_error = ?err, "admin: webhook registration failed");
                PaymentError::GatewayUnavailable(err.to_string())
            })?;

        Ok(webhook_url)
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn next_bucket(unit: ExtensionUnit, bucket: NaiveDate) -> UseCaseResult<NaiveDate> {
    let next = match unit {
        ExtensionUnit::Day => bucket.checked_add_days(Days::new(1)),
        ExtensionUnit::Month => bucket.checked_add_months(Months::new(1)),
    };
    next.ok_or_else(|| PaymentError::InvalidRequest("date range is out of range".to_string()))
}

/// First day of every bucket touched by `[start_date, end_date]`, oldest first.
fn series_buckets(
    unit: ExtensionUnit,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> UseCaseResult<Vec<NaiveDate>> {
    let (mut current, last) = match unit {
        ExtensionUnit::Day => (start_date, end_date),
        ExtensionUnit::Month => (
            start_date.with_day(1).unwrap_or(start_date),
            end_date.with_day(1).unwrap_or(end_date),
        ),
    };

    let mut buckets = Vec::new();
    while current <= last {
        if buckets.len() == MAX_SERIES_BUCKETS {
            return Err(PaymentError::InvalidRequest(format!(
                "date range spans more than {MAX_SERIES_BUCKETS} buckets"
            )));
        }
        buckets.push(current);
        if current == last {
            break;
        }
        current = next_bucket(unit, current)?;
    }

    Ok(buckets)
}

/// Resolves the inclusive date range of a revenue report.
fn revenue_window(query: RevenueQuery, today: NaiveDate) -> UseCaseResult<(NaiveDate, NaiveDate)> {
    let end_date = query.end_date.unwrap_or(today);
    let start_date = match query.start_date {
        Some(start_date) => start_date,
        None => end_date
            .checked_sub_days(Days::new(DEFAULT_REVENUE_WINDOW_DAYS - 1))
            .ok_or_else(|| PaymentError::InvalidRequest("end_date is out of range".to_string()))?,
    };

    if start_date > end_date {
        return Err(PaymentError::InvalidRequest(
            "start_date must not be after end_date".to_string(),
        ));
    }

    Ok((start_date, end_date))
}
