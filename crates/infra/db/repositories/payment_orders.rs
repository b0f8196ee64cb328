use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate, Utc};
use diesel::{
    Connection, OptionalExtension, QueryableByName, RunQueryDsl, dsl::not, insert_into,
    pg::Pg, prelude::*, sql_types::{BigInt, Date, Text, Timestamptz}, update,
};
use std::sync::Arc;
use tokio::task;
use tracing::info;
use uuid::Uuid;

use crate::{
    domain::{
        entities::{
            payment_orders::{InsertPaymentOrderEntity, PaymentOrderEntity},
            subscription_packages::SubscriptionPackageEntity,
        },
        repositories::payment_orders::PaymentOrderRepository,
        value_objects::{
            enums::{extension_units::ExtensionUnit, payment_statuses::PaymentStatus},
            pagination::{Page, PageRequest},
            payments::{
                AppliedExtension, CallbackOutcome, GatewayCallback, PackageRevenue,
                PaymentFilter, PaymentHistoryItem, PaymentUpdate, RevenueBucket,
                SettlementDecision,
            },
            subscriptions::SubscriptionExtension,
        },
    },
    infra::db::{
        postgres::{
            postgres_connection::{PgPoolSquad, is_unique_violation, lock_aware, set_lock_timeout},
            schema::{payment_orders, subscription_packages, user_subscriptions},
        },
        repositories::user_subscriptions::extend_locked,
    },
};

const UNKNOWN_PACKAGE_NAME: &str = "Unknown Package";

pub struct PaymentOrderPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PaymentOrderPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[derive(QueryableByName)]
struct PackageRevenueRow {
    #[diesel(sql_type = Text)]
    package_name: String,
    #[diesel(sql_type = BigInt)]
    amount: i64,
}

const BUCKETED_REVENUE_SQL: &str = "\
    SELECT CAST(date_trunc($1, o.created_at AT TIME ZONE 'UTC') AS DATE) AS bucket_start, \
           CAST(SUM(o.amount) AS BIGINT) AS amount \
    FROM payment_orders o \
    WHERE o.status = $2 AND o.created_at >= $3 AND o.created_at < $4 \
    GROUP BY 1 \
    ORDER BY 1";

const TOTAL_REVENUE_SQL: &str = "\
    SELECT CAST(COALESCE(SUM(amount), 0) AS BIGINT) AS total \
    FROM payment_orders \
    WHERE status = $1";

#[derive(QueryableByName)]
struct RevenueBucketRow {
    #[diesel(sql_type = Date)]
    bucket_start: NaiveDate,
    #[diesel(sql_type = BigInt)]
    amount: i64,
}

#[derive(QueryableByName)]
struct RevenueTotalRow {
    #[diesel(sql_type = BigInt)]
    total: i64,
}

/// `date_trunc` field for a bucket unit.
fn bucket_field(unit: ExtensionUnit) -> &'static str {
    match unit {
        ExtensionUnit::Day => "day",
        ExtensionUnit::Month => "month",
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

/// Builds the admin listing filter. Called once for the page and once for the count.
fn filtered_payments(
    filter: &PaymentFilter,
    now: DateTime<Utc>,
) -> payment_orders::BoxedQuery<'static, Pg> {
    let mut query = payment_orders::table.into_boxed::<Pg>();

    if let Some(status) = filter.status {
        query = query.filter(payment_orders::status.eq(status.as_str()));
    }
    if let Some(user_id) = filter.user_id {
        query = query.filter(payment_orders::user_id.eq(user_id));
    }
    if let Some(start_date) = filter.start_date {
        query = query.filter(payment_orders::created_at.ge(start_of_day(start_date)));
    }
    if let Some(end_date) = filter.end_date {
        // inclusive: everything before the next midnight
        if let Some(next_day) = end_date.checked_add_days(Days::new(1)) {
            query = query.filter(payment_orders::created_at.lt(start_of_day(next_day)));
        }
    }
    if let Some(is_subscribed) = filter.is_subscribed {
        let subscribed_users = user_subscriptions::table
            .filter(user_subscriptions::expired_at.gt(now))
            .select(user_subscriptions::user_id);

        query = if is_subscribed {
            query.filter(payment_orders::user_id.eq_any(subscribed_users))
        } else {
            query.filter(not(payment_orders::user_id.eq_any(subscribed_users)))
        };
    }

    query
}

fn lock_order_by_code(
    conn: &mut PgConnection,
    order_code: i64,
) -> Result<Option<PaymentOrderEntity>> {
    payment_orders::table
        .filter(payment_orders::order_code.eq(order_code))
        .select(PaymentOrderEntity::as_select())
        .for_update()
        .first::<PaymentOrderEntity>(conn)
        .optional()
        .map_err(lock_aware)
}

#[async_trait]
impl PaymentOrderRepository for PaymentOrderPostgres {
    async fn create_pending(
        &self,
        order: InsertPaymentOrderEntity,
    ) -> Result<Option<PaymentOrderEntity>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Option<PaymentOrderEntity>> {
            let mut conn = db_pool.get()?;

            let inserted = insert_into(payment_orders::table)
                .values(&order)
                .returning(PaymentOrderEntity::as_returning())
                .get_result::<PaymentOrderEntity>(&mut conn);

            match inserted {
                Ok(order) => Ok(Some(order)),
                Err(error) if is_unique_violation(&error) => Ok(None),
                Err(error) => Err(error.into()),
            }
        })
        .await??)
    }

    async fn attach_gateway_link(&self, order_id: Uuid, payment_link_id: String) -> Result<()> {
        let db_pool = Arc::clone(&self.db_pool);
        let now = Utc::now();

        Ok(task::spawn_blocking(move || -> Result<()> {
            let mut conn = db_pool.get()?;

            update(payment_orders::table.find(order_id))
                .set((
                    payment_orders::gateway_link_id.eq(Some(payment_link_id)),
                    payment_orders::updated_at.eq(now),
                ))
                .execute(&mut conn)?;

            Ok(())
        })
        .await??)
    }

    async fn apply_callback(
        &self,
        callback: GatewayCallback,
        now: DateTime<Utc>,
    ) -> Result<CallbackOutcome> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<CallbackOutcome> {
            let mut conn = db_pool.get()?;

            conn.transaction::<_, anyhow::Error, _>(|conn| {
                set_lock_timeout(conn)?;

                let Some(order) = lock_order_by_code(conn, callback.order_code)? else {
                    return Ok(CallbackOutcome::OrderNotFound {
                        order_code: callback.order_code,
                    });
                };

                let status = match SettlementDecision::decide(
                    order.payment_status()?,
                    &callback.result_code,
                ) {
                    SettlementDecision::Skip(current) => {
                        return Ok(CallbackOutcome::AlreadyProcessed {
                            order_code: order.order_code,
                            status: current,
                        });
                    }
                    SettlementDecision::Transition(next) => next,
                };

                let settled = update(payment_orders::table.find(order.id))
                    .set((
                        payment_orders::status.eq(status.as_str()),
                        payment_orders::gateway_transaction_id.eq(callback.reference.clone()),
                        payment_orders::raw_callback_payload.eq(Some(callback.raw_payload.clone())),
                        payment_orders::updated_at.eq(now),
                    ))
                    .returning(PaymentOrderEntity::as_returning())
                    .get_result::<PaymentOrderEntity>(conn)?;

                if status != PaymentStatus::Success {
                    return Ok(CallbackOutcome::Settled {
                        order: settled,
                        status,
                        extension: None,
                    });
                }

                // deactivated packages still resolve for orders bought before deactivation
                let package = subscription_packages::table
                    .find(settled.package_id)
                    .select(SubscriptionPackageEntity::as_select())
                    .first::<SubscriptionPackageEntity>(conn)
                    .optional()?
                    .ok_or_else(|| {
                        anyhow!(
                            "package {} of order {} no longer exists",
                            settled.package_id,
                            settled.order_code
                        )
                    })?;

                let extension = SubscriptionExtension::from_package_days(package.duration_days)?;
                let new_expiry = extend_locked(conn, settled.user_id, extension, now)?;

                info!(
                    order_code = settled.order_code,
                    user_id = %settled.user_id,
                    %new_expiry,
                    "payment settled and subscription extended"
                );

                Ok(CallbackOutcome::Settled {
                    extension: Some(AppliedExtension {
                        user_id: settled.user_id,
                        package_id: package.id,
                        package_name: package.display_name,
                        duration_days: package.duration_days,
                        amount: settled.amount,
                        new_expiry,
                    }),
                    order: settled,
                    status,
                })
            })
        })
        .await??)
    }

    async fn find_by_id(&self, order_id: Uuid) -> Result<Option<PaymentOrderEntity>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Option<PaymentOrderEntity>> {
            let mut conn = db_pool.get()?;

            let order = payment_orders::table
                .find(order_id)
                .select(PaymentOrderEntity::as_select())
                .first::<PaymentOrderEntity>(&mut conn)
                .optional()?;

            Ok(order)
        })
        .await??)
    }

    async fn admin_update(
        &self,
        order_id: Uuid,
        changes: PaymentUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<PaymentOrderEntity>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Option<PaymentOrderEntity>> {
            let mut conn = db_pool.get()?;

            conn.transaction::<_, anyhow::Error, _>(|conn| {
                set_lock_timeout(conn)?;

                let current = payment_orders::table
                    .find(order_id)
                    .select(PaymentOrderEntity::as_select())
                    .for_update()
                    .first::<PaymentOrderEntity>(conn)
                    .optional()
                    .map_err(lock_aware)?;

                let Some(current) = current else {
                    return Ok(None);
                };

                let status = changes
                    .status
                    .map(|status| status.as_str().to_string())
                    .unwrap_or(current.status);
                let amount = changes.amount.unwrap_or(current.amount);

                let updated = update(payment_orders::table.find(order_id))
                    .set((
                        payment_orders::status.eq(status),
                        payment_orders::amount.eq(amount),
                        payment_orders::updated_at.eq(now),
                    ))
                    .returning(PaymentOrderEntity::as_returning())
                    .get_result::<PaymentOrderEntity>(conn)?;

                Ok(Some(updated))
            })
        })
        .await??)
    }

    async fn list_success_history(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<PaymentHistoryItem>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Page<PaymentHistoryItem>> {
            let mut conn = db_pool.get()?;
            let success = PaymentStatus::Success.as_str();

            let total_items = payment_orders::table
                .filter(payment_orders::user_id.eq(user_id))
                .filter(payment_orders::status.eq(success))
                .count()
                .get_result::<i64>(&mut conn)?;

            let rows = payment_orders::table
                .left_join(subscription_packages::table)
                .filter(payment_orders::user_id.eq(user_id))
                .filter(payment_orders::status.eq(success))
                .order(payment_orders::created_at.desc())
                .limit(page.size)
                .offset(page.offset())
                .select((
                    payment_orders::id,
                    subscription_packages::display_name.nullable(),
                    payment_orders::amount,
                    payment_orders::created_at,
                ))
                .load::<(Uuid, Option<String>, i64, DateTime<Utc>)>(&mut conn)?;

            let items = rows
                .into_iter()
                .map(|(payment_id, package_name, amount, created_at)| PaymentHistoryItem {
                    payment_id,
                    package_name: package_name
                        .unwrap_or_else(|| UNKNOWN_PACKAGE_NAME.to_string()),
                    amount,
                    status: PaymentStatus::Success,
                    created_at,
                })
                .collect();

            Ok(Page::new(items, page, total_items))
        })
        .await??)
    }

    async fn list_payments(
        &self,
        filter: PaymentFilter,
        page: PageRequest,
        now: DateTime<Utc>,
    ) -> Result<Page<PaymentOrderEntity>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Page<PaymentOrderEntity>> {
            let mut conn = db_pool.get()?;

            let total_items = filtered_payments(&filter, now)
                .count()
                .get_result::<i64>(&mut conn)?;

            let items = filtered_payments(&filter, now)
                .select(PaymentOrderEntity::as_select())
                .order(payment_orders::created_at.desc())
                .limit(page.size)
                .offset(page.offset())
                .load::<PaymentOrderEntity>(&mut conn)?;

            Ok(Page::new(items, page, total_items))
        })
        .await??)
    }

    async fn revenue_by_package(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PackageRevenue>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Vec<PackageRevenue>> {
            let mut conn = db_pool.get()?;

            let rows = diesel::sql_query(
                "SELECT COALESCE(p.display_name, $3) AS package_name, \
                        CAST(SUM(o.amount) AS BIGINT) AS amount \
                 FROM payment_orders o \
                 LEFT JOIN subscription_packages p ON p.id = o.package_id \
                 WHERE o.status = $4 AND o.created_at >= $1 AND o.created_at < $2 \
                 GROUP BY 1 \
                 ORDER BY amount DESC, package_name ASC",
            )
            .bind::<Timestamptz, _>(start)
            .bind::<Timestamptz, _>(end)
            .bind::<Text, _>(UNKNOWN_PACKAGE_NAME)
            .bind::<Text, _>(PaymentStatus::Success.as_str())
            .load::<PackageRevenueRow>(&mut conn)?;

            Ok(rows
                .into_iter()
                .map(|row| PackageRevenue {
                    package_name: row.package_name,
                    amount: row.amount,
                })
                .collect())
        })
        .await??)
    }

    async fn revenue_by_bucket(
        &self,
        unit: ExtensionUnit,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RevenueBucket>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Vec<RevenueBucket>> {
            let mut conn = db_pool.get()?;

            let rows = diesel::sql_query(BUCKETED_REVENUE_SQL)
                .bind::<Text, _>(bucket_field(unit))
                .bind::<Text, _>(PaymentStatus::Success.as_str())
                .bind::<Timestamptz, _>(start)
                .bind::<Timestamptz, _>(end)
                .load::<RevenueBucketRow>(&mut conn)?;

            Ok(rows
                .into_iter()
                .map(|row| RevenueBucket {
                    bucket_start: row.bucket_start,
                    amount: row.amount,
                })
                .collect())
        })
        .await??)
    }

    async fn total_revenue(&self) -> Result<i64> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<i64> {
            let mut conn = db_pool.get()?;

            let row = diesel::sql_query(TOTAL_REVENUE_SQL)
                .bind::<Text, _>(PaymentStatus::Success.as_str())
                .get_result::<RevenueTotalRow>(&mut conn)?;

            Ok(row.total)
        })
        .await??)
    }
}
