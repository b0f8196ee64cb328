use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{
    Connection, OptionalExtension, PgConnection, RunQueryDsl, insert_into, prelude::*, update,
};
use std::sync::Arc;
use tokio::task;
use uuid::Uuid;

use crate::{
    domain::{
        entities::user_subscriptions::UserSubscriptionEntity,
        repositories::user_subscriptions::SubscriptionLedgerRepository,
        value_objects::subscriptions::{SubscriptionExtension, accrue_expiry},
    },
    infra::db::postgres::{
        postgres_connection::{PgPoolSquad, lock_aware, set_lock_timeout},
        schema::user_subscriptions,
    },
};

pub struct SubscriptionLedgerPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl SubscriptionLedgerPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

/// Extends the user's ledger entry inside the caller's transaction.
///
/// The entry is created empty when missing, then locked, so concurrent extensions
/// for the same user serialize on the row and each one sees the previous result.
pub(crate) fn extend_locked(
    conn: &mut PgConnection,
    user_id: Uuid,
    extension: SubscriptionExtension,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>> {
    insert_into(user_subscriptions::table)
        .values((
            user_subscriptions::user_id.eq(user_id),
            user_subscriptions::created_at.eq(now),
            user_subscriptions::updated_at.eq(now),
        ))
        .on_conflict(user_subscriptions::user_id)
        .do_nothing()
        .execute(conn)
        .map_err(lock_aware)?;

    let current_expiry = user_subscriptions::table
        .filter(user_subscriptions::user_id.eq(user_id))
        .select(user_subscriptions::expired_at)
        .for_update()
        .first::<Option<DateTime<Utc>>>(conn)
        .map_err(lock_aware)?;

    let new_expiry = accrue_expiry(current_expiry, extension, now)?;

    update(user_subscriptions::table.filter(user_subscriptions::user_id.eq(user_id)))
        .set((
            user_subscriptions::expired_at.eq(Some(new_expiry)),
            user_subscriptions::updated_at.eq(now),
        ))
        .execute(conn)?;

    Ok(new_expiry)
}

#[async_trait]
impl SubscriptionLedgerRepository for SubscriptionLedgerPostgres {
    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<UserSubscriptionEntity>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Option<UserSubscriptionEntity>> {
            let mut conn = db_pool.get()?;

            let entry = user_subscriptions::table
                .filter(user_subscriptions::user_id.eq(user_id))
                .select(UserSubscriptionEntity::as_select())
                .first::<UserSubscriptionEntity>(&mut conn)
                .optional()?;

            Ok(entry)
        })
        .await??)
    }

    async fn extend(
        &self,
        user_id: Uuid,
        extension: SubscriptionExtension,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<DateTime<Utc>> {
            let mut conn = db_pool.get()?;

            conn.transaction::<_, anyhow::Error, _>(|conn| {
                set_lock_timeout(conn)?;
                extend_locked(conn, user_id, extension, now)
            })
        })
        .await??)
    }
}
