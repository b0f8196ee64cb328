use anyhow::Result;
use async_trait::async_trait;
use diesel::{OptionalExtension, RunQueryDsl, prelude::*, update};
use std::sync::Arc;
use tokio::task;
use uuid::Uuid;

use crate::{
    domain::{
        entities::subscription_packages::SubscriptionPackageEntity,
        repositories::subscription_packages::SubscriptionPackageRepository,
    },
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::subscription_packages},
};

pub struct SubscriptionPackagePostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl SubscriptionPackagePostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl SubscriptionPackageRepository for SubscriptionPackagePostgres {
    async fn find_active_by_code(&self, code: &str) -> Result<Option<SubscriptionPackageEntity>> {
        let db_pool = Arc::clone(&self.db_pool);
        let code = code.to_string();

        Ok(task::spawn_blocking(move || -> Result<Option<SubscriptionPackageEntity>> {
            let mut conn = db_pool.get()?;

            let package = subscription_packages::table
                .filter(subscription_packages::code.eq(code))
                .filter(subscription_packages::is_active.eq(true))
                .select(SubscriptionPackageEntity::as_select())
                .first::<SubscriptionPackageEntity>(&mut conn)
                .optional()?;

            Ok(package)
        })
        .await??)
    }

    async fn find_by_id(&self, package_id: Uuid) -> Result<Option<SubscriptionPackageEntity>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Option<SubscriptionPackageEntity>> {
            let mut conn = db_pool.get()?;

            let package = subscription_packages::table
                .find(package_id)
                .select(SubscriptionPackageEntity::as_select())
                .first::<SubscriptionPackageEntity>(&mut conn)
                .optional()?;

            Ok(package)
        })
        .await??)
    }

    async fn list_active(&self) -> Result<Vec<SubscriptionPackageEntity>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Vec<SubscriptionPackageEntity>> {
            let mut conn = db_pool.get()?;

            let packages = subscription_packages::table
                .filter(subscription_packages::is_active.eq(true))
                .order(subscription_packages::price.asc())
                .select(SubscriptionPackageEntity::as_select())
                .load::<SubscriptionPackageEntity>(&mut conn)?;

            Ok(packages)
        })
        .await??)
    }

    async fn deactivate(&self, code: &str) -> Result<bool> {
        let db_pool = Arc::clone(&self.db_pool);
        let code = code.to_string();

        Ok(task::spawn_blocking(move || -> Result<bool> {
            let mut conn = db_pool.get()?;

            let affected = update(
                subscription_packages::table.filter(subscription_packages::code.eq(code)),
            )
            .set(subscription_packages::is_active.eq(false))
            .execute(&mut conn)?;

            Ok(affected > 0)
        })
        .await??)
    }
}
