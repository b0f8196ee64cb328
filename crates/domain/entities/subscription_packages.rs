use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::subscription_packages;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = subscription_packages)]
pub struct SubscriptionPackageEntity {
    pub id: Uuid,
    pub code: String,
    pub display_name: String,
    pub duration_days: i32,
    pub price: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

