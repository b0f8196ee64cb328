use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    domain::value_objects::enums::payment_statuses::PaymentStatus,
    infra::db::postgres::schema::payment_orders,
};

/// Fixed tag stored on every order created through the PayOS integration.
pub const PAYOS_GATEWAY_NAME: &str = "PAYOS";

#[derive(Debug, Clone, PartialEq, Serialize, Identifiable, Selectable, Queryable)]
#[diesel(table_name = payment_orders)]
pub struct PaymentOrderEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub package_id: Uuid,
    pub order_code: i64,
    pub amount: i64,
    pub status: String,
    pub gateway_name: String,
    pub gateway_link_id: Option<String>,
    pub gateway_transaction_id: Option<String>,
    pub raw_callback_payload: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentOrderEntity {
    pub fn payment_status(&self) -> Result<PaymentStatus> {
        PaymentStatus::from_str(&self.status).ok_or_else(|| {
            anyhow!(
                "payment order {} carries unknown status {:?}",
                self.id,
                self.status
            )
        })
    }
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = payment_orders)]
pub struct InsertPaymentOrderEntity {
    pub user_id: Uuid,
    pub package_id: Uuid,
    pub order_code: i64,
    pub amount: i64,
    pub status: String,
    pub gateway_name: String,
}
