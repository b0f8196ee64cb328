use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::payment_orders::PaymentOrderEntity,
    value_objects::enums::{extension_units::ExtensionUnit, payment_statuses::PaymentStatus},
};

/// Verified, parsed gateway callback.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayCallback {
    pub order_code: i64,
    pub result_code: String,
    pub reference: Option<String>,
    /// Body exactly as it was delivered, kept for audit.
    pub raw_payload: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentLink {
    pub checkout_url: String,
    pub payment_link_id: Option<String>,
}

/// What a callback does to an order, decided under the order's row lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementDecision {
    /// The order already left PENDING; nothing is written.
    Skip(PaymentStatus),
    Transition(PaymentStatus),
}

impl SettlementDecision {
    pub fn decide(current: PaymentStatus, result_code: &str) -> Self {
        if current.is_terminal() {
            return SettlementDecision::Skip(current);
        }
        SettlementDecision::Transition(PaymentStatus::from_gateway_code(result_code))
    }
}

/// Ledger effect of a settled order, reported after commit.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedExtension {
    pub user_id: Uuid,
    pub package_id: Uuid,
    pub package_name: String,
    pub duration_days: i32,
    pub amount: i64,
    pub new_expiry: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CallbackOutcome {
    Settled {
        order: PaymentOrderEntity,
        status: PaymentStatus,
        extension: Option<AppliedExtension>,
    },
    AlreadyProcessed {
        order_code: i64,
        status: PaymentStatus,
    },
    OrderNotFound {
        order_code: i64,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseRequest {
    pub user_id: Uuid,
    pub package_code: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PurchaseResponse {
    pub payment_id: Uuid,
    pub checkout_url: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PaymentHistoryItem {
    pub payment_id: Uuid,
    pub package_name: String,
    pub amount: i64,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct PaymentFilter {
    pub status: Option<PaymentStatus>,
    pub user_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Restricts to users whose ledger entry is (or is not) currently active.
    pub is_subscribed: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct PaymentUpdate {
    pub status: Option<PaymentStatus>,
    pub amount: Option<i64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PaymentOrderDto {
    pub id: Uuid,
    pub user_id: Uuid,
    pub package_id: Uuid,
    pub order_code: i64,
    pub amount: i64,
    pub status: String,
    pub gateway_name: String,
    pub gateway_link_id: Option<String>,
    pub gateway_transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PaymentOrderEntity> for PaymentOrderDto {
    fn from(value: PaymentOrderEntity) -> Self {
        Self {
            id: value.id,
            user_id: value.user_id,
            package_id: value.package_id,
            order_code: value.order_code,
            amount: value.amount,
            status: value.status,
            gateway_name: value.gateway_name,
            gateway_link_id: value.gateway_link_id,
            gateway_transaction_id: value.gateway_transaction_id,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PackageRevenue {
    pub package_name: String,
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RevenueReport {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total: i64,
    pub by_package: Vec<PackageRevenue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RevenueQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// SUCCESS revenue of one day or month, keyed by the bucket's first day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevenueBucket {
    pub bucket_start: NaiveDate,
    pub amount: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RevenueSeriesQuery {
    #[serde(rename = "type")]
    pub unit: Option<ExtensionUnit>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl RevenueSeriesQuery {
    pub fn into_parts(self) -> (ExtensionUnit, RevenueQuery) {
        (
            self.unit.unwrap_or(ExtensionUnit::Day),
            RevenueQuery {
                start_date: self.start_date,
                end_date: self.end_date,
            },
        )
    }
}

/// Chart-ready revenue: `labels[i]` names the bucket whose revenue is `data[i]`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RevenueSeries {
    pub unit: ExtensionUnit,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub labels: Vec<String>,
    pub data: Vec<i64>,
    pub total: i64,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct RevenueTotal {
    pub total_revenue: i64,
}
