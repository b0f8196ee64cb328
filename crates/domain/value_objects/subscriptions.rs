use anyhow::{Context, Result, bail};
use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::subscription_packages::SubscriptionPackageEntity;
use crate::domain::value_objects::enums::extension_units::ExtensionUnit;

const SECONDS_PER_DAY: i64 = 86_400;

/// Paid time added to a user's ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionExtension {
    Days(u32),
    Months(u32),
}

impl SubscriptionExtension {
    pub fn from_unit(unit: ExtensionUnit, amount: i32) -> Result<Self> {
        if amount <= 0 {
            bail!("extension amount must be positive, got {amount}");
        }
        let amount = amount as u32;
        Ok(match unit {
            ExtensionUnit::Day => SubscriptionExtension::Days(amount),
            ExtensionUnit::Month => SubscriptionExtension::Months(amount),
        })
    }

    pub fn from_package_days(duration_days: i32) -> Result<Self> {
        Self::from_unit(ExtensionUnit::Day, duration_days)
    }

    /// Adds the extension to `base`. Months are calendar months, clamped to the
    /// last day of a shorter target month.
    pub fn apply_to(&self, base: DateTime<Utc>) -> Result<DateTime<Utc>> {
        match *self {
            SubscriptionExtension::Days(days) => base
                .checked_add_signed(Duration::days(days.into()))
                .context("subscription expiry overflowed while adding days"),
            SubscriptionExtension::Months(months) => base
                .checked_add_months(Months::new(months))
                .context("subscription expiry overflowed while adding months"),
        }
    }
}

/// Accrual rule: time left on an unexpired entry is kept and the extension stacks
/// on top of it; a missing or elapsed entry restarts from `now`.
pub fn accrue_expiry(
    current_expiry: Option<DateTime<Utc>>,
    extension: SubscriptionExtension,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>> {
    let base = match current_expiry {
        Some(expired_at) if expired_at > now => expired_at,
        _ => now,
    };

    extension.apply_to(base)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubscriptionStatusDto {
    pub is_active: bool,
    pub now: DateTime<Utc>,
    pub expired_at: Option<DateTime<Utc>>,
    pub remaining_days: i64,
}

impl SubscriptionStatusDto {
    pub fn from_expiry(expired_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        let Some(expired_at) = expired_at else {
            return Self {
                is_active: false,
                now,
                expired_at: None,
                remaining_days: 0,
            };
        };

        let seconds = (expired_at - now).num_seconds();
        // ceil(seconds / 86400) for positive values only
        let remaining_days = if seconds > 0 {
            (seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY
        } else {
            0
        };

        Self {
            is_active: expired_at > now,
            now,
            expired_at: Some(expired_at),
            remaining_days,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PackageDto {
    pub id: Uuid,
    pub code: String,
    pub display_name: String,
    pub duration_days: i32,
    pub price: i64,
}

impl From<SubscriptionPackageEntity> for PackageDto {
    fn from(value: SubscriptionPackageEntity) -> Self {
        Self {
            id: value.id,
            code: value.code,
            display_name: value.display_name,
            duration_days: value.duration_days,
            price: value.price,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ExtendSubscriptionRequest {
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub unit: ExtensionUnit,
    pub amount: i32,
}

#[derive(Debug, Serialize)]
pub struct ExtendSubscriptionResponse {
    pub user_id: Uuid,
    pub expired_at: DateTime<Utc>,
}
