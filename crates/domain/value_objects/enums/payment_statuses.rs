use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Result code PayOS sends for a settled payment.
pub const GATEWAY_SUCCESS_CODE: &str = "00";
/// Result code sent when the buyer abandons the checkout.
pub const GATEWAY_CANCELLED_CODE: &str = "CANCELLED";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Success => "SUCCESS",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(PaymentStatus::Pending),
            "SUCCESS" => Some(PaymentStatus::Success),
            "FAILED" => Some(PaymentStatus::Failed),
            "CANCELLED" => Some(PaymentStatus::Cancelled),
            _ => None,
        }
    }

    /// Maps a gateway result code onto the status a pending order settles into.
    pub fn from_gateway_code(code: &str) -> Self {
        match code.trim() {
            GATEWAY_SUCCESS_CODE => PaymentStatus::Success,
            GATEWAY_CANCELLED_CODE => PaymentStatus::Cancelled,
            _ => PaymentStatus::Failed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
