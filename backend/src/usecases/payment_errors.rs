use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("subscription package not found: {0}")]
    PackageNotFound(String),
    #[error("payment gateway unavailable: {0}")]
    GatewayUnavailable(String),
    #[error("webhook verification failed: {0}")]
    WebhookVerificationFailed(String),
    #[error("payment order not found")]
    OrderNotFound,
    #[error("record is being updated concurrently, retry later")]
    ConcurrentUpdateConflict,
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl PaymentError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PaymentError::PackageNotFound(_) | PaymentError::OrderNotFound => StatusCode::NOT_FOUND,
            PaymentError::GatewayUnavailable(_) => StatusCode::BAD_GATEWAY,
            PaymentError::WebhookVerificationFailed(_) | PaymentError::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            PaymentError::ConcurrentUpdateConflict => StatusCode::CONFLICT,
            PaymentError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Lifts a store error, keeping lock contention distinguishable.
    pub fn from_store(error: anyhow::Error) -> Self {
        if error
            .downcast_ref::<crates::domain::repositories::payment_orders::RowLockConflict>()
            .is_some()
        {
            return PaymentError::ConcurrentUpdateConflict;
        }
        PaymentError::Internal(error)
    }
}

pub type UseCaseResult<T> = std::result::Result<T, PaymentError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crates::domain::repositories::payment_orders::RowLockConflict;

    #[test]
    fn lock_conflicts_map_to_conflict() {
        let error = PaymentError::from_store(anyhow::Error::new(RowLockConflict));
        assert!(matches!(error, PaymentError::ConcurrentUpdateConflict));
        assert_eq!(error.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn wrapped_lock_conflicts_are_still_detected() {
        let error = anyhow::Error::new(RowLockConflict).context("applying callback");
        assert!(matches!(
            PaymentError::from_store(error),
            PaymentError::ConcurrentUpdateConflict
        ));
    }

    #[test]
    fn other_store_errors_are_internal() {
        let error = PaymentError::from_store(anyhow::anyhow!("connection reset"));
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn gateway_failures_are_bad_gateway() {
        let error = PaymentError::GatewayUnavailable("timed out".to_string());
        assert_eq!(error.status_code(), StatusCode::BAD_GATEWAY);
    }
}
