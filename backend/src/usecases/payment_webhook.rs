use std::sync::Arc;

use chrono::Utc;
use crates::domain::{
    interfaces::{
        notifier::{PurchaseConfirmation, SubscriptionNotifier},
        payment_gateway::PaymentGateway,
    },
    repositories::payment_orders::PaymentOrderRepository,
    value_objects::payments::CallbackOutcome,
};
use tracing::{error, info, warn};

use super::payment_errors::{PaymentError, UseCaseResult};

pub struct PaymentWebhookUseCase<Ord, Gw, N>
where
    Ord: PaymentOrderRepository + Send + Sync + 'static,
    Gw: PaymentGateway + Send + Sync + 'static,
    N: SubscriptionNotifier + Send + Sync + 'static,
{
    order_repo: Arc<Ord>,
    gateway: Arc<Gw>,
    notifier: Arc<N>,
}

impl<Ord, Gw, N> PaymentWebhookUseCase<Ord, Gw, N>
where
    Ord: PaymentOrderRepository + Send + Sync + 'static,
    Gw: PaymentGateway + Send + Sync + 'static,
    N: SubscriptionNotifier + Send + Sync + 'static,
{
    pub fn new(order_repo: Arc<Ord>, gateway: Arc<Gw>, notifier: Arc<N>) -> Self {
        Self {
            order_repo,
            gateway,
            notifier,
        }
    }

    /// Entry point for the gateway's delivery. Never fails: the gateway is always
    /// acknowledged and every problem goes to the log (and from there to alerts).
    pub async fn handle_callback(&self, raw_body: &[u8]) {
        match self.process_callback(raw_body).await {
            Ok(_) => {}
            Err(PaymentError::WebhookVerificationFailed(reason)) => {
                warn!(%reason, body_len = raw_body.len(), "payment_webhook: rejected unverifiable callback");
            }
            Err(PaymentError::OrderNotFound) => {
                warn!("payment_webhook: callback for unknown order acknowledged");
            }
            Err(err) => {
                error!(error = ?err, "payment_webhook: callback processing failed; order left for redelivery");
            }
        }
    }

    /// Verifies the callback, settles the order, and on success extends the owner's
    /// subscription. Replays of a settled order are reported as `AlreadyProcessed`.
    pub async fn process_callback(&self, raw_body: &[u8]) -> UseCaseResult<CallbackOutcome> {
        let callback = self
            .gateway
            .verify_and_parse_webhook(raw_body)
            .map_err(|err| PaymentError::WebhookVerificationFailed(err.to_string()))?;

        let order_code = callback.order_code;
        let result_code = callback.result_code.clone();
        info!(order_code, %result_code, "payment_webhook: verified callback received");

        let outcome = self
            .order_repo
            .apply_callback(callback, Utc::now())
            .await
            .map_err(|err| {
                error!(order_code, db_error = ?err, "payment_webhook: failed to apply callback");
                PaymentError::from_store(err)
            })?;

        match &outcome {
            CallbackOutcome::OrderNotFound { order_code } => {
                warn!(order_code, "payment_webhook: no order carries this code");
                return Err(PaymentError::OrderNotFound);
            }
            CallbackOutcome::AlreadyProcessed { order_code, status } => {
                info!(order_code, %status, "payment_webhook: order already settled; replay ignored");
            }
            CallbackOutcome::Settled {
                order,
                status,
                extension,
            } => {
                info!(
                    order_code = order.order_code,
                    payment_id = %order.id,
                    %status,
                    "payment_webhook: order settled"
                );

                if let Some(extension) = extension {
                    let confirmation = PurchaseConfirmation {
                        user_id: extension.user_id,
                        package_name: extension.package_name.clone(),
                        amount: extension.amount,
                        expired_at: extension.new_expiry,
                    };
                    if let Err(err) = self.notifier.send_confirmation(confirmation) {
                        warn!(
                            user_id = %extension.user_id,
                            error = ?err,
                            "payment_webhook: confirmation notification failed"
                        );
                    }
                }
            }
        }

        Ok(outcome)
    }
}
