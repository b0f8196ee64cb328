use std::{sync::Arc, time::Duration};

use anyhow::anyhow;
use crates::domain::{
    entities::payment_orders::{InsertPaymentOrderEntity, PAYOS_GATEWAY_NAME},
    interfaces::payment_gateway::PaymentGateway,
    repositories::{
        payment_orders::PaymentOrderRepository,
        subscription_packages::SubscriptionPackageRepository,
    },
    value_objects::{
        enums::payment_statuses::PaymentStatus,
        order_codes::OrderCodeGenerator,
        payments::{PurchaseRequest, PurchaseResponse},
    },
};
use tracing::{error, info, warn};

use super::payment_errors::{PaymentError, UseCaseResult};

/// Attempts at allocating an unused order code before giving up.
const ORDER_CODE_ATTEMPTS: usize = 3;

#[derive(Debug, Clone)]
pub struct CheckoutUrls {
    pub return_url: String,
    pub cancel_url: String,
}

pub struct PurchaseUseCase<Pkg, Ord, Gw>
where
    Pkg: SubscriptionPackageRepository + Send + Sync + 'static,
    Ord: PaymentOrderRepository + Send + Sync + 'static,
    Gw: PaymentGateway + Send + Sync + 'static,
{
    package_repo: Arc<Pkg>,
    order_repo: Arc<Ord>,
    gateway: Arc<Gw>,
    order_codes: Arc<OrderCodeGenerator>,
    checkout_urls: CheckoutUrls,
    gateway_timeout: Duration,
}

impl<Pkg, Ord, Gw> PurchaseUseCase<Pkg, Ord, Gw>
where
    Pkg: SubscriptionPackageRepository + Send + Sync + 'static,
    Ord: PaymentOrderRepository + Send + Sync + 'static,
    Gw: PaymentGateway + Send + Sync + 'static,
{
    pub fn new(
        package_repo: Arc<Pkg>,
        order_repo: Arc<Ord>,
        gateway: Arc<Gw>,
        order_codes: Arc<OrderCodeGenerator>,
        checkout_urls: CheckoutUrls,
        gateway_timeout: Duration,
    ) -> Self {
        Self {
            package_repo,
            order_repo,
            gateway,
            order_codes,
            checkout_urls,
            gateway_timeout,
        }
    }

    /// Opens a PENDING order for the package and asks the gateway for a checkout link.
    /// A failed gateway call leaves the order in place as an audit record.
    pub async fn create_purchase(&self, request: PurchaseRequest) -> UseCaseResult<PurchaseResponse> {
        let PurchaseRequest {
            user_id,
            package_code,
        } = request;
        info!(%user_id, %package_code, "purchases: creating purchase");

        let package = self
            .package_repo
            .find_active_by_code(&package_code)
            .await
            .map_err(|err| {
                error!(%user_id, %package_code, db_error = ?err, "purchases: failed to load package");
                PaymentError::Internal(err)
            })?
            .ok_or_else(|| {
                warn!(%user_id, %package_code, "purchases: package not found or inactive");
                PaymentError::PackageNotFound(package_code.clone())
            })?;

        let mut created = None;
        for attempt in 1..=ORDER_CODE_ATTEMPTS {
            let order_code = self.order_codes.next_code();
            let insert = InsertPaymentOrderEntity {
                user_id,
                package_id: package.id,
                order_code,
                amount: package.price,
                status: PaymentStatus::Pending.as_str().to_string(),
                gateway_name: PAYOS_GATEWAY_NAME.to_string(),
            };

            match self.order_repo.create_pending(insert).await {
                Ok(Some(order)) => {
                    created = Some(order);
                    break;
                }
                Ok(None) => {
                    warn!(%user_id, order_code, attempt, "purchases: order code already taken");
                }
                Err(err) => {
                    error!(%user_id, order_code, db_error = ?err, "purchases: failed to persist order");
                    return Err(PaymentError::Internal(err));
                }
            }
        }

        let order = created.ok_or_else(|| {
            error!(%user_id, "purchases: could not allocate a unique order code");
            PaymentError::Internal(anyhow!(
                "no unique order code after {ORDER_CODE_ATTEMPTS} attempts"
            ))
        })?;

        info!(
            %user_id,
            payment_id = %order.id,
            order_code = order.order_code,
            amount = order.amount,
            "purchases: pending order created"
        );

        let description = format!("Subscription - {}", package.code);
        let link = tokio::time::timeout(
            self.gateway_timeout,
            self.gateway.create_link(
                order.order_code,
                order.amount,
                &description,
                &self.checkout_urls.return_url,
                &self.checkout_urls.cancel_url,
            ),
        )
        .await
        .map_err(|_| {
            error!(
                order_code = order.order_code,
                timeout_secs = self.gateway_timeout.as_secs(),
                "purchases: payment gateway timed out"
            );
            PaymentError::GatewayUnavailable("payment gateway timed out".to_string())
        })?
        .map_err(|err| {
            error!(order_code = order.order_code, gateway_error = ?err, "purchases: payment gateway rejected link creation");
            PaymentError::GatewayUnavailable(err.to_string())
        })?;

        if let Some(payment_link_id) = link.payment_link_id.clone() {
            if let Err(err) = self
                .order_repo
                .attach_gateway_link(order.id, payment_link_id)
                .await
            {
                warn!(payment_id = %order.id, db_error = ?err, "purchases: failed to record gateway link id");
            }
        }

        Ok(PurchaseResponse {
            payment_id: order.id,
            checkout_url: link.checkout_url,
        })
    }
}
