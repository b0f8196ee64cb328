use crate::{
    axum_http::error_responses::AppError,
    usecases::{payment_webhook::PaymentWebhookUseCase, subscriptions::SubscriptionUseCase},
};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    response::IntoResponse,
    routing::{get, post},
};
use crates::domain::{
    interfaces::{notifier::SubscriptionNotifier, payment_gateway::PaymentGateway},
    repositories::{
        payment_orders::PaymentOrderRepository,
        subscription_packages::SubscriptionPackageRepository,
        user_subscriptions::SubscriptionLedgerRepository,
    },
    value_objects::pagination::PageRequest,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub user_id: Uuid,
    pub page: Option<i64>,
    pub size: Option<i64>,
}

pub fn routes<Pkg, Ledger, Ord, Gw, N>(
    webhook_usecase: Arc<PaymentWebhookUseCase<Ord, Gw, N>>,
    subscription_usecase: Arc<SubscriptionUseCase<Pkg, Ledger, Ord>>,
) -> Router
where
    Pkg: SubscriptionPackageRepository + Send + Sync + 'static,
    Ledger: SubscriptionLedgerRepository + Send + Sync + 'static,
    Ord: PaymentOrderRepository + Send + Sync + 'static,
    Gw: PaymentGateway + Send + Sync + 'static,
    N: SubscriptionNotifier + Send + Sync + 'static,
{
    Router::new()
        .route("/payos/callback", post(payos_callback::<Ord, Gw, N>))
        .with_state(webhook_usecase)
        .merge(
            Router::new()
                .route("/history", get(payment_history::<Pkg, Ledger, Ord>))
                .with_state(subscription_usecase),
        )
}

/// PayOS retries anything that is not a 2xx, so every delivery is acknowledged and
/// failures are handled on our side.
pub async fn payos_callback<Ord, Gw, N>(
    State(webhook_usecase): State<Arc<PaymentWebhookUseCase<Ord, Gw, N>>>,
    body: Bytes,
) -> impl IntoResponse
where
    Ord: PaymentOrderRepository + Send + Sync + 'static,
    Gw: PaymentGateway + Send + Sync + 'static,
    N: SubscriptionNotifier + Send + Sync + 'static,
{
    webhook_usecase.handle_callback(&body).await;
    Json(json!({ "status": "ok" }))
}

pub async fn payment_history<Pkg, Ledger, Ord>(
    State(subscription_usecase): State<Arc<SubscriptionUseCase<Pkg, Ledger, Ord>>>,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, AppError>
where
    Pkg: SubscriptionPackageRepository + Send + Sync + 'static,
    Ledger: SubscriptionLedgerRepository + Send + Sync + 'static,
    Ord: PaymentOrderRepository + Send + Sync + 'static,
{
    let page = PageRequest::new(query.page, query.size);
    let history = subscription_usecase
        .payment_history(query.user_id, page)
        .await?;
    Ok(Json(history))
}
