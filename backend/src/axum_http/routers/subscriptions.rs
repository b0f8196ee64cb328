use crate::{
    axum_http::error_responses::AppError,
    usecases::{purchases::PurchaseUseCase, subscriptions::SubscriptionUseCase},
};
use axum::{
    Json, Router,
    extract::{Query, State},
    response::IntoResponse,
    routing::{get, post},
};
use crates::domain::{
    interfaces::payment_gateway::PaymentGateway,
    repositories::{
        payment_orders::PaymentOrderRepository,
        subscription_packages::SubscriptionPackageRepository,
        user_subscriptions::SubscriptionLedgerRepository,
    },
    value_objects::payments::PurchaseRequest,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub user_id: Uuid,
}

pub fn routes<Pkg, Ledger, Ord, Gw>(
    purchase_usecase: Arc<PurchaseUseCase<Pkg, Ord, Gw>>,
    subscription_usecase: Arc<SubscriptionUseCase<Pkg, Ledger, Ord>>,
) -> Router
where
    Pkg: SubscriptionPackageRepository + Send + Sync + 'static,
    Ledger: SubscriptionLedgerRepository + Send + Sync + 'static,
    Ord: PaymentOrderRepository + Send + Sync + 'static,
    Gw: PaymentGateway + Send + Sync + 'static,
{
    Router::new()
        .route("/purchase", post(purchase::<Pkg, Ord, Gw>))
        .with_state(purchase_usecase)
        .merge(
            Router::new()
                .route("/status", get(status::<Pkg, Ledger, Ord>))
                .route("/packages", get(list_packages::<Pkg, Ledger, Ord>))
                .with_state(subscription_usecase),
        )
}

pub async fn purchase<Pkg, Ord, Gw>(
    State(purchase_usecase): State<Arc<PurchaseUseCase<Pkg, Ord, Gw>>>,
    Json(request): Json<PurchaseRequest>,
) -> Result<impl IntoResponse, AppError>
where
    Pkg: SubscriptionPackageRepository + Send + Sync + 'static,
    Ord: PaymentOrderRepository + Send + Sync + 'static,
    Gw: PaymentGateway + Send + Sync + 'static,
{
    if request.package_code.trim().is_empty() {
        return Err(AppError::BadRequest("package_code is required".to_string()));
    }

    let response = purchase_usecase.create_purchase(request).await?;
    Ok(Json(response))
}

pub async fn status<Pkg, Ledger, Ord>(
    State(subscription_usecase): State<Arc<SubscriptionUseCase<Pkg, Ledger, Ord>>>,
    Query(query): Query<StatusQuery>,
) -> Result<impl IntoResponse, AppError>
where
    Pkg: SubscriptionPackageRepository + Send + Sync + 'static,
    Ledger: SubscriptionLedgerRepository + Send + Sync + 'static,
    Ord: PaymentOrderRepository + Send + Sync + 'static,
{
    let status = subscription_usecase.get_status(query.user_id).await?;
    Ok(Json(status))
}

pub async fn list_packages<Pkg, Ledger, Ord>(
    State(subscription_usecase): State<Arc<SubscriptionUseCase<Pkg, Ledger, Ord>>>,
) -> Result<impl IntoResponse, AppError>
where
    Pkg: SubscriptionPackageRepository + Send + Sync + 'static,
    Ledger: SubscriptionLedgerRepository + Send + Sync + 'static,
    Ord: PaymentOrderRepository + Send + Sync + 'static,
{
    let packages = subscription_usecase.list_packages().await?;
    Ok(Json(packages))
}
