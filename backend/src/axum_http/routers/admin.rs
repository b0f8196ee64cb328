use crate::{
    auth::{AdminUser, require_admin},
    axum_http::error_responses::AppError,
    config::config_model::AdminSecret,
    usecases::admin::AdminUseCase,
};
use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{get, post, put},
};
use chrono::NaiveDate;
use crates::domain::{
    interfaces::{notifier::SubscriptionNotifier, payment_gateway::PaymentGateway},
    repositories::{
        payment_orders::PaymentOrderRepository,
        subscription_packages::SubscriptionPackageRepository,
        user_subscriptions::SubscriptionLedgerRepository,
    },
    value_objects::{
        enums::payment_statuses::PaymentStatus,
        pagination::PageRequest,
        payments::{
            PaymentFilter, PaymentOrderDto, PaymentUpdate, RevenueQuery, RevenueSeriesQuery,
        },
        subscriptions::ExtendSubscriptionRequest,
    },
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct AdminPaymentsQuery {
    pub status: Option<PaymentStatus>,
    pub user_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_subscribed: Option<bool>,
    pub page: Option<i64>,
    pub size: Option<i64>,
}

impl AdminPaymentsQuery {
    fn into_parts(self) -> (PaymentFilter, PageRequest) {
        (
            PaymentFilter {
                status: self.status,
                user_id: self.user_id,
                start_date: self.start_date,
                end_date: self.end_date,
                is_subscribed: self.is_subscribed,
            },
            PageRequest::new(self.page, self.size),
        )
    }
}

pub fn routes<Pkg, Ord, Ledger, Gw, N>(
    admin_usecase: Arc<AdminUseCase<Pkg, Ord, Ledger, Gw, N>>,
    admin_secret: Arc<AdminSecret>,
) -> Router
where
    Pkg: SubscriptionPackageRepository + Send + Sync + 'static,
    Ord: PaymentOrderRepository + Send + Sync + 'static,
    Ledger: SubscriptionLedgerRepository + Send + Sync + 'static,
    Gw: PaymentGateway + Send + Sync + 'static,
    N: SubscriptionNotifier + Send + Sync + 'static,
{
    Router::new()
        .route("/payments", get(list_payments::<Pkg, Ord, Ledger, Gw, N>))
        .route("/payments/:id", put(update_payment::<Pkg, Ord, Ledger, Gw, N>))
        .route(
            "/subscriptions/extend",
            post(extend_subscription::<Pkg, Ord, Ledger, Gw, N>),
        )
        .route("/revenue", get(revenue_report::<Pkg, Ord, Ledger, Gw, N>))
        .route(
            "/stats/revenue",
            get(revenue_series::<Pkg, Ord, Ledger, Gw, N>),
        )
        .route(
            "/stats/total-revenue",
            get(total_revenue::<Pkg, Ord, Ledger, Gw, N>),
        )
        .route(
            "/packages/:code/deactivate",
            post(deactivate_package::<Pkg, Ord, Ledger, Gw, N>),
        )
        .route(
            "/payos/register-webhook",
            post(register_webhook::<Pkg, Ord, Ledger, Gw, N>),
        )
        .route_layer(from_fn_with_state(admin_secret, require_admin))
        .with_state(admin_usecase)
}

pub async fn list_payments<Pkg, Ord, Ledger, Gw, N>(
    State(admin_usecase): State<Arc<AdminUseCase<Pkg, Ord, Ledger, Gw, N>>>,
    Query(query): Query<AdminPaymentsQuery>,
) -> Result<impl IntoResponse, AppError>
where
    Pkg: SubscriptionPackageRepository + Send + Sync + 'static,
    Ord: PaymentOrderRepository + Send + Sync + 'static,
    Ledger: SubscriptionLedgerRepository + Send + Sync + 'static,
    Gw: PaymentGateway + Send + Sync + 'static,
    N: SubscriptionNotifier + Send + Sync + 'static,
{
    let (filter, page) = query.into_parts();
    let payments = admin_usecase.list_payments(filter, page).await?;
    Ok(Json(payments.map(PaymentOrderDto::from)))
}

pub async fn update_payment<Pkg, Ord, Ledger, Gw, N>(
    State(admin_usecase): State<Arc<AdminUseCase<Pkg, Ord, Ledger, Gw, N>>>,
    Extension(admin): Extension<AdminUser>,
    Path(order_id): Path<Uuid>,
    Json(changes): Json<PaymentUpdate>,
) -> Result<impl IntoResponse, AppError>
where
    Pkg: SubscriptionPackageRepository + Send + Sync + 'static,
    Ord: PaymentOrderRepository + Send + Sync + 'static,
    Ledger: SubscriptionLedgerRepository + Send + Sync + 'static,
    Gw: PaymentGateway + Send + Sync + 'static,
    N: SubscriptionNotifier + Send + Sync + 'static,
{
    info!(admin = %admin.subject, %order_id, "admin: payment update requested");
    let updated = admin_usecase.update_payment(order_id, changes).await?;
    Ok(Json(PaymentOrderDto::from(updated)))
}

pub async fn extend_subscription<Pkg, Ord, Ledger, Gw, N>(
    State(admin_usecase): State<Arc<AdminUseCase<Pkg, Ord, Ledger, Gw, N>>>,
    Extension(admin): Extension<AdminUser>,
    Json(request): Json<ExtendSubscriptionRequest>,
) -> Result<impl IntoResponse, AppError>
where
    Pkg: SubscriptionPackageRepository + Send + Sync + 'static,
    Ord: PaymentOrderRepository + Send + Sync + 'static,
    Ledger: SubscriptionLedgerRepository + Send + Sync + 'static,
    Gw: PaymentGateway + Send + Sync + 'static,
    N: SubscriptionNotifier + Send + Sync + 'static,
{
    info!(admin = %admin.subject, user_id = %request.user_id, "admin: subscription extension requested");
    let response = admin_usecase.extend_subscription(request).await?;
    Ok(Json(response))
}

pub async fn revenue_report<Pkg, Ord, Ledger, Gw, N>(
    State(admin_usecase): State<Arc<AdminUseCase<Pkg, Ord, Ledger, Gw, N>>>,
    Query(query): Query<RevenueQuery>,
) -> Result<impl IntoResponse, AppError>
where
    Pkg: SubscriptionPackageRepository + Send + Sync + 'static,
    Ord: PaymentOrderRepository + Send + Sync + 'static,
    Ledger: SubscriptionLedgerRepository + Send + Sync + 'static,
    Gw: PaymentGateway + Send + Sync + 'static,
    N: SubscriptionNotifier + Send + Sync + 'static,
{
    let report = admin_usecase.revenue_report(query).await?;
    Ok(Json(report))
}

pub async fn revenue_series<Pkg, Ord, Ledger, Gw, N>(
    State(admin_usecase): State<Arc<AdminUseCase<Pkg, Ord, Ledger, Gw, N>>>,
    Query(query): Query<RevenueSeriesQuery>,
) -> Result<impl IntoResponse, AppError>
where
    Pkg: SubscriptionPackageRepository + Send + Sync + 'static,
    Ord: PaymentOrderRepository + Send + Sync + 'static,
    Ledger: SubscriptionLedgerRepository + Send + Sync + 'static,
    Gw: PaymentGateway + Send + Sync + 'static,
    N: SubscriptionNotifier + Send + Sync + 'static,
{
    let (unit, range) = query.into_parts();
    let series = admin_usecase.revenue_series(unit, range).await?;
    Ok(Json(series))
}

pub async fn total_revenue<Pkg, Ord, Ledger, Gw, N>(
    State(admin_usecase): State<Arc<AdminUseCase<Pkg, Ord, Ledger, Gw, N>>>,
) -> Result<impl IntoResponse, AppError>
where
    Pkg: SubscriptionPackageRepository + Send + Sync + 'static,
    Ord: PaymentOrderRepository + Send + Sync + 'static,
    Ledger: SubscriptionLedgerRepository + Send + Sync + 'static,
    Gw: PaymentGateway + Send + Sync + 'static,
    N: SubscriptionNotifier + Send + Sync + 'static,
{
    let total = admin_usecase.total_revenue().await?;
    Ok(Json(total))
}

pub async fn deactivate_package<Pkg, Ord, Ledger, Gw, N>(
    State(admin_usecase): State<Arc<AdminUseCase<Pkg, Ord, Ledger, Gw, N>>>,
    Extension(admin): Extension<AdminUser>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, AppError>
where
    Pkg: SubscriptionPackageRepository + Send + Sync + 'static,
    Ord: PaymentOrderRepository + Send + Sync + 'static,
    Ledger: SubscriptionLedgerRepository + Send + Sync + 'static,
    Gw: PaymentGateway + Send + Sync + 'static,
    N: SubscriptionNotifier + Send + Sync + 'static,
{
    info!(admin = %admin.subject, package_code = %code, "admin: package deactivation requested");
    admin_usecase.deactivate_package(&code).await?;
    Ok(Json(json!({ "code": code, "is_active": false })))
}

pub async fn register_webhook<Pkg, Ord, Ledger, Gw, N>(
    State(admin_usecase): State<Arc<AdminUseCase<Pkg, Ord, Ledger, Gw, N>>>,
) -> Result<impl IntoResponse, AppError>
where
    Pkg: SubscriptionPackageRepository + Send + Sync + 'static,
    Ord: PaymentOrderRepository + Send + Sync + 'static,
    Ledger: SubscriptionLedgerRepository + Send + Sync + 'static,
    Gw: PaymentGateway + Send + Sync + 'static,
    N: SubscriptionNotifier + Send + Sync + 'static,
{
    let webhook_url = admin_usecase.register_webhook().await?;
    Ok(Json(json!({ "webhook_url": webhook_url })))
}
