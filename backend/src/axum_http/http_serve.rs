use crate::{
    axum_http::{default_routers, routers},
    config::config_model::DotEnvyConfig,
    usecases::{
        admin::AdminUseCase,
        payment_webhook::PaymentWebhookUseCase,
        purchases::{CheckoutUrls, PurchaseUseCase},
        subscriptions::SubscriptionUseCase,
    },
};
use anyhow::Result;
use axum::{
    Router,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::get,
};
use crates::{
    domain::{interfaces::payment_gateway::PaymentGateway, value_objects::order_codes::OrderCodeGenerator},
    infra::{
        db::{
            postgres::postgres_connection::PgPoolSquad,
            repositories::{
                payment_orders::PaymentOrderPostgres,
                subscription_packages::SubscriptionPackagePostgres,
                user_subscriptions::SubscriptionLedgerPostgres,
            },
        },
        notifications::logging_notifier::LoggingNotifier,
    },
    payments::payos_client::{PayOsClient, PayOsCredentials},
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info, warn};

pub async fn start(config: Arc<DotEnvyConfig>, db_pool: Arc<PgPoolSquad>) -> Result<()> {
    let package_repo = Arc::new(SubscriptionPackagePostgres::new(Arc::clone(&db_pool)));
    let order_repo = Arc::new(PaymentOrderPostgres::new(Arc::clone(&db_pool)));
    let ledger_repo = Arc::new(SubscriptionLedgerPostgres::new(Arc::clone(&db_pool)));
    let notifier = Arc::new(LoggingNotifier::new());

    let payos = Arc::new(PayOsClient::new(
        PayOsCredentials {
            client_id: config.payos.client_id.clone(),
            api_key: config.payos.api_key.clone(),
            checksum_key: config.payos.checksum_key.clone(),
        },
        config.payos.api_base_url.clone(),
        config.payos.gateway_timeout,
    )?);

    register_webhook_in_background(Arc::clone(&payos), config.payos.webhook_url.clone());

    let purchase_usecase = Arc::new(PurchaseUseCase::new(
        Arc::clone(&package_repo),
        Arc::clone(&order_repo),
        Arc::clone(&payos),
        Arc::new(OrderCodeGenerator::new()),
        CheckoutUrls {
            return_url: config.payos.return_url.clone(),
            cancel_url: config.payos.cancel_url.clone(),
        },
        config.payos.gateway_timeout,
    ));
    let subscription_usecase = Arc::new(SubscriptionUseCase::new(
        Arc::clone(&package_repo),
        Arc::clone(&ledger_repo),
        Arc::clone(&order_repo),
    ));
    let webhook_usecase = Arc::new(PaymentWebhookUseCase::new(
        Arc::clone(&order_repo),
        Arc::clone(&payos),
        Arc::clone(&notifier),
    ));
    let admin_usecase = Arc::new(AdminUseCase::new(
        package_repo,
        order_repo,
        ledger_repo,
        payos,
        notifier,
        config.payos.webhook_url.clone(),
    ));

    let app = Router::new()
        .fallback(default_routers::not_found)
        .nest(
            "/api/v1/subscriptions",
            routers::subscriptions::routes(purchase_usecase, Arc::clone(&subscription_usecase)),
        )
        .nest(
            "/api/v1/payments",
            routers::payments::routes(webhook_usecase, subscription_usecase),
        )
        .nest(
            "/api/v1/admin",
            routers::admin::routes(admin_usecase, Arc::new(config.admin.clone())),
        )
        .route("/api/v1/health-check", get(default_routers::health_check))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.backend_server.timeout,
        )))
        .layer(RequestBodyLimitLayer::new(
            (config.backend_server.body_limit * 1024 * 1024).try_into()?,
        ))
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST, Method::PUT])
                .allow_headers([AUTHORIZATION, CONTENT_TYPE])
                .allow_origin(Any),
        )
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.backend_server.port));
    let listener = TcpListener::bind(addr).await?;

    info!("Server is running on port {}", config.backend_server.port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Registration failure only means PayOS keeps its previous callback URL; the
/// server starts regardless.
fn register_webhook_in_background<Gw>(gateway: Arc<Gw>, webhook_url: Option<String>)
where
    Gw: PaymentGateway + Send + Sync + 'static,
{
    let Some(webhook_url) = webhook_url else {
        warn!("PAYOS_WEBHOOK_URL is not set; skipping webhook registration");
        return;
    };

    tokio::spawn(async move {
        if let Err(err) = gateway.register_webhook(&webhook_url).await {
            error!(gateway_error = ?err, "PayOS webhook registration failed at startup");
        }
    });
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received ctrl+C signal"),
        Err(err) => {
            error!(error = %err, "Failed to install CTRL+C signal handler");
            std::future::pending::<()>().await
        }
    }
}
