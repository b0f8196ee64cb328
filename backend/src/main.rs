use anyhow::Result;
use backend::{axum_http::http_serve, config::config_loader};
use crates::{infra::db::postgres::postgres_connection, observability::init_observability};
use std::sync::Arc;
use tracing::{error, info};

const SERVICE_NAME: &str = "billing-backend";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        error!(service = SERVICE_NAME, error = ?error, "Backend exited with error");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    init_observability(SERVICE_NAME)?;

    let config = Arc::new(config_loader::load()?);
    info!(
        port = config.backend_server.port,
        payos_api = %config.payos.api_base_url,
        webhook_registration = config.payos.webhook_url.is_some(),
        "Billing configuration loaded"
    );

    let db_pool = Arc::new(postgres_connection::establish_connection(
        &config.database.url,
    )?);
    info!("Postgres connection pool is ready");

    http_serve::start(config, db_pool).await
}
