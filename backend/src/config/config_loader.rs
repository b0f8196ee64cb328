use std::time::Duration;

use anyhow::{Context, Result};
use crates::payments::payos_client::DEFAULT_PAYOS_API_BASE_URL;

use super::config_model::{AdminSecret, BackendServer, Database, DotEnvyConfig, PayOs};

const DEFAULT_GATEWAY_TIMEOUT_SECS: u64 = 10;

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();
    load_from(|key| std::env::var(key).ok())
}

/// Builds the config from any key lookup; `load` feeds it the process environment.
pub fn load_from(lookup: impl Fn(&str) -> Option<String>) -> Result<DotEnvyConfig> {
    let required = |key: &str| -> Result<String> {
        lookup(key)
            .filter(|value| !value.trim().is_empty())
            .with_context(|| format!("{key} is missing"))
    };
    let optional = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    let backend_server = BackendServer {
        port: required("SERVER_PORT_BACKEND")?
            .parse()
            .context("SERVER_PORT_BACKEND is invalid")?,
        body_limit: required("SERVER_BODY_LIMIT")?
            .parse()
            .context("SERVER_BODY_LIMIT is invalid")?,
        timeout: required("SERVER_TIMEOUT")?
            .parse()
            .context("SERVER_TIMEOUT is invalid")?,
    };

    let database = Database {
        url: required("DATABASE_URL")?,
    };

    let gateway_timeout_secs = match optional("PAYOS_GATEWAY_TIMEOUT_SECS") {
        Some(raw) => raw
            .parse()
            .context("PAYOS_GATEWAY_TIMEOUT_SECS is invalid")?,
        None => DEFAULT_GATEWAY_TIMEOUT_SECS,
    };

    let payos = PayOs {
        client_id: required("PAYOS_CLIENT_ID")?,
        api_key: required("PAYOS_API_KEY")?,
        checksum_key: required("PAYOS_CHECKSUM_KEY")?,
        api_base_url: optional("PAYOS_API_BASE_URL")
            .unwrap_or_else(|| DEFAULT_PAYOS_API_BASE_URL.to_string()),
        return_url: required("PAYOS_RETURN_URL")?,
        cancel_url: required("PAYOS_CANCEL_URL")?,
        webhook_url: optional("PAYOS_WEBHOOK_URL"),
        gateway_timeout: Duration::from_secs(gateway_timeout_secs),
    };

    let admin = AdminSecret {
        secret: required("JWT_ADMIN_SECRET")?,
    };

    Ok(DotEnvyConfig {
        backend_server,
        database,
        payos,
        admin,
    })
}
