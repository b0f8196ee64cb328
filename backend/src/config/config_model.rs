use std::time::Duration;

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub backend_server: BackendServer,
    pub database: Database,
    pub payos: PayOs,
    pub admin: AdminSecret,
}

#[derive(Debug, Clone)]
pub struct BackendServer {
    pub port: u16,
    /// Megabytes.
    pub body_limit: u64,
    /// Seconds.
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct PayOs {
    pub client_id: String,
    pub api_key: String,
    pub checksum_key: String,
    pub api_base_url: String,
    pub return_url: String,
    pub cancel_url: String,
    /// Registered with PayOS at startup when set.
    pub webhook_url: Option<String>,
    pub gateway_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AdminSecret {
    pub secret: String,
}
