use std::env;
use tracing::Level;
use url::Url;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ServiceContext {
    pub(crate) service_name: String,
    pub(crate) environment: String,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AlertConfig {
    pub(crate) webhook_url: Url,
    pub(crate) min_level: Level,
}

#[derive(Debug, Clone)]
pub(crate) struct ObservabilityConfig {
    pub(crate) service_context: ServiceContext,
    pub(crate) alert: Option<AlertConfig>,
    /// Problems found while parsing, logged once tracing is up.
    pub(crate) warnings: Vec<String>,
}

impl ObservabilityConfig {
    pub(crate) fn from_env(service_name: &str) -> Self {
        Self::from_lookup(service_name, |key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        service_name: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let lookup = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let service_context = ServiceContext {
            service_name: lookup("SERVICE_NAME").unwrap_or_else(|| service_name.to_string()),
            environment: lookup("STAGE").unwrap_or_else(|| "unknown".to_string()),
        };

        let mut warnings = Vec::new();

        let webhook_url = match lookup("ALERT_DISCORD_WEBHOOK_URL") {
            Some(raw) => match Url::parse(&raw) {
                Ok(url) => Some(url),
                Err(err) => {
                    // the raw URL embeds the webhook token
                    warnings.push(format!(
                        "ALERT_DISCORD_WEBHOOK_URL is invalid; alerts disabled (parse error: {err})"
                    ));
                    None
                }
            },
            None => None,
        };

        let alert = webhook_url.map(|webhook_url| {
            let min_level = match lookup("ALERT_MIN_LEVEL") {
                Some(raw) => parse_level(&raw).unwrap_or_else(|| {
                    warnings.push(format!(
                        "ALERT_MIN_LEVEL is invalid (value: {raw}); defaulting to ERROR"
                    ));
                    Level::ERROR
                }),
                None => Level::ERROR,
            };

            AlertConfig {
                webhook_url,
                min_level,
            }
        });

        Self {
            service_context,
            alert,
            warnings,
        }
    }
}

fn parse_level(input: &str) -> Option<Level> {
    match input.trim().to_ascii_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}
