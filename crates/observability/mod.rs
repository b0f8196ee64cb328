mod alert_layer;
mod config;
mod discord;
mod dispatcher;

use alert_layer::AlertLayer;
use anyhow::Result;
use config::ObservabilityConfig;
use discord::DiscordAlertSink;
use dispatcher::AlertDispatcher;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Installs the global subscriber: console output filtered by `RUST_LOG` (default
/// `info`) plus, when `ALERT_DISCORD_WEBHOOK_URL` is set, an alert layer that
/// forwards serious events to Discord. Must run inside a tokio runtime.
pub fn init_observability(service_name: &str) -> Result<()> {
    let config = ObservabilityConfig::from_env(service_name);

    let alert_layer = match config.alert.as_ref() {
        Some(alert) => {
            let sink = DiscordAlertSink::new(alert.webhook_url.clone())?;
            let dispatcher = AlertDispatcher::spawn(vec![Arc::new(sink)]);

            Some(
                AlertLayer::new(dispatcher, config.service_context.clone(), alert.min_level)
                    .with_filter(LevelFilter::from_level(alert.min_level)),
            )
        }
        None => None,
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // local offset so `TZ=Asia/Ho_Chi_Minh` logs read as +07:00
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .with_filter(env_filter);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(alert_layer)
        .try_init()?;

    for warning in &config.warnings {
        warn!(
            service = %config.service_context.service_name,
            environment = %config.service_context.environment,
            warning = %warning,
            "Observability config warning"
        );
    }

    info!(
        service = %config.service_context.service_name,
        environment = %config.service_context.environment,
        alerts_enabled = config.alert.is_some(),
        "Observability initialized"
    );

    Ok(())
}
