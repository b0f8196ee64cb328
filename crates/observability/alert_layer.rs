use super::config::ServiceContext;
use super::dispatcher::{AlertDispatcher, AlertEvent, DELIVERY_TARGET};
use chrono::Utc;
use std::collections::BTreeMap;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

const REDACTED: &str = "[REDACTED]";

/// Forwards events at or above `min_level` to the alert dispatcher.
#[derive(Clone)]
pub(crate) struct AlertLayer {
    dispatcher: AlertDispatcher,
    service_context: ServiceContext,
    min_level: Level,
}

impl AlertLayer {
    pub(crate) fn new(
        dispatcher: AlertDispatcher,
        service_context: ServiceContext,
        min_level: Level,
    ) -> Self {
        Self {
            dispatcher,
            service_context,
            min_level,
        }
    }
}

#[derive(Default)]
struct RedactingVisitor {
    values: BTreeMap<String, String>,
}

impl RedactingVisitor {
    fn insert(&mut self, field: &Field, value: String) {
        let value = if is_sensitive_key(field.name()) {
            REDACTED.to_string()
        } else {
            value
        };
        self.values.insert(field.name().to_string(), value);
    }
}

impl Visit for RedactingVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.insert(field, format!("{value:?}"));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, value.to_string());
    }
}

impl<S> Layer<S> for AlertLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        // tracing orders levels by verbosity: ERROR is the smallest
        if *metadata.level() > self.min_level || metadata.target() == DELIVERY_TARGET {
            return;
        }

        let mut visitor = RedactingVisitor::default();
        event.record(&mut visitor);

        let message = visitor
            .values
            .remove("message")
            .map(|raw| unquote_debug_string(&raw));

        let spans = ctx
            .event_span(event)
            .map(|span| {
                span.scope()
                    .from_root()
                    .map(|s| s.metadata().name().to_string())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        let location = match (metadata.file(), metadata.line()) {
            (Some(file), Some(line)) => Some(format!("{file}:{line}")),
            _ => None,
        };

        self.dispatcher.try_dispatch(AlertEvent {
            level: *metadata.level(),
            timestamp: Utc::now(),
            service_name: self.service_context.service_name.clone(),
            environment: self.service_context.environment.clone(),
            target: metadata.target().to_string(),
            location,
            message,
            fields: visitor.values,
            spans,
        });
    }
}

fn unquote_debug_string(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        return trimmed[1..trimmed.len() - 1].to_string();
    }
    trimmed.to_string()
}

fn is_sensitive_key(field_name: &str) -> bool {
    let field = field_name.to_ascii_lowercase();
    ["webhook", "secret", "password", "token", "authorization", "api_key", "checksum"]
        .iter()
        .any(|needle| field.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::dispatcher::tests::RecordingSink;
    use std::sync::Arc;
    use std::time::Duration;
    use tracing::{error, info, warn};
    use tracing_subscriber::layer::SubscriberExt;

    fn context() -> ServiceContext {
        ServiceContext {
            service_name: "billing".to_string(),
            environment: "test".to_string(),
        }
    }

    async fn wait_for(sink: &RecordingSink, count: usize) {
        for _ in 0..50 {
            if sink.delivered.lock().unwrap().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn only_events_at_or_above_min_level_are_forwarded() {
        let sink = Arc::new(RecordingSink::default());
        let layer = AlertLayer::new(
            AlertDispatcher::spawn(vec![sink.clone()]),
            context(),
            Level::WARN,
        );
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            info!("purchase created");
            warn!(order_code = 17, "callback for unknown order");
            error!("ledger update failed");
        });

        wait_for(&sink, 2).await;
        let delivered = sink.delivered.lock().unwrap();
        assert_eq!(delivered.len(), 2);
        assert_eq!(
            delivered[0].message.as_deref(),
            Some("callback for unknown order")
        );
        assert_eq!(delivered[0].fields.get("order_code").map(String::as_str), Some("17"));
        assert_eq!(delivered[1].level, Level::ERROR);
    }

    #[tokio::test]
    async fn sensitive_fields_are_redacted() {
        let sink = Arc::new(RecordingSink::default());
        let layer = AlertLayer::new(
            AlertDispatcher::spawn(vec![sink.clone()]),
            context(),
            Level::ERROR,
        );
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            error!(checksum_key = "abc123", user_id = "u-1", "signature mismatch");
        });

        wait_for(&sink, 1).await;
        let delivered = sink.delivered.lock().unwrap();
        assert_eq!(
            delivered[0].fields.get("checksum_key").map(String::as_str),
            Some(REDACTED)
        );
        assert_eq!(delivered[0].fields.get("user_id").map(String::as_str), Some("u-1"));
    }

    #[tokio::test]
    async fn delivery_diagnostics_are_not_forwarded() {
        let sink = Arc::new(RecordingSink::default());
        let layer = AlertLayer::new(
            AlertDispatcher::spawn(vec![sink.clone()]),
            context(),
            Level::WARN,
        );
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            warn!(target: DELIVERY_TARGET, "Alert delivery failed");
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(sink.delivered.lock().unwrap().is_empty());
    }
}
