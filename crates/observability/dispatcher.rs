use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{Level, warn};

const ALERT_QUEUE_CAPACITY: usize = 256;

/// Target of the pipeline's own diagnostics. The alert layer ignores it so a failing
/// sink cannot feed alerts back into itself.
pub(crate) const DELIVERY_TARGET: &str = "alert_delivery";

#[derive(Clone, Debug)]
pub(crate) struct AlertEvent {
    pub(crate) level: Level,
    pub(crate) timestamp: DateTime<Utc>,
    pub(crate) service_name: String,
    pub(crate) environment: String,
    pub(crate) target: String,
    pub(crate) location: Option<String>,
    pub(crate) message: Option<String>,
    pub(crate) fields: BTreeMap<String, String>,
    pub(crate) spans: Vec<String>,
}

#[async_trait]
pub(crate) trait AlertSink: Send + Sync {
    async fn deliver(&self, event: &AlertEvent) -> Result<()>;
    fn sink_name(&self) -> &'static str;
}

/// Hands alerts to a background task so the logging call site never waits on the
/// network. A full queue drops the alert.
#[derive(Clone)]
pub(crate) struct AlertDispatcher {
    tx: mpsc::Sender<AlertEvent>,
}

impl AlertDispatcher {
    pub(crate) fn spawn(sinks: Vec<Arc<dyn AlertSink>>) -> Self {
        let (tx, mut rx) = mpsc::channel::<AlertEvent>(ALERT_QUEUE_CAPACITY);

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                for sink in &sinks {
                    if let Err(error) = sink.deliver(&event).await {
                        warn!(
                            target: DELIVERY_TARGET,
                            sink = sink.sink_name(),
                            error = %error,
                            "Alert delivery failed"
                        );
                    }
                }
            }
        });

        Self { tx }
    }

    pub(crate) fn try_dispatch(&self, event: AlertEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(target: DELIVERY_TARGET, "Alert queue full; dropping alert");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(target: DELIVERY_TARGET, "Alert queue closed; dropping alert");
                false
            }
        }
    }
}
