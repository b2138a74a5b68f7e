use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use common::{Result, SignalAlert, SignalSink};

/// Receives alert snapshots from the registry and hands each one to every
/// sink in turn. Runs on its own task so a slow sink only delays other
/// alerts, never detection.
pub struct AlertDispatcher {
    alert_rx: mpsc::Receiver<SignalAlert>,
    sinks: Vec<Arc<dyn SignalSink>>,
}

impl AlertDispatcher {
    pub fn new(alert_rx: mpsc::Receiver<SignalAlert>, sinks: Vec<Arc<dyn SignalSink>>) -> Self {
        Self { alert_rx, sinks }
    }

    /// Run the dispatch loop. Call from `tokio::spawn`.
    pub async fn run(mut self) {
        info!(sinks = self.sinks.len(), "AlertDispatcher running");
        while let Some(alert) = self.alert_rx.recv().await {
            for sink in &self.sinks {
                match sink.deliver(&alert).await {
                    Ok(()) => info!(
                        sink = sink.name(),
                        symbol = %alert.signal.symbol,
                        side = %alert.signal.side,
                        "Alert delivered"
                    ),
                    Err(e) => error!(
                        sink = sink.name(),
                        symbol = %alert.signal.symbol,
                        error = %e,
                        "Alert delivery failed"
                    ),
                }
            }
        }
        warn!("AlertDispatcher: alert channel closed");
    }
}

/// Writes the rendered alert to the log.
pub struct LogSink;

#[async_trait]
impl SignalSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn deliver(&self, alert: &SignalAlert) -> Result<()> {
        info!(symbol = %alert.signal.symbol, "\n{}", alert.render());
        Ok(())
    }
}
