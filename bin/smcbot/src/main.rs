use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use common::{Config, SignalAlert, SignalSink, SystemClock};
use engine::{AlertDispatcher, EngineRegistry, LogSink};
use smc::SmcConfig;

#[tokio::main]
async fn main() {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env();
    let smc_cfg = SmcConfig::load(&cfg.smc_config_path)
        .unwrap_or_else(|e| panic!("Failed to load detector config: {e}"));
    info!(
        symbols = ?cfg.symbols,
        auto_register = cfg.auto_register,
        primary = %smc_cfg.engine.primary_timeframe,
        timeframes = ?smc_cfg.engine.timeframes,
        "SmcBot starting"
    );

    // ── Alerts ────────────────────────────────────────────────────────────────
    let (alert_tx, alert_rx) = mpsc::channel::<SignalAlert>(cfg.alert_channel_capacity);
    let sinks: Vec<Arc<dyn SignalSink>> = vec![Arc::new(LogSink)];
    let dispatcher = AlertDispatcher::new(alert_rx, sinks);

    // ── Engine registry ───────────────────────────────────────────────────────
    let registry = EngineRegistry::new(
        &cfg.symbols,
        Arc::new(smc_cfg),
        Arc::new(SystemClock),
        cfg.auto_register,
    )
    .with_alerts(alert_tx);

    // ── Webhook API ───────────────────────────────────────────────────────────
    let api_state = api::AppState {
        registry: Arc::new(registry),
        webhook_token: cfg.webhook_token.clone(),
    };
    if api_state.webhook_token.is_none() {
        info!("WEBHOOK_TOKEN not set, webhook accepts unauthenticated requests");
    }

    // ── Spawn all tasks ───────────────────────────────────────────────────────
    let port = cfg.webhook_port;
    tokio::spawn(dispatcher.run());
    tokio::spawn(async move {
        if let Err(e) = api::serve(api_state, port).await {
            error!(port, error = %e, "Webhook server stopped");
        }
    });

    // Keep main alive
    info!("All subsystems started. Waiting for shutdown signal.");
    tokio::signal::ctrl_c()
        .await
        .unwrap_or_else(|e| panic!("Failed to listen for shutdown signal: {e}"));
    info!("Shutdown signal received. Exiting.");
}
