use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{info, warn};

use common::{Clock, Error, Poi, Result, Signal, SignalAlert, Timeframe, TrendRow};
use smc::SmcConfig;

use crate::engine::{IngestReport, SmcEngine};

/// Result of one webhook-style ingest cycle for a symbol.
#[derive(Debug)]
pub struct CycleOutcome {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub report: IngestReport,
    pub new_pois: usize,
    pub invalidated: usize,
    pub signal: Option<Signal>,
}

/// Owns one engine per symbol. Each engine sits behind its own lock, so a
/// read-modify-write cycle on one symbol never interleaves with another
/// cycle on the same symbol, while different symbols run in parallel.
pub struct EngineRegistry {
    engines: RwLock<HashMap<String, Arc<Mutex<SmcEngine>>>>,
    config: Arc<SmcConfig>,
    clock: Arc<dyn Clock>,
    /// `true` ⇒ unknown symbols get an engine on first use.
    auto_register: bool,
    alert_tx: Option<mpsc::Sender<SignalAlert>>,
}

impl EngineRegistry {
    /// Registry with an engine already created for each of `symbols`.
    pub fn new(
        symbols: &[String],
        config: Arc<SmcConfig>,
        clock: Arc<dyn Clock>,
        auto_register: bool,
    ) -> Self {
        let engines = symbols
            .iter()
            .map(|s| {
                let symbol = normalize(s);
                let engine = SmcEngine::new(symbol.clone(), config.clone(), clock.clone());
                (symbol, Arc::new(Mutex::new(engine)))
            })
            .collect();
        Self {
            engines: RwLock::new(engines),
            config,
            clock,
            auto_register,
            alert_tx: None,
        }
    }

    /// Send a snapshot of every generated signal to `alert_tx`.
    pub fn with_alerts(mut self, alert_tx: mpsc::Sender<SignalAlert>) -> Self {
        self.alert_tx = Some(alert_tx);
        self
    }

    pub fn config(&self) -> &SmcConfig {
        &self.config
    }

    pub async fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.engines.read().await.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    /// Engine for an already-known symbol.
    pub async fn get(&self, symbol: &str) -> Result<Arc<Mutex<SmcEngine>>> {
        let symbol = normalize(symbol);
        self.engines
            .read()
            .await
            .get(&symbol)
            .cloned()
            .ok_or(Error::UnknownSymbol(symbol))
    }

    /// Engine for `symbol`, created on first use when auto-registration is on.
    pub async fn get_or_create(&self, symbol: &str) -> Result<Arc<Mutex<SmcEngine>>> {
        match self.get(symbol).await {
            Err(Error::UnknownSymbol(symbol)) if self.auto_register && !symbol.is_empty() => {
                let mut engines = self.engines.write().await;
                let engine = engines
                    .entry(symbol.clone())
                    .or_insert_with(|| {
                        info!(%symbol, "Registering engine");
                        Arc::new(Mutex::new(SmcEngine::new(
                            symbol.clone(),
                            self.config.clone(),
                            self.clock.clone(),
                        )))
                    })
                    .clone();
                Ok(engine)
            }
            other => other,
        }
    }

    /// Ingest a batch and evaluate it under the symbol's lock. The alert is
    /// sent after the lock is released.
    pub async fn ingest(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        records: Vec<Value>,
    ) -> Result<CycleOutcome> {
        let engine = self.get_or_create(symbol).await?;

        let (outcome, alert) = {
            let mut engine = engine.lock().await;
            let report = engine.add_candles(timeframe, records);
            let eval = engine.evaluate(timeframe);
            let alert = eval
                .signal
                .clone()
                .filter(|_| self.alert_tx.is_some())
                .map(|s| engine.alert(s, timeframe));
            let outcome = CycleOutcome {
                symbol: engine.symbol().to_string(),
                timeframe,
                report,
                new_pois: eval.new_pois,
                invalidated: eval.invalidated,
                signal: eval.signal,
            };
            (outcome, alert)
        };

        if let (Some(tx), Some(alert)) = (&self.alert_tx, alert) {
            if tx.send(alert).await.is_err() {
                warn!(symbol = %outcome.symbol, "Alert channel closed, signal not delivered");
            }
        }
        Ok(outcome)
    }

    pub async fn trend_table(&self, symbol: &str) -> Result<Vec<TrendRow>> {
        let engine = self.get(symbol).await?;
        let engine = engine.lock().await;
        Ok(engine.trend_table())
    }

    pub async fn pois(&self, symbol: &str) -> Result<Vec<Poi>> {
        let engine = self.get(symbol).await?;
        let engine = engine.lock().await;
        Ok(engine.pois().to_vec())
    }
}

fn normalize(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tests::{setup_records, t0};
    use common::FixedClock;

    fn registry(auto_register: bool) -> EngineRegistry {
        EngineRegistry::new(
            &["EURUSD".to_string(), "xauusd ".to_string()],
            Arc::new(SmcConfig::default()),
            Arc::new(FixedClock::new(t0())),
            auto_register,
        )
    }

    #[tokio::test]
    async fn preregistered_symbols_only() {
        let registry = registry(false);
        assert_eq!(registry.symbols().await, vec!["EURUSD", "XAUUSD"]);
        assert!(registry.get("eurusd").await.is_ok());

        let err = registry
            .ingest("GBPUSD", Timeframe::M15, setup_records())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownSymbol(s) if s == "GBPUSD"));
    }

    #[tokio::test]
    async fn auto_register_creates_engine_once() {
        let registry = registry(true);
        let a = registry.get_or_create("gbpusd").await.unwrap();
        let b = registry.get_or_create("GBPUSD").await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.symbols().await.len(), 3);
    }

    #[tokio::test]
    async fn ingest_cycle_emits_alert_after_signal() {
        let (tx, mut rx) = mpsc::channel(4);
        let registry = registry(false).with_alerts(tx);

        let outcome = registry
            .ingest("EURUSD", Timeframe::M15, setup_records())
            .await
            .unwrap();
        assert_eq!(outcome.report.accepted, 6);
        assert!(outcome.signal.is_some());

        let alert = rx.try_recv().expect("alert queued");
        assert_eq!(alert.signal.symbol, "EURUSD");
        assert_eq!(alert.candles.len(), 6);

        // Same batch again: all duplicates, nothing new, signal still stands.
        let again = registry
            .ingest("EURUSD", Timeframe::M15, setup_records())
            .await
            .unwrap();
        assert_eq!(again.report.accepted, 0);
        assert_eq!(again.report.rejected.len(), 6);
        assert_eq!(again.new_pois, 0);
        assert_eq!(registry.pois("EURUSD").await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn concurrent_cycles_on_one_symbol_are_serialised() {
        let registry = Arc::new(registry(false));
        let records = setup_records();
        let handles: Vec<_> = records
            .into_iter()
            .map(|r| {
                let registry = registry.clone();
                tokio::spawn(async move {
                    registry.ingest("EURUSD", Timeframe::M15, vec![r]).await
                })
            })
            .collect();
        for h in handles {
            h.await.unwrap().unwrap();
        }

        let pois = registry.pois("EURUSD").await.unwrap();
        let ids: Vec<_> = pois.iter().map(|p| p.id).collect();
        let expected: Vec<u64> = (0..pois.len() as u64).collect();
        assert_eq!(ids, expected);
    }
}
