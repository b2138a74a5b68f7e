use async_trait::async_trait;
use serde::Serialize;

use crate::{Candle, Poi, Result, Signal, Timeframe, TrendRow};

/// Everything an alerting or visualisation collaborator receives with a
/// signal. The snapshots are copies; consumers cannot reach engine state.
#[derive(Debug, Clone, Serialize)]
pub struct SignalAlert {
    pub signal: Signal,
    pub trend: Vec<TrendRow>,
    pub pois: Vec<Poi>,
    /// Series of the timeframe the signal was evaluated on.
    pub timeframe: Timeframe,
    pub candles: Vec<Candle>,
}

impl SignalAlert {
    /// Plain-text rendering used by chat-style sinks and logs.
    pub fn render(&self) -> String {
        let s = &self.signal;
        let mut msg = format!(
            "{} Signal\nDirection: {}\nEntry: {}\nStop: {}\nTP: {}\nRR: {:.2}\nConfluence Score: {}\nConfluence Details:\n",
            s.symbol, s.side, s.entry, s.stop, s.target, s.rr, s.confluence_score
        );
        for (factor, hit) in &s.confluence {
            msg.push_str(&format!(" - {factor}: {}\n", if *hit { "Yes" } else { "No" }));
        }
        if !self.trend.is_empty() {
            msg.push_str("Multi-TF Trend:\n");
            for row in &self.trend {
                msg.push_str(&format!(" {} {} {}%\n", row.timeframe, row.trend, row.confidence));
            }
        }
        msg
    }
}

/// Downstream consumer of signals (chat alerts, order routing, charts).
///
/// Implementations run on the alert dispatcher task, never on the
/// detection path, and must treat the alert as read-only.
#[async_trait]
pub trait SignalSink: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    async fn deliver(&self, alert: &SignalAlert) -> Result<()>;
}
