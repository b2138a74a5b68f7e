use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use common::{FixedClock, PoiKind, Timeframe};
use engine::SmcEngine;
use proptest::prelude::*;
use serde_json::{json, Value};
use smc::SmcConfig;

fn records(bars: &[(f64, f64, f64, f64)]) -> Vec<Value> {
    let t0 = Utc.with_ymd_and_hms(2025, 10, 7, 0, 0, 0).unwrap();
    bars.iter()
        .enumerate()
        .map(|(i, (o, c, up, down))| {
            json!({
                "time": (t0 + Duration::minutes(5 * i as i64)).to_rfc3339(),
                "open": o,
                "high": o.max(*c) + up,
                "low": o.min(*c) - down,
                "close": c,
            })
        })
        .collect()
}

proptest! {
    /// Re-evaluating an unchanged series adds and invalidates nothing, and
    /// every invalidated non-inverse gap has exactly one inverse.
    #[test]
    fn evaluation_is_idempotent(
        bars in prop::collection::vec((1.0f64..1.2, 1.0f64..1.2, 0.0f64..0.02, 0.0f64..0.02), 0..150)
    ) {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let mut engine = SmcEngine::new("EURUSD", Arc::new(SmcConfig::default()), clock);
        let report = engine.add_candles(Timeframe::M5, records(&bars));
        prop_assert_eq!(report.accepted, bars.len());

        let first = engine.evaluate(Timeframe::M5);
        let snapshot = engine.pois().to_vec();
        let second = engine.evaluate(Timeframe::M5);

        prop_assert_eq!(second.new_pois, 0);
        prop_assert_eq!(second.invalidated, 0);
        prop_assert_eq!(engine.pois(), &snapshot[..]);
        prop_assert_eq!(first.signal, second.signal);

        let filled = snapshot
            .iter()
            .filter(|p| p.kind == PoiKind::FairValueGap && !p.inverse && !p.validated)
            .count();
        let inverses = snapshot.iter().filter(|p| p.inverse).count();
        prop_assert_eq!(filled, inverses);
        for inverse in snapshot.iter().filter(|p| p.inverse) {
            let source = inverse.source.and_then(|id| snapshot.iter().find(|p| p.id == id));
            prop_assert!(source.is_some_and(|s| s.low == inverse.low && s.high == inverse.high));
        }
    }
}
