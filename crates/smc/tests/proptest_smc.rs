use chrono::{Duration, TimeZone, Utc};
use common::{Candle, Direction, Timeframe, TrendLabel};
use proptest::prelude::*;
use smc::{FvgDetector, SignalGenerator, TrendScorer};

fn candle_at(i: usize, open: f64, close: f64, up: f64, down: f64) -> Candle {
    let t0 = Utc.with_ymd_and_hms(2025, 10, 7, 0, 0, 0).unwrap();
    Candle::new(
        t0 + Duration::minutes(15 * i as i64),
        open,
        open.max(close) + up,
        open.min(close) - down,
        close,
        1.0,
    )
    .unwrap()
}

fn arb_candles(max: usize) -> impl Strategy<Value = Vec<Candle>> {
    prop::collection::vec(
        (1.0f64..2.0, 1.0f64..2.0, 0.0f64..0.05, 0.0f64..0.05),
        0..max,
    )
    .prop_map(|bars| {
        bars.into_iter()
            .enumerate()
            .map(|(i, (o, c, up, down))| candle_at(i, o, c, up, down))
            .collect()
    })
}

proptest! {
    /// Confidence stays in 0..=100 and the row is a pure function of the window.
    #[test]
    fn trend_confidence_is_bounded_and_deterministic(candles in arb_candles(120)) {
        let scorer = TrendScorer::default();
        let row = scorer.score(Timeframe::M15, &candles);
        prop_assert!(row.confidence <= 100);
        prop_assert_eq!(row.clone(), scorer.score(Timeframe::M15, &candles));

        let unknown = row.trend == TrendLabel::Unknown;
        prop_assert_eq!(unknown, candles.len() < scorer.min_bars);
        if row.trend == TrendLabel::Bull {
            prop_assert!(row.confidence >= 60);
        }
        if row.trend == TrendLabel::Bear {
            prop_assert!(row.confidence <= 40);
        }
    }

    /// A triple whose first low sits above the third high is one bullish gap.
    #[test]
    fn gap_triple_yields_exactly_one_bullish_fvg(
        b3_high in 1.0f64..1.5,
        gap in 0.0001f64..0.1,
        mid_body in 0.0f64..1.0,
    ) {
        let b1_low = b3_high + gap;
        let b1 = candle_at(0, b1_low + 0.01, b1_low + 0.005, 0.0, 0.005);
        let mid_low = b3_high - 0.01;
        let mid_close = mid_low + mid_body * (b1_low - mid_low);
        let b2 = candle_at(1, b1_low, mid_close, 0.0, mid_close - mid_low);
        let b3 = candle_at(2, b3_high - 0.002, b3_high - 0.004, 0.002, 0.003);

        let zones = FvgDetector.detect(&[b1, b2, b3]);
        let bullish: Vec<_> = zones.iter().filter(|z| z.direction == Direction::Bullish).collect();
        prop_assert_eq!(bullish.len(), 1);
        prop_assert_eq!(bullish[0].low, b3.high);
        prop_assert_eq!(bullish[0].high, b1.low);
    }

    /// Any signal produced over detected zones carries a positive RR and a
    /// score equal to the number of true confluence factors.
    #[test]
    fn generated_signals_are_consistent(candles in arb_candles(80)) {
        let t = Utc.with_ymd_and_hms(2025, 10, 7, 0, 0, 0).unwrap();
        let pois: Vec<_> = FvgDetector
            .detect(&candles)
            .into_iter()
            .enumerate()
            .map(|(i, z)| common::Poi {
                id: i as u64,
                kind: if i % 2 == 0 { common::PoiKind::FairValueGap } else { common::PoiKind::OrderBlock },
                direction: z.direction,
                timeframe: Timeframe::M15,
                low: z.low,
                high: z.high,
                validated: true,
                inverse: false,
                origin: z.origin,
                formed_at: z.formed_at,
                created_at: t,
                invalidated_at: None,
                source: None,
                touches: None,
            })
            .collect();

        if let Some(signal) = SignalGenerator::default().generate("EURUSD", &pois) {
            prop_assert!(signal.rr > 0.0 && signal.rr.is_finite());
            let trues = signal.confluence.values().filter(|v| **v).count() as u32;
            prop_assert_eq!(signal.confluence_score, trues);
            prop_assert!(signal.confluence_score >= 2);
        }
    }
}
