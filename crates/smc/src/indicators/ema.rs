/// Exponential moving average with `alpha = 2 / (span + 1)`.
///
/// Recursive form seeded with the first value (no bias adjustment), so
/// every input position has an output and the series is a pure function
/// of its inputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ema {
    pub span: usize,
}

impl Ema {
    pub fn new(span: usize) -> Self {
        assert!(span >= 1, "EMA span must be >= 1");
        Self { span }
    }

    fn alpha(&self) -> f64 {
        2.0 / (self.span as f64 + 1.0)
    }

    /// EMA value at every position of `values` (oldest first).
    pub fn series(&self, values: &[f64]) -> Vec<f64> {
        let alpha = self.alpha();
        let mut out = Vec::with_capacity(values.len());
        let mut prev: Option<f64> = None;
        for &v in values {
            let next = match prev {
                None => v,
                Some(p) => alpha * v + (1.0 - alpha) * p,
            };
            out.push(next);
            prev = Some(next);
        }
        out
    }

    /// Latest EMA value, `None` for empty input.
    pub fn last(&self, values: &[f64]) -> Option<f64> {
        self.series(values).last().copied()
    }
}

/// Direction of a fast/slow average crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crossover {
    Bullish, // fast crossed above slow
    Bearish, // fast crossed below slow
}

/// Most recent crossing of `fast` over `slow` among the last `within` bars.
///
/// Returns the index of the bar on which the cross completed. Both slices
/// must be aligned and of equal length.
pub fn last_crossover(fast: &[f64], slow: &[f64], within: usize) -> Option<(usize, Crossover)> {
    let n = fast.len().min(slow.len());
    let start = n.saturating_sub(within).max(1);
    (start..n).rev().find_map(|i| {
        if fast[i] > slow[i] && fast[i - 1] <= slow[i - 1] {
            Some((i, Crossover::Bullish))
        } else if fast[i] < slow[i] && fast[i - 1] >= slow[i - 1] {
            Some((i, Crossover::Bearish))
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ema_seeds_with_first_value() {
        let ema = Ema::new(3);
        let out = ema.series(&[10.0, 20.0, 20.0]);
        assert_eq!(out[0], 10.0);
        assert!((out[1] - 15.0).abs() < 1e-12);
        assert!((out[2] - 17.5).abs() < 1e-12);
    }

    #[test]
    fn ema_of_constant_series_is_constant() {
        let ema = Ema::new(34);
        assert!(ema.series(&[1.25; 60]).iter().all(|&v| (v - 1.25).abs() < 1e-12));
        assert_eq!(ema.last(&[]), None);
    }

    #[test]
    fn crossover_reports_the_most_recent_cross() {
        let slow = vec![1.0; 8];
        // above → below at 3, back above at 6
        let fast = vec![1.1, 1.1, 1.1, 0.9, 0.9, 0.9, 1.2, 1.2];
        assert_eq!(last_crossover(&fast, &slow, 10), Some((6, Crossover::Bullish)));
        // window of 4 bars only sees the cross at 6
        assert_eq!(last_crossover(&fast, &slow, 4), Some((6, Crossover::Bullish)));
        // excluding the last 3 bars leaves the bearish cross
        assert_eq!(last_crossover(&fast[..6], &slow[..6], 10), Some((3, Crossover::Bearish)));
    }

    #[test]
    fn crossover_outside_window_is_ignored() {
        let slow = vec![1.0; 12];
        let mut fast = vec![0.9; 12];
        for v in fast.iter_mut().skip(1) {
            *v = 1.1;
        }
        assert_eq!(last_crossover(&fast, &slow, 12), Some((1, Crossover::Bullish)));
        assert_eq!(last_crossover(&fast, &slow, 10), None);
    }
}
