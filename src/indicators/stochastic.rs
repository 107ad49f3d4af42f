// =============================================================================
// Stochastic Oscillator, Stochastic crossover and Williams %R
// =============================================================================
//
// All three read the rolling highest high / lowest low of the last `period`
// bars from a pair of monotonic deques.
//
//   %K  = (close - LL) / (HH - LL) * 100          (0 when HH == LL)
//   %D  = SMA(smooth) of %K
//   %R  = (HH - close) / (HH - LL) * -100         (0 when HH == LL)
//
// The crossover variant adds `cross`: +1 on the bar where %K moves above %D,
// -1 where it moves below, 0 otherwise.
// =============================================================================

use super::rolling::{RollingExtreme, RollingWindow};
use super::StochParams;
use crate::dataset::Columns;
use crate::types::{empty_series, put, Series};

/// Per-bar (highest high, lowest low) once `period` bars are available.
fn rolling_range(cols: &Columns, period: usize) -> Vec<Option<(f64, f64)>> {
    let mut highs = RollingExtreme::max(period);
    let mut lows = RollingExtreme::min(period);
    (0..cols.len())
        .map(|i| {
            let (_, hh) = highs.push(i, cols.high[i]);
            let (_, ll) = lows.push(i, cols.low[i]);
            (i + 1 >= period).then_some((hh, ll))
        })
        .collect()
}

/// %K and %D per bar.
fn k_and_d(cols: &Columns, p: &StochParams) -> Vec<(Option<f64>, Option<f64>)> {
    let mut d_window = RollingWindow::new(p.smooth);
    rolling_range(cols, p.period)
        .into_iter()
        .enumerate()
        .map(|(i, range)| {
            let Some((hh, ll)) = range else {
                return (None, None);
            };
            let span = hh - ll;
            let k = if span == 0.0 {
                0.0
            } else {
                (cols.close[i] - ll) / span * 100.0
            };
            d_window.push(k);
            (Some(k), d_window.full_mean())
        })
        .collect()
}

/// Keys `k` (from `period - 1`) and `d` (from `period + smooth - 2`).
pub fn stoch(cols: &Columns, p: &StochParams) -> Series {
    let mut series = empty_series(cols.len());
    for (i, (k, d)) in k_and_d(cols, p).into_iter().enumerate() {
        if let Some(k) = k {
            put(&mut series[i], "k", k);
        }
        if let Some(d) = d {
            put(&mut series[i], "d", d);
        }
    }
    series
}

/// `stoch` plus a `cross` signal on every bar that has %D for itself and for
/// the previous bar.
pub fn stoch_cross(cols: &Columns, p: &StochParams) -> Series {
    let mut series = stoch(cols, p);
    let mut prev_diff: Option<f64> = None;
    for rec in series.iter_mut() {
        let diff = match (rec.get("k"), rec.get("d")) {
            (Some(k), Some(d)) => Some(k - d),
            _ => None,
        };
        if let (Some(prev), Some(cur)) = (prev_diff, diff) {
            let cross = if prev <= 0.0 && cur > 0.0 {
                1.0
            } else if prev >= 0.0 && cur < 0.0 {
                -1.0
            } else {
                0.0
            };
            put(rec, "cross", cross);
        }
        prev_diff = diff;
    }
    series
}

/// Key `wr`, populated from `period - 1`.
pub fn williams_r(cols: &Columns, period: usize) -> Series {
    let mut series = empty_series(cols.len());
    for (i, range) in rolling_range(cols, period).into_iter().enumerate() {
        let Some((hh, ll)) = range else {
            continue;
        };
        let span = hh - ll;
        let wr = if span == 0.0 {
            0.0
        } else {
            (hh - cols.close[i]) / span * -100.0
        };
        put(&mut series[i], "wr", wr);
    }
    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::test_support::{assert_close, columns_from_closes, field};

    fn params(period: usize, smooth: usize) -> StochParams {
        StochParams { period, smooth }
    }

    #[test]
    fn stoch_warm_up() {
        let cols = columns_from_closes(&(1..=10).map(|x| x as f64).collect::<Vec<_>>());
        let series = stoch(&cols, &params(4, 3));
        assert!(series[..3].iter().all(|r| r.is_empty()));
        assert!(field(&series, 3, "k").is_some());
        assert!(field(&series, 4, "d").is_none());
        assert!(field(&series, 5, "d").is_some());
    }

    #[test]
    fn stoch_known_k() {
        // closes 1..=4, high = c + 1, low = c - 1 => HH = 5, LL = 0
        let cols = columns_from_closes(&[1.0, 2.0, 3.0, 4.0]);
        let series = stoch(&cols, &params(4, 1));
        assert_close(field(&series, 3, "k").unwrap(), 80.0);
        assert_close(field(&series, 3, "d").unwrap(), 80.0);
    }

    #[test]
    fn stoch_zero_range_is_zero() {
        let mut cols = columns_from_closes(&[5.0; 6]);
        cols.high = vec![5.0; 6];
        cols.low = vec![5.0; 6];
        let series = stoch(&cols, &params(3, 2));
        for i in 2..6 {
            assert_close(field(&series, i, "k").unwrap(), 0.0);
        }
        let wr = williams_r(&cols, 3);
        assert_close(field(&wr, 5, "wr").unwrap(), 0.0);
    }

    #[test]
    fn williams_r_bounds() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0).collect();
        let series = williams_r(&columns_from_closes(&closes), 14);
        assert!(series[..13].iter().all(|r| r.is_empty()));
        for rec in &series[13..] {
            let v = rec["wr"];
            assert!((-100.0..=0.0).contains(&v), "%R {v} out of range");
        }
    }

    #[test]
    fn stoch_cross_flags_direction_changes() {
        let mut closes = vec![100.0, 101.0, 102.0, 103.0, 104.0, 105.0, 106.0, 107.0, 103.0, 110.0];
        closes.extend([108.0, 106.0, 104.0, 102.0]);
        closes.extend((0..8).map(|i| 104.0 + i as f64 * 2.0));
        let series = stoch_cross(&columns_from_closes(&closes), &params(5, 3));
        assert!(field(&series, 6, "cross").is_none());
        assert!(field(&series, 7, "cross").is_some());
        assert_close(field(&series, 9, "cross").unwrap(), 1.0);
        assert_close(field(&series, 10, "cross").unwrap(), 0.0);
        assert_close(field(&series, 11, "cross").unwrap(), -1.0);
        assert_close(field(&series, 12, "cross").unwrap(), 0.0);
        assert_close(field(&series, 14, "cross").unwrap(), 1.0);
        assert_close(field(&series, 15, "cross").unwrap(), 0.0);
    }
}
