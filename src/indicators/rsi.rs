// =============================================================================
// Relative Strength Index (RSI) — Wilder's Smoothing
// =============================================================================
//
// Step 1 — Price change per bar: delta_t = close_t - close_{t-1}.
// Step 2 — Seed average gain / average loss with the SMA of the first
//          `period` gains / losses.
// Step 3 — Wilder smoothing:
//            avg = (prev_avg * (period - 1) + current) / period
// Step 4 — RS  = avg_gain / avg_loss
//          RSI = 100 - 100 / (1 + RS)
//
// When avg_loss is zero RSI is 100, including the flat-market case where
// avg_gain is zero as well.
//
// Default periods: 6, 12, 24 (keys rsi1, rsi2, rsi3).
// =============================================================================

use super::rolling::Wilder;
use crate::types::{empty_series, put, Series};

/// RSI for every requested period; each key is populated from index `period`.
pub fn rsi(closes: &[f64], periods: &[usize]) -> Series {
    let mut series = empty_series(closes.len());
    let keys: Vec<String> = (1..=periods.len()).map(|i| format!("rsi{i}")).collect();
    let mut smoothers: Vec<(Wilder, Wilder)> = periods
        .iter()
        .map(|&p| (Wilder::new(p), Wilder::new(p)))
        .collect();

    for i in 1..closes.len() {
        let delta = closes[i] - closes[i - 1];
        let gain = if delta > 0.0 { delta } else { 0.0 };
        let loss = if delta < 0.0 { -delta } else { 0.0 };

        for ((avg_gain, avg_loss), key) in smoothers.iter_mut().zip(&keys) {
            let g = avg_gain.update(gain);
            let l = avg_loss.update(loss);
            if let (Some(g), Some(l)) = (g, l) {
                put(&mut series[i], key, rsi_from_averages(g, l));
            }
        }
    }
    series
}

/// Convert average gain / average loss into an RSI value in [0, 100].
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::test_support::{assert_close, field};

    #[test]
    fn rsi_empty_input() {
        assert!(rsi(&[], &[14]).is_empty());
    }

    #[test]
    fn rsi_insufficient_data() {
        // 14 closes => 13 deltas < 14.
        let closes: Vec<f64> = (1..=14).map(|x| x as f64).collect();
        let series = rsi(&closes, &[14]);
        assert_eq!(series.len(), 14);
        assert!(series.iter().all(|r| r.is_empty()));
    }

    #[test]
    fn rsi_all_gains_is_100_everywhere() {
        let closes: Vec<f64> = (1..=30).map(|x| x as f64).collect();
        let series = rsi(&closes, &[14]);
        assert!(series[..14].iter().all(|r| r.is_empty()));
        for i in 14..30 {
            let v = field(&series, i, "rsi1").unwrap();
            assert!(v.is_finite());
            assert_close(v, 100.0);
        }
    }

    #[test]
    fn rsi_all_losses_is_zero() {
        let closes: Vec<f64> = (1..=30).rev().map(|x| x as f64).collect();
        let series = rsi(&closes, &[14]);
        for i in 14..30 {
            assert_close(field(&series, i, "rsi1").unwrap(), 0.0);
        }
    }

    #[test]
    fn rsi_flat_market_maps_to_100() {
        let series = rsi(&[100.0; 30], &[14]);
        for i in 14..30 {
            assert_close(field(&series, i, "rsi1").unwrap(), 100.0);
        }
    }

    #[test]
    fn rsi_range_check() {
        let closes = vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08, 45.89, 46.03,
            44.18, 44.22, 44.57, 43.42, 42.66, 43.13,
        ];
        let series = rsi(&closes, &[14]);
        let populated: Vec<f64> = series.iter().filter_map(|r| r.get("rsi1").copied()).collect();
        assert_eq!(populated.len(), 4);
        for v in populated {
            assert!((0.0..=100.0).contains(&v), "RSI {v} out of range");
        }
    }

    #[test]
    fn rsi_known_first_value() {
        // period 2 over 1, 3, 2: gains [2, 0], losses [0, 1] => RS = 2 => 66.67
        let series = rsi(&[1.0, 3.0, 2.0], &[2]);
        assert_close(field(&series, 2, "rsi1").unwrap(), 100.0 - 100.0 / 3.0);
    }
}
