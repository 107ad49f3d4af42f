// =============================================================================
// Momentum — Rate of Change and True Strength Index
// =============================================================================
//
// ROC = ((close - close_n) / close_n) * 100, 0 when close_n is 0.
//
// TSI = 100 * EMA_short(EMA_long(m)) / EMA_short(EMA_long(|m|)),
//       m = close_t - close_{t-1}; omitted when the denominator is 0.
// =============================================================================

use super::rolling::Ema;
use crate::types::{empty_series, put, Series};

/// Key `roc`, populated from index `period`.
pub fn roc(closes: &[f64], period: usize) -> Series {
    let mut series = empty_series(closes.len());
    for i in period..closes.len() {
        let prev = closes[i - period];
        let value = if prev == 0.0 {
            0.0
        } else {
            (closes[i] - prev) / prev * 100.0
        };
        put(&mut series[i], "roc", value);
    }
    series
}

/// Key `tsi`, populated from index `long + short - 1`.
pub fn tsi(closes: &[f64], long: usize, short: usize) -> Series {
    let mut series = empty_series(closes.len());
    let (mut num_long, mut num_short) = (Ema::new(long), Ema::new(short));
    let (mut den_long, mut den_short) = (Ema::new(long), Ema::new(short));

    for i in 1..closes.len() {
        let m = closes[i] - closes[i - 1];
        let num = num_long.update(m).and_then(|v| num_short.update(v));
        let den = den_long.update(m.abs()).and_then(|v| den_short.update(v));
        if let (Some(num), Some(den)) = (num, den) {
            if den != 0.0 {
                put(&mut series[i], "tsi", 100.0 * num / den);
            }
        }
    }
    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::test_support::{assert_close, field};

    #[test]
    fn roc_basic() {
        let closes: Vec<f64> = (1..=20).map(|x| x as f64).collect();
        let series = roc(&closes, 14);
        assert!(series[13].is_empty());
        // From 1 to 15: (15 - 1) / 1 * 100 = 1400%
        assert_close(field(&series, 14, "roc").unwrap(), 1400.0);
    }

    #[test]
    fn roc_zero_base_is_zero() {
        let series = roc(&[0.0, 5.0], 1);
        assert_close(field(&series, 1, "roc").unwrap(), 0.0);
    }

    #[test]
    fn roc_insufficient_data() {
        let series = roc(&[1.0, 2.0, 3.0], 14);
        assert!(series.iter().all(|r| r.is_empty()));
    }

    #[test]
    fn tsi_monotonic_rise_is_100() {
        let closes: Vec<f64> = (0..60).map(|i| 10.0 + i as f64 * 0.5).collect();
        let series = tsi(&closes, 25, 13);
        assert!(series[36].is_empty());
        for i in 37..60 {
            assert_close(field(&series, i, "tsi").unwrap(), 100.0);
        }
    }

    #[test]
    fn tsi_flat_is_omitted() {
        let series = tsi(&[5.0; 60], 25, 13);
        assert!(series.iter().all(|r| r.is_empty()));
    }
}
