// =============================================================================
// Simple & Exponential Moving Averages
// =============================================================================
//
// SMA:  running sum over the last `period` closes.
// EMA:  multiplier = 2 / (period + 1)
//       EMA_t      = close_t * multiplier + EMA_{t-1} * (1 - multiplier)
//       seeded with the SMA of the first `period` closes.
//
// Several periods are computed in one pass; output keys are `ma1..maN` /
// `ema1..emaN` in the order the periods were requested. Each key is populated
// from index `period - 1`.
// =============================================================================

use super::rolling::{Ema, RollingWindow};
use crate::types::{empty_series, put, Series};

pub fn ma(closes: &[f64], periods: &[usize]) -> Series {
    let mut series = empty_series(closes.len());
    let keys: Vec<String> = (1..=periods.len()).map(|i| format!("ma{i}")).collect();
    let mut windows: Vec<RollingWindow> = periods.iter().map(|&p| RollingWindow::new(p)).collect();

    for (i, &close) in closes.iter().enumerate() {
        for (window, key) in windows.iter_mut().zip(&keys) {
            if window.push(close) {
                put(&mut series[i], key, window.mean());
            }
        }
    }
    series
}

pub fn ema(closes: &[f64], periods: &[usize]) -> Series {
    let mut series = empty_series(closes.len());
    let keys: Vec<String> = (1..=periods.len()).map(|i| format!("ema{i}")).collect();
    let mut emas: Vec<Ema> = periods.iter().map(|&p| Ema::new(p)).collect();

    for (i, &close) in closes.iter().enumerate() {
        for (ema, key) in emas.iter_mut().zip(&keys) {
            if let Some(v) = ema.update(close) {
                put(&mut series[i], key, v);
            }
        }
    }
    series
}
