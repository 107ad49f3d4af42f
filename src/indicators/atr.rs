// =============================================================================
// Average True Range (ATR) — Wilder's Smoothing Method
// =============================================================================
//
// True Range (TR) for each bar:
//   TR_0 = H - L
//   TR_t = max(H - L, |H - prevClose|, |L - prevClose|)
//
// ATR is the Wilder-smoothed average of TR:
//   ATR_0 = SMA of the first `period` TR values   (at index period - 1)
//   ATR_t = (ATR_{t-1} * (period - 1) + TR_t) / period
//
// Default period: 14
// =============================================================================

use super::rolling::Wilder;
use crate::dataset::Columns;
use crate::types::{empty_series, put, Series};

/// True range of bar `i`.
pub fn true_range(cols: &Columns, i: usize) -> f64 {
    let hl = cols.high[i] - cols.low[i];
    if i == 0 {
        return hl;
    }
    let prev_close = cols.close[i - 1];
    let hc = (cols.high[i] - prev_close).abs();
    let lc = (cols.low[i] - prev_close).abs();
    hl.max(hc).max(lc)
}

pub fn atr(cols: &Columns, period: usize) -> Series {
    let mut series = empty_series(cols.len());
    let mut smoother = Wilder::new(period);
    for i in 0..cols.len() {
        if let Some(v) = smoother.update(true_range(cols, i)) {
            put(&mut series[i], "atr", v);
        }
    }
    series
}
