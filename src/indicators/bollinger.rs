// =============================================================================
// Bollinger Bands
// =============================================================================
//
// Middle band (SMA), upper band (SMA + k*σ) and lower band (SMA - k*σ), where
// σ is the population standard deviation of the window. Mean and σ come from
// a running sum and sum of squares, so each bar costs O(1).

use super::rolling::RollingWindow;
use crate::types::{empty_series, put, Series};

/// Keys `up`, `mid`, `dn`, populated from index `period - 1`.
pub fn boll(closes: &[f64], period: usize, multiplier: f64) -> Series {
    let mut series = empty_series(closes.len());
    let mut window = RollingWindow::new(period);

    for (i, &close) in closes.iter().enumerate() {
        if !window.push(close) {
            continue;
        }
        let mid = window.mean();
        let band = multiplier * window.std_dev();
        let rec = &mut series[i];
        put(rec, "up", mid + band);
        put(rec, "mid", mid);
        put(rec, "dn", mid - band);
    }
    series
}
