// Commodity Channel Index.
//
//   TP  = (H + L + C) / 3
//   CCI = (TP - SMA(TP)) / (0.015 * meanDev)
//
// meanDev is the mean absolute deviation of TP around the window mean; the
// window is rescanned for it on each bar. When meanDev is zero the value is
// omitted.

use super::rolling::RollingWindow;
use crate::dataset::Columns;
use crate::types::{empty_series, put, Series};

const LAMBERT: f64 = 0.015;

/// Key `cci`, populated from index `period - 1`.
///
/// Not single-pass: the mean deviation rescans the window on every bar, so
/// this is O(n * period). The running mean alone stays O(n).
pub fn cci(cols: &Columns, period: usize) -> Series {
    let mut series = empty_series(cols.len());
    let mut window = RollingWindow::new(period);

    for i in 0..cols.len() {
        let tp = (cols.high[i] + cols.low[i] + cols.close[i]) / 3.0;
        let Some(mean) = window.push(tp).then(|| window.mean()) else {
            continue;
        };
        let mean_dev = window.values().map(|v| (v - mean).abs()).sum::<f64>() / period as f64;
        if mean_dev == 0.0 {
            continue;
        }
        put(&mut series[i], "cci", (tp - mean) / (LAMBERT * mean_dev));
    }
    series
}
