// =============================================================================
// Volume-based indicators — On-Balance Volume and Money Flow Index
// =============================================================================
//
// OBV:  cumulative total, +volume on an up close, -volume on a down close,
//       unchanged on a flat close. OBV_0 = 0. Optional trailing SMAs of the
//       cumulative series are emitted as `obvMa1..obvMaN`.
//
// MFI:  typical price TP = (H + L + C) / 3, raw flow = TP * volume.
//       Flow counts as positive when TP rises, negative when it falls.
//       Over the last `period` flows:
//         MFI = 100 - 100 / (1 + positive / negative)
//       and 100 when the negative sum is zero.
// =============================================================================

use super::rolling::RollingWindow;
use crate::dataset::Columns;
use crate::types::{empty_series, put, Series};

pub fn obv(cols: &Columns, ma_periods: &[usize]) -> Series {
    let mut series = empty_series(cols.len());
    let keys: Vec<String> = (1..=ma_periods.len()).map(|i| format!("obvMa{i}")).collect();
    let mut windows: Vec<RollingWindow> =
        ma_periods.iter().map(|&p| RollingWindow::new(p)).collect();

    let mut total = 0.0;
    for i in 0..cols.len() {
        if i > 0 {
            let (cur, prev) = (cols.close[i], cols.close[i - 1]);
            if cur > prev {
                total += cols.volume[i];
            } else if cur < prev {
                total -= cols.volume[i];
            }
        }
        put(&mut series[i], "obv", total);
        for (window, key) in windows.iter_mut().zip(&keys) {
            if window.push(total) {
                put(&mut series[i], key, window.mean());
            }
        }
    }
    series
}

fn typical_price(cols: &Columns, i: usize) -> f64 {
    (cols.high[i] + cols.low[i] + cols.close[i]) / 3.0
}

/// Key `mfi`, populated from index `period`.
pub fn mfi(cols: &Columns, period: usize) -> Series {
    let mut series = empty_series(cols.len());
    let mut positive = RollingWindow::new(period);
    let mut negative = RollingWindow::new(period);

    for i in 1..cols.len() {
        let tp = typical_price(cols, i);
        let prev_tp = typical_price(cols, i - 1);
        let flow = tp * cols.volume[i];
        let (pos, neg) = if tp > prev_tp {
            (flow, 0.0)
        } else if tp < prev_tp {
            (0.0, flow)
        } else {
            (0.0, 0.0)
        };
        positive.push(pos);
        if !negative.push(neg) {
            continue;
        }

        let neg_sum = negative.sum();
        let value = if neg_sum == 0.0 {
            100.0
        } else {
            100.0 - 100.0 / (1.0 + positive.sum() / neg_sum)
        };
        put(&mut series[i], "mfi", value);
    }
    series
}
