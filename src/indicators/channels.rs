// =============================================================================
// Rolling-extreme channels — Donchian and Aroon
// =============================================================================
//
// Donchian: upper = highest high, lower = lowest low over `period` bars,
//           middle = (upper + lower) / 2.
//
// Aroon:    over the last `period + 1` bars,
//             up   = (period - bars since highest high) / period * 100
//             down = (period - bars since lowest low)  / period * 100
//             osc  = up - down
//           The deque front carries the index of the extreme, so "bars
//           since" is a subtraction. Ties resolve to the most recent bar.
// =============================================================================

use super::rolling::RollingExtreme;
use crate::dataset::Columns;
use crate::types::{empty_series, put, Series};

pub fn donchian(cols: &Columns, period: usize) -> Series {
    let mut series = empty_series(cols.len());
    let mut highs = RollingExtreme::max(period);
    let mut lows = RollingExtreme::min(period);

    for i in 0..cols.len() {
        let (_, upper) = highs.push(i, cols.high[i]);
        let (_, lower) = lows.push(i, cols.low[i]);
        if i + 1 < period {
            continue;
        }
        let rec = &mut series[i];
        put(rec, "upper", upper);
        put(rec, "middle", (upper + lower) / 2.0);
        put(rec, "lower", lower);
    }
    series
}

pub fn aroon(cols: &Columns, period: usize) -> Series {
    let mut series = empty_series(cols.len());
    let window = period.saturating_add(1);
    let mut highs = RollingExtreme::max(window);
    let mut lows = RollingExtreme::min(window);
    let span = period as f64;

    for i in 0..cols.len() {
        let (hi_idx, _) = highs.push(i, cols.high[i]);
        let (lo_idx, _) = lows.push(i, cols.low[i]);
        if i < period {
            continue;
        }
        let up = (span - (i - hi_idx) as f64) / span * 100.0;
        let down = (span - (i - lo_idx) as f64) / span * 100.0;
        let rec = &mut series[i];
        put(rec, "aroonUp", up);
        put(rec, "aroonDown", down);
        put(rec, "aroonOsc", up - down);
    }
    series
}
