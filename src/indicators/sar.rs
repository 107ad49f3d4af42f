// =============================================================================
// Parabolic SAR (Stop and Reverse)
// =============================================================================
//
//   SAR_t = SAR_{t-1} + AF * (EP - SAR_{t-1})
//
// EP is the extreme point of the current trend (highest high in an uptrend,
// lowest low in a downtrend). AF starts at `start`, grows by `step` each time
// a new EP is set and is capped at `max`. In an uptrend SAR may not rise
// above the prior one or two lows (mirror rule in a downtrend); when price
// pierces SAR the trend flips, SAR jumps to the old EP and AF resets.
//
// The initial trend is up when the second bar's high exceeds the first's.
// Needs at least two bars; every bar is populated from then on.
// =============================================================================

use super::SarParams;
use crate::dataset::Columns;
use crate::types::{empty_series, put, Series};

pub fn sar(cols: &Columns, p: &SarParams) -> Series {
    let n = cols.len();
    let mut series = empty_series(n);
    if n < 2 {
        return series;
    }
    let (high, low) = (&cols.high, &cols.low);

    let mut rising = high[1] > high[0];
    let mut af = p.start;
    let mut ep = if rising { high[0] } else { low[0] };
    let mut value = if rising { low[0] } else { high[0] };
    put(&mut series[0], "sar", value);

    for i in 1..n {
        value += af * (ep - value);

        if rising {
            value = value.min(low[i - 1]);
            if i >= 2 {
                value = value.min(low[i - 2]);
            }
            if low[i] < value {
                rising = false;
                value = ep;
                ep = low[i];
                af = p.start;
            } else if high[i] > ep {
                ep = high[i];
                af = (af + p.step).min(p.max);
            }
        } else {
            value = value.max(high[i - 1]);
            if i >= 2 {
                value = value.max(high[i - 2]);
            }
            if high[i] > value {
                rising = true;
                value = ep;
                ep = high[i];
                af = p.start;
            } else if low[i] < ep {
                ep = low[i];
                af = (af + p.step).min(p.max);
            }
        }

        put(&mut series[i], "sar", value);
    }
    series
}
