// =============================================================================
// MACD — Moving Average Convergence / Divergence
// =============================================================================
//
//   DIF  = EMA(fast) - EMA(slow)
//   DEA  = EMA(signal) of DIF, seeded with the first DIF value
//   MACD = (DIF - DEA) * 2
//
// All three keys (`dif`, `dea`, `macd`) appear once the slower EMA has
// finished its warm-up, i.e. from index max(fast, slow) - 1.
// =============================================================================

use super::rolling::Ema;
use super::MacdParams;
use crate::types::{empty_series, put, Series};

pub fn macd(closes: &[f64], p: &MacdParams) -> Series {
    let mut series = empty_series(closes.len());
    let mut fast = Ema::new(p.fast);
    let mut slow = Ema::new(p.slow);
    let mut dea: Option<Ema> = None;

    for (i, &close) in closes.iter().enumerate() {
        let f = fast.update(close);
        let s = slow.update(close);
        let (Some(f), Some(s)) = (f, s) else {
            continue;
        };
        let dif = f - s;
        let dea_value = match dea.as_mut() {
            Some(signal) => signal.update(dif).unwrap_or(dif),
            None => {
                dea = Some(Ema::seeded(p.signal, dif));
                dif
            }
        };

        let rec = &mut series[i];
        put(rec, "dif", dif);
        put(rec, "dea", dea_value);
        put(rec, "macd", (dif - dea_value) * 2.0);
    }
    series
}
