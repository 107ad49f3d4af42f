// =============================================================================
// Volatility measures
// =============================================================================
//
// stddev      — rolling population standard deviation of closes.
// hv          — rolling population standard deviation of log returns,
//               annualised:  hv = σ * sqrt(252) * 100
// chaikinvol  — EMA of the high-low range, then its rate of change over a
//               second window:
//                 cv = (EMA_t - EMA_{t-r}) / EMA_{t-r} * 100
// =============================================================================

use std::collections::VecDeque;

use super::rolling::{Ema, RollingWindow};
use crate::dataset::Columns;
use crate::types::{empty_series, put, Series};

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Key `stddev`, populated from `period - 1`.
pub fn std_dev(closes: &[f64], period: usize) -> Series {
    let mut series = empty_series(closes.len());
    let mut window = RollingWindow::new(period);
    for (i, &close) in closes.iter().enumerate() {
        if window.push(close) {
            put(&mut series[i], "stddev", window.std_dev());
        }
    }
    series
}

/// Key `hv`, populated from index `period` (the first return needs two bars).
pub fn historical_volatility(closes: &[f64], period: usize) -> Series {
    let mut series = empty_series(closes.len());
    let mut window = RollingWindow::new(period);
    let annualise = TRADING_DAYS_PER_YEAR.sqrt() * 100.0;

    for i in 1..closes.len() {
        let (cur, prev) = (closes[i], closes[i - 1]);
        // Non-positive prices have no log return; treat the bar as unchanged.
        let ret = if cur > 0.0 && prev > 0.0 {
            (cur / prev).ln()
        } else {
            0.0
        };
        if window.push(ret) {
            put(&mut series[i], "hv", window.std_dev() * annualise);
        }
    }
    series
}

/// Key `cv`, populated from `ema_period - 1 + roc_period`.
pub fn chaikin_volatility(cols: &Columns, ema_period: usize, roc_period: usize) -> Series {
    let mut series = empty_series(cols.len());
    let mut ema = Ema::new(ema_period);
    let mut history: VecDeque<f64> = VecDeque::new();

    for i in 0..cols.len() {
        let Some(current) = ema.update(cols.high[i] - cols.low[i]) else {
            continue;
        };
        history.push_back(current);
        if history.len() <= roc_period {
            continue;
        }
        let Some(base) = history.pop_front() else {
            continue;
        };
        if base != 0.0 {
            put(&mut series[i], "cv", (current - base) / base * 100.0);
        }
    }
    series
}
