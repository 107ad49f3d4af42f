// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Whole-history, single-pass implementations of the overlays the engine can
// compute. Every algorithm returns one `Record` per input bar; bars inside
// the warm-up period get an empty record, never a zero or a NaN.
//
// Requests arrive by name with a loose `params: Vec<f64>`. `Indicator::parse`
// turns that pair into a closed enum whose variants carry typed parameters,
// so dispatch is an exhaustive `match` rather than a string switch.

pub mod atr;
pub mod bollinger;
pub mod cci;
pub mod channels;
pub mod levels;
pub mod macd;
pub mod moving_average;
pub mod rolling;
pub mod roc;
pub mod rsi;
pub mod sar;
pub mod stochastic;
pub mod volatility;
pub mod volume;

use crate::dataset::Columns;
use crate::error::ComputeError;
use crate::types::Series;

// -----------------------------------------------------------------------------
// Parameter helpers
// -----------------------------------------------------------------------------

/// Clamp a raw period: non-finite or below 1 becomes 1, fractions are floored.
pub fn clamp_period(raw: f64) -> usize {
    if !raw.is_finite() || raw < 1.0 {
        1
    } else {
        raw.floor() as usize
    }
}

/// Period at `idx`, or `default` when the caller did not supply one.
pub fn period_at(params: &[f64], idx: usize, default: usize) -> usize {
    params.get(idx).map_or(default, |&p| clamp_period(p))
}

/// All supplied periods, or `defaults` when `params` is empty.
pub fn periods_or(params: &[f64], defaults: &[usize]) -> Vec<usize> {
    if params.is_empty() {
        defaults.to_vec()
    } else {
        params.iter().map(|&p| clamp_period(p)).collect()
    }
}

/// Finite number at `idx`, or `default`.
pub fn number_at(params: &[f64], idx: usize, default: f64) -> f64 {
    params
        .get(idx)
        .copied()
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

// -----------------------------------------------------------------------------
// Typed parameter sets
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct BollParams {
    pub period: usize,
    pub multiplier: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MacdParams {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StochParams {
    pub period: usize,
    pub smooth: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SarParams {
    pub start: f64,
    pub step: f64,
    pub max: f64,
}

/// Every indicator the backend knows, with its parsed parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Indicator {
    Ma { periods: Vec<usize> },
    Ema { periods: Vec<usize> },
    Boll(BollParams),
    Rsi { periods: Vec<usize> },
    Atr { period: usize },
    Macd(MacdParams),
    Stoch(StochParams),
    StochCross(StochParams),
    Obv { ma_periods: Vec<usize> },
    Cci { period: usize },
    Wr { period: usize },
    Mfi { period: usize },
    Sar(SarParams),
    Donchian { period: usize },
    StdDev { period: usize },
    Hv { period: usize },
    ChaikinVol { ema_period: usize, roc_period: usize },
    Pivot,
    Fib,
    Psych { step: f64 },
    Roc { period: usize },
    Tsi { long: usize, short: usize },
    Aroon { period: usize },
}

impl Indicator {
    /// Resolve a request's `(name, params)` pair. Names are case-insensitive;
    /// missing parameters fall back to each indicator's defaults.
    pub fn parse(name: &str, params: &[f64]) -> Result<Self, ComputeError> {
        let indicator = match name.to_ascii_lowercase().as_str() {
            "ma" => Self::Ma {
                periods: periods_or(params, &[5, 10, 30, 60]),
            },
            "ema" => Self::Ema {
                periods: periods_or(params, &[6, 12, 20]),
            },
            "boll" => Self::Boll(BollParams {
                period: period_at(params, 0, 20),
                multiplier: number_at(params, 1, 2.0),
            }),
            "rsi" => Self::Rsi {
                periods: periods_or(params, &[6, 12, 24]),
            },
            "atr" => Self::Atr {
                period: period_at(params, 0, 14),
            },
            "macd" => Self::Macd(MacdParams {
                fast: period_at(params, 0, 12),
                slow: period_at(params, 1, 26),
                signal: period_at(params, 2, 9),
            }),
            "stoch" => Self::Stoch(StochParams {
                period: period_at(params, 0, 14),
                smooth: period_at(params, 1, 3),
            }),
            "stochcross" => Self::StochCross(StochParams {
                period: period_at(params, 0, 14),
                smooth: period_at(params, 1, 3),
            }),
            "obv" => Self::Obv {
                ma_periods: periods_or(params, &[30]),
            },
            "cci" => Self::Cci {
                period: period_at(params, 0, 20),
            },
            "wr" => Self::Wr {
                period: period_at(params, 0, 14),
            },
            "mfi" => Self::Mfi {
                period: period_at(params, 0, 14),
            },
            "sar" => Self::Sar(SarParams {
                start: number_at(params, 0, 0.02),
                step: number_at(params, 1, 0.02),
                max: number_at(params, 2, 0.2),
            }),
            "donchian" => Self::Donchian {
                period: period_at(params, 0, 20),
            },
            "stddev" => Self::StdDev {
                period: period_at(params, 0, 20),
            },
            "hv" => Self::Hv {
                period: period_at(params, 0, 20),
            },
            "chaikinvol" => Self::ChaikinVol {
                ema_period: period_at(params, 0, 10),
                roc_period: period_at(params, 1, 10),
            },
            "pivot" => Self::Pivot,
            "fib" => Self::Fib,
            "psych" => Self::Psych {
                step: match params.first() {
                    None => 10.0,
                    Some(&step) if step.is_finite() && step > 0.0 => step,
                    Some(_) => 1.0,
                },
            },
            "roc" => Self::Roc {
                period: period_at(params, 0, 12),
            },
            "tsi" => Self::Tsi {
                long: period_at(params, 0, 25),
                short: period_at(params, 1, 13),
            },
            "aroon" => Self::Aroon {
                period: period_at(params, 0, 25),
            },
            _ => return Err(ComputeError::UnknownIndicator(name.to_string())),
        };
        Ok(indicator)
    }

    /// Canonical lowercase name, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ma { .. } => "ma",
            Self::Ema { .. } => "ema",
            Self::Boll(_) => "boll",
            Self::Rsi { .. } => "rsi",
            Self::Atr { .. } => "atr",
            Self::Macd(_) => "macd",
            Self::Stoch(_) => "stoch",
            Self::StochCross(_) => "stochcross",
            Self::Obv { .. } => "obv",
            Self::Cci { .. } => "cci",
            Self::Wr { .. } => "wr",
            Self::Mfi { .. } => "mfi",
            Self::Sar(_) => "sar",
            Self::Donchian { .. } => "donchian",
            Self::StdDev { .. } => "stddev",
            Self::Hv { .. } => "hv",
            Self::ChaikinVol { .. } => "chaikinvol",
            Self::Pivot => "pivot",
            Self::Fib => "fib",
            Self::Psych { .. } => "psych",
            Self::Roc { .. } => "roc",
            Self::Tsi { .. } => "tsi",
            Self::Aroon { .. } => "aroon",
        }
    }

    /// Run the algorithm over `cols`. The output has exactly `cols.len()`
    /// records.
    pub fn compute(&self, cols: &Columns) -> Result<Series, ComputeError> {
        cols.validate()?;
        let series = match self {
            Self::Ma { periods } => moving_average::ma(&cols.close, periods),
            Self::Ema { periods } => moving_average::ema(&cols.close, periods),
            Self::Boll(p) => bollinger::boll(&cols.close, p.period, p.multiplier),
            Self::Rsi { periods } => rsi::rsi(&cols.close, periods),
            Self::Atr { period } => atr::atr(cols, *period),
            Self::Macd(p) => macd::macd(&cols.close, p),
            Self::Stoch(p) => stochastic::stoch(cols, p),
            Self::StochCross(p) => stochastic::stoch_cross(cols, p),
            Self::Obv { ma_periods } => volume::obv(cols, ma_periods),
            Self::Cci { period } => cci::cci(cols, *period),
            Self::Wr { period } => stochastic::williams_r(cols, *period),
            Self::Mfi { period } => volume::mfi(cols, *period),
            Self::Sar(p) => sar::sar(cols, p),
            Self::Donchian { period } => channels::donchian(cols, *period),
            Self::StdDev { period } => volatility::std_dev(&cols.close, *period),
            Self::Hv { period } => volatility::historical_volatility(&cols.close, *period),
            Self::ChaikinVol {
                ema_period,
                roc_period,
            } => volatility::chaikin_volatility(cols, *ema_period, *roc_period),
            Self::Pivot => levels::pivot(cols),
            Self::Fib => levels::fibonacci(cols),
            Self::Psych { step } => levels::psychological(&cols.close, *step),
            Self::Roc { period } => roc::roc(&cols.close, *period),
            Self::Tsi { long, short } => roc::tsi(&cols.close, *long, *short),
            Self::Aroon { period } => channels::aroon(cols, *period),
        };
        Ok(series)
    }
}
