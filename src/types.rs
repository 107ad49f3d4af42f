// =============================================================================
// Shared types used across the indicator engine
// =============================================================================

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One OHLCV period of price history.
///
/// `timestamp` is expected to be monotonically non-decreasing across a
/// history; index 0 is the oldest bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

impl Bar {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// Sparse per-bar output: named numeric fields, e.g. `{"ma1": 101.2}`.
///
/// Bars inside an indicator's warm-up period carry an empty record.
pub type Record = BTreeMap<String, f64>;

/// One record per input bar, oldest first.
pub type Series = Vec<Record>;

/// A series of `len` empty records.
pub fn empty_series(len: usize) -> Series {
    vec![Record::new(); len]
}

/// Insert `value` under `key` unless it is NaN or infinite.
///
/// Non-finite results (e.g. from a NaN input bar) leave the field absent.
pub fn put(record: &mut Record, key: &str, value: f64) {
    if value.is_finite() {
        record.insert(key.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_skips_non_finite() {
        let mut rec = Record::new();
        put(&mut rec, "a", 1.5);
        put(&mut rec, "b", f64::NAN);
        put(&mut rec, "c", f64::INFINITY);
        assert_eq!(rec.len(), 1);
        assert_eq!(rec.get("a"), Some(&1.5));
    }

    #[test]
    fn bar_volume_defaults_to_zero() {
        let json = r#"{"timestamp":1,"open":1.0,"high":2.0,"low":0.5,"close":1.5}"#;
        let bar: Bar = serde_json::from_str(json).unwrap();
        assert_eq!(bar.volume, 0.0);
        assert_eq!(bar.timestamp, 1);
    }
}
