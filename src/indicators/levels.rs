// =============================================================================
// Static price levels — pivot points, Fibonacci retracement, round numbers
// =============================================================================
//
// pivot:  classic floor pivots from the PREVIOUS bar's H / L / C.
//           PP = (H + L + C) / 3
//           R1 = 2PP - L     S1 = 2PP - H
//           R2 = PP + (H - L) S2 = PP - (H - L)
//           R3 = H + 2(PP - L) S3 = L - 2(H - PP)
// fib:    one global high / low over the whole dataset; the same levels are
//         written to every bar.
// psych:  close rounded to the nearest multiple of `step`.
// =============================================================================

use crate::dataset::Columns;
use crate::types::{empty_series, put, Record, Series};

const FIB_LEVELS: [(&str, f64); 7] = [
    ("fib0", 0.0),
    ("fib236", 0.236),
    ("fib382", 0.382),
    ("fib500", 0.5),
    ("fib618", 0.618),
    ("fib786", 0.786),
    ("fib1000", 1.0),
];

pub fn pivot(cols: &Columns) -> Series {
    let mut series = empty_series(cols.len());
    for i in 1..cols.len() {
        let (h, l, c) = (cols.high[i - 1], cols.low[i - 1], cols.close[i - 1]);
        let pp = (h + l + c) / 3.0;
        let rec = &mut series[i];
        put(rec, "pp", pp);
        put(rec, "r1", 2.0 * pp - l);
        put(rec, "s1", 2.0 * pp - h);
        put(rec, "r2", pp + (h - l));
        put(rec, "s2", pp - (h - l));
        put(rec, "r3", h + 2.0 * (pp - l));
        put(rec, "s3", l - 2.0 * (h - pp));
    }
    series
}

/// Levels measured down from the global high: `fib0` is the high, `fib1000`
/// the low.
pub fn fibonacci(cols: &Columns) -> Series {
    let high = cols
        .high
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);
    let low = cols
        .low
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(f64::INFINITY, f64::min);

    let mut levels = Record::new();
    if high.is_finite() && low.is_finite() {
        let range = high - low;
        for (key, ratio) in FIB_LEVELS {
            put(&mut levels, key, high - range * ratio);
        }
    }
    vec![levels; cols.len()]
}

pub fn psychological(closes: &[f64], step: f64) -> Series {
    let mut series = empty_series(closes.len());
    for (i, &close) in closes.iter().enumerate() {
        put(&mut series[i], "psych", (close / step).round() * step);
    }
    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::test_support::{assert_close, columns_from_closes, field};

    #[test]
    fn pivot_uses_previous_bar() {
        // bar 0: H 11, L 9, C 10 => PP 10
        let series = pivot(&columns_from_closes(&[10.0, 50.0]));
        assert!(series[0].is_empty());
        assert_close(field(&series, 1, "pp").unwrap(), 10.0);
        assert_close(field(&series, 1, "r1").unwrap(), 11.0);
        assert_close(field(&series, 1, "s1").unwrap(), 9.0);
        assert_close(field(&series, 1, "r2").unwrap(), 12.0);
        assert_close(field(&series, 1, "s2").unwrap(), 8.0);
        assert_close(field(&series, 1, "r3").unwrap(), 13.0);
        assert_close(field(&series, 1, "s3").unwrap(), 7.0);
    }

    #[test]
    fn fib_levels_broadcast() {
        // highs 11..=21, lows 9..=19 => high 21, low 9, range 12
        let closes: Vec<f64> = (10..=20).map(|x| x as f64).collect();
        let series = fibonacci(&columns_from_closes(&closes));
        assert_eq!(series.len(), 11);
        assert!(series.iter().all(|r| r == &series[0]));
        assert_close(field(&series, 0, "fib0").unwrap(), 21.0);
        assert_close(field(&series, 5, "fib500").unwrap(), 15.0);
        assert_close(field(&series, 10, "fib1000").unwrap(), 9.0);
        assert_close(field(&series, 3, "fib618").unwrap(), 21.0 - 12.0 * 0.618);
    }

    #[test]
    fn psych_rounds_to_step() {
        let series = psychological(&[101.0, 104.9, 105.0, 117.0], 10.0);
        let got: Vec<f64> = (0..4).map(|i| field(&series, i, "psych").unwrap()).collect();
        assert_eq!(got, vec![100.0, 100.0, 110.0, 120.0]);
    }
}
