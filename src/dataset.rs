// =============================================================================
// Dataset — columnar bar history and its cheap identity signature
// =============================================================================
//
// The signature covers only the length and the endpoints of a history:
//
//   len : first.timestamp : last.timestamp : last.close : last.high
//       : last.low : last.volume
//
// Two histories that differ only in interior bars produce the SAME id. A
// caller that rewrites an interior bar in place and keeps both endpoints
// will keep receiving cached results for the old content. Hashing every bar
// would fix that but costs O(n) on every `compute()` call, which the
// coordinator is built to avoid.
// =============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ComputeError;
use crate::types::Bar;

/// Opaque identity signature of a bar history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetId(String);

impl DatasetId {
    /// Derive the signature of `bars`. Returns `None` for an empty history.
    pub fn from_bars(bars: &[Bar]) -> Option<Self> {
        let first = bars.first()?;
        let last = bars.last()?;
        Some(Self(format!(
            "{}:{}:{}:{}:{}:{}:{}",
            bars.len(),
            first.timestamp,
            last.timestamp,
            last.close,
            last.high,
            last.low,
            last.volume
        )))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DatasetId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parallel numeric columns of a bar history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Columns {
    pub timestamp: Vec<i64>,
    pub open: Vec<f64>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub close: Vec<f64>,
    pub volume: Vec<f64>,
}

impl Columns {
    /// Materialise `bars` into freshly allocated columns.
    pub fn from_bars(bars: &[Bar]) -> Self {
        let n = bars.len();
        let mut cols = Self {
            timestamp: Vec::with_capacity(n),
            open: Vec::with_capacity(n),
            high: Vec::with_capacity(n),
            low: Vec::with_capacity(n),
            close: Vec::with_capacity(n),
            volume: Vec::with_capacity(n),
        };
        for bar in bars {
            cols.timestamp.push(bar.timestamp);
            cols.open.push(bar.open);
            cols.high.push(bar.high);
            cols.low.push(bar.low);
            cols.close.push(bar.close);
            cols.volume.push(bar.volume);
        }
        cols
    }

    pub fn len(&self) -> usize {
        self.close.len()
    }

    pub fn is_empty(&self) -> bool {
        self.close.is_empty()
    }

    /// Check that every column has the same length.
    pub fn validate(&self) -> Result<(), ComputeError> {
        let n = self.close.len();
        let lens = [
            ("timestamp", self.timestamp.len()),
            ("open", self.open.len()),
            ("high", self.high.len()),
            ("low", self.low.len()),
            ("volume", self.volume.len()),
        ];
        for (name, len) in lens {
            if len != n {
                return Err(ComputeError::InvalidDataset(format!(
                    "column `{name}` has {len} values, expected {n}"
                )));
            }
        }
        Ok(())
    }
}

/// The backend's resident dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub id: DatasetId,
    pub columns: Columns,
}

impl Dataset {
    pub fn new(id: DatasetId, columns: Columns) -> Self {
        Self { id, columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
