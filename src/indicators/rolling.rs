// =============================================================================
// Streaming building blocks shared by the indicator algorithms
// =============================================================================
//
// - `RollingExtreme` — monotonic deque, O(1) amortised rolling max / min and
//                      the index where it occurred.
// - `RollingWindow`  — fixed-size window with running sum and sum of squares.
// - `Ema`            — EMA recurrence seeded with the SMA of the first
//                      `period` inputs.
// - `Wilder`         — Wilder smoothing, seeded the same way.
//
// Every `push`/`update` returns `None` until the warm-up period is complete.
// =============================================================================

use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extreme {
    Max,
    Min,
}

/// Rolling maximum or minimum over the last `window` pushes.
///
/// Entries are kept in monotonic order: for `Max`, values decrease from the
/// front, so the front is always the window maximum. Ties keep the most
/// recent index.
#[derive(Debug, Clone)]
pub struct RollingExtreme {
    window: usize,
    kind: Extreme,
    deque: VecDeque<(usize, f64)>,
}

impl RollingExtreme {
    pub fn new(window: usize, kind: Extreme) -> Self {
        Self {
            window: window.max(1),
            kind,
            deque: VecDeque::new(),
        }
    }

    pub fn max(window: usize) -> Self {
        Self::new(window, Extreme::Max)
    }

    pub fn min(window: usize) -> Self {
        Self::new(window, Extreme::Min)
    }

    /// Push the value at bar `index` (indices must be increasing) and return
    /// `(index_of_extreme, extreme)` for the window ending at `index`.
    pub fn push(&mut self, index: usize, value: f64) -> (usize, f64) {
        while let Some(&(_, back)) = self.deque.back() {
            let dominated = match self.kind {
                Extreme::Max => back <= value,
                Extreme::Min => back >= value,
            };
            if !dominated {
                break;
            }
            self.deque.pop_back();
        }
        self.deque.push_back((index, value));

        if index >= self.window {
            let oldest_kept = index + 1 - self.window;
            while let Some(&(i, _)) = self.deque.front() {
                if i >= oldest_kept {
                    break;
                }
                self.deque.pop_front();
            }
        }

        // The value just pushed is always present, so the deque is non-empty.
        self.deque.front().copied().unwrap_or((index, value))
    }
}

/// Fixed-size trailing window with running sum and sum of squares.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    window: usize,
    values: VecDeque<f64>,
    sum: f64,
    sum_sq: f64,
}

impl RollingWindow {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            values: VecDeque::new(),
            sum: 0.0,
            sum_sq: 0.0,
        }
    }

    /// Add a value, evicting the oldest once the window is full.
    /// Returns `true` when the window holds exactly `window` values.
    pub fn push(&mut self, value: f64) -> bool {
        self.values.push_back(value);
        self.sum += value;
        self.sum_sq += value * value;
        if self.values.len() > self.window {
            if let Some(old) = self.values.pop_front() {
                self.sum -= old;
                self.sum_sq -= old * old;
            }
        }
        self.is_full()
    }

    pub fn is_full(&self) -> bool {
        self.values.len() == self.window
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn mean(&self) -> f64 {
        self.sum / self.values.len().max(1) as f64
    }

    /// Population standard deviation; variance is clamped at zero to absorb
    /// floating-point drift in the running sums.
    pub fn std_dev(&self) -> f64 {
        let n = self.values.len().max(1) as f64;
        let mean = self.sum / n;
        let variance = (self.sum_sq / n - mean * mean).max(0.0);
        variance.sqrt()
    }

    pub fn values(&self) -> impl Iterator<Item = &f64> {
        self.values.iter()
    }

    /// Mean of the current window if it is full, otherwise `None`.
    pub fn full_mean(&self) -> Option<f64> {
        self.is_full().then(|| self.mean())
    }
}

/// Exponential moving average, `w = 2 / (period + 1)`.
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    multiplier: f64,
    seen: usize,
    seed_sum: f64,
    value: Option<f64>,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            multiplier: 2.0 / (period as f64 + 1.0),
            seen: 0,
            seed_sum: 0.0,
            value: None,
        }
    }

    pub fn update(&mut self, x: f64) -> Option<f64> {
        match self.value {
            Some(prev) => {
                let next = x * self.multiplier + prev * (1.0 - self.multiplier);
                self.value = Some(next);
            }
            None => {
                self.seen += 1;
                self.seed_sum += x;
                if self.seen == self.period {
                    self.value = Some(self.seed_sum / self.period as f64);
                }
            }
        }
        self.value
    }

    /// Seed directly with a value (no SMA warm-up).
    pub fn seeded(period: usize, seed: f64) -> Self {
        let mut ema = Self::new(period);
        ema.value = Some(seed);
        ema
    }
}

/// Wilder smoothing: `avg = (avg * (n - 1) + x) / n` after an SMA seed.
#[derive(Debug, Clone)]
pub struct Wilder {
    period: usize,
    seen: usize,
    seed_sum: f64,
    value: Option<f64>,
}

impl Wilder {
    pub fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
            seen: 0,
            seed_sum: 0.0,
            value: None,
        }
    }

    pub fn update(&mut self, x: f64) -> Option<f64> {
        let n = self.period as f64;
        match self.value {
            Some(prev) => self.value = Some((prev * (n - 1.0) + x) / n),
            None => {
                self.seen += 1;
                self.seed_sum += x;
                if self.seen == self.period {
                    self.value = Some(self.seed_sum / n);
                }
            }
        }
        self.value
    }
}
