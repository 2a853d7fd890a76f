//! Aggregates over nullable values
//!
//! Absent values are ignored; a result is absent only when every input is.

use std::collections::VecDeque;

/// Minimum of the present values
pub fn min_present<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    values.into_iter().flatten().fold(None, |acc, v| match acc {
        Some(m) if m <= v => Some(m),
        _ => Some(v),
    })
}

/// Arithmetic mean of the present values
pub fn mean_present<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let (sum, count) = values
        .into_iter()
        .flatten()
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Fixed-size window over the most recent observations of one group
///
/// Slots hold `None` for observations whose value was missing: they still
/// occupy a position in the window but are skipped by the mean.
#[derive(Debug, Clone)]
pub struct TrailingWindow {
    size: usize,
    min_periods: usize,
    values: VecDeque<Option<f64>>,
}

impl TrailingWindow {
    pub fn new(size: usize, min_periods: usize) -> Self {
        Self {
            size,
            min_periods,
            values: VecDeque::with_capacity(size),
        }
    }

    pub fn push(&mut self, value: Option<f64>) {
        if self.size == 0 {
            return;
        }
        if self.values.len() == self.size {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    /// Mean of the window, or `None` below `min_periods` present values
    pub fn mean(&self) -> Option<f64> {
        let present = self.values.iter().flatten().count();
        if present == 0 || present < self.min_periods {
            return None;
        }
        mean_present(self.values.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Convert a provider number into a rank or count
///
/// Returns `None` for missing, negative, non-finite or fractional input.
pub fn as_whole(value: Option<f64>) -> Option<u32> {
    let v = value?;
    if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64 {
        Some(v as u32)
    } else {
        None
    }
}
