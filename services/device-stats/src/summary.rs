//! Per-axis descriptive statistics
//!
//! Reduces the values of one axis to min, max, count, sum and median.

use serde::{Deserialize, Serialize};

/// Summary statistics over one axis of a set of readings.
///
/// An empty input yields all-zero fields with `count == 0`. Callers must treat
/// a zero count as "no data" rather than trusting the other fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisSummary {
    #[serde(rename = "min_value")]
    pub min: f64,
    #[serde(rename = "max_value")]
    pub max: f64,
    pub count: usize,
    pub sum: f64,
    pub median: f64,
}

impl AxisSummary {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Reduce a sequence of values to an [`AxisSummary`]
pub fn summarize(values: &[f64]) -> AxisSummary {
    if values.is_empty() {
        return AxisSummary::default();
    }

    let mut sum = 0.0;
    let mut min = values[0];
    let mut max = values[0];
    for &v in values {
        sum += v;
        min = min.min(v);
        max = max.max(v);
    }

    AxisSummary {
        min,
        max,
        count: values.len(),
        sum,
        median: median(values),
    }
}

// Caller guarantees `values` is non-empty.
fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}
