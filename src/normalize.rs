//! Per-column min-max scaling of record features

use ndarray::{Array1, Array2};
use tracing::warn;

use crate::error::ValidationError;
use crate::record::{Metric, Record, FEATURE_COUNT};

/// Min-max scaler fitted on one dataset snapshot.
///
/// Each feature column is mapped independently onto `[0, 1]` with
/// `(v - min) / (max - min)`. A degenerate column (`min == max`) maps every
/// value to `0.0` so no `NaN` reaches the distance computation.
#[derive(Debug, Clone, PartialEq)]
pub struct MinMaxScaler {
    min: [f64; FEATURE_COUNT],
    max: [f64; FEATURE_COUNT],
}

impl MinMaxScaler {
    /// Value assigned to every entry of a degenerate column.
    pub const DEGENERATE_VALUE: f64 = 0.0;

    /// Learn per-column bounds from the records.
    pub fn fit(records: &[Record]) -> Result<Self, ValidationError> {
        if records.is_empty() {
            return Err(ValidationError::EmptyDataset);
        }

        let mut min = [f64::INFINITY; FEATURE_COUNT];
        let mut max = [f64::NEG_INFINITY; FEATURE_COUNT];
        for record in records {
            for (f, &value) in record.features().iter().enumerate() {
                min[f] = min[f].min(value);
                max[f] = max[f].max(value);
            }
        }

        let scaler = Self { min, max };
        for metric in scaler.degenerate_columns() {
            warn!(metric = %metric, value = min[metric.index()], "degenerate column, scaling to 0");
        }
        Ok(scaler)
    }

    pub fn min(&self, metric: Metric) -> f64 {
        self.min[metric.index()]
    }

    pub fn max(&self, metric: Metric) -> f64 {
        self.max[metric.index()]
    }

    /// Columns whose fitted minimum equals the maximum.
    pub fn degenerate_columns(&self) -> Vec<Metric> {
        Metric::ALL
            .into_iter()
            .filter(|m| self.min[m.index()] >= self.max[m.index()])
            .collect()
    }

    /// Scale a single feature vector. Values outside the fitted range map
    /// outside `[0, 1]`.
    pub fn scale(&self, features: &[f64; FEATURE_COUNT]) -> Array1<f64> {
        features
            .iter()
            .enumerate()
            .map(|(f, &value)| self.scale_value(f, value))
            .collect()
    }

    /// Scale every record into an `(n_records, FEATURE_COUNT)` matrix, row order
    /// preserved.
    pub fn transform(&self, records: &[Record]) -> Array2<f64> {
        let mut out = Array2::zeros((records.len(), FEATURE_COUNT));
        for (mut row, record) in out.outer_iter_mut().zip(records) {
            for (f, &value) in record.features().iter().enumerate() {
                row[f] = self.scale_value(f, value);
            }
        }
        out
    }

    fn scale_value(&self, f: usize, value: f64) -> f64 {
        let (min, max) = (self.min[f], self.max[f]);
        if min >= max {
            return Self::DEGENERATE_VALUE;
        }

        let range = max - min;
        if range.is_finite() {
            (value - min) / range
        } else {
            // Bounds far enough apart that `max - min` overflows
            (value / 2.0 - min / 2.0) / (max / 2.0 - min / 2.0)
        }
    }
}

/// Fit on the records and return their scaled features in one step.
pub fn normalize(records: &[Record]) -> Result<(MinMaxScaler, Array2<f64>), ValidationError> {
    let scaler = MinMaxScaler::fit(records)?;
    let features = scaler.transform(records);
    Ok((scaler, features))
}
