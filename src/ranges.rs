//! Ranked highest / medium / lowest slices per metric

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::error::ValidationError;
use crate::record::{Metric, Record};

/// Default number of records in each slice.
pub const DEFAULT_WINDOW: usize = 5;

/// Records per metric, ordered ascending by that metric's value.
pub type MetricSlices<'a> = BTreeMap<Metric, Vec<&'a Record>>;

/// Ranked slices of a dataset, borrowed from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeReport<'a> {
    pub highest: MetricSlices<'a>,
    pub medium: MetricSlices<'a>,
    pub lowest: MetricSlices<'a>,
}

/// Ranks records independently per metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeAnalyzer {
    window: usize,
}

impl Default for RangeAnalyzer {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
        }
    }
}

impl RangeAnalyzer {
    pub fn new(window: usize) -> Result<Self, ValidationError> {
        if window == 0 {
            return Err(ValidationError::InvalidParameter {
                name: "range_window",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(Self { window })
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Slice every metric in [`Metric::ALL`].
    pub fn analyze<'a>(&self, records: &'a [Record]) -> RangeReport<'a> {
        let mut report = RangeReport {
            highest: BTreeMap::new(),
            medium: BTreeMap::new(),
            lowest: BTreeMap::new(),
        };

        for metric in Metric::ALL {
            let sorted = sorted_by(records, metric);
            let n = sorted.len();
            let mid_start = n / 3;

            report
                .lowest
                .insert(metric, sorted[..self.window.min(n)].to_vec());
            report
                .highest
                .insert(metric, sorted[n.saturating_sub(self.window)..].to_vec());
            report.medium.insert(
                metric,
                sorted[mid_start..mid_start.saturating_add(self.window).min(n)].to_vec(),
            );
        }

        report
    }
}

/// Stable ascending sort on one metric; equal values keep dataset order.
fn sorted_by(records: &[Record], metric: Metric) -> Vec<&Record> {
    let mut sorted: Vec<&Record> = records.iter().collect();
    sorted.sort_by(|a, b| {
        a.value(metric)
            .partial_cmp(&b.value(metric))
            .unwrap_or(Ordering::Equal)
    });
    sorted
}
