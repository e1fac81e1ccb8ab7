//! Request-level pipeline: records -> normalize -> distances -> k-medoids

use linfa_nn::distance::{Distance, L1Dist};
use ndarray::Array2;
use tracing::{debug, info, info_span};

use crate::distance::DistanceMatrix;
use crate::error::ValidationError;
use crate::model::{
    fit_kmedoids, Initialization, KMedoidsModel, KMedoidsParams, DEFAULT_MAX_ITERATIONS,
};
use crate::normalize::MinMaxScaler;
use crate::ranges::{RangeAnalyzer, RangeReport, DEFAULT_WINDOW};
use crate::record::Record;
use crate::report::ClusteringReport;

/// Cluster count used when the caller does not give one.
pub const DEFAULT_CLUSTERS: usize = 3;

/// Engine settings shared by every request.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub max_iterations: usize,
    pub init: Initialization,
    /// Compute distance rows on the rayon pool
    pub parallel: bool,
    pub range_window: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            init: Initialization::default(),
            parallel: true,
            range_window: DEFAULT_WINDOW,
        }
    }
}

impl EngineConfig {
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_init(mut self, init: Initialization) -> Self {
        self.init = init;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_range_window(mut self, range_window: usize) -> Self {
        self.range_window = range_window;
        self
    }
}

/// Parse a textual cluster count, defaulting to [`DEFAULT_CLUSTERS`] when absent.
pub fn parse_cluster_count(raw: Option<&str>) -> Result<usize, ValidationError> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_CLUSTERS);
    };

    let value: i64 = raw
        .trim()
        .parse()
        .map_err(|_| ValidationError::MalformedClusterCount(raw.to_string()))?;
    if value < 1 {
        return Err(ValidationError::NonPositiveClusterCount(value));
    }
    usize::try_from(value).map_err(|_| ValidationError::MalformedClusterCount(raw.to_string()))
}

/// Everything produced by one clustering request.
#[derive(Debug, Clone)]
pub struct ClusterAnalysis {
    pub scaler: MinMaxScaler,
    /// Normalized features, one row per record
    pub features: Array2<f64>,
    pub distances: DistanceMatrix,
    pub model: KMedoidsModel,
}

impl ClusterAnalysis {
    pub fn report(&self) -> ClusteringReport {
        ClusteringReport::from_model(&self.model)
    }

    pub fn silhouette(&self) -> f64 {
        self.model.silhouette(&self.distances)
    }

    /// Cluster of the medoid nearest to `record` in the fitted feature space.
    /// Ties go to the medoid with the lowest record index.
    pub fn predict(&self, record: &Record) -> usize {
        let point = self.scaler.scale(record.features());

        let mut best_cluster = 0;
        let mut best = (f64::INFINITY, usize::MAX);
        for (cluster, &medoid) in self.model.medoids.iter().enumerate() {
            let d = L1Dist.distance(point.view(), self.features.row(medoid));
            if d < best.0 || (d == best.0 && medoid < best.1) {
                best = (d, medoid);
                best_cluster = cluster;
            }
        }
        best_cluster
    }
}

/// Stateless clustering engine; every call works on its own snapshot.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Partition `records` into `k` clusters.
    ///
    /// Request parameters are validated before any matrix is built.
    pub fn cluster(&self, records: &[Record], k: usize) -> crate::Result<ClusterAnalysis> {
        let span = info_span!("cluster", n_records = records.len(), k);
        let _guard = span.enter();

        let params = KMedoidsParams::new(k)
            .max_iterations(self.config.max_iterations)
            .init(self.config.init);
        params.validate(records.len())?;

        let scaler = MinMaxScaler::fit(records)?;
        let features = scaler.transform(records);
        debug!("features normalized");

        let distances = DistanceMatrix::manhattan(features.view(), self.config.parallel);
        debug!("distance matrix built");

        let model = fit_kmedoids(&distances, &params)?;
        info!(
            iterations = model.n_iterations,
            converged = model.converged,
            cost = model.total_cost,
            "clustering finished"
        );

        Ok(ClusterAnalysis {
            scaler,
            features,
            distances,
            model,
        })
    }

    /// Highest / medium / lowest slices per metric.
    pub fn ranges<'a>(&self, records: &'a [Record]) -> crate::Result<RangeReport<'a>> {
        let analyzer = RangeAnalyzer::new(self.config.range_window)?;
        Ok(analyzer.analyze(records))
    }

    /// Run clustering and range analysis side by side on the rayon pool.
    pub fn analyze<'a>(
        &self,
        records: &'a [Record],
        k: usize,
    ) -> crate::Result<(ClusterAnalysis, RangeReport<'a>)> {
        let (clusters, ranges) =
            rayon::join(|| self.cluster(records, k), || self.ranges(records));
        Ok((clusters?, ranges?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::record::{Metric, FEATURE_COUNT};

    fn record(id: usize, level: f64) -> Record {
        let mut features = [level; FEATURE_COUNT];
        features[Metric::DeRatio.index()] = 1.0;
        Record::new(id.to_string(), format!("STK{id}"), features).unwrap()
    }

    fn two_regimes() -> Vec<Record> {
        vec![
            record(0, 1.0),
            record(1, 1.2),
            record(2, 0.9),
            record(3, 9.0),
            record(4, 9.5),
            record(5, 8.8),
        ]
    }

    #[test]
    fn test_parse_cluster_count() {
        assert_eq!(parse_cluster_count(None).unwrap(), 3);
        assert_eq!(parse_cluster_count(Some(" 4 ")).unwrap(), 4);
        assert_eq!(
            parse_cluster_count(Some("0")).unwrap_err(),
            ValidationError::NonPositiveClusterCount(0)
        );
        assert_eq!(
            parse_cluster_count(Some("-2")).unwrap_err(),
            ValidationError::NonPositiveClusterCount(-2)
        );
        assert_eq!(
            parse_cluster_count(Some("three")).unwrap_err(),
            ValidationError::MalformedClusterCount("three".to_string())
        );
        assert!(parse_cluster_count(Some("2.5")).is_err());
    }

    #[test]
    fn test_cluster_two_regimes() {
        let records = two_regimes();
        let analysis = Engine::default().cluster(&records, 2).unwrap();
        let labels = &analysis.model.labels;

        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[0], labels[2]);
        assert_eq!(labels[3], labels[4]);
        assert_eq!(labels[3], labels[5]);
        assert_ne!(labels[0], labels[3]);
        assert_eq!(analysis.features.dim(), (6, FEATURE_COUNT));
        assert!(analysis.silhouette() > 0.5);
    }

    #[test]
    fn test_invalid_k_fails_before_work() {
        let records = two_regimes();
        let engine = Engine::default();

        assert!(matches!(engine.cluster(&records, 0), Err(Error::Validation(_))));
        assert!(matches!(engine.cluster(&records, 7), Err(Error::Validation(_))));
        assert!(matches!(
            engine.cluster(&[], 1),
            Err(Error::Validation(ValidationError::EmptyDataset))
        ));
    }

    #[test]
    fn test_predict_joins_nearest_regime() {
        let records = two_regimes();
        let analysis = Engine::default().cluster(&records, 2).unwrap();

        assert_eq!(analysis.predict(&record(9, 1.1)), analysis.model.labels[0]);
        assert_eq!(analysis.predict(&record(9, 12.0)), analysis.model.labels[3]);
    }

    #[test]
    fn test_sequential_and_parallel_agree() {
        let records = two_regimes();
        let parallel = Engine::new(EngineConfig::default()).cluster(&records, 3).unwrap();
        let sequential = Engine::new(EngineConfig::default().with_parallel(false))
            .cluster(&records, 3)
            .unwrap();

        assert_eq!(parallel.model, sequential.model);
        assert_eq!(parallel.distances, sequential.distances);
    }

    #[test]
    fn test_analyze_runs_both_pipelines() {
        let records = two_regimes();
        let (analysis, ranges) = Engine::default().analyze(&records, 2).unwrap();

        assert_eq!(analysis.report().clusters.len(), 2);
        assert_eq!(ranges.highest[&Metric::Roa].len(), 5);
        assert_eq!(ranges.lowest[&Metric::Roa][0].id(), "2");
    }

    #[test]
    fn test_zero_range_window_is_rejected() {
        let engine = Engine::new(EngineConfig::default().with_range_window(0));
        assert!(matches!(engine.ranges(&two_regimes()), Err(Error::Validation(_))));
    }
}
