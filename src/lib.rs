//! finclust: grouping companies by their financial ratios
//!
//! The engine min-max normalizes eight ratio features per record, builds a
//! Manhattan distance matrix, and partitions the records with deterministic
//! k-medoids. A separate range analyzer ranks records per metric.

pub mod cli;
pub mod data;
pub mod distance;
pub mod engine;
pub mod error;
pub mod model;
pub mod normalize;
pub mod ranges;
pub mod record;
pub mod report;

// Re-export public items for easier access
pub use cli::Args;
pub use data::load_records;
pub use distance::DistanceMatrix;
pub use engine::{parse_cluster_count, ClusterAnalysis, Engine, EngineConfig, DEFAULT_CLUSTERS};
pub use error::{DataError, Error, ValidationError};
pub use model::{fit_kmedoids, Initialization, KMedoidsModel, KMedoidsParams};
pub use normalize::MinMaxScaler;
pub use ranges::{RangeAnalyzer, RangeReport};
pub use record::{Metric, Record, FEATURE_COUNT};
pub use report::{write_cluster_statistics, ClusteringReport};

/// Common result type used throughout the library
pub type Result<T> = std::result::Result<T, Error>;
