//! Command-line interface definitions and argument parsing

use clap::{Parser, ValueEnum};

use crate::engine::{parse_cluster_count, EngineConfig};
use crate::model::{Initialization, DEFAULT_MAX_ITERATIONS, DEFAULT_SEED};
use crate::ranges::DEFAULT_WINDOW;
use crate::record::{Metric, FEATURE_COUNT};

/// Medoid initialization strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InitArg {
    Build,
    Heuristic,
    #[value(name = "kmedoids++")]
    KMedoidsPlusPlus,
}

/// Cluster companies by financial ratios with k-medoids
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input file (CSV, or a JSON array of reports)
    #[arg(short, long, default_value = "financial_reports.csv")]
    pub input: String,

    /// Number of clusters
    #[arg(short = 'k', long, default_value = "3")]
    pub clusters: String,

    /// Maximum k-medoids update steps
    #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
    pub max_iters: usize,

    /// Medoid initialization strategy
    #[arg(long, value_enum, default_value_t = InitArg::Build)]
    pub init: InitArg,

    /// Seed for kmedoids++ initialization
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Compute distances on a single thread
    #[arg(long)]
    pub sequential: bool,

    /// Include highest / medium / lowest slices per metric
    #[arg(long)]
    pub ranges: bool,

    /// Records per range slice
    #[arg(long, default_value_t = DEFAULT_WINDOW)]
    pub range_window: usize,

    /// Prediction mode: the eight ratios of a new company, comma-separated
    /// Example: --predict "2.5,17.1,350,30.2,1900,2.4,12.5,5.1"
    /// (roa,roe,eps,npm,bv,price_to_bv,pe_ratio,de_ratio)
    #[arg(short, long)]
    pub predict: Option<String>,

    /// Write the JSON report here instead of stdout
    #[arg(short, long)]
    pub output: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Validated cluster count.
    pub fn cluster_count(&self) -> anyhow::Result<usize> {
        Ok(parse_cluster_count(Some(self.clusters.as_str()))?)
    }

    pub fn engine_config(&self) -> EngineConfig {
        let init = match self.init {
            InitArg::Build => Initialization::Build,
            InitArg::Heuristic => Initialization::Heuristic,
            InitArg::KMedoidsPlusPlus => Initialization::KMedoidsPlusPlus { seed: self.seed },
        };

        EngineConfig::default()
            .with_max_iterations(self.max_iters)
            .with_init(init)
            .with_parallel(!self.sequential)
            .with_range_window(self.range_window)
    }

    /// Parse the eight ratio values from the predict string.
    pub fn parse_predict_values(&self) -> anyhow::Result<Option<[f64; FEATURE_COUNT]>> {
        let Some(ref predict_str) = self.predict else {
            return Ok(None);
        };

        let parts: Vec<&str> = predict_str.split(',').collect();
        if parts.len() != FEATURE_COUNT {
            anyhow::bail!(
                "Predict values must be {} comma-separated numbers ({})",
                FEATURE_COUNT,
                Metric::ALL.map(Metric::name).join(",")
            );
        }

        let mut values = [0.0; FEATURE_COUNT];
        for ((slot, part), metric) in values.iter_mut().zip(&parts).zip(Metric::ALL) {
            *slot = part
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid {} value: {}", metric, part))?;
        }

        Ok(Some(values))
    }
}
