//! Serializable results and console statistics

use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};
use std::io::{self, Write};

use crate::engine::ClusterAnalysis;
use crate::model::KMedoidsModel;
use crate::ranges::RangeReport;
use crate::record::Record;

/// One cluster: its member indices and its medoid index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterSummary {
    pub id: usize,
    pub members: Vec<usize>,
    pub medoid: usize,
}

impl Serialize for ClusterSummary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ClusterSummary", 2)?;
        state.serialize_field("Data Indices", &self.members)?;
        state.serialize_field("Medoid Index", &self.medoid)?;
        state.end()
    }
}

/// Cluster id -> members and medoid, for ids `0..k`.
///
/// Serializes as `{"Cluster 0": {"Data Indices": [..], "Medoid Index": m}, ..}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusteringReport {
    pub clusters: Vec<ClusterSummary>,
}

impl ClusteringReport {
    pub fn from_model(model: &KMedoidsModel) -> Self {
        let mut clusters: Vec<ClusterSummary> = model
            .medoids
            .iter()
            .enumerate()
            .map(|(id, &medoid)| ClusterSummary {
                id,
                members: Vec::new(),
                medoid,
            })
            .collect();
        for (i, &label) in model.labels.iter().enumerate() {
            clusters[label].members.push(i);
        }
        Self { clusters }
    }
}

impl Serialize for ClusteringReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.clusters.len()))?;
        for cluster in &self.clusters {
            map.serialize_entry(&format!("Cluster {}", cluster.id), cluster)?;
        }
        map.end()
    }
}

/// Document written by the command-line tool.
#[derive(Debug, Serialize)]
pub struct AnalysisDocument<'a> {
    pub clusters: ClusteringReport,
    pub total_cost: f64,
    pub silhouette: f64,
    pub iterations: usize,
    pub converged: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranges: Option<RangeReport<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicted_cluster: Option<usize>,
}

impl<'a> AnalysisDocument<'a> {
    pub fn new(analysis: &ClusterAnalysis) -> Self {
        Self {
            clusters: analysis.report(),
            total_cost: analysis.model.total_cost,
            silhouette: analysis.silhouette(),
            iterations: analysis.model.n_iterations,
            converged: analysis.model.converged,
            ranges: None,
            predicted_cluster: None,
        }
    }
}

/// Write a cluster statistics table to `out`.
///
/// The command-line tool sends this to stderr so stdout only ever carries the
/// JSON document.
pub fn write_cluster_statistics<W: Write>(
    out: &mut W,
    records: &[Record],
    analysis: &ClusterAnalysis,
) -> io::Result<()> {
    let model = &analysis.model;

    writeln!(out, "\n=== Cluster Statistics ===")?;
    writeln!(out, "Number of clusters: {}", model.n_clusters)?;
    writeln!(out, "Total records: {}", records.len())?;
    writeln!(out, "Total distance to medoids: {:.4}", model.total_cost)?;
    writeln!(out, "Silhouette score: {:.3}", analysis.silhouette())?;
    writeln!(
        out,
        "Iterations: {} ({})",
        model.n_iterations,
        if model.converged { "converged" } else { "iteration bound reached" }
    )?;

    writeln!(out, "\n  Cluster | Size | Share  | Medoid")?;
    writeln!(out, "  --------|------|--------|-------------------")?;
    for (i, &size) in model.cluster_sizes().iter().enumerate() {
        let percentage = (size as f64 / records.len() as f64) * 100.0;
        let medoid = &records[model.medoids[i]];
        writeln!(
            out,
            "  {:7} | {:4} | {:5.1}% | #{} {}",
            i,
            size,
            percentage,
            model.medoids[i],
            medoid.stock_name()
        )?;
    }
    Ok(())
}
