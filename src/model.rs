//! K-medoids partitioning over a precomputed distance matrix

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use crate::distance::DistanceMatrix;
use crate::error::ValidationError;

/// Default bound on update steps.
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Seed used for k-medoids++ when none is given.
pub const DEFAULT_SEED: u64 = 42;

/// How the first medoids are chosen. Every strategy is reproducible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Initialization {
    /// Greedy PAM BUILD: start from the most central point, then repeatedly add
    /// the point that most reduces the total nearest-medoid distance.
    #[default]
    Build,
    /// The k points with the smallest total distance to all others.
    Heuristic,
    /// k-medoids++ driven by a seeded `StdRng`.
    KMedoidsPlusPlus { seed: u64 },
}

/// Parameters for a k-medoids fit.
#[derive(Debug, Clone, PartialEq)]
pub struct KMedoidsParams {
    pub n_clusters: usize,
    pub max_iterations: usize,
    pub init: Initialization,
}

impl KMedoidsParams {
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            init: Initialization::default(),
        }
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn init(mut self, init: Initialization) -> Self {
        self.init = init;
        self
    }

    /// Check the parameters against a dataset of `n_items` points.
    pub fn validate(&self, n_items: usize) -> Result<(), ValidationError> {
        if n_items == 0 {
            return Err(ValidationError::EmptyDataset);
        }
        if self.n_clusters < 1 || self.n_clusters > n_items {
            return Err(ValidationError::InvalidClusterCount {
                requested: self.n_clusters,
                n_items,
            });
        }
        if self.max_iterations == 0 {
            return Err(ValidationError::InvalidParameter {
                name: "max_iterations",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Fitted k-medoids partition.
#[derive(Debug, Clone, PartialEq)]
pub struct KMedoidsModel {
    /// Number of clusters
    pub n_clusters: usize,
    /// Cluster id of every point, indexed like the dataset
    pub labels: Vec<usize>,
    /// Record index of the medoid of each cluster id
    pub medoids: Vec<usize>,
    /// Sum of distances from every point to its medoid
    pub total_cost: f64,
    /// Update steps run
    pub n_iterations: usize,
    /// Whether an update step left every medoid in place
    pub converged: bool,
}

impl KMedoidsModel {
    /// Get cluster sizes
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.n_clusters];
        for &label in &self.labels {
            sizes[label] += 1;
        }
        sizes
    }

    /// Member indices of `cluster`, ascending.
    pub fn members(&self, cluster: usize) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter(|&(_, &label)| label == cluster)
            .map(|(i, _)| i)
            .collect()
    }

    /// Mean silhouette coefficient over all points.
    ///
    /// Points in singleton clusters score 0, and a single cluster scores 0.
    pub fn silhouette(&self, distances: &DistanceMatrix) -> f64 {
        let n = self.labels.len();
        if n < 2 || self.n_clusters < 2 {
            return 0.0;
        }

        let sizes = self.cluster_sizes();
        let mut total = 0.0;
        for i in 0..n {
            let own = self.labels[i];
            if sizes[own] < 2 {
                continue;
            }

            let mut sums = vec![0.0; self.n_clusters];
            for j in 0..n {
                if i != j {
                    sums[self.labels[j]] += distances.get(i, j);
                }
            }

            let a = sums[own] / (sizes[own] - 1) as f64;
            let b = (0..self.n_clusters)
                .filter(|&c| c != own && sizes[c] > 0)
                .map(|c| sums[c] / sizes[c] as f64)
                .fold(f64::INFINITY, f64::min);

            if b.is_finite() && a.max(b) > 0.0 {
                total += (b - a) / a.max(b);
            }
        }

        total / n as f64
    }
}

/// Fit k-medoids on a precomputed distance matrix.
///
/// Alternates assignment and medoid update until no medoid moves or
/// `params.max_iterations` update steps have run. Ties always resolve to the
/// lowest record index, so identical input gives identical output.
pub fn fit_kmedoids(
    distances: &DistanceMatrix,
    params: &KMedoidsParams,
) -> Result<KMedoidsModel, ValidationError> {
    params.validate(distances.len())?;

    let mut medoids = initial_medoids(distances, params.n_clusters, params.init);
    medoids.sort_unstable();
    let mut labels = assign(distances, &medoids);

    let mut n_iterations = 0;
    let mut converged = false;
    while n_iterations < params.max_iterations {
        n_iterations += 1;
        let updated = update_medoids(distances, &labels, medoids.len());
        if updated == medoids {
            converged = true;
            debug!(iteration = n_iterations, "k-medoids converged");
            break;
        }
        medoids = updated;
        labels = assign(distances, &medoids);
        debug!(
            iteration = n_iterations,
            cost = total_cost(distances, &labels, &medoids),
            "k-medoids step"
        );
    }

    if !converged {
        warn!(
            max_iterations = params.max_iterations,
            "k-medoids stopped at iteration bound"
        );
    }

    Ok(KMedoidsModel {
        n_clusters: params.n_clusters,
        total_cost: total_cost(distances, &labels, &medoids),
        labels,
        medoids,
        n_iterations,
        converged,
    })
}

fn initial_medoids(distances: &DistanceMatrix, k: usize, init: Initialization) -> Vec<usize> {
    match init {
        Initialization::Build => build_init(distances, k),
        Initialization::Heuristic => heuristic_init(distances, k),
        Initialization::KMedoidsPlusPlus { seed } => plus_plus_init(distances, k, seed),
    }
}

/// Index of the smallest value, first one on ties.
fn argmin(values: impl Iterator<Item = (usize, f64)>) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, v) in values {
        if best.map_or(true, |(_, b)| v < b) {
            best = Some((i, v));
        }
    }
    best.map(|(i, _)| i)
}

fn heuristic_init(distances: &DistanceMatrix, k: usize) -> Vec<usize> {
    let sums: Vec<f64> = (0..distances.len()).map(|i| distances.row_sum(i)).collect();
    let mut order: Vec<usize> = (0..distances.len()).collect();
    // stable: equal sums keep index order
    order.sort_by(|&a, &b| sums[a].total_cmp(&sums[b]));
    order.truncate(k);
    order
}

fn build_init(distances: &DistanceMatrix, k: usize) -> Vec<usize> {
    let n = distances.len();
    let Some(first) = argmin((0..n).map(|i| (i, distances.row_sum(i)))) else {
        return Vec::new();
    };

    let mut medoids = vec![first];
    let mut is_medoid = vec![false; n];
    is_medoid[first] = true;
    let mut nearest: Vec<f64> = distances.row(first).to_vec();

    while medoids.len() < k {
        let mut best: Option<(usize, f64)> = None;
        for c in (0..n).filter(|&c| !is_medoid[c]) {
            let gain: f64 = (0..n)
                .map(|j| (nearest[j] - distances.get(j, c)).max(0.0))
                .sum();
            if best.map_or(true, |(_, g)| gain > g) {
                best = Some((c, gain));
            }
        }
        let Some((chosen, _)) = best else { break };

        medoids.push(chosen);
        is_medoid[chosen] = true;
        for (j, d) in nearest.iter_mut().enumerate() {
            *d = d.min(distances.get(j, chosen));
        }
    }

    medoids
}

fn plus_plus_init(distances: &DistanceMatrix, k: usize, seed: u64) -> Vec<usize> {
    let n = distances.len();
    let mut rng = StdRng::seed_from_u64(seed);

    let first = rng.gen_range(0..n);
    let mut medoids = vec![first];
    let mut is_medoid = vec![false; n];
    is_medoid[first] = true;
    let mut nearest: Vec<f64> = distances.row(first).to_vec();

    while medoids.len() < k {
        let total: f64 = (0..n).filter(|&j| !is_medoid[j]).map(|j| nearest[j]).sum();

        let chosen = if total > 0.0 {
            let target = rng.gen::<f64>() * total;
            let mut acc = 0.0;
            let mut pick = None;
            for j in (0..n).filter(|&j| !is_medoid[j] && nearest[j] > 0.0) {
                acc += nearest[j];
                pick = Some(j);
                if acc > target {
                    break;
                }
            }
            pick
        } else {
            (0..n).find(|&j| !is_medoid[j])
        };
        let Some(chosen) = chosen else { break };

        medoids.push(chosen);
        is_medoid[chosen] = true;
        for (j, d) in nearest.iter_mut().enumerate() {
            *d = d.min(distances.get(j, chosen));
        }
    }

    medoids
}

/// Assign every point to the cluster of its nearest medoid.
///
/// A medoid always belongs to its own cluster, even when another medoid sits
/// at distance zero. Other ties go to the medoid with the lowest record index.
fn assign(distances: &DistanceMatrix, medoids: &[usize]) -> Vec<usize> {
    (0..distances.len())
        .map(|i| {
            if let Some(own) = medoids.iter().position(|&m| m == i) {
                return own;
            }
            let mut best_cluster = 0;
            let mut best = (f64::INFINITY, usize::MAX);
            for (cluster, &m) in medoids.iter().enumerate() {
                let candidate = (distances.get(i, m), m);
                if candidate.0 < best.0 || (candidate.0 == best.0 && candidate.1 < best.1) {
                    best = candidate;
                    best_cluster = cluster;
                }
            }
            best_cluster
        })
        .collect()
}

/// For each cluster pick the member with the smallest summed distance to the
/// other members.
fn update_medoids(distances: &DistanceMatrix, labels: &[usize], k: usize) -> Vec<usize> {
    let mut members: Vec<Vec<usize>> = vec![Vec::new(); k];
    for (i, &label) in labels.iter().enumerate() {
        members[label].push(i);
    }

    members
        .iter()
        .map(|cluster| {
            argmin(cluster.iter().map(|&c| {
                let cost: f64 = cluster.iter().map(|&m| distances.get(c, m)).sum();
                (c, cost)
            }))
            .unwrap_or_default()
        })
        .collect()
}

fn total_cost(distances: &DistanceMatrix, labels: &[usize], medoids: &[usize]) -> f64 {
    labels
        .iter()
        .enumerate()
        .map(|(i, &label)| distances.get(i, medoids[label]))
        .sum()
}
