//! Pairwise Manhattan distances over normalized feature vectors

use linfa_nn::distance::{Distance, L1Dist};
use ndarray::{Array2, ArrayView1, ArrayView2};
use rayon::prelude::*;

use crate::error::ValidationError;

/// Dense, symmetric `N x N` dissimilarity matrix with a zero diagonal.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    data: Array2<f64>,
}

impl DistanceMatrix {
    /// Manhattan (L1) distances between every pair of rows of `points`.
    pub fn manhattan(points: ArrayView2<f64>, parallel: bool) -> Self {
        Self::build_with(points, &L1Dist, parallel)
    }

    /// Distances between every pair of rows under `metric`.
    ///
    /// Each unordered pair is computed once and mirrored, so the result is
    /// exactly symmetric and identical whether rows run in parallel or not.
    pub fn build_with<M>(points: ArrayView2<f64>, metric: &M, parallel: bool) -> Self
    where
        M: Distance<f64> + Sync,
    {
        let n = points.nrows();
        let upper_row = |i: usize| -> Vec<f64> {
            ((i + 1)..n)
                .map(|j| metric.distance(points.row(i), points.row(j)))
                .collect()
        };

        let rows: Vec<Vec<f64>> = if parallel {
            (0..n).into_par_iter().map(upper_row).collect()
        } else {
            (0..n).map(upper_row).collect()
        };

        let mut data = Array2::zeros((n, n));
        for (i, row) in rows.into_iter().enumerate() {
            for (offset, d) in row.into_iter().enumerate() {
                let j = i + 1 + offset;
                data[[i, j]] = d;
                data[[j, i]] = d;
            }
        }

        Self { data }
    }

    /// Wrap a caller-supplied matrix after checking it is a valid dissimilarity.
    pub fn from_precomputed(data: Array2<f64>) -> Result<Self, ValidationError> {
        let (rows, cols) = data.dim();
        if rows != cols {
            return Err(ValidationError::InvalidDistanceMatrix(format!(
                "expected a square matrix, got {rows}x{cols}"
            )));
        }

        for ((i, j), &d) in data.indexed_iter() {
            if !d.is_finite() || d < 0.0 {
                return Err(ValidationError::InvalidDistanceMatrix(format!(
                    "entry ({i}, {j}) is {d}"
                )));
            }
            if i == j && d != 0.0 {
                return Err(ValidationError::InvalidDistanceMatrix(format!(
                    "diagonal entry {i} is {d}"
                )));
            }
            if d != data[[j, i]] {
                return Err(ValidationError::InvalidDistanceMatrix(format!(
                    "entries ({i}, {j}) and ({j}, {i}) differ"
                )));
            }
        }

        Ok(Self { data })
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.data.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[[i, j]]
    }

    /// Distances from point `i` to every point.
    pub fn row(&self, i: usize) -> ArrayView1<'_, f64> {
        self.data.row(i)
    }

    /// Sum of distances from point `i` to every point.
    pub fn row_sum(&self, i: usize) -> f64 {
        self.data.row(i).iter().sum()
    }
}
