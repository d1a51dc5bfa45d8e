//! DBSCAN over arbitrary feature vectors with Gower distance.
//!
//! Unlike sparse CCL this needs no sort order, at the cost of a quadratic
//! neighbourhood search. Labels: `0` is noise, positive values are cluster
//! ids starting at 1.
#![allow(clippy::cast_precision_loss)]

use std::collections::VecDeque;

use trackpix_core::clustering::ClusteringConfig;
use trackpix_core::error::ClusteringError;

/// Label of points that belong to no cluster.
pub const NOISE: i32 = 0;

const UNCLASSIFIED: i32 = -1;

/// Mean absolute per-dimension difference of two feature vectors.
///
/// Features are assumed to be normalized to comparable scales. Two empty
/// vectors are at distance 0.
#[inline]
#[must_use]
pub fn gower_distance(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    if a.is_empty() {
        return 0.0;
    }
    let sum: f64 = a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum();
    sum / a.len() as f64
}

/// DBSCAN parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DbscanParams {
    /// Neighbourhood radius.
    pub eps: f64,
    /// Minimum neighbourhood size (including the point itself) of a core point.
    pub min_pts: usize,
}

impl Default for DbscanParams {
    fn default() -> Self {
        Self {
            eps: 0.3,
            min_pts: 5,
        }
    }
}

impl From<&ClusteringConfig> for DbscanParams {
    fn from(config: &ClusteringConfig) -> Self {
        Self {
            eps: config.eps,
            min_pts: config.min_pts,
        }
    }
}

impl DbscanParams {
    /// Rejects `min_pts < 1` and negative or non-finite `eps`.
    ///
    /// # Errors
    /// Returns [`ClusteringError::InvalidConfig`] on invalid parameters.
    pub fn validate(&self) -> Result<(), ClusteringError> {
        if self.min_pts < 1 {
            return Err(ClusteringError::InvalidConfig(
                "min_pts must be at least 1".to_string(),
            ));
        }
        if !self.eps.is_finite() || self.eps < 0.0 {
            return Err(ClusteringError::InvalidConfig(format!(
                "eps must be finite and non-negative, got {}",
                self.eps
            )));
        }
        Ok(())
    }
}

/// Density clustering with Gower distance.
#[derive(Clone, Debug, Default)]
pub struct DbscanGowerClustering {
    params: DbscanParams,
}

impl DbscanGowerClustering {
    /// Creates the algorithm with the given parameters.
    #[must_use]
    pub fn new(params: DbscanParams) -> Self {
        Self { params }
    }

    /// Parameters in use.
    #[must_use]
    pub fn params(&self) -> &DbscanParams {
        &self.params
    }

    /// Labels every feature vector as noise (`0`) or a cluster id (`> 0`).
    ///
    /// # Errors
    /// Returns an error for invalid parameters or feature vectors of
    /// different dimensions.
    pub fn cluster<V: AsRef<[f64]>>(&self, features: &[V]) -> Result<Vec<i32>, ClusteringError> {
        self.params.validate()?;
        if let Some(first) = features.first() {
            let expected = first.as_ref().len();
            if let Some((index, found)) = features
                .iter()
                .map(|f| f.as_ref().len())
                .enumerate()
                .find(|&(_, len)| len != expected)
            {
                return Err(ClusteringError::FeatureDimensionMismatch {
                    index,
                    expected,
                    found,
                });
            }
        }

        let n = features.len();
        let mut labels = vec![UNCLASSIFIED; n];
        let mut neighbors = Vec::new();
        let mut queue = VecDeque::new();
        let mut cluster_id = 1;

        for i in 0..n {
            if labels[i] != UNCLASSIFIED {
                continue;
            }

            self.region_query_into(features, i, &mut neighbors);
            if neighbors.len() < self.params.min_pts {
                labels[i] = NOISE;
                continue;
            }

            labels[i] = cluster_id;
            queue.clear();
            queue.extend(neighbors.iter().copied());
            self.expand_cluster(features, cluster_id, &mut labels, &mut queue, &mut neighbors);
            cluster_id += 1;
        }

        debug_assert!(labels.iter().all(|&label| label != UNCLASSIFIED));
        Ok(labels)
    }

    fn region_query_into<V: AsRef<[f64]>>(
        &self,
        features: &[V],
        idx: usize,
        neighbors: &mut Vec<usize>,
    ) {
        let point = features[idx].as_ref();
        neighbors.clear();
        neighbors.extend(
            features
                .iter()
                .enumerate()
                .filter(|(_, other)| gower_distance(point, other.as_ref()) <= self.params.eps)
                .map(|(j, _)| j),
        );
    }

    fn expand_cluster<V: AsRef<[f64]>>(
        &self,
        features: &[V],
        cluster_id: i32,
        labels: &mut [i32],
        queue: &mut VecDeque<usize>,
        neighbors: &mut Vec<usize>,
    ) {
        while let Some(idx) = queue.pop_front() {
            if labels[idx] == NOISE {
                // Border point: joins the cluster but is not expanded.
                labels[idx] = cluster_id;
            }
            if labels[idx] != UNCLASSIFIED {
                continue;
            }
            labels[idx] = cluster_id;

            self.region_query_into(features, idx, neighbors);
            if neighbors.len() >= self.params.min_pts {
                queue.extend(neighbors.iter().copied().filter(|&j| labels[j] <= NOISE));
            }
        }
    }
}
