//! Clustering configuration, connectivity and cluster containers.

use crate::cell::Cell;
use crate::error::ClusteringError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Adjacency rule used by connected-component labeling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Connectivity {
    /// Strips: neighbouring `channel0` on the same module, `channel1` ignored.
    Strip1D,
    /// Pixels: 8-connectivity on the same module.
    #[default]
    Pixel2D,
}

impl Connectivity {
    /// Checks whether two cells touch.
    #[inline]
    #[must_use]
    pub fn is_adjacent(self, a: &Cell, b: &Cell) -> bool {
        if a.module_index != b.module_index || a.channel0.abs_diff(b.channel0) > 1 {
            return false;
        }
        match self {
            Connectivity::Strip1D => true,
            Connectivity::Pixel2D => a.channel1.abs_diff(b.channel1) <= 1,
        }
    }

    /// Checks whether an earlier cell `a` is out of reach of `b` and of every
    /// cell sorted after `b`.
    ///
    /// Only valid when `a` precedes `b` in column-major order.
    #[inline]
    #[must_use]
    pub fn is_far_enough(self, a: &Cell, b: &Cell) -> bool {
        a.module_index != b.module_index || b.channel0 > a.channel0.saturating_add(1)
    }
}

/// Configuration for the clusterization chain.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ClusteringConfig {
    /// Use density (DBSCAN-Gower) clustering instead of connected components.
    pub use_density_clustering: bool,
    /// Neighbourhood radius for density clustering (Gower distance).
    pub eps: f64,
    /// Minimum neighbourhood size of a core point for density clustering.
    pub min_pts: usize,
    /// Adjacency rule for connected-component labeling.
    pub connectivity: Connectivity,
    /// Run labeling and measurement creation on the rayon thread pool.
    pub parallel: bool,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            use_density_clustering: false,
            eps: 0.3,
            min_pts: 5,
            connectivity: Connectivity::Pixel2D,
            parallel: false,
        }
    }
}

impl ClusteringConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects density clustering.
    #[must_use]
    pub fn with_density_clustering(mut self, enabled: bool) -> Self {
        self.use_density_clustering = enabled;
        self
    }

    /// Sets the density neighbourhood radius.
    #[must_use]
    pub fn with_eps(mut self, eps: f64) -> Self {
        self.eps = eps;
        self
    }

    /// Sets the minimum core-point neighbourhood size.
    #[must_use]
    pub fn with_min_pts(mut self, min_pts: usize) -> Self {
        self.min_pts = min_pts;
        self
    }

    /// Sets the adjacency rule.
    #[must_use]
    pub fn with_connectivity(mut self, connectivity: Connectivity) -> Self {
        self.connectivity = connectivity;
        self
    }

    /// Enables parallel execution.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Rejects unusable density parameters.
    ///
    /// The density parameters are checked even when connected-component
    /// labeling is selected, so a bad configuration file fails early.
    ///
    /// # Errors
    /// Returns [`ClusteringError::InvalidConfig`] for `min_pts < 1` or a
    /// negative or non-finite `eps`.
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

/// Clusters as lists of cell indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClusterCollection {
    /// Cell indices of each cluster, in cell order.
    pub cell_indices: Vec<Vec<usize>>,
}

impl ClusterCollection {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Groups cells by dense connected-component labels `0..num_clusters`.
    ///
    /// # Panics
    /// Panics if a label is not below `num_clusters`.
    #[must_use]
    pub fn from_labels(labels: &[u32], num_clusters: usize) -> Self {
        let mut cell_indices = vec![Vec::new(); num_clusters];
        for (cell, &label) in labels.iter().enumerate() {
            cell_indices[label as usize].push(cell);
        }
        Self { cell_indices }
    }

    /// Groups cells by density labels, dropping noise (`0`).
    ///
    /// Cluster `k` of the result holds the cells labeled `k + 1`.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub fn from_density_labels(labels: &[i32]) -> Self {
        let num_clusters = labels.iter().copied().max().unwrap_or(0).max(0) as usize;
        let mut cell_indices = vec![Vec::new(); num_clusters];
        for (cell, &label) in labels.iter().enumerate() {
            debug_assert!(label >= 0, "unclassified cell {cell} in density labels");
            if label > 0 {
                cell_indices[label as usize - 1].push(cell);
            }
        }
        Self { cell_indices }
    }

    /// Number of clusters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cell_indices.len()
    }

    /// Returns true if there are no clusters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cell_indices.is_empty()
    }

    /// Adds a cluster.
    pub fn push(&mut self, cells: Vec<usize>) {
        self.cell_indices.push(cells);
    }

    /// Appends the clusters of `other`, shifting its cell indices by `offset`.
    pub fn append_shifted(&mut self, other: ClusterCollection, offset: usize) {
        self.cell_indices.extend(
            other
                .cell_indices
                .into_iter()
                .map(|cells| cells.into_iter().map(|i| i + offset).collect()),
        );
    }

    /// Returns the cell indices of cluster `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&[usize]> {
        self.cell_indices.get(index).map(Vec::as_slice)
    }

    /// Iterates over the clusters.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &[usize]> {
        self.cell_indices.iter().map(Vec::as_slice)
    }

    /// Keeps only the clusters for which `keep` returns true.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&[usize]) -> bool,
    {
        self.cell_indices.retain(|cells| keep(cells));
    }

    /// Total number of clustered cells.
    #[must_use]
    pub fn total_cells(&self) -> usize {
        self.cell_indices.iter().map(Vec::len).sum()
    }

    /// Per-cell cluster labels; cells outside every cluster get `-1`.
    ///
    /// Cluster counts are bounded by the 32-bit cell limit of the labelers;
    /// a count past `i32::MAX` trips a debug assertion.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn to_labels(&self, num_cells: usize) -> Vec<i32> {
        debug_assert!(
            i32::try_from(self.cell_indices.len()).is_ok(),
            "{} clusters exceed the i32 label space",
            self.cell_indices.len()
        );
        let mut labels = vec![-1; num_cells];
        for (cluster, cells) in self.cell_indices.iter().enumerate() {
            for &cell in cells {
                labels[cell] = cluster as i32;
            }
        }
        labels
    }
}

/// Counters collected by one clusterization run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClusteringStatistics {
    /// Number of input cells.
    pub cells_processed: usize,
    /// Clusters produced by the clustering strategy.
    pub clusters_found: usize,
    /// Clusters without any cell above threshold.
    pub clusters_dropped: usize,
    /// Cells labeled as noise by density clustering.
    pub noise_cells: usize,
    /// Measurements written.
    pub measurements_created: usize,
}
