//! Sparse connected-component labeling (SparseCCL).
//!
//! Single pass over column-major sorted cells with an online union-find kept
//! in the label array itself, following DOI 10.1109/DASIP48288.2019.9049184.
//!
//! Key characteristics:
//! - Parent links are plain `u32` indices into the label array
//! - Unions always link the higher root below the lower one, so the
//!   representative of a component is its lowest cell index
//! - The sort order bounds the search window of each cell
#![allow(clippy::cast_possible_truncation)]

use log::debug;
use trackpix_core::cell::CellCollection;
use trackpix_core::clustering::{ClusterCollection, Connectivity};
use trackpix_core::error::ClusteringError;
use trackpix_core::ordering::{
    channel0_order, column_major_order, is_contiguous_on_module, is_ordered_on,
};

use crate::parallel_ccl::parallel_sparse_ccl;

/// Finds the root of the tree containing `e`.
///
/// Walks parent links without compressing them.
#[inline]
#[must_use]
pub fn find_root(labels: &[u32], e: u32) -> u32 {
    let mut r = e;
    while labels[r as usize] != r {
        r = labels[r as usize];
    }
    r
}

/// Merges the trees rooted at `e1` and `e2` and returns the new root.
///
/// Both arguments must be roots. The lower one wins.
#[inline]
pub fn make_union(labels: &mut [u32], e1: u32, e2: u32) -> u32 {
    let (low, high) = if e1 < e2 { (e1, e2) } else { (e2, e1) };
    labels[high as usize] = low;
    low
}

/// Checks the preconditions shared by the sequential and parallel labelers.
pub(crate) fn check_input(
    cells: &CellCollection,
    connectivity: Connectivity,
    labels: &[u32],
) -> Result<(), ClusteringError> {
    if labels.len() != cells.len() {
        return Err(ClusteringError::LabelMismatch {
            cells: cells.len(),
            labels: labels.len(),
        });
    }
    if u32::try_from(cells.len()).is_err() {
        return Err(ClusteringError::TooManyCells(cells.len()));
    }
    debug_assert!(
        is_contiguous_on_module(cells),
        "cells are not contiguous on module"
    );
    debug_assert!(
        match connectivity {
            Connectivity::Strip1D => is_ordered_on(cells, channel0_order),
            Connectivity::Pixel2D => is_ordered_on(cells, column_major_order),
        },
        "cells are not sorted for {connectivity:?} labeling"
    );
    Ok(())
}

/// Labels connected components of sorted cells.
///
/// On return `labels[i]` is the cluster of cell `i`, numbered densely in
/// order of first appearance.
///
/// # Errors
/// Returns an error if `labels` does not match the number of cells or the
/// cell count does not fit a `u32`.
pub fn sparse_ccl(
    cells: &CellCollection,
    connectivity: Connectivity,
    labels: &mut [u32],
) -> Result<usize, ClusteringError> {
    check_input(cells, connectivity, labels)?;
    let n = cells.len();

    // First scan: union adjacent cells.
    let mut window_start = 0;
    for j in 0..n {
        labels[j] = j as u32;
        let cj = cells.get(j);
        let mut root = j as u32;
        for i in window_start..j {
            let ci = cells.get(i);
            if connectivity.is_adjacent(&ci, &cj) {
                root = make_union(labels, root, find_root(labels, i as u32));
            } else if connectivity.is_far_enough(&ci, &cj) {
                window_start = i + 1;
            }
        }
    }

    // Second scan: parents precede their children, so resolving in order
    // reaches every root in one pass.
    let mut num_clusters = 0u32;
    for j in 0..n {
        let parent = labels[j];
        if parent as usize == j {
            labels[j] = num_clusters;
            num_clusters += 1;
        } else {
            labels[j] = labels[parent as usize];
        }
    }

    Ok(num_clusters as usize)
}

/// Connected-component clustering of sorted cells.
#[derive(Debug, Clone, Copy, Default)]
pub struct SparseCclClustering {
    connectivity: Connectivity,
    parallel: bool,
}

impl SparseCclClustering {
    /// Creates a sequential labeler with the given adjacency rule.
    #[must_use]
    pub fn new(connectivity: Connectivity) -> Self {
        Self {
            connectivity,
            parallel: false,
        }
    }

    /// Selects the data-parallel labeler.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Adjacency rule in use.
    #[must_use]
    pub fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    /// Computes dense per-cell labels and the number of clusters.
    ///
    /// # Errors
    /// Returns an error if the cell count does not fit a `u32`.
    pub fn label(&self, cells: &CellCollection) -> Result<(Vec<u32>, usize), ClusteringError> {
        let mut labels = vec![0; cells.len()];
        let num_clusters = if self.parallel {
            parallel_sparse_ccl(cells, self.connectivity, &mut labels)?
        } else {
            sparse_ccl(cells, self.connectivity, &mut labels)?
        };
        debug!(
            "sparse CCL ({:?}, parallel={}): {} cells -> {} clusters",
            self.connectivity,
            self.parallel,
            cells.len(),
            num_clusters
        );
        Ok((labels, num_clusters))
    }

    /// Groups cells into clusters.
    ///
    /// # Errors
    /// Returns an error if the cell count does not fit a `u32`.
    pub fn cluster(&self, cells: &CellCollection) -> Result<ClusterCollection, ClusteringError> {
        let (labels, num_clusters) = self.label(cells)?;
        Ok(ClusterCollection::from_labels(&labels, num_clusters))
    }
}
