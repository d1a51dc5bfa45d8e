//! Data-parallel sparse CCL.
//!
//! Every cell is an independent rayon work item. Workers share one array of
//! atomic parent links and merge components with a compare-and-swap on a
//! root entry; no locks and no allocation inside the per-cell step.
//!
//! Label resolution runs as repeated parallel pointer-jumping passes until a
//! pass changes nothing, then roots are renumbered with a chunked prefix sum.
//! Since unions link the higher root below the lower one, as in the
//! sequential labeler, both produce identical labels.
#![allow(clippy::cast_possible_truncation)]

use std::sync::atomic::{AtomicU32, Ordering};

use log::trace;
use rayon::prelude::*;
use trackpix_core::cell::CellCollection;
use trackpix_core::clustering::Connectivity;
use trackpix_core::error::ClusteringError;

use crate::sparse_ccl::check_input;

/// Work items per chunk in the renumbering prefix sum.
const RENUMBER_CHUNK: usize = 4096;

#[inline]
fn find_root_atomic(parents: &[AtomicU32], e: u32) -> u32 {
    let mut r = e;
    loop {
        let parent = parents[r as usize].load(Ordering::Acquire);
        if parent == r {
            return r;
        }
        r = parent;
    }
}

/// Links the components of `a` and `b`, retrying if another worker moved a
/// root in between.
#[inline]
fn link(parents: &[AtomicU32], a: u32, b: u32) {
    let mut ra = find_root_atomic(parents, a);
    let mut rb = find_root_atomic(parents, b);
    while ra != rb {
        let (low, high) = if ra < rb { (ra, rb) } else { (rb, ra) };
        match parents[high as usize].compare_exchange(
            high,
            low,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => return,
            Err(_) => {
                ra = find_root_atomic(parents, high);
                rb = find_root_atomic(parents, low);
            }
        }
    }
}

/// One pointer-jumping pass. Returns true if any link moved.
fn jump_pass(parents: &[AtomicU32]) -> bool {
    parents
        .par_iter()
        .map(|slot| {
            let parent = slot.load(Ordering::Relaxed);
            let grandparent = parents[parent as usize].load(Ordering::Relaxed);
            if parent == grandparent {
                false
            } else {
                slot.store(grandparent, Ordering::Relaxed);
                true
            }
        })
        .reduce(|| false, |a, b| a || b)
}

/// Data-parallel version of [`sparse_ccl`](crate::sparse_ccl::sparse_ccl).
///
/// # Errors
/// Returns an error if `labels` does not match the number of cells or the
/// cell count does not fit a `u32`.
pub fn parallel_sparse_ccl(
    cells: &CellCollection,
    connectivity: Connectivity,
    labels: &mut [u32],
) -> Result<usize, ClusteringError> {
    check_input(cells, connectivity, labels)?;
    let n = cells.len();
    if n == 0 {
        return Ok(0);
    }

    let parents: Vec<AtomicU32> = (0..n as u32).map(AtomicU32::new).collect();

    (0..n).into_par_iter().for_each(|j| {
        let cj = cells.get(j);
        for i in (0..j).rev() {
            let ci = cells.get(i);
            if connectivity.is_far_enough(&ci, &cj) {
                break;
            }
            if connectivity.is_adjacent(&ci, &cj) {
                link(&parents, i as u32, j as u32);
            }
        }
    });

    let mut passes = 1;
    while jump_pass(&parents) {
        passes += 1;
    }
    trace!("parallel CCL resolved {n} cells in {passes} passes");

    let roots: Vec<u32> = parents.into_iter().map(AtomicU32::into_inner).collect();

    let root_counts: Vec<u32> = roots
        .par_chunks(RENUMBER_CHUNK)
        .enumerate()
        .map(|(chunk, block)| {
            let base = chunk * RENUMBER_CHUNK;
            block
                .iter()
                .enumerate()
                .filter(|&(k, &root)| root as usize == base + k)
                .count() as u32
        })
        .collect();

    let mut chunk_offsets = Vec::with_capacity(root_counts.len());
    let mut num_clusters = 0u32;
    for count in root_counts {
        chunk_offsets.push(num_clusters);
        num_clusters += count;
    }

    let mut root_ids = vec![0u32; n];
    root_ids
        .par_chunks_mut(RENUMBER_CHUNK)
        .zip(roots.par_chunks(RENUMBER_CHUNK))
        .enumerate()
        .for_each(|(chunk, (ids, block))| {
            let base = chunk * RENUMBER_CHUNK;
            let mut next = chunk_offsets[chunk];
            for (k, &root) in block.iter().enumerate() {
                if root as usize == base + k {
                    ids[k] = next;
                    next += 1;
                }
            }
        });

    labels
        .par_iter_mut()
        .zip(roots.par_iter())
        .for_each(|(label, &root)| *label = root_ids[root as usize]);

    Ok(num_clusters as usize)
}
