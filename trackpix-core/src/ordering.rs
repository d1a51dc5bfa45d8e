//! Ordering checks and sorting for cell collections.
//!
//! The clustering kernels require cells grouped contiguously by module and,
//! within a module, sorted with `channel0` major and `channel1` minor. The
//! checks here are cheap enough to run in debug assertions.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::cell::{Cell, CellCollection};

/// Returns true if every module's cells form a single contiguous run.
#[must_use]
pub fn is_contiguous_on_module(cells: &CellCollection) -> bool {
    let mut seen = HashSet::new();
    cells
        .module_ranges()
        .into_iter()
        .all(|range| seen.insert(cells.module_index[range.start]))
}

/// Returns true if `in_order(a, b)` holds for every pair of neighbouring cells.
pub fn is_ordered_on<F>(cells: &CellCollection, in_order: F) -> bool
where
    F: Fn(&Cell, &Cell) -> bool,
{
    (1..cells.len()).all(|i| in_order(&cells.get(i - 1), &cells.get(i)))
}

/// `channel0`-only order within a module, used by strip clustering.
///
/// A module boundary is always in order; grouping is checked by
/// [`is_contiguous_on_module`].
#[must_use]
pub fn channel0_order(a: &Cell, b: &Cell) -> bool {
    a.module_index != b.module_index || a.channel0 <= b.channel0
}

/// Column-major order within a module, used by pixel clustering.
///
/// A module boundary is always in order.
#[must_use]
pub fn column_major_order(a: &Cell, b: &Cell) -> bool {
    a.module_index != b.module_index || (a.channel0, a.channel1) <= (b.channel0, b.channel1)
}

fn compare_cells(a: &Cell, b: &Cell) -> Ordering {
    (a.module_index, a.channel0, a.channel1).cmp(&(b.module_index, b.channel0, b.channel1))
}

/// Sorts cells into column-major order in place.
///
/// The sort is stable. Returns the permutation applied: entry `i` is the
/// original position of the cell now stored at `i`.
pub fn sort_cells(cells: &mut CellCollection) -> Vec<usize> {
    let mut order: Vec<usize> = (0..cells.len()).collect();
    order.sort_by(|&a, &b| compare_cells(&cells.get(a), &cells.get(b)));
    *cells = cells.select(&order);
    order
}
