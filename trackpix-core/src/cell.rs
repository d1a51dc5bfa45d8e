//! Cell types for silicon detector readout.
//!
//! Cells are stored column-wise in a [`CellCollection`] so the clustering
//! kernels only touch the channels they compare.

use std::ops::Range;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single activated detector channel.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Cell {
    /// Index of the module in the detector description.
    pub module_index: u32,
    /// First channel coordinate (column, or strip number).
    pub channel0: u32,
    /// Second channel coordinate (row; ignored by strip modules).
    pub channel1: u32,
    /// Activation signal.
    pub activation: f64,
    /// Readout time.
    pub time: f64,
}

impl Cell {
    /// Creates a cell with zero readout time.
    #[inline]
    #[must_use]
    pub fn new(module_index: u32, channel0: u32, channel1: u32, activation: f64) -> Self {
        Self {
            module_index,
            channel0,
            channel1,
            activation,
            time: 0.0,
        }
    }

    /// Sets the readout time.
    #[inline]
    #[must_use]
    pub fn with_time(mut self, time: f64) -> Self {
        self.time = time;
        self
    }
}

/// Cells stored in Structure of Arrays (`SoA`) format.
///
/// The position of a cell in the collection is its identity: clusters and
/// labels refer to cells by index.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CellCollection {
    /// Columnar storage for module indices.
    pub module_index: Vec<u32>,
    /// Columnar storage for the first channel coordinate.
    pub channel0: Vec<u32>,
    /// Columnar storage for the second channel coordinate.
    pub channel1: Vec<u32>,
    /// Columnar storage for activation signals.
    pub activation: Vec<f64>,
    /// Columnar storage for readout times.
    pub time: Vec<f64>,
}

impl CellCollection {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty collection with the given capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            module_index: Vec::with_capacity(capacity),
            channel0: Vec::with_capacity(capacity),
            channel1: Vec::with_capacity(capacity),
            activation: Vec::with_capacity(capacity),
            time: Vec::with_capacity(capacity),
        }
    }

    /// Returns the number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.module_index.len()
    }

    /// Returns true if the collection holds no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.module_index.is_empty()
    }

    /// Clears all columns.
    pub fn clear(&mut self) {
        self.module_index.clear();
        self.channel0.clear();
        self.channel1.clear();
        self.activation.clear();
        self.time.clear();
    }

    /// Appends a cell.
    pub fn push(&mut self, cell: Cell) {
        self.module_index.push(cell.module_index);
        self.channel0.push(cell.channel0);
        self.channel1.push(cell.channel1);
        self.activation.push(cell.activation);
        self.time.push(cell.time);
    }

    /// Appends all cells from another collection.
    pub fn append(&mut self, other: &CellCollection) {
        self.module_index.extend_from_slice(&other.module_index);
        self.channel0.extend_from_slice(&other.channel0);
        self.channel1.extend_from_slice(&other.channel1);
        self.activation.extend_from_slice(&other.activation);
        self.time.extend_from_slice(&other.time);
    }

    /// Returns the cell at `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Cell {
        Cell {
            module_index: self.module_index[index],
            channel0: self.channel0[index],
            channel1: self.channel1[index],
            activation: self.activation[index],
            time: self.time[index],
        }
    }

    /// Iterates over the cells in storage order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = Cell> + '_ {
        (0..self.len()).map(move |index| self.get(index))
    }

    /// Builds a new collection holding the cells at `indices`, in that order.
    #[must_use]
    pub fn select(&self, indices: &[usize]) -> CellCollection {
        let mut out = CellCollection::with_capacity(indices.len());
        for &index in indices {
            out.push(self.get(index));
        }
        out
    }

    /// Returns the index ranges of consecutive cells sharing a module.
    ///
    /// On a collection that is contiguous on module this yields exactly one
    /// range per module.
    #[must_use]
    pub fn module_ranges(&self) -> Vec<Range<usize>> {
        let mut ranges = Vec::new();
        let mut start = 0;
        for i in 1..=self.len() {
            if i == self.len() || self.module_index[i] != self.module_index[start] {
                ranges.push(start..i);
                start = i;
            }
        }
        ranges
    }
}

impl FromIterator<Cell> for CellCollection {
    fn from_iter<I: IntoIterator<Item = Cell>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut cells = CellCollection::with_capacity(iter.size_hint().0);
        for cell in iter {
            cells.push(cell);
        }
        cells
    }
}

impl Extend<Cell> for CellCollection {
    fn extend<I: IntoIterator<Item = Cell>>(&mut self, iter: I) {
        for cell in iter {
            self.push(cell);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_collection_operations() {
        let mut cells = CellCollection::with_capacity(4);
        assert!(cells.is_empty());

        cells.push(Cell::new(0, 10, 20, 1.5));
        cells.push(Cell::new(0, 11, 20, 2.5).with_time(3.0));
        assert_eq!(cells.len(), 2);
        assert_eq!(cells.get(1).channel0, 11);
        assert!((cells.get(1).time - 3.0).abs() < f64::EPSILON);

        cells.clear();
        assert!(cells.is_empty());
    }

    #[test]
    fn test_select_reorders() {
        let cells: CellCollection = (0..4).map(|i| Cell::new(0, i, 0, 1.0)).collect();
        let picked = cells.select(&[3, 1]);
        assert_eq!(picked.channel0, vec![3, 1]);
    }

    #[test]
    fn test_module_ranges() {
        let cells: CellCollection = [0, 0, 1, 3, 3, 3]
            .into_iter()
            .map(|m| Cell::new(m, 0, 0, 1.0))
            .collect();
        assert_eq!(cells.module_ranges(), vec![0..2, 2..3, 3..6]);
        assert!(CellCollection::new().module_ranges().is_empty());
    }
}
