//! Error types for trackpix-core.

use thiserror::Error;

/// Result type alias for trackpix operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for trackpix operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid detector description.
    #[error("invalid detector description: {0}")]
    InvalidDetector(String),

    /// Clustering error.
    #[error("clustering error: {0}")]
    Clustering(#[from] ClusteringError),

    /// Measurement creation error.
    #[error("measurement error: {0}")]
    Measurement(#[from] MeasurementError),
}

/// Errors reported by the clustering algorithms.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClusteringError {
    /// Rejected configuration, reported before any cell is processed.
    #[error("invalid clustering configuration: {0}")]
    InvalidConfig(String),

    /// Feature vectors handed to the density clustering disagree in size.
    #[error("feature vector {index} has {found} dimensions, expected {expected}")]
    FeatureDimensionMismatch {
        /// Position of the offending feature vector.
        index: usize,
        /// Dimension of the first feature vector.
        expected: usize,
        /// Dimension of the offending feature vector.
        found: usize,
    },

    /// Label buffer does not match the number of cells.
    #[error("label buffer has {labels} entries for {cells} cells")]
    LabelMismatch {
        /// Number of cells.
        cells: usize,
        /// Number of labels.
        labels: usize,
    },

    /// Cell count does not fit the 32-bit label space.
    #[error("{0} cells exceed the 32-bit label space")]
    TooManyCells(usize),
}

/// Errors reported while turning clusters into measurements.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MeasurementError {
    /// A cell refers to a module the detector description does not know.
    #[error("module index {module_index} is not described ({modules} modules known)")]
    UnknownModule {
        /// Module index carried by the cell.
        module_index: u32,
        /// Number of modules in the detector description.
        modules: usize,
    },
}
