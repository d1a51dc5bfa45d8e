//! Measurement types and the cell signal model.

use crate::detector::ModuleDescription;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Reduced position estimate of one cluster.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Measurement {
    /// Geometry id of the module surface.
    pub surface_link: u64,
    /// Weighted mean local position.
    pub local: [f64; 2],
    /// Statistical variance plus single-channel quantization variance.
    pub variance: [f64; 2],
    /// Position of this measurement in its collection.
    pub measurement_id: usize,
    /// Measurement dimensionality of the module (1 or 2).
    pub meas_dim: u8,
    /// Module index of the cluster.
    pub module_index: u32,
    /// Number of cells that contributed to the estimate.
    pub cluster_size: usize,
}

impl Measurement {
    /// Local x coordinate.
    #[inline]
    #[must_use]
    pub fn x(&self) -> f64 {
        self.local[0]
    }

    /// Local y coordinate.
    #[inline]
    #[must_use]
    pub fn y(&self) -> f64 {
        self.local[1]
    }
}

/// Maps a raw cell activation to the weight used by measurement creation.
pub trait SignalModel: Send + Sync {
    /// Weight of a cell with the given activation on `module`.
    fn weight(&self, activation: f64, module: &ModuleDescription) -> f64;
}

/// Uses the activation unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentitySignal;

impl SignalModel for IdentitySignal {
    #[inline]
    fn weight(&self, activation: f64, _module: &ModuleDescription) -> f64 {
        activation
    }
}

impl<F> SignalModel for F
where
    F: Fn(f64, &ModuleDescription) -> f64 + Send + Sync,
{
    #[inline]
    fn weight(&self, activation: f64, module: &ModuleDescription) -> f64 {
        self(activation, module)
    }
}
