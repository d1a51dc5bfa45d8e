//! trackpix-core: Core types for silicon detector clusterization.
//!
//! This crate provides the cell store, the per-module detector description,
//! clustering configuration and containers, and the measurement record
//! produced by the clusterization chain.
//!

pub mod cell;
pub mod clustering;
pub mod detector;
pub mod error;
pub mod measurement;
pub mod ordering;

pub use cell::{Cell, CellCollection};
pub use clustering::{ClusterCollection, ClusteringConfig, ClusteringStatistics, Connectivity};
pub use detector::{DetectorDescription, ModuleDescription};
pub use error::{ClusteringError, Error, MeasurementError, Result};
pub use measurement::{IdentitySignal, Measurement, SignalModel};
