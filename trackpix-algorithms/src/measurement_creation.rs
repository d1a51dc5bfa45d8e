//! Cluster reduction: one weighted position estimate per cluster.
//!
//! Positions are accumulated with a weighted Welford update around an offset
//! fixed at the first contributing cell, which keeps the running mean small
//! even for modules far from the local origin.

use log::debug;
use rayon::prelude::*;
use trackpix_core::cell::CellCollection;
use trackpix_core::clustering::ClusterCollection;
use trackpix_core::detector::{DetectorDescription, ModuleDescription};
use trackpix_core::error::MeasurementError;
use trackpix_core::measurement::{IdentitySignal, Measurement, SignalModel};

/// Streaming weighted mean and variance of 2-D positions.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WeightedStatistics {
    offset: [f64; 2],
    mean: [f64; 2],
    variance: [f64; 2],
    total_weight: f64,
    count: usize,
}

impl WeightedStatistics {
    /// Creates an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sample. `weight` must be positive.
    pub fn push(&mut self, position: [f64; 2], weight: f64) {
        debug_assert!(weight > 0.0, "non-positive weight {weight}");
        if self.count == 0 {
            self.offset = position;
        }
        self.count += 1;
        self.total_weight += weight;
        let fraction = weight / self.total_weight;
        for axis in 0..2 {
            let pos = position[axis] - self.offset[axis];
            let d_old = pos - self.mean[axis];
            self.mean[axis] += d_old * fraction;
            let d_new = pos - self.mean[axis];
            self.variance[axis] =
                (1.0 - fraction) * self.variance[axis] + fraction * d_old * d_new;
        }
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns true if nothing was pushed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Sum of all weights.
    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    /// Weighted mean position.
    #[must_use]
    pub fn mean(&self) -> [f64; 2] {
        [
            self.mean[0] + self.offset[0],
            self.mean[1] + self.offset[1],
        ]
    }

    /// Weighted population variance.
    #[must_use]
    pub fn variance(&self) -> [f64; 2] {
        self.variance
    }
}

/// Statistics of the above-threshold cells of one cluster.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClusterProperties {
    /// Weighted mean local position.
    pub mean: [f64; 2],
    /// Weighted variance, without the quantization term.
    pub variance: [f64; 2],
    /// Sum of contributing weights.
    pub total_weight: f64,
    /// Number of contributing cells.
    pub cells: usize,
}

/// Accumulates the cells of `cluster` whose weight exceeds the module
/// threshold.
#[must_use]
pub fn calc_cluster_properties<S: SignalModel + ?Sized>(
    cluster: &[usize],
    cells: &CellCollection,
    module: &ModuleDescription,
    signal: &S,
) -> ClusterProperties {
    let mut stats = WeightedStatistics::new();
    for &index in cluster {
        let cell = cells.get(index);
        let weight = signal.weight(cell.activation, module);
        if weight > module.threshold {
            stats.push(module.cell_position(&cell), weight);
        }
    }
    ClusterProperties {
        mean: stats.mean(),
        variance: stats.variance(),
        total_weight: stats.total_weight(),
        cells: stats.len(),
    }
}

/// Reduces one cluster to a measurement.
///
/// # Errors
/// Returns [`MeasurementError::UnknownModule`] if the cluster's module is not
/// in `detector`.
///
/// # Panics
/// Panics if the cluster is empty, spans more than one module, or has no
/// cell above the module threshold.
pub fn create_measurement<S: SignalModel + ?Sized>(
    cluster: &[usize],
    cells: &CellCollection,
    detector: &DetectorDescription,
    signal: &S,
    measurement_id: usize,
) -> Result<Measurement, MeasurementError> {
    assert!(!cluster.is_empty(), "cannot create a measurement from an empty cluster");
    let module_index = cells.module_index[cluster[0]];
    assert!(
        cluster
            .iter()
            .all(|&index| cells.module_index[index] == module_index),
        "cluster {measurement_id} spans more than one module"
    );

    let module = detector.module(module_index)?;
    let props = calc_cluster_properties(cluster, cells, module, signal);
    assert!(
        props.total_weight > 0.0,
        "cluster {measurement_id} has no cell above threshold"
    );

    let quantization = module.quantization_variance();
    Ok(Measurement {
        surface_link: module.geometry_id,
        local: props.mean,
        variance: [
            props.variance[0] + quantization[0],
            props.variance[1] + quantization[1],
        ],
        measurement_id,
        meas_dim: module.dimensions,
        module_index,
        cluster_size: props.cells,
    })
}

/// Turns a cluster collection into measurements.
#[derive(Clone, Debug, Default)]
pub struct MeasurementCreation<S = IdentitySignal> {
    signal: S,
    parallel: bool,
}

impl MeasurementCreation {
    /// Creates a sequential reducer using raw activations as weights.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: SignalModel> MeasurementCreation<S> {
    /// Replaces the signal model.
    #[must_use]
    pub fn with_signal<T: SignalModel>(self, signal: T) -> MeasurementCreation<T> {
        MeasurementCreation {
            signal,
            parallel: self.parallel,
        }
    }

    /// Reduces clusters on the rayon pool.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Signal model in use.
    #[must_use]
    pub fn signal(&self) -> &S {
        &self.signal
    }

    /// One measurement per cluster; `measurement_id` is the cluster position.
    ///
    /// # Errors
    /// Returns [`MeasurementError::UnknownModule`] if a cluster refers to a
    /// module missing from `detector`.
    ///
    /// # Panics
    /// See [`create_measurement`].
    pub fn create(
        &self,
        cells: &CellCollection,
        clusters: &ClusterCollection,
        detector: &DetectorDescription,
    ) -> Result<Vec<Measurement>, MeasurementError> {
        let measurements: Vec<Measurement> = if self.parallel {
            clusters
                .cell_indices
                .par_iter()
                .enumerate()
                .map(|(id, cluster)| create_measurement(cluster, cells, detector, &self.signal, id))
                .collect::<Result<_, _>>()?
        } else {
            clusters
                .iter()
                .enumerate()
                .map(|(id, cluster)| create_measurement(cluster, cells, detector, &self.signal, id))
                .collect::<Result<_, _>>()?
        };
        debug!(
            "created {} measurements (parallel={})",
            measurements.len(),
            self.parallel
        );
        Ok(measurements)
    }
}
