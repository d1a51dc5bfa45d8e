//! High-level processing: clustering followed by measurement creation.

use log::{debug, info};
use trackpix_core::cell::CellCollection;
use trackpix_core::clustering::{ClusterCollection, ClusteringConfig, ClusteringStatistics};
use trackpix_core::detector::DetectorDescription;
use trackpix_core::error::{ClusteringError, Result};
use trackpix_core::measurement::{IdentitySignal, Measurement, SignalModel};

use crate::dbscan_gower::{DbscanGowerClustering, DbscanParams};
use crate::features::{ChannelFeatures, FeatureExtractor};
use crate::measurement_creation::MeasurementCreation;
use crate::sparse_ccl::SparseCclClustering;

/// A strategy that groups cells into clusters.
pub trait CellClustering {
    /// Algorithm name.
    fn name(&self) -> &'static str;

    /// Groups `cells`; every cluster lies on a single module.
    fn cluster(
        &self,
        cells: &CellCollection,
    ) -> std::result::Result<ClusterCollection, ClusteringError>;
}

impl CellClustering for SparseCclClustering {
    fn name(&self) -> &'static str {
        "SparseCCL"
    }

    fn cluster(
        &self,
        cells: &CellCollection,
    ) -> std::result::Result<ClusterCollection, ClusteringError> {
        SparseCclClustering::cluster(self, cells)
    }
}

/// DBSCAN-Gower run separately on every module range.
///
/// Noise cells end up in no cluster.
pub struct DensityClustering<'a, F: ?Sized> {
    features: &'a F,
    dbscan: DbscanGowerClustering,
}

impl<'a, F: FeatureExtractor + ?Sized> DensityClustering<'a, F> {
    /// Creates the strategy from a feature projection and DBSCAN parameters.
    #[must_use]
    pub fn new(features: &'a F, params: DbscanParams) -> Self {
        Self {
            features,
            dbscan: DbscanGowerClustering::new(params),
        }
    }
}

impl<F: FeatureExtractor + ?Sized> CellClustering for DensityClustering<'_, F> {
    fn name(&self) -> &'static str {
        "DBSCAN-Gower"
    }

    fn cluster(
        &self,
        cells: &CellCollection,
    ) -> std::result::Result<ClusterCollection, ClusteringError> {
        let mut clusters = ClusterCollection::new();
        for range in cells.module_ranges() {
            let features: Vec<Vec<f64>> = range
                .clone()
                .map(|i| self.features.features(&cells.get(i)))
                .collect();
            let labels = self.dbscan.cluster(&features)?;
            clusters.append_shifted(ClusterCollection::from_density_labels(&labels), range.start);
        }
        Ok(clusters)
    }
}

/// Clustering strategy selected by configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClusteringAlgorithm {
    /// Sparse connected-component labeling.
    SparseCcl,
    /// DBSCAN with Gower distance.
    DbscanGower,
}

impl ClusteringAlgorithm {
    /// Picks the strategy requested by `config`.
    #[must_use]
    pub fn from_config(config: &ClusteringConfig) -> Self {
        if config.use_density_clustering {
            Self::DbscanGower
        } else {
            Self::SparseCcl
        }
    }
}

/// Result of one clusterization run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Clusterization {
    /// One measurement per kept cluster, `measurement_id == index`.
    pub measurements: Vec<Measurement>,
    /// Kept clusters, in measurement order.
    pub clusters: ClusterCollection,
    /// Measurement index of every input cell, `-1` for noise and dropped
    /// clusters.
    pub labels: Vec<i32>,
    /// Run counters.
    pub statistics: ClusteringStatistics,
}

/// Clustering plus measurement creation over one cell collection.
#[derive(Clone, Debug)]
pub struct Clusterizer<F = ChannelFeatures, S = IdentitySignal> {
    config: ClusteringConfig,
    features: F,
    reducer: MeasurementCreation<S>,
}

impl Clusterizer {
    /// Creates a clusterizer with default features and signal model.
    ///
    /// # Errors
    /// Returns [`ClusteringError::InvalidConfig`] (wrapped) for an invalid
    /// configuration.
    pub fn new(config: ClusteringConfig) -> Result<Self> {
        config.validate()?;
        let reducer = MeasurementCreation::new().with_parallel(config.parallel);
        Ok(Self {
            config,
            features: ChannelFeatures::default(),
            reducer,
        })
    }
}

impl<F: FeatureExtractor, S: SignalModel> Clusterizer<F, S> {
    /// Replaces the feature projection used by density clustering.
    #[must_use]
    pub fn with_features<G: FeatureExtractor>(self, features: G) -> Clusterizer<G, S> {
        Clusterizer {
            config: self.config,
            features,
            reducer: self.reducer,
        }
    }

    /// Replaces the signal model used by measurement creation.
    #[must_use]
    pub fn with_signal<T: SignalModel>(self, signal: T) -> Clusterizer<F, T> {
        Clusterizer {
            config: self.config,
            features: self.features,
            reducer: self.reducer.with_signal(signal),
        }
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &ClusteringConfig {
        &self.config
    }

    /// Strategy selected by the configuration.
    #[must_use]
    pub fn algorithm(&self) -> ClusteringAlgorithm {
        ClusteringAlgorithm::from_config(&self.config)
    }

    /// Clusters `cells` and reduces every cluster with at least one cell above
    /// its module threshold.
    ///
    /// # Errors
    /// Returns an error if clustering fails or a cell refers to a module
    /// missing from `detector`.
    pub fn run(
        &self,
        cells: &CellCollection,
        detector: &DetectorDescription,
    ) -> Result<Clusterization> {
        let ccl;
        let density;
        let strategy: &dyn CellClustering = match self.algorithm() {
            ClusteringAlgorithm::SparseCcl => {
                ccl = SparseCclClustering::new(self.config.connectivity)
                    .with_parallel(self.config.parallel);
                &ccl
            }
            ClusteringAlgorithm::DbscanGower => {
                density = DensityClustering::new(&self.features, DbscanParams::from(&self.config));
                &density
            }
        };

        let mut clusters = strategy.cluster(cells)?;
        let clusters_found = clusters.len();
        let noise_cells = cells.len() - clusters.total_cells();
        debug!(
            "{}: {} cells -> {} clusters, {} noise cells",
            strategy.name(),
            cells.len(),
            clusters_found,
            noise_cells
        );

        let signal = self.reducer.signal();
        clusters.retain(|cluster| {
            let module_index = cells.module_index[cluster[0]];
            match detector.get(module_index) {
                Some(module) => cluster
                    .iter()
                    .any(|&i| signal.weight(cells.activation[i], module) > module.threshold),
                // Kept so measurement creation reports the unknown module.
                None => true,
            }
        });
        let clusters_dropped = clusters_found - clusters.len();
        if clusters_dropped > 0 {
            debug!("dropped {clusters_dropped} clusters without a cell above threshold");
        }

        let measurements = self.reducer.create(cells, &clusters, detector)?;
        let labels = clusters.to_labels(cells.len());
        let statistics = ClusteringStatistics {
            cells_processed: cells.len(),
            clusters_found,
            clusters_dropped,
            noise_cells,
            measurements_created: measurements.len(),
        };
        info!(
            "clusterization: {} cells, {} clusters, {} measurements",
            statistics.cells_processed, statistics.clusters_found, statistics.measurements_created
        );

        Ok(Clusterization {
            measurements,
            clusters,
            labels,
            statistics,
        })
    }
}

/// Runs the default clusterization chain and returns the measurements.
///
/// # Errors
/// See [`Clusterizer::new`] and [`Clusterizer::run`].
pub fn cluster_and_measure(
    cells: &CellCollection,
    detector: &DetectorDescription,
    config: &ClusteringConfig,
) -> Result<Vec<Measurement>> {
    Ok(Clusterizer::new(config.clone())?.run(cells, detector)?.measurements)
}
