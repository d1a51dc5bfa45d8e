//! trackpix-algorithms: Clusterization of silicon detector cells.
//!
//! This crate provides the clustering strategies and the cluster reduction:
//! - **SparseCCL** - one-pass connected-component labeling of sorted cells,
//!   sequential or data-parallel
//! - **DBSCAN-Gower** - density clustering over per-cell feature vectors
//! - **Measurement creation** - weighted Welford mean/variance per cluster
//!
#![warn(missing_docs)]

pub mod dbscan_gower;
pub mod features;
pub mod measurement_creation;
pub mod parallel_ccl;
mod processing;
pub mod sparse_ccl;

pub use dbscan_gower::{gower_distance, DbscanGowerClustering, DbscanParams, NOISE};
pub use features::{ChannelFeatures, FeatureExtractor};
pub use measurement_creation::{
    calc_cluster_properties, create_measurement, ClusterProperties, MeasurementCreation,
    WeightedStatistics,
};
pub use parallel_ccl::parallel_sparse_ccl;
pub use processing::{
    cluster_and_measure, CellClustering, ClusteringAlgorithm, Clusterization, Clusterizer,
    DensityClustering,
};
pub use sparse_ccl::{find_root, make_union, sparse_ccl, SparseCclClustering};

// Re-export core clustering types
pub use trackpix_core::clustering::{
    ClusterCollection, ClusteringConfig, ClusteringStatistics, Connectivity,
};
