//! trackpix-io: File I/O for trackpix.
//!
//! This crate reads cells from CSV files through memory-mapped files
//! (memmap2), loads detector descriptions and clustering configurations from
//! JSON, and writes measurements and per-cell labels as CSV.
//!

mod detector;
mod error;
mod reader;
mod writer;

pub use detector::{
    clustering_config_from_json, detector_from_json, load_clustering_config,
    load_detector_description,
};
pub use error::{Error, Result};
pub use reader::{parse_cells_csv, read_cells_csv, MappedFileReader};
pub use writer::{write_labels_csv, write_measurements_csv, CsvFileWriter};
