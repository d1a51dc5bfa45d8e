//! JSON loaders for the detector description and the clustering configuration.

use crate::Result;
use log::debug;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use trackpix_core::{ClusteringConfig, DetectorDescription, ModuleDescription};

// Intermediate structs for the detector file schema
#[derive(Deserialize)]
struct JsonDetector {
    modules: Vec<JsonModule>,
}

#[derive(Deserialize)]
struct JsonModule {
    geometry_id: u64,
    #[serde(default)]
    reference_x: f64,
    #[serde(default)]
    reference_y: f64,
    #[serde(default = "unit_pitch")]
    pitch_x: f64,
    #[serde(default = "unit_pitch")]
    pitch_y: f64,
    #[serde(default)]
    threshold: f64,
    #[serde(default = "pixel_dimensions")]
    dimensions: u8,
}

fn unit_pitch() -> f64 {
    1.0
}

fn pixel_dimensions() -> u8 {
    2
}

impl From<JsonModule> for ModuleDescription {
    fn from(module: JsonModule) -> Self {
        ModuleDescription::new(module.geometry_id)
            .with_reference(module.reference_x, module.reference_y)
            .with_pitch(module.pitch_x, module.pitch_y)
            .with_threshold(module.threshold)
            .with_dimensions(module.dimensions)
    }
}

/// Parses a detector description from JSON.
///
/// The document is `{"modules": [...]}`; module `i` gets module index `i`.
/// Omitted fields default to reference 0, pitch 1, threshold 0 and
/// dimensions 2.
///
/// # Errors
/// Returns an error for malformed JSON or an invalid module.
pub fn detector_from_json(json: &str) -> Result<DetectorDescription> {
    let detector: JsonDetector = serde_json::from_str(json)?;
    build_detector(detector)
}

/// Loads a detector description from a JSON file; see [`detector_from_json`].
///
/// # Errors
/// Returns an error if the file cannot be read or is invalid.
pub fn load_detector_description<P: AsRef<Path>>(path: P) -> Result<DetectorDescription> {
    let file = File::open(&path)?;
    let detector: JsonDetector = serde_json::from_reader(BufReader::new(file))?;
    let detector = build_detector(detector)?;
    debug!(
        "loaded {} modules from {}",
        detector.len(),
        path.as_ref().display()
    );
    Ok(detector)
}

fn build_detector(detector: JsonDetector) -> Result<DetectorDescription> {
    let modules = detector
        .modules
        .into_iter()
        .map(ModuleDescription::from)
        .collect();
    Ok(DetectorDescription::new(modules)?)
}

/// Parses and validates a clustering configuration from JSON.
///
/// Omitted fields take their default values.
///
/// # Errors
/// Returns an error for malformed JSON or invalid parameters.
pub fn clustering_config_from_json(json: &str) -> Result<ClusteringConfig> {
    let config: ClusteringConfig = serde_json::from_str(json)?;
    config.validate().map_err(trackpix_core::Error::from)?;
    Ok(config)
}

/// Loads a clustering configuration from a JSON file.
///
/// # Errors
/// Returns an error if the file cannot be read or is invalid.
pub fn load_clustering_config<P: AsRef<Path>>(path: P) -> Result<ClusteringConfig> {
    let file = File::open(path)?;
    let config: ClusteringConfig = serde_json::from_reader(BufReader::new(file))?;
    config.validate().map_err(trackpix_core::Error::from)?;
    Ok(config)
}
