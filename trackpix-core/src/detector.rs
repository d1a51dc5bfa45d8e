//! Detector description: per-module calibration used by measurement creation.

use std::collections::HashMap;

use crate::cell::Cell;
use crate::error::{Error, MeasurementError, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Calibration of a single detector module.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ModuleDescription {
    /// Identifier of the module surface in the tracking geometry.
    pub geometry_id: u64,
    /// Local x of the channel grid origin.
    pub reference_x: f64,
    /// Local y of the channel grid origin.
    pub reference_y: f64,
    /// Channel pitch along `channel0`.
    pub pitch_x: f64,
    /// Channel pitch along `channel1`.
    pub pitch_y: f64,
    /// Cells at or below this weight do not contribute to measurements.
    pub threshold: f64,
    /// 1 for strip modules, 2 for pixel modules.
    pub dimensions: u8,
}

impl ModuleDescription {
    /// Creates a unit-pitch pixel module at the origin with no threshold.
    #[must_use]
    pub fn new(geometry_id: u64) -> Self {
        Self {
            geometry_id,
            reference_x: 0.0,
            reference_y: 0.0,
            pitch_x: 1.0,
            pitch_y: 1.0,
            threshold: 0.0,
            dimensions: 2,
        }
    }

    /// Sets the channel grid origin.
    #[must_use]
    pub fn with_reference(mut self, x: f64, y: f64) -> Self {
        self.reference_x = x;
        self.reference_y = y;
        self
    }

    /// Sets the channel pitch.
    #[must_use]
    pub fn with_pitch(mut self, x: f64, y: f64) -> Self {
        self.pitch_x = x;
        self.pitch_y = y;
        self
    }

    /// Sets the activation threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Sets the measurement dimensionality.
    #[must_use]
    pub fn with_dimensions(mut self, dimensions: u8) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Local position of the centre of `cell`.
    #[inline]
    #[must_use]
    pub fn cell_position(&self, cell: &Cell) -> [f64; 2] {
        [
            self.reference_x + (f64::from(cell.channel0) + 0.5) * self.pitch_x,
            self.reference_y + (f64::from(cell.channel1) + 0.5) * self.pitch_y,
        ]
    }

    /// Variance of a uniform distribution over one channel, `pitch² / 12`.
    #[inline]
    #[must_use]
    pub fn quantization_variance(&self) -> [f64; 2] {
        [
            self.pitch_x * self.pitch_x / 12.0,
            self.pitch_y * self.pitch_y / 12.0,
        ]
    }

    /// Checks that the calibration is usable.
    ///
    /// # Errors
    /// Returns [`Error::InvalidDetector`] for non-positive pitch, a non-finite
    /// reference, a negative threshold, or dimensions other than 1 or 2.
    pub fn validate(&self) -> Result<()> {
        let id = self.geometry_id;
        if !(self.pitch_x > 0.0 && self.pitch_x.is_finite())
            || !(self.pitch_y > 0.0 && self.pitch_y.is_finite())
        {
            return Err(Error::InvalidDetector(format!(
                "module {id}: pitch must be positive, got ({}, {})",
                self.pitch_x, self.pitch_y
            )));
        }
        if !self.reference_x.is_finite() || !self.reference_y.is_finite() {
            return Err(Error::InvalidDetector(format!(
                "module {id}: reference position is not finite"
            )));
        }
        if !(self.threshold.is_finite() && self.threshold >= 0.0) {
            return Err(Error::InvalidDetector(format!(
                "module {id}: threshold must be finite and non-negative, got {}",
                self.threshold
            )));
        }
        if !matches!(self.dimensions, 1 | 2) {
            return Err(Error::InvalidDetector(format!(
                "module {id}: dimensions must be 1 or 2, got {}",
                self.dimensions
            )));
        }
        Ok(())
    }
}

/// Read-only calibration table indexed by module index.
#[derive(Debug, Clone, Default)]
pub struct DetectorDescription {
    modules: Vec<ModuleDescription>,
    by_geometry: HashMap<u64, u32>,
}

impl DetectorDescription {
    /// Builds a detector description; module `i` gets module index `i`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidDetector`] if a module fails validation, a
    /// geometry id is used twice, or there are more modules than fit a `u32`.
    pub fn new(modules: Vec<ModuleDescription>) -> Result<Self> {
        let mut by_geometry = HashMap::with_capacity(modules.len());
        for (index, module) in modules.iter().enumerate() {
            module.validate()?;
            let index = u32::try_from(index)
                .map_err(|_| Error::InvalidDetector("too many modules".to_string()))?;
            if by_geometry.insert(module.geometry_id, index).is_some() {
                return Err(Error::InvalidDetector(format!(
                    "duplicate geometry id {}",
                    module.geometry_id
                )));
            }
        }
        Ok(Self {
            modules,
            by_geometry,
        })
    }

    /// Number of described modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Returns true if no module is described.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Returns the module with the given index, if described.
    #[inline]
    #[must_use]
    pub fn get(&self, module_index: u32) -> Option<&ModuleDescription> {
        self.modules.get(module_index as usize)
    }

    /// Returns the module with the given index.
    ///
    /// # Errors
    /// Returns [`MeasurementError::UnknownModule`] if the index is not described.
    #[inline]
    pub fn module(
        &self,
        module_index: u32,
    ) -> std::result::Result<&ModuleDescription, MeasurementError> {
        self.get(module_index).ok_or(MeasurementError::UnknownModule {
            module_index,
            modules: self.modules.len(),
        })
    }

    /// Looks up the module index of a geometry id.
    #[must_use]
    pub fn module_index_of(&self, geometry_id: u64) -> Option<u32> {
        self.by_geometry.get(&geometry_id).copied()
    }

    /// Iterates over the modules in index order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &ModuleDescription> {
        self.modules.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cell_position_is_channel_centre() {
        let module = ModuleDescription::new(7)
            .with_reference(-10.0, 5.0)
            .with_pitch(0.05, 0.1);
        let pos = module.cell_position(&Cell::new(0, 4, 2, 1.0));
        assert_relative_eq!(pos[0], -10.0 + 4.5 * 0.05);
        assert_relative_eq!(pos[1], 5.0 + 2.5 * 0.1);
    }

    #[test]
    fn test_quantization_variance() {
        let module = ModuleDescription::new(1).with_pitch(0.6, 1.2);
        let var = module.quantization_variance();
        assert_relative_eq!(var[0], 0.03, max_relative = 1e-12);
        assert_relative_eq!(var[1], 0.12, max_relative = 1e-12);
    }

    #[test]
    fn test_lookup() {
        let detector = DetectorDescription::new(vec![
            ModuleDescription::new(100),
            ModuleDescription::new(200).with_dimensions(1),
        ])
        .unwrap();

        assert_eq!(detector.len(), 2);
        assert_eq!(detector.module_index_of(200), Some(1));
        assert_eq!(detector.module_index_of(300), None);
        assert_eq!(detector.get(1).unwrap().dimensions, 1);
        assert_eq!(
            detector.module(5),
            Err(MeasurementError::UnknownModule {
                module_index: 5,
                modules: 2
            })
        );
    }

    #[test]
    fn test_rejects_invalid_modules() {
        assert!(DetectorDescription::new(vec![ModuleDescription::new(1).with_pitch(0.0, 1.0)])
            .is_err());
        assert!(DetectorDescription::new(vec![ModuleDescription::new(1).with_dimensions(3)])
            .is_err());
        assert!(DetectorDescription::new(vec![ModuleDescription::new(1).with_threshold(-1.0)])
            .is_err());
        assert!(DetectorDescription::new(vec![
            ModuleDescription::new(1),
            ModuleDescription::new(1)
        ])
        .is_err());
    }
}
