//! Per-cell feature vectors for density clustering.

use trackpix_core::cell::Cell;

/// Projects a cell onto a normalized feature vector.
///
/// Every vector produced for one clustering call must have the same length.
pub trait FeatureExtractor: Send + Sync {
    /// Feature vector of `cell`.
    fn features(&self, cell: &Cell) -> Vec<f64>;
}

impl<F> FeatureExtractor for F
where
    F: Fn(&Cell) -> Vec<f64> + Send + Sync,
{
    #[inline]
    fn features(&self, cell: &Cell) -> Vec<f64> {
        self(cell)
    }
}

/// Channel coordinates divided by a scale, optionally followed by the
/// scaled activation.
///
/// With the default scale of 4 channels and `eps = 0.3`, direct and diagonal
/// neighbours (Gower distance 0.125 and 0.25) are density-reachable while
/// cells two channels apart along both axes (0.5) are not.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChannelFeatures {
    /// Divisors for `channel0` and `channel1`.
    pub channel_scale: [f64; 2],
    /// Divisor for the activation; `None` leaves it out.
    pub activation_scale: Option<f64>,
}

impl Default for ChannelFeatures {
    fn default() -> Self {
        Self {
            channel_scale: [4.0, 4.0],
            activation_scale: None,
        }
    }
}

impl ChannelFeatures {
    /// Sets the channel divisors.
    #[must_use]
    pub fn with_channel_scale(mut self, scale0: f64, scale1: f64) -> Self {
        self.channel_scale = [scale0, scale1];
        self
    }

    /// Appends the activation divided by `scale` as a third feature.
    #[must_use]
    pub fn with_activation_scale(mut self, scale: f64) -> Self {
        self.activation_scale = Some(scale);
        self
    }
}

impl FeatureExtractor for ChannelFeatures {
    fn features(&self, cell: &Cell) -> Vec<f64> {
        let mut features = Vec::with_capacity(3);
        features.push(f64::from(cell.channel0) / self.channel_scale[0]);
        features.push(f64::from(cell.channel1) / self.channel_scale[1]);
        if let Some(scale) = self.activation_scale {
            features.push(cell.activation / scale);
        }
        features
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dbscan_gower::gower_distance;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_neighbour_distances() {
        let fx = ChannelFeatures::default();
        let centre = fx.features(&Cell::new(0, 10, 10, 1.0));
        let side = fx.features(&Cell::new(0, 11, 10, 1.0));
        let diagonal = fx.features(&Cell::new(0, 11, 11, 1.0));
        let far = fx.features(&Cell::new(0, 12, 12, 1.0));

        assert_relative_eq!(gower_distance(&centre, &side), 0.125);
        assert_relative_eq!(gower_distance(&centre, &diagonal), 0.25);
        assert_relative_eq!(gower_distance(&centre, &far), 0.5);
    }

    #[test]
    fn test_activation_feature() {
        let fx = ChannelFeatures::default()
            .with_channel_scale(1.0, 2.0)
            .with_activation_scale(10.0);
        assert_eq!(fx.features(&Cell::new(0, 3, 4, 5.0)), vec![3.0, 2.0, 0.5]);
    }

    #[test]
    fn test_closure_extractor() {
        let fx = |cell: &Cell| vec![f64::from(cell.channel0)];
        assert_eq!(fx.features(&Cell::new(2, 7, 1, 1.0)), vec![7.0]);
    }
}
