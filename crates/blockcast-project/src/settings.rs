//! Projection settings.

use serde::{Deserialize, Serialize};

use crate::error::{ProjectError, ProjectResult};
use crate::{EYE_HEIGHT, FAR_FRACTION};

/// Tunables for turning an image into a field of blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionSettings {
    /// Distance assigned to the brightest pixels.
    pub min_distance: f64,
    /// Distance assigned to the darkest pixels; also the perspective reference.
    pub max_distance: f64,
    /// Size of one pixel step at `max_distance`, in blocks.
    pub pixel_scale: f64,
    /// Width the source image is resampled to before projection.
    pub output_width: u32,
    /// Height the source image is resampled to. Derived from the aspect ratio if unset.
    pub output_height: Option<u32>,
    /// Offset added to the observer's vertical position to find the eye.
    pub eye_height: f64,
}

impl Default for ProjectionSettings {
    fn default() -> Self {
        Self {
            min_distance: 60.0,
            max_distance: 180.0,
            pixel_scale: 1.0,
            output_width: 400,
            output_height: None,
            eye_height: EYE_HEIGHT,
        }
    }
}

impl ProjectionSettings {
    /// Check the settings before any processing starts.
    pub fn validate(&self) -> ProjectResult<()> {
        if !self.min_distance.is_finite() || !self.max_distance.is_finite() {
            return Err(ProjectError::config("distance bounds must be finite"));
        }
        if self.min_distance >= self.max_distance {
            return Err(ProjectError::config(format!(
                "min_distance ({}) must be less than max_distance ({})",
                self.min_distance, self.max_distance
            )));
        }
        if self.max_distance <= 0.0 {
            return Err(ProjectError::config("max_distance must be positive"));
        }
        if !(self.pixel_scale.is_finite() && self.pixel_scale > 0.0) {
            return Err(ProjectError::config("pixel_scale must be positive"));
        }
        if self.output_width == 0 {
            return Err(ProjectError::config("output_width must be positive"));
        }
        if self.output_height == Some(0) {
            return Err(ProjectError::config("output_height must be positive"));
        }
        if !self.eye_height.is_finite() {
            return Err(ProjectError::config("eye_height must be finite"));
        }
        Ok(())
    }

    /// Depth at or beyond which a pixel is drawn as a 2×2 cluster.
    ///
    /// The coefficient covers the farthest 40% of the range.
    #[must_use]
    pub fn far_threshold(&self) -> f64 {
        self.min_distance + FAR_FRACTION * (self.max_distance - self.min_distance)
    }

    /// Output dimensions for a source image of the given size.
    ///
    /// When no height is configured the aspect ratio is kept, truncating
    /// toward zero.
    pub fn output_dimensions(
        &self,
        source_width: u32,
        source_height: u32,
    ) -> ProjectResult<(u32, u32)> {
        if source_width == 0 || source_height == 0 {
            return Err(ProjectError::config("source image is empty"));
        }
        let height = match self.output_height {
            Some(height) => height,
            None => {
                let derived = u64::from(self.output_width) * u64::from(source_height)
                    / u64::from(source_width);
                u32::try_from(derived)
                    .map_err(|_| ProjectError::config("derived output height is too large"))?
            }
        };
        if height == 0 {
            return Err(ProjectError::config(format!(
                "derived output height is zero for a {source_width}x{source_height} image"
            )));
        }
        Ok((self.output_width, height))
    }
}
