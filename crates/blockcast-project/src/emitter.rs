//! Placement command emission.

use std::fmt;

use glam::{DVec3, IVec3};

use crate::ALPHA_CUTOFF;
use crate::projector::Projector;
use crate::settings::ProjectionSettings;

/// Set the block at an integer coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlacementCommand {
    pub position: IVec3,
    pub block: String,
}

impl PlacementCommand {
    #[must_use]
    pub fn new(position: IVec3, block: impl Into<String>) -> Self {
        Self {
            position,
            block: block.into(),
        }
    }
}

impl fmt::Display for PlacementCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "setblock {} {} {} {}",
            self.position.x, self.position.y, self.position.z, self.block
        )
    }
}

/// Round to the nearest lattice point, ties to even.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn to_lattice(position: DVec3) -> IVec3 {
    IVec3::new(
        position.x.round_ties_even() as i32,
        position.y.round_ties_even() as i32,
        position.z.round_ties_even() as i32,
    )
}

/// Turns projected pixels into placement commands.
///
/// Transparent pixels are dropped. Pixels at or beyond the far threshold are
/// drawn as a 2×2 cluster to fill the gaps that perspective spreading leaves.
#[derive(Debug, Clone, Copy)]
pub struct CommandEmitter {
    far_threshold: f64,
    pixel_scale: f64,
}

impl CommandEmitter {
    #[must_use]
    pub fn new(settings: &ProjectionSettings) -> Self {
        Self {
            far_threshold: settings.far_threshold(),
            pixel_scale: settings.pixel_scale,
        }
    }

    #[must_use]
    pub fn far_threshold(&self) -> f64 {
        self.far_threshold
    }

    /// Append the commands for one pixel to `out` and return how many were added.
    pub fn emit(
        &self,
        projector: &Projector,
        alpha: u8,
        position: DVec3,
        depth: f64,
        block: &str,
        out: &mut Vec<PlacementCommand>,
    ) -> usize {
        if alpha < ALPHA_CUTOFF {
            return 0;
        }

        if depth < self.far_threshold {
            out.push(PlacementCommand::new(to_lattice(position), block));
            return 1;
        }

        let step = self.pixel_scale * projector.scale_factor(depth);
        let camera = projector.camera();
        let delta_right = camera.right * step;
        let delta_up = camera.up * step;
        for offset in [
            DVec3::ZERO,
            delta_right,
            delta_up,
            delta_right + delta_up,
        ] {
            out.push(PlacementCommand::new(to_lattice(position + offset), block));
        }
        4
    }
}
