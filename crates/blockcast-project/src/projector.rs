//! Perspective placement of pixels in front of the camera.

use glam::DVec3;

use crate::camera::CameraFrame;

/// Places pixel grid coordinates in world space.
///
/// Offsets from the image center grow linearly with depth, so far pixels
/// spread over a proportionally larger area. Horizontal offsets are negated
/// to keep the image from appearing mirrored to the observer.
#[derive(Debug, Clone, Copy)]
pub struct Projector {
    camera: CameraFrame,
    base_distance: f64,
    image_size: (u32, u32),
    output_size: (u32, u32),
}

impl Projector {
    /// Create a projector.
    ///
    /// `image_size` is the grid being walked; `output_size` is the extent in
    /// blocks covered by the image at `base_distance`.
    #[must_use]
    pub fn new(
        camera: CameraFrame,
        base_distance: f64,
        image_size: (u32, u32),
        output_size: (u32, u32),
    ) -> Self {
        Self {
            camera,
            base_distance,
            image_size,
            output_size,
        }
    }

    /// Camera this projector places pixels for.
    #[must_use]
    pub fn camera(&self) -> &CameraFrame {
        &self.camera
    }

    /// Ratio of `depth` to the reference distance.
    #[must_use]
    pub fn scale_factor(&self, depth: f64) -> f64 {
        depth / self.base_distance
    }

    /// World position of pixel (`col`, `row`) at `depth`. Not rounded.
    #[must_use]
    pub fn project(&self, col: u32, row: u32, depth: f64) -> DVec3 {
        let scale = self.scale_factor(depth);
        let half_width = f64::from(self.image_size.0) / 2.0;
        let half_height = f64::from(self.image_size.1) / 2.0;
        let half_out_width = f64::from(self.output_size.0) / 2.0;
        let half_out_height = f64::from(self.output_size.1) / 2.0;

        let lateral = -((f64::from(col) - half_width) / half_width) * half_out_width * scale;
        let vertical = ((half_height - f64::from(row)) / half_height) * half_out_height * scale;

        self.camera.eye
            + self.camera.look * depth
            + self.camera.right * lateral
            + self.camera.up * vertical
    }
}
