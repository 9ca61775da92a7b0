//! Whole-image projection.

use image::RgbaImage;

use crate::camera::CameraFrame;
use crate::depth::{brightness, depth_for_brightness};
use crate::emitter::{CommandEmitter, PlacementCommand};
use crate::error::ProjectResult;
use crate::palette::Palette;
use crate::pose::ObserverPose;
use crate::projector::Projector;
use crate::settings::ProjectionSettings;

/// Generate placement commands for every visible pixel of `image`.
///
/// `image` is expected to be resampled already (see [`crate::raster::prepare`]);
/// its size together with the configured output size sets the extent of the
/// projected picture. Commands come out in row-major pixel order.
pub fn build_commands(
    image: &RgbaImage,
    palette: &Palette,
    pose: &ObserverPose,
    settings: &ProjectionSettings,
) -> ProjectResult<Vec<PlacementCommand>> {
    settings.validate()?;
    let (width, height) = image.dimensions();
    let output_size = settings.output_dimensions(width, height)?;

    let camera = CameraFrame::from_pose(pose, settings.eye_height);
    tracing::debug!(
        "Camera: eye={:?} look={:?} right={:?} up={:?}",
        camera.eye,
        camera.look,
        camera.right,
        camera.up
    );

    let projector = Projector::new(camera, settings.max_distance, (width, height), output_size);
    let emitter = CommandEmitter::new(settings);

    let mut commands = Vec::new();
    let mut skipped = 0usize;
    for (col, row, pixel) in image.enumerate_pixels() {
        let [r, g, b, alpha] = pixel.0;
        let depth = depth_for_brightness(
            brightness(*pixel),
            settings.min_distance,
            settings.max_distance,
        );
        let position = projector.project(col, row, depth);
        let block = palette.closest([r, g, b]);
        if emitter.emit(&projector, alpha, position, depth, block, &mut commands) == 0 {
            skipped += 1;
        }
    }

    tracing::info!(
        "Generated {} commands for {}x{} image ({} transparent pixels skipped)",
        commands.len(),
        width,
        height,
        skipped
    );
    Ok(commands)
}
