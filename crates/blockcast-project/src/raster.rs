//! Source image loading and resampling.

use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};

use crate::error::ProjectResult;
use crate::settings::ProjectionSettings;

/// Decode an image file.
pub fn load_image(path: impl AsRef<Path>) -> ProjectResult<DynamicImage> {
    let path = path.as_ref();
    let image = image::open(path)?;
    tracing::info!(
        "Loaded image {}: {}x{}",
        path.display(),
        image.width(),
        image.height()
    );
    Ok(image)
}

/// Resample `image` to the configured output size as RGBA.
///
/// The output size bounds the number of commands generated.
pub fn prepare(image: &DynamicImage, settings: &ProjectionSettings) -> ProjectResult<RgbaImage> {
    let (width, height) = settings.output_dimensions(image.width(), image.height())?;
    let resized = if (width, height) == (image.width(), image.height()) {
        image.to_rgba8()
    } else {
        image
            .resize_exact(width, height, FilterType::Lanczos3)
            .to_rgba8()
    };
    tracing::info!("Resampled image to {width}x{height}");
    Ok(resized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn keeps_aspect_ratio() {
        let source = DynamicImage::ImageRgba8(RgbaImage::from_pixel(40, 20, Rgba([9, 9, 9, 255])));
        let settings = ProjectionSettings {
            output_width: 10,
            ..Default::default()
        };
        let prepared = prepare(&source, &settings).unwrap();
        assert_eq!(prepared.dimensions(), (10, 5));
    }

    #[test]
    fn same_size_is_untouched() {
        let mut source = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        source.put_pixel(1, 2, Rgba([200, 100, 50, 64]));
        let settings = ProjectionSettings {
            output_width: 4,
            output_height: Some(4),
            ..Default::default()
        };
        let prepared = prepare(&DynamicImage::ImageRgba8(source), &settings).unwrap();
        assert_eq!(prepared.get_pixel(1, 2), &Rgba([200, 100, 50, 64]));
    }
}
