//! Brightness to distance mapping.
//!
//! Bright pixels are treated as near and dark pixels as far.

use image::Rgba;

/// Map brightness in `[0, 1]` to a distance in `[min_distance, max_distance]`.
///
/// Input outside `[0, 1]` is clamped so the result never leaves the bounds.
#[must_use]
pub fn depth_for_brightness(normalized: f64, min_distance: f64, max_distance: f64) -> f64 {
    let normalized = normalized.clamp(0.0, 1.0);
    let depth = max_distance - normalized * (max_distance - min_distance);
    depth.clamp(min_distance, max_distance)
}

/// ITU-R 601-2 luma of a pixel, normalized to `[0, 1]`. Alpha is ignored.
#[must_use]
pub fn brightness(pixel: Rgba<u8>) -> f64 {
    let [r, g, b, _] = pixel.0;
    // 16.16 fixed point weights 0.299, 0.587, 0.114, rounded.
    let weighted = u32::from(r) * 19_595 + u32::from(g) * 38_470 + u32::from(b) * 7_471;
    let luma = (weighted + 0x8000) >> 16;
    f64::from(luma) / 255.0
}
