//! Project image pixels into camera-relative block placement commands.
//!
//! This crate turns a raster image and an observer pose into a list of
//! `setblock` commands. Every function is synchronous and free of I/O except
//! the explicit loaders ([`Palette::load`], [`raster::load_image`]); sending
//! the commands anywhere is the caller's business.
//!
//! # Pipeline
//!
//! - [`CameraFrame`]: orthonormal look/right/up basis from yaw and pitch
//! - [`depth::depth_for_brightness`]: brightness to distance between near/far bounds
//! - [`Palette::closest`]: nearest block identifier by squared RGB distance
//! - [`Projector`]: pixel grid coordinate plus depth to world position
//! - [`CommandEmitter`]: alpha cutoff and far-distance 2×2 clusters
//! - [`build_commands`]: all of the above over a whole image

mod error;

pub mod camera;
pub mod depth;
pub mod emitter;
pub mod palette;
pub mod pipeline;
pub mod pose;
pub mod projector;
pub mod raster;
pub mod settings;

pub use camera::CameraFrame;
pub use emitter::{CommandEmitter, PlacementCommand};
pub use error::{ProjectError, ProjectResult};
pub use palette::{Palette, PaletteEntry};
pub use pipeline::build_commands;
pub use pose::{ObserverPose, parse_list_response};
pub use projector::Projector;
pub use settings::ProjectionSettings;

/// Height of the observer's eyes above their feet, in blocks.
pub const EYE_HEIGHT: f64 = 1.62;

/// Pixels with alpha below this value are skipped entirely.
pub const ALPHA_CUTOFF: u8 = 128;

/// Fraction of the near/far range after which pixels are drawn as 2×2 clusters.
pub const FAR_FRACTION: f64 = 0.6;
