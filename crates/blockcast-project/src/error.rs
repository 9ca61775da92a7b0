//! Error types for the projection pipeline.

use thiserror::Error;

/// Result type alias for projection operations.
pub type ProjectResult<T> = std::result::Result<T, ProjectError>;

/// Errors raised while preparing inputs or projecting an image.
#[derive(Error, Debug)]
pub enum ProjectError {
    /// Invalid settings or palette contents; fatal before any processing.
    #[error("configuration error: {0}")]
    Config(String),

    /// Observer pose or rotation text did not contain a usable numeric list.
    #[error("could not parse observer pose: {0}")]
    PoseParse(String),

    /// Palette file is not a JSON object of `[r, g, b]` triples.
    #[error("malformed palette: {0}")]
    PaletteFormat(#[from] serde_json::Error),

    /// Source image could not be decoded.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Reading an input file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProjectError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a pose parse error.
    pub fn pose_parse(msg: impl Into<String>) -> Self {
        Self::PoseParse(msg.into())
    }
}
