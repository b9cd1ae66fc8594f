//! Errors returned by the capture controller.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while capturing, previewing or saving a screenshot.
///
/// None of these leave the controller in a broken state: a failed capture
/// keeps the previous image and a failed save touches nothing.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("No capturable display: {0}")]
    NoDisplay(String),

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to encode image as {format}: {source}")]
    Encode {
        format: String,
        #[source]
        source: image::ImageError,
    },

    #[error("The image could not be saved to \"{}\": {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("A capture is already scheduled")]
    Busy,
}
