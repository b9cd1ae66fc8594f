//! Access to the screen being captured.

use image::RgbaImage;

use crate::error::CaptureError;

/// Something that can grab the contents of the primary display.
///
/// The controller receives one of these at construction instead of reaching
/// for a global screen handle, which keeps it testable without a display.
pub trait DisplaySource: Send {
    fn capture_primary(&mut self) -> Result<RgbaImage, CaptureError>;
}

/// Grabs the primary monitor through the `screenshots` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrimaryScreen;

impl DisplaySource for PrimaryScreen {
    fn capture_primary(&mut self) -> Result<RgbaImage, CaptureError> {
        let screens = screenshots::Screen::all()
            .map_err(|e| CaptureError::NoDisplay(format!("Failed to get screens: {}", e)))?;

        let primary = screens
            .iter()
            .position(|screen| screen.display_info.is_primary)
            .unwrap_or(0);
        let screen = screens
            .get(primary)
            .ok_or_else(|| CaptureError::NoDisplay("No screen found".to_string()))?;

        let captured = screen
            .capture()
            .map_err(|e| CaptureError::NoDisplay(format!("Failed to capture screen: {}", e)))?;

        // screenshots is built on image 0.24, so hand the raw RGBA bytes over
        // instead of the buffer type itself
        let width = captured.width();
        let height = captured.height();
        log::debug!(
            "Captured display {} ({}x{})",
            screen.display_info.id,
            width,
            height
        );

        RgbaImage::from_raw(width, height, captured.into_raw()).ok_or_else(|| {
            CaptureError::NoDisplay(format!(
                "Display returned a truncated {}x{} frame",
                width, height
            ))
        })
    }
}
