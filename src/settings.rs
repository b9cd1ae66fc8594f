use std::time::Duration;

use crate::constants::limits::MAX_DELAY_SECONDS;
use crate::error::CaptureError;

/// Delay and window-hiding options for the next capture.
///
/// Hiding the window only makes sense when there is time to hide it, so a
/// zero delay always implies `hide_window == false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CaptureSettings {
    delay_seconds: u32,
    hide_window: bool,
}

impl CaptureSettings {
    pub fn new(delay_seconds: u32, hide_window: bool) -> Result<Self, CaptureError> {
        let mut settings = Self::default();
        settings.set_delay(delay_seconds)?;
        settings.set_hide_window(hide_window)?;
        Ok(settings)
    }

    pub fn delay_seconds(&self) -> u32 {
        self.delay_seconds
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs(u64::from(self.delay_seconds))
    }

    pub fn hide_window(&self) -> bool {
        self.hide_window
    }

    /// Whether the hide-window option can currently be switched on.
    pub fn can_hide_window(&self) -> bool {
        self.delay_seconds > 0
    }

    pub fn set_delay(&mut self, seconds: u32) -> Result<(), CaptureError> {
        if seconds > MAX_DELAY_SECONDS {
            return Err(CaptureError::InvalidArgument(format!(
                "delay must be between 0 and {} seconds, got {}",
                MAX_DELAY_SECONDS, seconds
            )));
        }

        self.delay_seconds = seconds;
        if seconds == 0 {
            self.hide_window = false;
        }
        Ok(())
    }

    pub fn set_hide_window(&mut self, hide: bool) -> Result<(), CaptureError> {
        if hide && !self.can_hide_window() {
            return Err(CaptureError::InvalidArgument(
                "hiding the window requires a delay of at least one second".to_string(),
            ));
        }
        self.hide_window = hide;
        Ok(())
    }
}
