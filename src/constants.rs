// GUI-related constants
pub mod gui {
    // Window settings
    pub const WINDOW_TITLE: &str = "Screenshot";
    pub const WINDOW_WIDTH: f32 = 300.0;
    pub const WINDOW_HEIGHT: f32 = 200.0;

    // The preview never shrinks below this fraction of the captured size
    pub const PREVIEW_MIN_DIVISOR: u32 = 8;

    pub const DELAY_SUFFIX: &str = " s";
    pub const DEFAULT_SAVE_NAME: &str = "untitled";
}

// Capture configuration defaults
pub mod defaults {
    pub const DELAY_SECONDS: u32 = 5;
    pub const FORMAT: &str = "png";
    pub const FILENAME_TEMPLATE: &str = "screenshot_%Y-%m-%d_%H%M%S";
    pub const DEFAULTS_FILE_NAME: &str = ".screenshot-defaults.json";
}

// Capture limits
pub mod limits {
    pub const MAX_DELAY_SECONDS: u32 = 60;
}
