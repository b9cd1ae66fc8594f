pub mod alert;
pub mod config;
pub mod constants;
pub mod controller;
pub mod display;
pub mod error;
pub mod gui;
pub mod output;
pub mod preview;
pub mod settings;

pub use controller::{CaptureController, CaptureEvent, CaptureObserver, CaptureState, CapturedImage};
pub use display::{DisplaySource, PrimaryScreen};
pub use error::CaptureError;
pub use output::{SUPPORTED_FORMATS, build_output_path, parse_format};
pub use preview::{PreviewImage, compute_preview, scale_to_fit};
pub use settings::CaptureSettings;
