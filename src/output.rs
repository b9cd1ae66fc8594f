//! Image format selection and writing captured images to disk.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use chrono::Local;
use image::{DynamicImage, ImageFormat, RgbaImage};

use crate::constants::defaults;
use crate::error::CaptureError;

/// File extensions accepted for saving, in the order they are offered.
pub const SUPPORTED_FORMATS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "tiff", "tif", "webp", "ico", "tga", "pnm", "qoi",
];

/// Resolve an extension or format name such as `"JPG"` to an encoder.
pub fn parse_format(name: &str) -> Result<ImageFormat, CaptureError> {
    let lowered = name.trim().trim_start_matches('.').to_lowercase();
    if !SUPPORTED_FORMATS.contains(&lowered.as_str()) {
        return Err(CaptureError::UnsupportedFormat(format!(
            "{} (supported: {})",
            name,
            SUPPORTED_FORMATS.join(", ")
        )));
    }

    ImageFormat::from_extension(&lowered)
        .ok_or_else(|| CaptureError::UnsupportedFormat(name.to_string()))
}

/// Pick the format implied by the file extension. A path without an
/// extension gets `default_format` appended.
pub fn resolve_output(path: &Path, default_format: &str) -> Result<(PathBuf, ImageFormat), CaptureError> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if !ext.is_empty() => Ok((path.to_path_buf(), parse_format(ext)?)),
        _ => {
            let format = parse_format(default_format)?;
            Ok((path.with_extension(default_format.to_lowercase()), format))
        }
    }
}

/// Encode an image into memory.
///
/// Formats without an alpha channel are fed an RGB copy.
pub fn encode(image: &RgbaImage, format: ImageFormat) -> Result<Vec<u8>, CaptureError> {
    let dynamic = if matches!(format, ImageFormat::Jpeg) {
        DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(image.clone()).to_rgb8())
    } else {
        DynamicImage::ImageRgba8(image.clone())
    };

    let mut buffer = Cursor::new(Vec::new());
    dynamic
        .write_to(&mut buffer, format)
        .map_err(|source| CaptureError::Encode {
            format: format!("{:?}", format).to_lowercase(),
            source,
        })?;
    Ok(buffer.into_inner())
}

/// Encode `image` as `format` and write it to `path`.
///
/// Encoding happens before the file is touched, so an encoder failure never
/// leaves a partial file behind.
pub fn write_image(image: &RgbaImage, path: &Path, format: ImageFormat) -> Result<(), CaptureError> {
    let data = encode(image, format)?;

    std::fs::write(path, &data).map_err(|source| CaptureError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    log::info!(
        "Saved {}x{} screenshot to {} ({} bytes)",
        image.width(),
        image.height(),
        path.display(),
        data.len()
    );
    Ok(())
}

/// Generate a timestamped file name such as `screenshot_2024-01-31_120000.png`.
pub fn generate_filename(template: &str, format: &str) -> String {
    let now = Local::now();
    format!("{}.{}", now.format(template), format)
}

/// Build the output path for a CLI capture.
///
/// An explicit `output` wins; otherwise a timestamped name is placed in
/// `directory`.
pub fn build_output_path(output: Option<&Path>, directory: &Path, format: &str) -> PathBuf {
    match output {
        Some(path) => path.to_path_buf(),
        None => directory.join(generate_filename(defaults::FILENAME_TEMPLATE, format)),
    }
}
