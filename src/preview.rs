//! Aspect-preserving preview of the captured image.

use image::RgbaImage;
use image::imageops::{self, FilterType};

use crate::error::CaptureError;

/// Scaled rendering of a captured image, sized to fit a display area.
#[derive(Debug, Clone)]
pub struct PreviewImage {
    image: RgbaImage,
    generation: u64,
    target: (u32, u32),
}

impl PreviewImage {
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Generation of the capture this preview was made from.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The box the preview was fitted into.
    pub fn target(&self) -> (u32, u32) {
        self.target
    }
}

/// Largest size with the source's aspect ratio that fits inside the box.
///
/// Tries the full box height first and falls back to the full width when the
/// result would be too wide. Neither side drops below one pixel.
pub fn scale_to_fit(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = (u64::from(source.0.max(1)), u64::from(source.1.max(1)));
    let (box_w, box_h) = (u64::from(target.0), u64::from(target.1));

    let width_at_full_height = box_h * src_w / src_h;
    let (w, h) = if width_at_full_height <= box_w {
        (width_at_full_height, box_h)
    } else {
        (box_w, box_w * src_h / src_w)
    };

    (w.max(1) as u32, h.max(1) as u32)
}

/// Scale `image` to fit a `width` x `height` box, keeping its aspect ratio.
pub fn compute_preview(
    image: &RgbaImage,
    generation: u64,
    width: u32,
    height: u32,
) -> Result<PreviewImage, CaptureError> {
    if width == 0 || height == 0 {
        return Err(CaptureError::InvalidArgument(format!(
            "preview area must be non-empty, got {}x{}",
            width, height
        )));
    }

    let (w, h) = scale_to_fit(image.dimensions(), (width, height));
    let scaled = if (w, h) == image.dimensions() {
        image.clone()
    } else {
        imageops::resize(image, w, h, FilterType::Triangle)
    };

    Ok(PreviewImage {
        image: scaled,
        generation,
        target: (width, height),
    })
}

/// Keeps the last preview and only rescales when the source capture or the
/// target box changes.
#[derive(Debug, Default)]
pub struct PreviewCache {
    current: Option<PreviewImage>,
    renders: u64,
}

impl PreviewCache {
    pub fn get_or_render(
        &mut self,
        image: &RgbaImage,
        generation: u64,
        width: u32,
        height: u32,
    ) -> Result<&PreviewImage, CaptureError> {
        let stale = match &self.current {
            Some(preview) => preview.generation != generation || preview.target != (width, height),
            None => true,
        };

        if stale {
            let preview = compute_preview(image, generation, width, height)?;
            log::debug!(
                "Rendered preview {}x{} for capture {} in {}x{}",
                preview.width(),
                preview.height(),
                generation,
                width,
                height
            );
            self.renders += 1;
            self.current = Some(preview);
        }

        self.current
            .as_ref()
            .ok_or_else(|| CaptureError::InvalidArgument("preview unavailable".to_string()))
    }

    /// Number of times a preview has actually been rescaled.
    pub fn renders(&self) -> u64 {
        self.renders
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_scale_landscape_into_square() {
        assert_eq!(scale_to_fit((800, 600), (100, 100)), (100, 75));
    }

    #[test]
    fn test_scale_portrait_into_square() {
        assert_eq!(scale_to_fit((600, 800), (100, 100)), (75, 100));
    }

    #[test]
    fn test_scale_up_small_source() {
        assert_eq!(scale_to_fit((40, 20), (200, 200)), (200, 100));
    }

    #[test]
    fn test_scale_never_collapses_to_zero() {
        assert_eq!(scale_to_fit((10_000, 1), (50, 50)), (50, 1));
    }

    #[test]
    fn test_scale_fits_and_keeps_ratio() {
        let sources = [(1920, 1080), (1080, 1920), (800, 600), (3440, 1440), (17, 31)];
        let boxes = [(100, 100), (640, 480), (33, 400), (1, 1), (500, 90)];

        for source in sources {
            for target in boxes {
                let (w, h) = scale_to_fit(source, target);
                assert!(w <= target.0 && h <= target.1, "{:?} in {:?}", source, target);

                // one side fills the box, the other is within a pixel of the ratio
                assert!(w == target.0 || h == target.1);
                let expected_h = f64::from(w) * f64::from(source.1) / f64::from(source.0);
                let expected_w = f64::from(h) * f64::from(source.0) / f64::from(source.1);
                assert!(
                    (f64::from(h) - expected_h).abs() <= 1.0
                        || (f64::from(w) - expected_w).abs() <= 1.0
                );
            }
        }
    }

    #[test]
    fn test_compute_preview_rejects_empty_box() {
        let image = RgbaImage::new(4, 4);
        assert!(compute_preview(&image, 1, 0, 10).is_err());
        assert!(compute_preview(&image, 1, 10, 0).is_err());
    }

    #[test]
    fn test_cache_reuses_preview() {
        let image = RgbaImage::from_pixel(800, 600, Rgba([1, 2, 3, 255]));
        let mut cache = PreviewCache::default();

        let first = cache.get_or_render(&image, 1, 100, 100).unwrap().image().clone();
        assert_eq!(first.dimensions(), (100, 75));
        cache.get_or_render(&image, 1, 100, 100).unwrap();
        assert_eq!(cache.renders(), 1);

        cache.get_or_render(&image, 1, 200, 200).unwrap();
        assert_eq!(cache.renders(), 2);

        cache.get_or_render(&image, 2, 200, 200).unwrap();
        assert_eq!(cache.renders(), 3);
    }
}
