//! skeletrace-pipeline: Pure skeleton tracing pipeline (sans-IO).
//!
//! Converts a binary raster into polylines that follow the centerlines of
//! its strokes:
//! decode -> binarize -> Zhang-Suen thinning -> recursive chunked tracing.
//!
//! The tracer splits the image along cheap seams until each chunk is small
//! enough to read fragments off its boundary, then stitches the fragments
//! of sibling chunks back together across the seam that separated them.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! buffers and returns structured data. File handling and SVG output live
//! in `skeletrace-cli` and `skeletrace-export`.

pub mod bitmap;
pub mod diagnostics;
pub mod extract;
pub mod merge;
pub mod pipeline;
pub mod probe;
pub mod raster;
pub mod seam;
pub mod thin;
pub mod trace;
pub mod types;

#[cfg(test)]
mod test_utils;

pub use bitmap::Bitmap;
pub use diagnostics::{
    Clock, PipelineDiagnostics, process_staged_with_diagnostics, process_with_diagnostics,
};
pub use pipeline::Pipeline;
pub use seam::Seam;
pub use thin::ThinningStats;
pub use trace::{TraceOutput, TraceStats};
pub use types::{
    Dimensions, PipelineConfig, PipelineError, Point, Polyline, Rect, TraceConfig, TraceResult,
};

/// Thin a raw pixel buffer in place.
///
/// `pixels` is row-major, `width * height` long, and any non-zero value is
/// foreground. Removed pixels are set to zero; surviving pixels keep their
/// original value.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidDimensions`] if either dimension is
/// zero, or [`PipelineError::BufferLength`] on a length mismatch. The
/// buffer is untouched on error.
pub fn thin_in_place(
    pixels: &mut [u8],
    width: u32,
    height: u32,
) -> Result<ThinningStats, PipelineError> {
    let mut bitmap = Bitmap::from_raw(width, height, pixels.to_vec())?;
    let stats = thin::thin(&mut bitmap);
    for (pixel, &kept) in pixels.iter_mut().zip(bitmap.as_raw()) {
        if kept == 0 {
            *pixel = 0;
        }
    }
    Ok(stats)
}

/// Thin (when `config.thin` is set) and trace an owned bitmap.
///
/// The configuration is validated before any pixel is scanned.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if `config.trace` fails
/// [`TraceConfig::validate`].
pub fn trace_bitmap(
    mut bitmap: Bitmap,
    config: &PipelineConfig,
) -> Result<TraceResult, PipelineError> {
    config.trace.validate()?;
    let thinning = config.thin.then(|| thin::thin(&mut bitmap));
    let output = trace::trace(&bitmap, &config.trace)?;
    Ok(TraceResult {
        polylines: output.polylines,
        rects: output.rects,
        dimensions: bitmap.dimensions(),
        thinning,
        stats: output.stats,
    })
}

/// Trace a raw pixel buffer.
///
/// `pixels` is row-major, `width * height` long, and any non-zero value is
/// foreground.
///
/// ```rust
/// # use skeletrace_pipeline::{PipelineConfig, PipelineError, Point, trace_skeleton};
/// # fn main() -> Result<(), PipelineError> {
/// let mut pixels = vec![0u8; 20 * 3];
/// pixels[20..40].fill(1);
///
/// let result = trace_skeleton(pixels, 20, 3, &PipelineConfig::default())?;
/// assert_eq!(result.polylines.len(), 1);
/// assert_eq!(result.polylines[0].first(), Some(&Point::new(19, 1)));
/// assert_eq!(result.polylines[0].last(), Some(&Point::new(0, 1)));
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] for an invalid trace
/// configuration, [`PipelineError::InvalidDimensions`] if either dimension
/// is zero, or [`PipelineError::BufferLength`] on a length mismatch.
pub fn trace_skeleton(
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    config: &PipelineConfig,
) -> Result<TraceResult, PipelineError> {
    config.trace.validate()?;
    trace_bitmap(Bitmap::from_raw(width, height, pixels)?, config)
}

/// Run the full pipeline on encoded image bytes.
///
/// # Pipeline steps
///
/// 1. Decode image and convert to grayscale
/// 2. Threshold into a bitmap (`config.threshold`, `config.invert`)
/// 3. Zhang-Suen thinning (when `config.thin` is set)
/// 4. Recursive chunked tracing (`config.trace`)
///
/// Intermediate rasters are dropped as soon as the next one exists. Use
/// [`Pipeline`] to inspect them.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `image_bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is unrecognized.
/// Returns [`PipelineError::InvalidConfig`] for an invalid trace
/// configuration.
pub fn process(
    image_bytes: &[u8],
    config: &PipelineConfig,
) -> Result<TraceResult, PipelineError> {
    config.trace.validate()?;
    let gray = raster::decode_and_grayscale(image_bytes)?;
    let bitmap = raster::binarize(&gray, config.threshold, config.invert)?;
    drop(gray);
    trace_bitmap(bitmap, config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// A white PNG with a dark horizontal stroke `thickness` rows thick
    /// centred vertically.
    fn dark_stroke_png(width: u32, height: u32, thickness: u32) -> Vec<u8> {
        let top = (height - thickness) / 2;
        let img = image::RgbaImage::from_fn(width, height, |_, y| {
            if (top..top + thickness).contains(&y) {
                image::Rgba([0, 0, 0, 255])
            } else {
                image::Rgba([255, 255, 255, 255])
            }
        });
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
        buf
    }

    fn pts(coords: &[(u32, u32)]) -> Vec<Point> {
        coords.iter().map(|&(x, y)| Point::new(x, y)).collect()
    }

    fn line_pixels() -> Vec<u8> {
        let mut pixels = vec![0u8; 20 * 3];
        pixels[20..40].fill(1);
        pixels
    }

    #[test]
    fn thin_in_place_clears_only_removed_pixels() {
        // A 3-row bar of 7s inside a 5-row image.
        let mut pixels = vec![0u8; 12 * 5];
        pixels[12..48].fill(7);
        let stats = thin_in_place(&mut pixels, 12, 5).unwrap();
        assert!(stats.removed > 0);
        assert!(pixels.iter().all(|&p| p == 0 || p == 7));
        let remaining = u64::try_from(pixels.iter().filter(|&&p| p == 7).count()).unwrap();
        assert_eq!(remaining, 36 - stats.removed);
    }

    #[test]
    fn thin_in_place_rejects_bad_length() {
        let mut pixels = vec![1u8; 10];
        let result = thin_in_place(&mut pixels, 4, 4);
        assert!(matches!(
            result,
            Err(PipelineError::BufferLength {
                expected: 16,
                actual: 10
            })
        ));
        assert!(pixels.iter().all(|&p| p == 1));
    }

    #[test]
    fn trace_skeleton_horizontal_line() {
        let result = trace_skeleton(line_pixels(), 20, 3, &PipelineConfig::default()).unwrap();
        assert_eq!(result.polylines.len(), 1);
        assert_eq!(
            result.polylines[0].points(),
            pts(&[(19, 1), (10, 1), (9, 1), (0, 1)])
        );
        assert_eq!(
            result.dimensions,
            Dimensions {
                width: 20,
                height: 3
            }
        );
        assert_eq!(result.thinning.map(|t| t.removed), Some(0));
        assert_eq!(result.rects, None);
    }

    #[test]
    fn trace_skeleton_records_rects_when_asked() {
        let mut config = PipelineConfig::default();
        config.trace.record_rects = true;
        let result = trace_skeleton(line_pixels(), 20, 3, &config).unwrap();
        assert_eq!(
            result.rects,
            Some(vec![Rect::new(0, 0, 10, 3), Rect::new(10, 0, 10, 3)])
        );
    }

    #[test]
    fn trace_skeleton_blank_image() {
        let mut config = PipelineConfig::default();
        config.trace.record_rects = true;
        let result = trace_skeleton(vec![0; 25 * 25], 25, 25, &config).unwrap();
        assert!(result.polylines.is_empty());
        assert_eq!(result.rects, Some(vec![]));
    }

    #[test]
    fn trace_skeleton_without_thinning() {
        let config = PipelineConfig {
            thin: false,
            ..PipelineConfig::default()
        };
        let result = trace_skeleton(line_pixels(), 20, 3, &config).unwrap();
        assert_eq!(result.thinning, None);
        assert_eq!(result.polylines.len(), 1);
    }

    #[test]
    fn trace_skeleton_rejects_malformed_input() {
        let config = PipelineConfig::default();
        assert!(matches!(
            trace_skeleton(vec![0; 5], 2, 3, &config),
            Err(PipelineError::BufferLength { .. })
        ));
        assert!(matches!(
            trace_skeleton(vec![], 0, 3, &config),
            Err(PipelineError::InvalidDimensions { .. })
        ));

        let mut bad = PipelineConfig::default();
        bad.trace.chunk_size = 0;
        assert!(matches!(
            trace_skeleton(vec![0; 6], 2, 3, &bad),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn process_empty_input() {
        let result = process(&[], &PipelineConfig::default());
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn process_invalid_config_fails_before_decoding() {
        let mut config = PipelineConfig::default();
        config.trace.max_depth = Some(0);
        let result = process(&[], &config);
        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn process_dark_stroke_on_light_background() {
        let config = PipelineConfig {
            invert: true,
            ..PipelineConfig::default()
        };
        let result = process(&dark_stroke_png(40, 12, 3), &config).unwrap();
        assert_eq!(
            result.dimensions,
            Dimensions {
                width: 40,
                height: 12
            }
        );
        assert!(!result.polylines.is_empty());
        assert!(result.thinning.unwrap().removed > 0);
        for polyline in &result.polylines {
            for p in polyline.points() {
                assert!(p.x < 40 && p.y < 12);
            }
        }
    }

    #[test]
    fn process_without_invert_sees_the_background() {
        // Without inversion the light background is the foreground, so the
        // stroke becomes a gap rather than a line.
        let result = process(&dark_stroke_png(40, 12, 3), &PipelineConfig::default()).unwrap();
        let inverted = process(
            &dark_stroke_png(40, 12, 3),
            &PipelineConfig {
                invert: true,
                ..PipelineConfig::default()
            },
        )
        .unwrap();
        assert_ne!(result.polylines, inverted.polylines);
    }

    #[test]
    fn process_is_deterministic() {
        let png = dark_stroke_png(48, 20, 4);
        let config = PipelineConfig {
            invert: true,
            ..PipelineConfig::default()
        };
        assert_eq!(
            process(&png, &config).unwrap(),
            process(&png, &config).unwrap()
        );
    }
}
