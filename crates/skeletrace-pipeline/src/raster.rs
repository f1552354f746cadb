//! Image decoding and binarization.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP), converts them to a
//! single-channel grayscale image, and thresholds that into the binary
//! [`Bitmap`] the thinner and tracer operate on.

use image::GrayImage;
use imageproc::contrast::{ThresholdType, threshold};

use crate::bitmap::Bitmap;
use crate::types::PipelineError;

/// Decode raw image bytes and convert to grayscale.
///
/// Supports PNG, JPEG, BMP, and WebP formats (whatever the `image` crate
/// can decode). The standard luminance formula is used for RGB-to-gray
/// conversion.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
#[must_use = "returns the decoded grayscale image"]
pub fn decode_and_grayscale(bytes: &[u8]) -> Result<GrayImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    Ok(img.to_luma8())
}

/// Threshold a grayscale image into a bitmap.
///
/// Pixels with luma strictly above `level` are foreground. With `invert`
/// set, pixels at or below `level` are foreground instead, which suits dark
/// ink on a light background.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidDimensions`] for a zero-sized image.
pub fn binarize(gray: &GrayImage, level: u8, invert: bool) -> Result<Bitmap, PipelineError> {
    let kind = if invert {
        ThresholdType::BinaryInverted
    } else {
        ThresholdType::Binary
    };
    Bitmap::from_gray(&threshold(gray, level, kind))
}
