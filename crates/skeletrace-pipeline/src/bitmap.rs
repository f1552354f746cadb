//! Binary pixel buffer shared by every stage of the tracer.
//!
//! Pixels are stored row-major as `0` (background) or `1` (foreground),
//! so neighbourhood sums can be taken directly on the raw values.

use std::fmt;

use image::{GrayImage, Luma};

use crate::types::{Dimensions, PipelineError, Rect};

/// A binary image with fixed dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    dimensions: Dimensions,
    pixels: Vec<u8>,
}

impl Bitmap {
    /// Create an all-background bitmap.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidDimensions`] if either dimension is zero.
    pub fn new(width: u32, height: u32) -> Result<Self, PipelineError> {
        let len = checked_len(width, height)?;
        Ok(Self {
            dimensions: Dimensions { width, height },
            pixels: vec![0; len],
        })
    }

    /// Wrap a row-major pixel buffer. Any non-zero value is foreground.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidDimensions`] if either dimension is
    /// zero, or [`PipelineError::BufferLength`] if `pixels` does not hold
    /// exactly `width * height` values.
    pub fn from_raw(width: u32, height: u32, mut pixels: Vec<u8>) -> Result<Self, PipelineError> {
        let expected = checked_len(width, height)?;
        if pixels.len() != expected {
            return Err(PipelineError::BufferLength {
                expected,
                actual: pixels.len(),
            });
        }
        for p in &mut pixels {
            *p = u8::from(*p != 0);
        }
        Ok(Self {
            dimensions: Dimensions { width, height },
            pixels,
        })
    }

    /// Build a bitmap by evaluating `f(x, y)` for every pixel.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidDimensions`] if either dimension is zero.
    pub fn from_fn(
        width: u32,
        height: u32,
        mut f: impl FnMut(u32, u32) -> bool,
    ) -> Result<Self, PipelineError> {
        let mut bitmap = Self::new(width, height)?;
        for y in 0..height {
            for x in 0..width {
                if f(x, y) {
                    bitmap.set(x, y, true);
                }
            }
        }
        Ok(bitmap)
    }

    /// Convert a grayscale image: any non-zero luma is foreground.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidDimensions`] for a zero-sized image.
    pub fn from_gray(image: &GrayImage) -> Result<Self, PipelineError> {
        Self::from_raw(image.width(), image.height(), image.as_raw().clone())
    }

    /// Render as a grayscale image with foreground at 255.
    #[must_use]
    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width(), self.height(), |x, y| {
            Luma([if self.get(x, y) { 255 } else { 0 }])
        })
    }

    /// Image width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.dimensions.width
    }

    /// Image height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.dimensions.height
    }

    /// Image dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// The rectangle covering the whole image.
    #[must_use]
    pub const fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.dimensions.width, self.dimensions.height)
    }

    /// Whether the pixel at `(x, y)` is foreground.
    ///
    /// Coordinates must be in bounds.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> bool {
        self.pixels[self.index(x, y)] != 0
    }

    /// The pixel at `(x, y)` as `0` or `1`.
    #[must_use]
    pub fn value(&self, x: u32, y: u32) -> u8 {
        self.pixels[self.index(x, y)]
    }

    /// Set the pixel at `(x, y)`.
    pub fn set(&mut self, x: u32, y: u32, foreground: bool) {
        let i = self.index(x, y);
        self.pixels[i] = u8::from(foreground);
    }

    /// Number of foreground pixels.
    #[must_use]
    pub fn count_foreground(&self) -> u64 {
        self.pixels.iter().map(|&p| u64::from(p)).sum()
    }

    /// The row-major 0/1 buffer.
    #[must_use]
    pub fn as_raw(&self) -> &[u8] {
        &self.pixels
    }

    /// Consume the bitmap and return the row-major 0/1 buffer.
    #[must_use]
    pub fn into_raw(self) -> Vec<u8> {
        self.pixels
    }

    pub(crate) fn raw_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    pub(crate) const fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.dimensions.width as usize + x as usize
    }
}

fn checked_len(width: u32, height: u32) -> Result<usize, PipelineError> {
    if width == 0 || height == 0 {
        return Err(PipelineError::InvalidDimensions { width, height });
    }
    (width as usize)
        .checked_mul(height as usize)
        .ok_or(PipelineError::InvalidDimensions { width, height })
}

/// One text row per image row: `#` for foreground, `.` for background.
impl fmt::Display for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..self.height() {
            for x in 0..self.width() {
                f.write_str(if self.get(x, y) { "#" } else { "." })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn new_is_all_background() {
        let bitmap = Bitmap::new(4, 3).unwrap();
        assert_eq!(bitmap.as_raw().len(), 12);
        assert_eq!(bitmap.count_foreground(), 0);
        assert_eq!(bitmap.bounds(), Rect::new(0, 0, 4, 3));
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        assert!(matches!(
            Bitmap::new(0, 3),
            Err(PipelineError::InvalidDimensions {
                width: 0,
                height: 3
            })
        ));
        assert!(matches!(
            Bitmap::from_raw(3, 0, vec![]),
            Err(PipelineError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn from_raw_rejects_length_mismatch() {
        let result = Bitmap::from_raw(3, 2, vec![0; 5]);
        assert!(matches!(
            result,
            Err(PipelineError::BufferLength {
                expected: 6,
                actual: 5
            })
        ));
    }

    #[test]
    fn from_raw_normalizes_nonzero_to_one() {
        let bitmap = Bitmap::from_raw(2, 2, vec![0, 255, 7, 1]).unwrap();
        assert_eq!(bitmap.as_raw(), &[0, 1, 1, 1]);
    }

    #[test]
    fn get_and_set_use_row_major_layout() {
        let mut bitmap = Bitmap::new(3, 2).unwrap();
        bitmap.set(2, 1, true);
        assert!(bitmap.get(2, 1));
        assert_eq!(bitmap.value(2, 1), 1);
        assert_eq!(bitmap.as_raw()[5], 1);
        bitmap.set(2, 1, false);
        assert!(!bitmap.get(2, 1));
    }

    #[test]
    fn gray_round_trip() {
        let bitmap = Bitmap::from_fn(5, 4, |x, y| (x + y) % 2 == 0).unwrap();
        let gray = bitmap.to_gray_image();
        assert_eq!(gray.get_pixel(0, 0).0[0], 255);
        assert_eq!(gray.get_pixel(1, 0).0[0], 0);
        assert_eq!(Bitmap::from_gray(&gray).unwrap(), bitmap);
    }

    #[test]
    fn display_renders_rows() {
        let bitmap = Bitmap::from_fn(3, 2, |x, y| x == y).unwrap();
        assert_eq!(bitmap.to_string(), "#..\n.#.\n");
    }
}
