//! Shared types for the skeletrace pipeline.

use serde::{Deserialize, Serialize};

use crate::thin::ThinningStats;
use crate::trace::TraceStats;

/// Re-export `GrayImage` so downstream crates can reference
/// intermediate raster data without depending on `image` directly.
pub use image::GrayImage;

/// An integer pixel coordinate in image space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    /// Column (pixels from left edge).
    pub x: u32,
    /// Row (pixels from top edge).
    pub y: u32,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Manhattan (L1) distance to another point.
    #[must_use]
    pub const fn manhattan_distance(self, other: Self) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

/// A sequence of connected points.
///
/// Inside the tracer a polyline is a *fragment*: a piece of a stroke that
/// may still be spliced onto a neighbour from an adjacent chunk. Once the
/// tracer returns, polylines are final and only readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Polyline(Vec<Point>);

impl Polyline {
    /// Create a new polyline from a vector of points.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the polyline has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of points in the polyline.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the first point, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Point> {
        self.0.first()
    }

    /// Returns the last point, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Point> {
        self.0.last()
    }

    /// Returns a slice of all points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Consumes the polyline and returns the underlying vector of points.
    #[must_use]
    pub fn into_points(self) -> Vec<Point> {
        self.0
    }

    /// Append `other` after the last point.
    pub(crate) fn append(&mut self, other: Self) {
        self.0.extend(other.0);
    }

    /// Insert `other` before the first point.
    pub(crate) fn prepend(&mut self, mut other: Self) {
        other.0.append(&mut self.0);
        self.0 = other.0;
    }

    pub(crate) fn reverse(&mut self) {
        self.0.reverse();
    }
}

/// Total number of points across a set of polylines.
#[must_use]
pub fn total_points(polylines: &[Polyline]) -> usize {
    polylines.iter().map(Polyline::len).sum()
}

/// An axis-aligned rectangle of pixels: a chunk of the bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    /// Left column.
    pub x: u32,
    /// Top row.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Rect {
    /// Create a new rectangle.
    #[must_use]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Returns `true` if the rectangle covers no pixels.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// One past the rightmost column.
    #[must_use]
    pub const fn right(&self) -> u32 {
        self.x + self.width
    }

    /// One past the bottom row.
    #[must_use]
    pub const fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// The chunk center used as the default fragment anchor.
    ///
    /// Integer division, so even-sized chunks round toward the bottom-right.
    #[must_use]
    pub const fn center(&self) -> Point {
        Point::new(self.x + self.width / 2, self.y + self.height / 2)
    }

    /// Returns `true` if the whole rectangle lies inside an image of the
    /// given dimensions.
    #[must_use]
    pub const fn fits_within(&self, dimensions: Dimensions) -> bool {
        match (
            self.x.checked_add(self.width),
            self.y.checked_add(self.height),
        ) {
            (Some(right), Some(bottom)) => {
                right <= dimensions.width && bottom <= dimensions.height
            }
            _ => false,
        }
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Total pixel count.
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Parameters of the recursive tracer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceConfig {
    /// Chunks no larger than this on both axes are turned into fragments
    /// directly instead of being split further.
    pub chunk_size: u32,

    /// Recursion depth cutoff. `None` uses `width * height` of the image,
    /// which never trips on sane inputs.
    pub max_depth: Option<usize>,

    /// Whether to record every sub-chunk the tracer recursed into.
    pub record_rects: bool,
}

impl TraceConfig {
    /// Default chunk size in pixels.
    pub const DEFAULT_CHUNK_SIZE: u32 = 10;

    /// Check the invariants the tracer relies on.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if `chunk_size` is zero or
    /// `max_depth` is `Some(0)`.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.chunk_size == 0 {
            return Err(PipelineError::InvalidConfig(
                "chunk_size must be at least 1".to_string(),
            ));
        }
        if self.max_depth == Some(0) {
            return Err(PipelineError::InvalidConfig(
                "max_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// The depth budget to start the recursion with for an image of the
    /// given dimensions.
    #[must_use]
    pub fn depth_budget(&self, dimensions: Dimensions) -> usize {
        self.max_depth.unwrap_or_else(|| {
            usize::try_from(dimensions.pixel_count()).unwrap_or(usize::MAX)
        })
    }
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            chunk_size: Self::DEFAULT_CHUNK_SIZE,
            max_depth: None,
            record_rects: false,
        }
    }
}

/// Configuration for the full image-to-skeleton pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Luma threshold for binarization. Pixels brighter than this are
    /// foreground (or darker-or-equal, when `invert` is set).
    pub threshold: u8,

    /// Treat dark pixels as foreground. Use for ink on paper.
    pub invert: bool,

    /// Run Zhang-Suen thinning before tracing. Disable only for inputs
    /// that are already one pixel wide.
    pub thin: bool,

    /// Tracer parameters.
    pub trace: TraceConfig,
}

impl PipelineConfig {
    /// Default binarization threshold.
    pub const DEFAULT_THRESHOLD: u8 = 128;
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            threshold: Self::DEFAULT_THRESHOLD,
            invert: false,
            thin: true,
            trace: TraceConfig::default(),
        }
    }
}

/// Output of a complete trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceResult {
    /// The traced skeleton centerlines. Every polyline has at least one point.
    pub polylines: Vec<Polyline>,

    /// Sub-chunks visited by the tracer, in visitation order. `Some` only
    /// when [`TraceConfig::record_rects`] was set.
    pub rects: Option<Vec<Rect>>,

    /// Dimensions of the traced bitmap.
    pub dimensions: Dimensions,

    /// Thinning statistics (`None` when thinning was disabled).
    pub thinning: Option<ThinningStats>,

    /// Tracer statistics.
    pub stats: TraceStats,
}

/// Errors that can occur during pipeline processing.
///
/// Uses custom `Serialize`/`Deserialize` because `image::ImageError`
/// does not implement serde traits. The `ImageDecode` variant is
/// serialized as its `Display` string.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Width or height is zero.
    #[error("invalid bitmap dimensions {width}x{height}")]
    InvalidDimensions {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },

    /// The pixel buffer does not hold `width * height` values.
    #[error("pixel buffer holds {actual} values, expected {expected}")]
    BufferLength {
        /// `width * height`.
        expected: usize,
        /// Length of the supplied buffer.
        actual: usize,
    },

    /// Configuration is invalid.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    /// A chunk is empty or extends past the bitmap.
    #[error("invalid chunk {}x{} at ({}, {})", .0.width, .0.height, .0.x, .0.y)]
    InvalidChunk(Rect),
}

/// Serde-compatible proxy for `PipelineError`.
#[derive(Serialize, Deserialize)]
enum PipelineErrorProxy {
    ImageDecode(String),
    EmptyInput,
    InvalidDimensions { width: u32, height: u32 },
    BufferLength { expected: usize, actual: usize },
    InvalidConfig(String),
    InvalidChunk(Rect),
}

impl Serialize for PipelineError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let proxy = match self {
            Self::ImageDecode(e) => PipelineErrorProxy::ImageDecode(e.to_string()),
            Self::EmptyInput => PipelineErrorProxy::EmptyInput,
            Self::InvalidDimensions { width, height } => PipelineErrorProxy::InvalidDimensions {
                width: *width,
                height: *height,
            },
            Self::BufferLength { expected, actual } => PipelineErrorProxy::BufferLength {
                expected: *expected,
                actual: *actual,
            },
            Self::InvalidConfig(s) => PipelineErrorProxy::InvalidConfig(s.clone()),
            Self::InvalidChunk(rect) => PipelineErrorProxy::InvalidChunk(*rect),
        };
        proxy.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PipelineError {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let proxy = PipelineErrorProxy::deserialize(deserializer)?;
        Ok(match proxy {
            // The typed image error cannot be rebuilt; keep its message.
            PipelineErrorProxy::ImageDecode(msg) => {
                Self::InvalidConfig(format!("image decode error: {msg}"))
            }
            PipelineErrorProxy::EmptyInput => Self::EmptyInput,
            PipelineErrorProxy::InvalidDimensions { width, height } => {
                Self::InvalidDimensions { width, height }
            }
            PipelineErrorProxy::BufferLength { expected, actual } => {
                Self::BufferLength { expected, actual }
            }
            PipelineErrorProxy::InvalidConfig(s) => Self::InvalidConfig(s),
            PipelineErrorProxy::InvalidChunk(rect) => Self::InvalidChunk(rect),
        })
    }
}
