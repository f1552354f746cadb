//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! Unlike [`crate::process`] which runs the entire pipeline in one call,
//! [`Pipeline`] lets the caller drive execution one step at a time:
//!
//! ```rust
//! # use skeletrace_pipeline::{Pipeline, PipelineConfig, PipelineError};
//! # fn run(png: Vec<u8>) -> Result<(), PipelineError> {
//! let config = PipelineConfig::default();
//! let traced = Pipeline::new(png, config)
//!     .decode()?
//!     .binarize()?
//!     .thin()
//!     .trace()?;
//!
//! println!("{} polylines", traced.polylines().len());
//! let result = traced.into_result();
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next pipeline state
//! (or `Result` for fallible stages), carrying all previously computed
//! intermediates. The caller can inspect the current stage's output via
//! accessor methods at any point.
//!
//! # Memory
//!
//! Every stage from [`Thinned`] onward retains the grayscale image, the
//! binary bitmap and the skeleton, so a caller can dump any of them after
//! tracing. Callers that only need the polylines should prefer
//! [`crate::process`], which drops the rasters as it goes.

use crate::bitmap::Bitmap;
use crate::diagnostics::StageMetrics;
use crate::thin::ThinningStats;
use crate::trace::{TraceOutput, TraceStats};
use crate::types::{
    Dimensions, GrayImage, PipelineConfig, PipelineError, Polyline, Rect, TraceResult,
    total_points,
};

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
///
/// The source image bytes and config are stored but not yet touched.
/// Call [`decode`](Self::decode) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing; call .decode() to continue"]
pub struct Pending {
    config: PipelineConfig,
    source: Vec<u8>,
}

impl Pending {
    /// The raw source image bytes.
    #[must_use]
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    /// Decode the source image and advance to the [`Decoded`] stage.
    ///
    /// The trace configuration is validated before the source is touched.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if the trace parameters
    /// are invalid. Returns [`PipelineError::EmptyInput`] if the source
    /// bytes are empty. Returns [`PipelineError::ImageDecode`] if the
    /// image format is unrecognized or the data is corrupt.
    pub fn decode(self) -> Result<Decoded, PipelineError> {
        self.config.trace.validate()?;
        let source_len = self.source.len();
        let grayscale = crate::raster::decode_and_grayscale(&self.source)?;
        Ok(Decoded {
            config: self.config,
            grayscale,
            source_len,
        })
    }
}

// ───────────────────────── Stage 1: Decoded ──────────────────────────

/// Pipeline state after decoding the source image to grayscale.
///
/// Call [`binarize`](Self::binarize) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing; call .binarize() to continue"]
pub struct Decoded {
    config: PipelineConfig,
    grayscale: GrayImage,
    source_len: usize,
}

impl Decoded {
    /// The decoded grayscale image.
    #[must_use]
    pub const fn grayscale(&self) -> &GrayImage {
        &self.grayscale
    }

    /// Threshold the grayscale image and advance to the [`Binarized`]
    /// stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidDimensions`] if the decoded image
    /// has no pixels.
    pub fn binarize(self) -> Result<Binarized, PipelineError> {
        let binary = crate::raster::binarize(
            &self.grayscale,
            self.config.threshold,
            self.config.invert,
        )?;
        Ok(Binarized {
            config: self.config,
            grayscale: self.grayscale,
            binary,
        })
    }

    pub(crate) fn stage_metrics(&self) -> StageMetrics {
        let (width, height) = self.grayscale.dimensions();
        StageMetrics::Decode {
            input_bytes: self.source_len,
            width,
            height,
            pixel_count: u64::from(width) * u64::from(height),
        }
    }
}

// ───────────────────────── Stage 2: Binarized ────────────────────────

/// Pipeline state after thresholding.
///
/// Call [`thin`](Self::thin) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing; call .thin() to continue"]
pub struct Binarized {
    config: PipelineConfig,
    grayscale: GrayImage,
    binary: Bitmap,
}

impl Binarized {
    /// The thresholded bitmap.
    #[must_use]
    pub const fn binary(&self) -> &Bitmap {
        &self.binary
    }

    /// Thin the bitmap to its skeleton (when `config.thin` is set) and
    /// advance to the [`Thinned`] stage.
    pub fn thin(self) -> Thinned {
        let mut skeleton = self.binary.clone();
        let stats = self
            .config
            .thin
            .then(|| crate::thin::thin(&mut skeleton));
        Thinned {
            config: self.config,
            grayscale: self.grayscale,
            binary: self.binary,
            skeleton,
            stats,
        }
    }

    pub(crate) fn stage_metrics(&self) -> StageMetrics {
        StageMetrics::Binarize {
            threshold: self.config.threshold,
            invert: self.config.invert,
            foreground_pixels: self.binary.count_foreground(),
            total_pixels: self.binary.dimensions().pixel_count(),
        }
    }
}

// ───────────────────────── Stage 3: Thinned ──────────────────────────

/// Pipeline state after thinning.
///
/// When thinning is disabled the skeleton is an unchanged copy of the
/// binary bitmap. Call [`trace`](Self::trace) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing; call .trace() to continue"]
pub struct Thinned {
    config: PipelineConfig,
    grayscale: GrayImage,
    binary: Bitmap,
    skeleton: Bitmap,
    stats: Option<ThinningStats>,
}

impl Thinned {
    /// The bitmap handed to the tracer.
    #[must_use]
    pub const fn skeleton(&self) -> &Bitmap {
        &self.skeleton
    }

    /// Thinning statistics, or `None` when thinning was disabled.
    #[must_use]
    pub const fn stats(&self) -> Option<ThinningStats> {
        self.stats
    }

    /// Trace the skeleton and advance to the [`Traced`] stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if the trace parameters
    /// are invalid.
    pub fn trace(self) -> Result<Traced, PipelineError> {
        let output = crate::trace::trace(&self.skeleton, &self.config.trace)?;
        Ok(Traced {
            config: self.config,
            grayscale: self.grayscale,
            binary: self.binary,
            skeleton: self.skeleton,
            thinning: self.stats,
            output,
        })
    }

    pub(crate) fn stage_metrics(&self) -> Option<StageMetrics> {
        self.stats.map(|stats| StageMetrics::Thin {
            cycles: stats.cycles,
            removed: stats.removed,
            foreground_pixels: self.skeleton.count_foreground(),
        })
    }
}

// ───────────────────────── Stage 4: Traced ───────────────────────────

/// Pipeline state after tracing. This is the final stage.
///
/// Call [`into_result`](Self::into_result) to extract the
/// [`TraceResult`].
#[must_use = "call .into_result() to extract the traced polylines"]
pub struct Traced {
    config: PipelineConfig,
    grayscale: GrayImage,
    binary: Bitmap,
    skeleton: Bitmap,
    thinning: Option<ThinningStats>,
    output: TraceOutput,
}

impl Traced {
    /// The traced polylines.
    #[must_use]
    pub fn polylines(&self) -> &[Polyline] {
        &self.output.polylines
    }

    /// Sub-chunks visited, when `config.trace.record_rects` was set.
    #[must_use]
    pub fn rects(&self) -> Option<&[Rect]> {
        self.output.rects.as_deref()
    }

    /// Tracer counters.
    #[must_use]
    pub const fn stats(&self) -> TraceStats {
        self.output.stats
    }

    /// The decoded grayscale image.
    #[must_use]
    pub const fn grayscale(&self) -> &GrayImage {
        &self.grayscale
    }

    /// The thresholded bitmap.
    #[must_use]
    pub const fn binary(&self) -> &Bitmap {
        &self.binary
    }

    /// The bitmap that was traced.
    #[must_use]
    pub const fn skeleton(&self) -> &Bitmap {
        &self.skeleton
    }

    /// Image dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.skeleton.dimensions()
    }

    /// Copy the final result out, keeping the intermediates.
    #[must_use]
    pub fn to_result(&self) -> TraceResult {
        TraceResult {
            dimensions: self.skeleton.dimensions(),
            polylines: self.output.polylines.clone(),
            rects: self.output.rects.clone(),
            thinning: self.thinning,
            stats: self.output.stats,
        }
    }

    /// Consume the pipeline and return the final result.
    pub fn into_result(self) -> TraceResult {
        TraceResult {
            dimensions: self.skeleton.dimensions(),
            polylines: self.output.polylines,
            rects: self.output.rects,
            thinning: self.thinning,
            stats: self.output.stats,
        }
    }

    pub(crate) fn stage_metrics(&self) -> StageMetrics {
        StageMetrics::Trace {
            chunk_size: self.config.trace.chunk_size,
            polyline_count: self.output.polylines.len(),
            total_point_count: total_points(&self.output.polylines),
            stats: self.output.stats,
        }
    }
}

// ──────────────────── PipelineStage trait + Stage enum ────────────────

/// Total number of stages in the pipeline.
pub const STAGE_COUNT: usize = 5;

/// The output produced by a single pipeline stage.
///
/// Each variant borrows the data that the corresponding stage computed.
#[must_use]
pub enum StageOutput<'a> {
    /// Source image bytes (not yet decoded).
    Source {
        /// The raw image bytes.
        bytes: &'a [u8],
    },
    /// Decoded grayscale image.
    Decoded {
        /// The grayscale image.
        grayscale: &'a GrayImage,
    },
    /// Thresholded bitmap.
    Binarized {
        /// The binary bitmap.
        binary: &'a Bitmap,
    },
    /// Thinned bitmap.
    Thinned {
        /// The skeleton handed to the tracer.
        skeleton: &'a Bitmap,
    },
    /// Tracing result.
    Traced {
        /// The traced polylines.
        polylines: &'a [Polyline],
        /// Visited sub-chunks, if recorded.
        rects: Option<&'a [Rect]>,
        /// Image dimensions.
        dimensions: Dimensions,
    },
}

/// Trait implemented by every pipeline stage, enabling uniform iteration.
///
/// # Loop pattern
///
/// ```rust
/// # use skeletrace_pipeline::{Pipeline, PipelineConfig, PipelineError};
/// # use skeletrace_pipeline::pipeline::{Stage, Advance};
/// # fn run(png: Vec<u8>) -> Result<(), PipelineError> {
/// let mut stage: Stage = Pipeline::new(png, PipelineConfig::default()).into();
/// loop {
///     match stage.advance()? {
///         Advance::Next(next) => stage = next,
///         Advance::Complete(done) => { stage = done; break; }
///     }
/// }
/// let result = stage.complete()?;
/// # Ok(())
/// # }
/// ```
pub trait PipelineStage: Sized {
    /// Human-readable name of this stage (e.g. `"source"`, `"thin"`).
    const NAME: &str;

    /// Zero-based index of this stage (`0` for Pending through `4` for
    /// Traced).
    const INDEX: usize;

    /// The output this stage produced.
    fn output(&self) -> StageOutput<'_>;

    /// Stage-specific metrics for diagnostics.
    ///
    /// Returns `None` for [`Pending`], which has not processed anything,
    /// and for [`Thinned`] when thinning was disabled.
    fn metrics(&self) -> Option<StageMetrics>;

    /// Advance to the next stage.
    ///
    /// Returns `Ok(Some(stage))` on success, `Ok(None)` if already at
    /// the final stage, or `Err` if the stage transition fails.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the transition fails.
    fn next(self) -> Result<Option<Stage>, PipelineError>;

    /// Run all remaining stages to completion and return the final
    /// [`TraceResult`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if any remaining fallible stage fails.
    fn complete(self) -> Result<TraceResult, PipelineError>;
}

impl PipelineStage for Pending {
    const NAME: &str = "source";
    const INDEX: usize = 0;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Source {
            bytes: &self.source,
        }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        None
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(Some(Stage::Decoded(self.decode()?)))
    }

    fn complete(self) -> Result<TraceResult, PipelineError> {
        self.decode()?.complete()
    }
}

impl PipelineStage for Decoded {
    const NAME: &str = "decode";
    const INDEX: usize = 1;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Decoded {
            grayscale: &self.grayscale,
        }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        Some(self.stage_metrics())
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(Some(Stage::Binarized(self.binarize()?)))
    }

    fn complete(self) -> Result<TraceResult, PipelineError> {
        self.binarize()?.complete()
    }
}

impl PipelineStage for Binarized {
    const NAME: &str = "binarize";
    const INDEX: usize = 2;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Binarized {
            binary: &self.binary,
        }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        Some(self.stage_metrics())
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(Some(Stage::Thinned(self.thin())))
    }

    fn complete(self) -> Result<TraceResult, PipelineError> {
        self.thin().complete()
    }
}

impl PipelineStage for Thinned {
    const NAME: &str = "thin";
    const INDEX: usize = 3;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Thinned {
            skeleton: &self.skeleton,
        }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        self.stage_metrics()
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(Some(Stage::Traced(self.trace()?)))
    }

    fn complete(self) -> Result<TraceResult, PipelineError> {
        Ok(self.trace()?.into_result())
    }
}

impl PipelineStage for Traced {
    const NAME: &str = "trace";
    const INDEX: usize = 4;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Traced {
            polylines: &self.output.polylines,
            rects: self.output.rects.as_deref(),
            dimensions: self.dimensions(),
        }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        Some(self.stage_metrics())
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(None)
    }

    fn complete(self) -> Result<TraceResult, PipelineError> {
        Ok(self.into_result())
    }
}

/// Enum wrapping all pipeline stages for uniform, loopable access.
///
/// Use [`From`] conversions to enter the dynamic API from any typed
/// stage, then call [`advance`](Self::advance) in a loop.
#[must_use]
pub enum Stage {
    /// See [`Pending`].
    Pending(Pending),
    /// See [`Decoded`].
    Decoded(Decoded),
    /// See [`Binarized`].
    Binarized(Binarized),
    /// See [`Thinned`].
    Thinned(Thinned),
    /// See [`Traced`].
    Traced(Traced),
}

/// Compile-time guard: if a [`Stage`] variant is added, this match becomes
/// non-exhaustive and the build fails, a reminder to bump [`STAGE_COUNT`].
#[allow(dead_code, clippy::match_same_arms)]
const fn _stage_count_guard(s: &Stage) {
    match s {
        Stage::Pending(_)
        | Stage::Decoded(_)
        | Stage::Binarized(_)
        | Stage::Thinned(_)
        | Stage::Traced(_) => {}
    }
}

/// Result of [`Stage::advance`]: either the next stage or the
/// completed final stage returned unchanged.
#[must_use]
pub enum Advance {
    /// The pipeline advanced to this next stage.
    Next(Stage),
    /// The pipeline was already at the final stage and is returned unchanged.
    Complete(Stage),
}

/// Delegate a method call to whichever `Stage` variant is active.
macro_rules! delegate {
    ($self:ident, $method:ident $(, $arg:expr)*) => {
        match $self {
            Self::Pending(s) => s.$method($($arg),*),
            Self::Decoded(s) => s.$method($($arg),*),
            Self::Binarized(s) => s.$method($($arg),*),
            Self::Thinned(s) => s.$method($($arg),*),
            Self::Traced(s) => s.$method($($arg),*),
        }
    };
}

impl Stage {
    /// Human-readable name of the current stage.
    #[must_use]
    pub fn name(&self) -> &'static str {
        delegate!(self, name)
    }

    /// Zero-based index of the current stage.
    #[must_use]
    pub fn index(&self) -> usize {
        delegate!(self, index)
    }

    /// The output this stage produced.
    pub fn output(&self) -> StageOutput<'_> {
        delegate!(self, output)
    }

    /// Stage-specific metrics for diagnostics.
    #[must_use]
    pub fn metrics(&self) -> Option<StageMetrics> {
        delegate!(self, metrics)
    }

    /// Whether the pipeline is at the final stage.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Traced(_))
    }

    /// Advance to the next stage.
    ///
    /// Returns `Ok(Some(next_stage))` on success, `Ok(None)` if
    /// already complete (the `Traced` value is consumed), or `Err` if
    /// the transition fails.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if a fallible stage transition fails.
    pub fn next(self) -> Result<Option<Self>, PipelineError> {
        delegate!(self, next)
    }

    /// Advance to the next stage, returning `self` unchanged if
    /// already complete.
    ///
    /// This is the loop-friendly version of [`next`](Self::next).
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if a fallible stage transition fails.
    pub fn advance(self) -> Result<Advance, PipelineError> {
        if self.is_complete() {
            return Ok(Advance::Complete(self));
        }
        // Non-complete stages always return Ok(Some(_)) from next().
        #[allow(clippy::unreachable)]
        let next = self
            .next()?
            .unwrap_or_else(|| unreachable!("non-complete stage returned None from next()"));
        Ok(Advance::Next(next))
    }

    /// Run all remaining stages to completion.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if any remaining fallible stage fails.
    pub fn complete(self) -> Result<TraceResult, PipelineError> {
        delegate!(self, complete)
    }
}

// The macro calls `.name()` and `.index()` on `&self`; the trait's
// associated constants are not reachable that way.
trait StageMetadata {
    fn name(&self) -> &'static str;
    fn index(&self) -> usize;
}

impl<T: PipelineStage> StageMetadata for T {
    fn name(&self) -> &'static str {
        T::NAME
    }

    fn index(&self) -> usize {
        T::INDEX
    }
}

impl From<Pending> for Stage {
    fn from(s: Pending) -> Self {
        Self::Pending(s)
    }
}

impl From<Decoded> for Stage {
    fn from(s: Decoded) -> Self {
        Self::Decoded(s)
    }
}

impl From<Binarized> for Stage {
    fn from(s: Binarized) -> Self {
        Self::Binarized(s)
    }
}

impl From<Thinned> for Stage {
    fn from(s: Thinned) -> Self {
        Self::Thinned(s)
    }
}

impl From<Traced> for Stage {
    fn from(s: Traced) -> Self {
        Self::Traced(s)
    }
}

// ───────────────────── Pipeline entry point ──────────────────────────

/// Incremental skeleton tracing pipeline.
///
/// Created via [`Pipeline::new`], which stores the source image and
/// config without doing any processing. Each stage method consumes the
/// current state and returns the next, making it a compile-time error to
/// skip stages or call them out of order.
pub struct Pipeline;

impl Pipeline {
    /// Create a new pipeline from source image bytes and config.
    ///
    /// No processing is performed; the bytes and config are simply
    /// stored. Call [`.decode()`](Pending::decode) (or convert to a
    /// [`Stage`] and loop) to begin processing.
    #[allow(clippy::new_ret_no_self)]
    pub const fn new(image_bytes: Vec<u8>, config: PipelineConfig) -> Pending {
        Pending {
            config,
            source: image_bytes,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// A black PNG with a three-pixel-thick white bar across the middle.
    fn bar_png(width: u32, height: u32) -> Vec<u8> {
        let mid = height / 2;
        let img = image::RgbaImage::from_fn(width, height, |_, y| {
            if y + 1 >= mid && y <= mid + 1 {
                image::Rgba([255, 255, 255, 255])
            } else {
                image::Rgba([0, 0, 0, 255])
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

    fn traced(png: Vec<u8>, config: PipelineConfig) -> Traced {
        Pipeline::new(png, config)
            .decode()
            .unwrap()
            .binarize()
            .unwrap()
            .thin()
            .trace()
            .unwrap()
    }

    // ─────────── Typed API tests ─────────────────────────────────

    #[test]
    fn pending_exposes_source_bytes() {
        let png = bar_png(20, 20);
        let expected_len = png.len();
        let pending = Pipeline::new(png, PipelineConfig::default());
        assert_eq!(pending.source().len(), expected_len);
    }

    #[test]
    fn decode_empty_input_returns_error() {
        let result = Pipeline::new(vec![], PipelineConfig::default()).decode();
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn decode_corrupt_input_returns_error() {
        let result = Pipeline::new(vec![0xFF, 0x00], PipelineConfig::default()).decode();
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn decoded_exposes_grayscale() {
        let decoded = Pipeline::new(bar_png(20, 16), PipelineConfig::default())
            .decode()
            .unwrap();
        assert_eq!(decoded.grayscale().dimensions(), (20, 16));
    }

    #[test]
    fn binarized_exposes_binary() {
        let binarized = Pipeline::new(bar_png(20, 16), PipelineConfig::default())
            .decode()
            .unwrap()
            .binarize()
            .unwrap();
        assert_eq!(binarized.binary().count_foreground(), 60);
    }

    #[test]
    fn invert_swaps_foreground() {
        let config = PipelineConfig {
            invert: true,
            ..PipelineConfig::default()
        };
        let binarized = Pipeline::new(bar_png(20, 16), config)
            .decode()
            .unwrap()
            .binarize()
            .unwrap();
        assert_eq!(binarized.binary().count_foreground(), 20 * 16 - 60);
    }

    #[test]
    fn thinned_reduces_the_bar() {
        let thinned = Pipeline::new(bar_png(20, 16), PipelineConfig::default())
            .decode()
            .unwrap()
            .binarize()
            .unwrap()
            .thin();
        let stats = thinned.stats().unwrap();
        assert!(stats.removed > 0);
        assert!(thinned.skeleton().count_foreground() < 60);
    }

    #[test]
    fn thin_disabled_keeps_binary() {
        let config = PipelineConfig {
            thin: false,
            ..PipelineConfig::default()
        };
        let thinned = Pipeline::new(bar_png(20, 16), config)
            .decode()
            .unwrap()
            .binarize()
            .unwrap()
            .thin();
        assert!(thinned.stats().is_none());
        assert_eq!(thinned.skeleton().count_foreground(), 60);
        assert!(PipelineStage::metrics(&thinned).is_none());
    }

    #[test]
    fn traced_exposes_everything() {
        let mut config = PipelineConfig::default();
        config.trace.record_rects = true;
        let traced = traced(bar_png(40, 16), config);
        assert!(!traced.polylines().is_empty());
        assert!(traced.rects().is_some());
        assert!(traced.stats().chunks_visited > 0);
        assert_eq!(
            traced.dimensions(),
            Dimensions {
                width: 40,
                height: 16,
            }
        );
        assert_eq!(traced.binary().count_foreground(), 120);
        assert!(traced.skeleton().count_foreground() < 120);
        assert_eq!(traced.grayscale().width(), 40);
        assert_eq!(traced.to_result(), traced.into_result());
    }

    #[test]
    fn invalid_trace_config_fails_before_decoding() {
        let mut config = PipelineConfig::default();
        config.trace.chunk_size = 0;
        assert!(matches!(
            Pipeline::new(bar_png(20, 16), config).decode(),
            Err(PipelineError::InvalidConfig(_))
        ));
        // Corrupt bytes would fail to decode; the config error wins.
        assert!(matches!(
            Pipeline::new(vec![0xFF, 0x00], config).decode(),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn full_pipeline_matches_process() {
        let png = bar_png(40, 24);
        let config = PipelineConfig::default();
        let processed = crate::process(&png, &config).unwrap();
        let staged = traced(png, config).into_result();
        assert_eq!(processed, staged);
    }

    // ─────────── Helper: drive a Stage to completion ────────────

    /// Advance a [`Stage`] to completion, returning the final stage
    /// and a log of `(index, name)` pairs visited along the way.
    #[allow(clippy::type_complexity)]
    fn drive_to_end(start: Stage) -> Result<(Stage, Vec<(usize, &'static str)>), PipelineError> {
        let mut log = vec![(start.index(), start.name())];
        let mut stage = start;
        loop {
            match stage.advance()? {
                Advance::Next(next) => {
                    log.push((next.index(), next.name()));
                    stage = next;
                }
                Advance::Complete(done) => return Ok((done, log)),
            }
        }
    }

    // ─────────── PipelineStage trait + Stage enum tests ───────────

    #[test]
    fn stage_names_and_indices() {
        let start: Stage = Pipeline::new(bar_png(40, 16), PipelineConfig::default()).into();
        let (_, log) = drive_to_end(start).unwrap();
        let expected = [
            (0, "source"),
            (1, "decode"),
            (2, "binarize"),
            (3, "thin"),
            (4, "trace"),
        ];
        assert_eq!(log.as_slice(), &expected);
    }

    #[test]
    fn loop_to_completion_matches_chained_api() {
        let png = bar_png(40, 16);
        let config = PipelineConfig::default();

        let chained = traced(png.clone(), config).into_result();

        let start: Stage = Pipeline::new(png, config).into();
        let (final_stage, _) = drive_to_end(start).unwrap();
        let looped = final_stage.complete().unwrap();

        assert_eq!(chained, looped);
    }

    #[test]
    fn complete_from_any_stage() {
        let png = bar_png(40, 16);
        let config = PipelineConfig::default();
        let expected = traced(png.clone(), config).into_result();

        let pending = Pipeline::new(png.clone(), config);
        assert_eq!(pending.complete().unwrap(), expected);

        let binarized = Pipeline::new(png, config)
            .decode()
            .unwrap()
            .binarize()
            .unwrap();
        assert_eq!(binarized.complete().unwrap(), expected);
    }

    #[test]
    fn next_on_traced_returns_none() {
        let traced = traced(bar_png(40, 16), PipelineConfig::default());
        assert!(traced.next().unwrap().is_none());
    }

    #[test]
    fn stage_is_complete() {
        let start: Stage = Pipeline::new(bar_png(40, 16), PipelineConfig::default()).into();
        assert!(!start.is_complete());
        let (final_stage, _) = drive_to_end(start).unwrap();
        assert!(final_stage.is_complete());
    }

    #[test]
    fn output_variant_matches_stage() {
        let mut stage: Stage = Pipeline::new(bar_png(40, 16), PipelineConfig::default()).into();
        let mut visited = 0;
        loop {
            let idx = stage.index();
            let variant_idx = match stage.output() {
                StageOutput::Source { .. } => 0,
                StageOutput::Decoded { .. } => 1,
                StageOutput::Binarized { .. } => 2,
                StageOutput::Thinned { .. } => 3,
                StageOutput::Traced { .. } => 4,
            };
            assert_eq!(idx, variant_idx, "output variant mismatch at index {idx}");
            visited += 1;
            match stage.advance().unwrap() {
                Advance::Next(next) => stage = next,
                Advance::Complete(_) => break,
            }
        }
        assert_eq!(visited, STAGE_COUNT);
    }

    #[test]
    fn metrics_present_after_source() {
        let mut stage: Stage = Pipeline::new(bar_png(40, 16), PipelineConfig::default()).into();
        assert!(stage.metrics().is_none());
        while let Advance::Next(next) = stage.advance().unwrap() {
            assert!(next.metrics().is_some(), "{} has no metrics", next.name());
            stage = next;
        }
    }

    #[test]
    fn pending_decode_error_via_advance() {
        let stage: Stage = Pipeline::new(vec![], PipelineConfig::default()).into();
        let result = stage.advance();
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }
}
