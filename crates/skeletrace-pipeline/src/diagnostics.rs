//! Pipeline diagnostics: timing, counts, and other metrics for each stage.
//!
//! These diagnostics are permanent instrumentation intended for tuning the
//! binarization threshold and chunk size. [`process_with_diagnostics`]
//! collects them alongside the traced result.
//!
//! The crate stays sans-IO: timestamps come from a caller-supplied
//! [`Clock`]. Durations are serialized as fractional seconds (`f64`) for
//! JSON compatibility, since `std::time::Duration` does not implement
//! serde traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pipeline::{Pipeline, Traced};
use crate::trace::TraceStats;
use crate::types::{PipelineConfig, PipelineError, TraceResult, total_points};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Source of timestamps for stage timing.
pub trait Clock {
    /// An opaque point in time.
    type Instant;

    /// The current time.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Diagnostics collected from a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Stage 1: image decoding and grayscale conversion.
    pub decode: StageDiagnostics,
    /// Stage 2: thresholding into a bitmap.
    pub binarize: StageDiagnostics,
    /// Stage 3: Zhang-Suen thinning (only when `config.thin == true`).
    pub thin: Option<StageDiagnostics>,
    /// Stage 4: recursive skeleton tracing.
    pub trace: StageDiagnostics,
    /// Total wall-clock duration of the entire pipeline (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics (counts, sizes, etc.).
    pub metrics: StageMetrics,
}

/// Stage-specific metrics that vary by pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Image decoding metrics.
    Decode {
        /// Size of the input image bytes.
        input_bytes: usize,
        /// Decoded image width in pixels.
        width: u32,
        /// Decoded image height in pixels.
        height: u32,
        /// Total pixel count (`width * height`).
        pixel_count: u64,
    },
    /// Binarization metrics.
    Binarize {
        /// Luma threshold used.
        threshold: u8,
        /// Whether dark pixels were taken as foreground.
        invert: bool,
        /// Foreground pixels after thresholding.
        foreground_pixels: u64,
        /// Total pixel count for computing density.
        total_pixels: u64,
    },
    /// Thinning metrics.
    Thin {
        /// Even+odd cycles until convergence.
        cycles: usize,
        /// Pixels removed.
        removed: u64,
        /// Foreground pixels left in the skeleton.
        foreground_pixels: u64,
    },
    /// Tracing metrics.
    Trace {
        /// Chunk size used.
        chunk_size: u32,
        /// Number of polylines produced.
        polyline_count: usize,
        /// Total points across all polylines.
        total_point_count: usize,
        /// Tracer counters.
        stats: TraceStats,
    },
}

/// High-level summary counts for the entire pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Source image width in pixels.
    pub image_width: u32,
    /// Source image height in pixels.
    pub image_height: u32,
    /// Total pixel count.
    pub pixel_count: u64,
    /// Number of polylines traced.
    pub polyline_count: usize,
    /// Total points across all polylines.
    pub total_point_count: usize,
}

impl PipelineDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{} ({} pixels)",
            self.summary.image_width, self.summary.image_height, self.summary.pixel_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);

        let mut stages = vec![("Decode", &self.decode), ("Binarize", &self.binarize)];
        if let Some(ref thin) = self.thin {
            stages.push(("Thin", thin));
        }
        stages.push(("Trace", &self.trace));

        for (name, diag) in &stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Polylines: {}  |  Points: {}",
            self.summary.polyline_count, self.summary.total_point_count,
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Decode {
            input_bytes,
            width,
            height,
            ..
        } => {
            format!("{input_bytes} bytes -> {width}x{height}")
        }
        StageMetrics::Binarize {
            threshold,
            invert,
            foreground_pixels,
            total_pixels,
        } => {
            #[allow(clippy::cast_precision_loss)]
            let density = if *total_pixels > 0 {
                *foreground_pixels as f64 / *total_pixels as f64 * 100.0
            } else {
                0.0
            };
            let polarity = if *invert { "dark" } else { "light" };
            format!("threshold={threshold} {polarity} fg={foreground_pixels} ({density:.1}%)")
        }
        StageMetrics::Thin {
            cycles,
            removed,
            foreground_pixels,
        } => {
            format!("{cycles} cycles, removed={removed} skeleton={foreground_pixels}")
        }
        StageMetrics::Trace {
            chunk_size,
            polyline_count,
            total_point_count,
            stats,
        } => {
            format!(
                "chunk={chunk_size} {polyline_count} polys, {total_point_count} pts, {} chunks ({} splits, {} joins)",
                stats.chunks_visited, stats.splits, stats.fragments_joined,
            )
        }
    }
}

/// Run the full pipeline, timing each stage with `clock`.
///
/// # Errors
///
/// Returns [`PipelineError`] under the same conditions as
/// [`crate::process`].
pub fn process_with_diagnostics<C: Clock>(
    image_bytes: &[u8],
    config: &PipelineConfig,
    clock: &C,
) -> Result<(TraceResult, PipelineDiagnostics), PipelineError> {
    let (traced, diagnostics) = process_staged_with_diagnostics(image_bytes, config, clock)?;
    Ok((traced.into_result(), diagnostics))
}

/// Like [`process_with_diagnostics`] but returns the final [`Traced`]
/// stage, so callers can still reach the intermediate rasters.
///
/// # Errors
///
/// Returns [`PipelineError`] under the same conditions as
/// [`crate::process`].
pub fn process_staged_with_diagnostics<C: Clock>(
    image_bytes: &[u8],
    config: &PipelineConfig,
    clock: &C,
) -> Result<(Traced, PipelineDiagnostics), PipelineError> {
    let pipeline_start = clock.now();

    let start = clock.now();
    let decoded = Pipeline::new(image_bytes.to_vec(), *config).decode()?;
    let decode = timed(clock, &start, decoded.stage_metrics());

    let start = clock.now();
    let binarized = decoded.binarize()?;
    let binarize = timed(clock, &start, binarized.stage_metrics());

    let start = clock.now();
    let thinned = binarized.thin();
    let thin = thinned
        .stage_metrics()
        .map(|metrics| timed(clock, &start, metrics));

    let start = clock.now();
    let traced = thinned.trace()?;
    let trace = timed(clock, &start, traced.stage_metrics());

    let total_duration = clock.elapsed(&pipeline_start);

    let dimensions = traced.dimensions();
    let summary = PipelineSummary {
        image_width: dimensions.width,
        image_height: dimensions.height,
        pixel_count: dimensions.pixel_count(),
        polyline_count: traced.polylines().len(),
        total_point_count: total_points(traced.polylines()),
    };

    Ok((
        traced,
        PipelineDiagnostics {
            decode,
            binarize,
            thin,
            trace,
            total_duration,
            summary,
        },
    ))
}

/// Pair the time since `start` with the metrics of the stage just reached.
fn timed<C: Clock>(clock: &C, start: &C::Instant, metrics: StageMetrics) -> StageDiagnostics {
    StageDiagnostics {
        duration: clock.elapsed(start),
        metrics,
    }
}
