//! skeletrace: trace the skeleton of a line drawing into polylines.
//!
//! Reads an image file, thresholds and thins it, traces the skeleton and
//! writes the result as SVG and/or JSON. Per-stage diagnostics help with
//! picking a threshold and chunk size:
//!
//! - Compare polyline/point counts across chunk sizes
//! - Check how much the thinner removed and how many seams were cut
//! - Measure per-stage durations over several runs
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin skeletrace -- [OPTIONS] <IMAGE_PATH>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use skeletrace_export::{SvgMetadata, SvgOptions};
use skeletrace_pipeline::diagnostics::{Clock, PipelineDiagnostics};
use skeletrace_pipeline::pipeline::Traced;
use skeletrace_pipeline::{PipelineConfig, TraceConfig};

/// Trace the skeleton of a binary line drawing into polylines.
///
/// Thresholds the input image, thins its strokes to one pixel and traces
/// the result with a recursive chunked tracer.
#[derive(Parser)]
#[command(name = "skeletrace", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Luma threshold; pixels brighter than this are foreground.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_THRESHOLD)]
    threshold: u8,

    /// Treat dark pixels as foreground (dark ink on light paper).
    #[arg(long)]
    invert: bool,

    /// Skip thinning (the input is already a skeleton).
    #[arg(long)]
    no_thin: bool,

    /// Largest chunk side handed directly to the fragment extractor.
    #[arg(long, default_value_t = TraceConfig::DEFAULT_CHUNK_SIZE, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    chunk_size: u32,

    /// Recursion depth limit (defaults to width * height).
    #[arg(long, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    max_depth: Option<usize>,

    /// Write SVG output to file.
    #[arg(long)]
    svg: Option<PathBuf>,

    /// Write the traced result as JSON to file.
    #[arg(long)]
    json: Option<PathBuf>,

    /// Write the thinned bitmap as an image to file.
    #[arg(long)]
    thinned: Option<PathBuf>,

    /// Record the visited chunks and outline them in the SVG.
    #[arg(long)]
    rects: bool,

    /// Mark every polyline vertex in the SVG.
    #[arg(long)]
    keypoints: bool,

    /// Give each polyline its own colour in the SVG.
    #[arg(long)]
    colorize: bool,

    /// SVG output units per source pixel.
    #[arg(long, default_value_t = SvgOptions::DEFAULT_SCALE)]
    scale: f64,

    /// SVG stroke width.
    #[arg(long, default_value_t = SvgOptions::DEFAULT_STROKE_WIDTH)]
    stroke_width: f64,

    /// Full pipeline config as a JSON string.
    ///
    /// When provided, all other pipeline parameter flags are ignored
    /// (`--rects` still turns on rectangle recording). The JSON must be a
    /// valid `PipelineConfig` serialization.
    #[arg(long)]
    config_json: Option<String>,

    /// Print the per-stage diagnostics report.
    #[arg(long)]
    report: bool,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,
}

/// Build a [`PipelineConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and the
/// individual parameter flags are ignored.  Otherwise, a config is
/// assembled from the individual flags.
fn config_from_cli(cli: &Cli) -> Result<PipelineConfig, String> {
    let mut config = if let Some(ref json) = cli.config_json {
        serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"))?
    } else {
        PipelineConfig {
            threshold: cli.threshold,
            invert: cli.invert,
            thin: !cli.no_thin,
            trace: TraceConfig {
                chunk_size: cli.chunk_size,
                max_depth: cli.max_depth,
                record_rects: cli.rects,
            },
        }
    };
    config.trace.record_rects |= cli.rects;
    config
        .trace
        .validate()
        .map_err(|e| format!("Invalid config: {e}"))?;
    Ok(config)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            tracing::error!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let image_bytes = match std::fs::read(&cli.image_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!("Error reading {}: {e}", cli.image_path.display());
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        image = %cli.image_path.display(),
        bytes = image_bytes.len(),
        runs = cli.runs,
        "loaded image"
    );
    tracing::debug!(?config, "pipeline config");

    let mut all_diagnostics = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            tracing::info!("run {}/{}", run + 1, cli.runs);
        }

        let (traced, diagnostics) =
            match skeletrace_pipeline::process_staged_with_diagnostics(
                &image_bytes,
                &config,
                &StdClock,
            ) {
                Ok(staged) => staged,
                Err(e) => {
                    tracing::error!("Pipeline error: {e}");
                    return ExitCode::FAILURE;
                }
            };

        if cli.report {
            println!("{}", diagnostics.report());
        }

        // Write outputs on the first run only.
        if run == 0 {
            tracing::info!(
                polylines = diagnostics.summary.polyline_count,
                points = diagnostics.summary.total_point_count,
                "traced skeleton"
            );
            if let Err(msg) = write_outputs(&cli, &config, &traced) {
                tracing::error!("{msg}");
                return ExitCode::FAILURE;
            }
        }

        all_diagnostics.push(diagnostics);
    }

    // Print summary when multiple runs.
    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    ExitCode::SUCCESS
}

/// Write every output file requested on the command line.
fn write_outputs(cli: &Cli, config: &PipelineConfig, traced: &Traced) -> Result<(), String> {
    if let Some(ref path) = cli.thinned {
        traced
            .skeleton()
            .to_gray_image()
            .save(path)
            .map_err(|e| format!("Error writing thinned image to {}: {e}", path.display()))?;
        tracing::info!(path = %path.display(), "thinned bitmap written");
    }

    if cli.svg.is_none() && cli.json.is_none() {
        return Ok(());
    }

    let result = traced.to_result();

    if let Some(ref path) = cli.json {
        let json = serde_json::to_string_pretty(&result)
            .map_err(|e| format!("Error serializing result: {e}"))?;
        write_file(path, &json)?;
    }

    if let Some(ref path) = cli.svg {
        let title = cli
            .image_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("skeletrace");
        let description = format!(
            "threshold={} invert={} thin={} chunk_size={}",
            config.threshold, config.invert, config.thin, config.trace.chunk_size,
        );
        let config_json = serde_json::to_string(config)
            .map_err(|e| format!("Error serializing config: {e}"))?;
        let metadata = SvgMetadata {
            title: Some(title),
            description: Some(&description),
            config_json: Some(&config_json),
        };
        let options = svg_options(cli, config, metadata);
        write_file(path, &skeletrace_export::to_svg(&result, &options))?;
    }

    Ok(())
}

/// Rendering options for the SVG output.
///
/// Chunk outlines follow the effective config, so rects recorded because
/// `--config-json` asked for them are drawn as well.
fn svg_options<'a>(
    cli: &Cli,
    config: &PipelineConfig,
    metadata: SvgMetadata<'a>,
) -> SvgOptions<'a> {
    SvgOptions {
        scale: cli.scale,
        stroke_width: cli.stroke_width,
        draw_rects: config.trace.record_rects,
        draw_keypoints: cli.keypoints,
        colorize: cli.colorize,
        metadata,
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), String> {
    std::fs::write(path, contents)
        .map_err(|e| format!("Error writing {}: {e}", path.display()))?;
    tracing::info!(path = %path.display(), bytes = contents.len(), "output written");
    Ok(())
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Function pointer type for extracting a stage duration from diagnostics.
type StageExtractor = fn(&PipelineDiagnostics) -> Option<Duration>;

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[PipelineDiagnostics]) {
    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    if all_diagnostics.is_empty() {
        println!("Warning: no diagnostics to summarize");
        return;
    }

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| d.total_duration.as_secs_f64() * 1000.0)
        .collect();

    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;

    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    // Per-stage means.
    println!();
    println!("{:<24} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(40));

    let stage_extractors: &[(&str, StageExtractor)] = &[
        ("Decode", |d| Some(d.decode.duration)),
        ("Binarize", |d| Some(d.binarize.duration)),
        ("Thin", |d| d.thin.as_ref().map(|s| s.duration)),
        ("Trace", |d| Some(d.trace.duration)),
    ];

    for (name, extractor) in stage_extractors {
        let stage_durations: Vec<f64> = all_diagnostics
            .iter()
            .filter_map(extractor)
            .map(|dur| dur.as_secs_f64() * 1000.0)
            .collect();

        if stage_durations.is_empty() {
            continue;
        }

        let stage_mean = stage_durations.iter().sum::<f64>() / stage_durations.len() as f64;
        println!("{name:<24} {stage_mean:>10.3}ms");
    }
}
