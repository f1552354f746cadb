//! SVG export serializer.
//!
//! Converts a [`TraceResult`] into an SVG string using the [`svg`] crate
//! for document construction, XML escaping, and path data formatting.
//!
//! Each polyline becomes a separate `<path>` element using `M` (move to)
//! and `L` (line to) commands. A single-point polyline becomes a
//! zero-length path, which the round line caps render as a dot.
//!
//! [`SvgOptions`] controls scaling, stroke width, per-polyline colours and
//! two debugging overlays: the chunk rectangles visited by the tracer and
//! a marker on every vertex.
//!
//! This is a pure function with no I/O -- it returns a `String`.

use svg::Document;
use svg::node::element::path::Data;
use svg::node::element::{Description, Element, Group, Path, Rectangle, Title};
use svg::node::{Node, Text, Value};

use skeletrace_pipeline::{Point, Polyline, TraceResult};

/// Stroke colours cycled through when [`SvgOptions::colorize`] is set.
pub const POLYLINE_COLORS: &[&str] = &[
    "#c0392b", // red
    "#2471a3", // blue
    "#1e8449", // green
    "#b9770e", // ochre
    "#7d3c98", // purple
    "#117a65", // teal
    "#a04000", // rust
    "#2e4053", // slate
];

/// Side length of a vertex marker, in output units.
const KEYPOINT_SIZE: f64 = 10.0;

/// Metadata to embed in the SVG document.
///
/// All fields are optional.  When present, a `<title>` and/or `<desc>`
/// element is emitted immediately after the opening `<svg>` tag.
///
/// Text values are XML-escaped automatically by the `svg` crate.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Document title: emitted as `<title>`.
    ///
    /// Typically the source image filename (without extension).
    pub title: Option<&'a str>,

    /// Document description: emitted as `<desc>`.
    pub description: Option<&'a str>,

    /// Serialized pipeline configuration: emitted inside a `<metadata>`
    /// element wrapped in a namespaced `<skeletrace:pipeline>` element so
    /// exported files carry the settings that produced them.
    pub config_json: Option<&'a str>,
}

/// Rendering options for [`to_svg`].
#[derive(Debug, Clone)]
pub struct SvgOptions<'a> {
    /// Output units per source pixel.
    pub scale: f64,
    /// Path stroke width in output units.
    pub stroke_width: f64,
    /// Outline every chunk the tracer recursed into (needs
    /// [`TraceResult::rects`]).
    pub draw_rects: bool,
    /// Mark every polyline vertex with a small red square.
    pub draw_keypoints: bool,
    /// Stroke each polyline with a colour from [`POLYLINE_COLORS`]
    /// instead of black.
    pub colorize: bool,
    /// Embedded document metadata.
    pub metadata: SvgMetadata<'a>,
}

impl SvgOptions<'_> {
    /// Default output units per pixel.
    pub const DEFAULT_SCALE: f64 = 1.0;

    /// Default stroke width.
    pub const DEFAULT_STROKE_WIDTH: f64 = 1.0;
}

impl Default for SvgOptions<'_> {
    fn default() -> Self {
        Self {
            scale: Self::DEFAULT_SCALE,
            stroke_width: Self::DEFAULT_STROKE_WIDTH,
            draw_rects: false,
            draw_keypoints: false,
            colorize: false,
            metadata: SvgMetadata::default(),
        }
    }
}

/// Build an SVG path `d` attribute string from a polyline.
///
/// Uses `M` for the first point and `L` for subsequent points. A
/// single-point polyline yields a zero-length segment (`M x,y L x,y`) so
/// it stays visible with round caps. Returns an empty string for an empty
/// polyline.
///
/// # Examples
///
/// ```
/// use skeletrace_pipeline::{Point, Polyline};
/// use skeletrace_export::build_path_data;
///
/// let polyline = Polyline::new(vec![
///     Point::new(10, 20),
///     Point::new(30, 40),
/// ]);
/// let d = build_path_data(&polyline);
/// assert_eq!(d, "M10,20 L30,40");
/// ```
#[must_use]
pub fn build_path_data(polyline: &Polyline) -> String {
    build_path_data_scaled(polyline, 1.0)
}

/// Like [`build_path_data`] but multiplies every coordinate by `scale`.
fn build_path_data_scaled(polyline: &Polyline, scale: f64) -> String {
    let tx = |p: &Point| (f64::from(p.x) * scale, f64::from(p.y) * scale);

    let points = polyline.points();
    let Some((first, rest)) = points.split_first() else {
        return String::new();
    };

    let mut data = Data::new().move_to(tx(first));
    if rest.is_empty() {
        data = data.line_to(tx(first));
    }
    for p in rest {
        data = data.line_to(tx(p));
    }
    String::from(Value::from(data))
}

/// Stroke colour for the polyline at `index`.
fn stroke_color(index: usize, colorize: bool) -> &'static str {
    if colorize {
        POLYLINE_COLORS[index % POLYLINE_COLORS.len()]
    } else {
        "black"
    }
}

/// Serialize a traced result into an SVG document string.
///
/// The document is `width * scale` by `height * scale` output units with
/// a matching `viewBox`. Elements are emitted in this order: `<title>`,
/// `<desc>`, `<metadata>`, the chunk rectangles (`<g id="chunks">`), one
/// `<path>` per non-empty polyline, and finally the vertex markers
/// (`<g id="keypoints">`).
///
/// # Examples
///
/// ```
/// use skeletrace_pipeline::{PipelineConfig, trace_skeleton};
/// use skeletrace_export::{SvgMetadata, SvgOptions, to_svg};
///
/// let mut pixels = vec![0u8; 20 * 3];
/// pixels[20..40].fill(1);
/// let result = trace_skeleton(pixels, 20, 3, &PipelineConfig::default()).unwrap();
///
/// let options = SvgOptions {
///     metadata: SvgMetadata {
///         title: Some("line"),
///         ..SvgMetadata::default()
///     },
///     ..SvgOptions::default()
/// };
/// let svg = to_svg(&result, &options);
/// assert!(svg.contains("<title>line</title>"));
/// assert!(svg.contains(r#"d="M19,1 L10,1 L9,1 L0,1""#));
/// ```
#[must_use]
pub fn to_svg(result: &TraceResult, options: &SvgOptions<'_>) -> String {
    let scale = options.scale;
    let width = f64::from(result.dimensions.width) * scale;
    let height = f64::from(result.dimensions.height) * scale;

    let mut doc = Document::new()
        .set("width", width)
        .set("height", height)
        .set("viewBox", format!("0 0 {width} {height}"));

    let metadata = &options.metadata;
    if let Some(title) = metadata.title {
        doc = doc.add(Title::new(title));
    }

    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }

    if let Some(config_json) = metadata.config_json {
        let mut pipeline_el = Element::new("skeletrace:pipeline");
        pipeline_el.assign("xmlns:skeletrace", "https://github.com/skeletrace/skeletrace/ns/1");
        pipeline_el.append(Text::new(config_json));
        let mut metadata_el = Element::new("metadata");
        metadata_el.append(pipeline_el);
        doc = doc.add(metadata_el);
    }

    if options.draw_rects
        && let Some(rects) = result.rects.as_deref()
    {
        let mut group = Group::new()
            .set("id", "chunks")
            .set("fill", "none")
            .set("stroke", "gray");
        for rect in rects {
            group = group.add(
                Rectangle::new()
                    .set("x", f64::from(rect.x) * scale)
                    .set("y", f64::from(rect.y) * scale)
                    .set("width", f64::from(rect.width) * scale)
                    .set("height", f64::from(rect.height) * scale),
            );
        }
        doc = doc.add(group);
    }

    for (index, polyline) in result.polylines.iter().enumerate() {
        let d = build_path_data_scaled(polyline, scale);
        if d.is_empty() {
            continue;
        }

        let path = Path::new()
            .set("d", d)
            .set("fill", "none")
            .set("stroke", stroke_color(index, options.colorize))
            .set("stroke-width", options.stroke_width)
            .set("stroke-linecap", "round")
            .set("stroke-linejoin", "round");
        doc = doc.add(path);
    }

    if options.draw_keypoints {
        let half = KEYPOINT_SIZE / 2.0;
        let mut group = Group::new()
            .set("id", "keypoints")
            .set("fill", "none")
            .set("stroke", "red");
        for p in result.polylines.iter().flat_map(Polyline::points) {
            group = group.add(
                Rectangle::new()
                    .set("x", f64::from(p.x).mul_add(scale, -half))
                    .set("y", f64::from(p.y).mul_add(scale, -half))
                    .set("width", KEYPOINT_SIZE)
                    .set("height", KEYPOINT_SIZE),
            );
        }
        doc = doc.add(group);
    }

    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}
