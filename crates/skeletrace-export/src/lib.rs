//! skeletrace-export: Pure format serializers (sans-IO)
//!
//! Converts traced skeletons into output formats. Currently supports SVG.

pub mod svg;

pub use svg::{POLYLINE_COLORS, SvgMetadata, SvgOptions, build_path_data, to_svg};
