//! Recursive divide-and-conquer skeleton tracing.
//!
//! The tracer walks a (thinned) bitmap top-down. A chunk small enough on
//! both axes is handed to the fragment extractor. A larger chunk is cut
//! along the cheapest seam; each non-empty half is traced on its own and
//! the two fragment lists are merged back together across the seam. When
//! no seam qualifies, the oversize chunk is extracted directly.
//!
//! Recursion is depth-first and single-threaded. The bitmap is shared
//! read-only; every call owns the fragment list it returns.

use serde::{Deserialize, Serialize};

use crate::bitmap::Bitmap;
use crate::extract::chunk_to_fragments;
use crate::merge::merge_fragments;
use crate::probe::not_empty;
use crate::seam::find_seam;
use crate::types::{PipelineError, Polyline, Rect, TraceConfig};

/// Counters collected during one trace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceStats {
    /// Chunks the tracer was invoked on, including the whole image.
    pub chunks_visited: usize,
    /// Chunks turned into fragments by the extractor.
    pub leaf_chunks: usize,
    /// Chunks split along a seam.
    pub splits: usize,
    /// Oversize chunks extracted because no seam qualified.
    pub fallback_leaves: usize,
    /// Chunks dropped because the depth cutoff was reached.
    pub depth_exhausted: usize,
    /// Fragments spliced onto a neighbour across a seam.
    pub fragments_joined: usize,
}

/// Result of tracing a bitmap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceOutput {
    /// Final polylines, each with at least one point.
    pub polylines: Vec<Polyline>,
    /// Non-empty sub-chunks in visitation order, when requested.
    pub rects: Option<Vec<Rect>>,
    /// Counters for the run.
    pub stats: TraceStats,
}

/// Trace the whole bitmap.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if `config` fails
/// [`TraceConfig::validate`].
pub fn trace(bitmap: &Bitmap, config: &TraceConfig) -> Result<TraceOutput, PipelineError> {
    trace_chunk(bitmap, bitmap.bounds(), config)
}

/// Trace a single chunk of the bitmap.
///
/// The chunk itself is never recorded in [`TraceOutput::rects`]; only the
/// non-empty sub-chunks the tracer recurses into are.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] for an invalid `config`, or
/// [`PipelineError::InvalidChunk`] if `chunk` is empty or extends past the
/// bitmap.
pub fn trace_chunk(
    bitmap: &Bitmap,
    chunk: Rect,
    config: &TraceConfig,
) -> Result<TraceOutput, PipelineError> {
    config.validate()?;
    if chunk.is_empty() || !chunk.fits_within(bitmap.dimensions()) {
        return Err(PipelineError::InvalidChunk(chunk));
    }

    let mut tracer = Tracer {
        bitmap,
        chunk_size: config.chunk_size,
        rects: config.record_rects.then(Vec::new),
        stats: TraceStats::default(),
    };
    let polylines = tracer.trace(chunk, config.depth_budget(bitmap.dimensions()));
    let Tracer { rects, stats, .. } = tracer;

    if stats.depth_exhausted > 0 {
        tracing::warn!(
            chunks = stats.depth_exhausted,
            "depth cutoff reached, some strokes were dropped"
        );
    }
    tracing::debug!(
        polylines = polylines.len(),
        chunks = stats.chunks_visited,
        splits = stats.splits,
        joined = stats.fragments_joined,
        "trace complete"
    );

    Ok(TraceOutput {
        polylines,
        rects,
        stats,
    })
}

struct Tracer<'a> {
    bitmap: &'a Bitmap,
    chunk_size: u32,
    rects: Option<Vec<Rect>>,
    stats: TraceStats,
}

impl Tracer<'_> {
    fn trace(&mut self, chunk: Rect, depth: usize) -> Vec<Polyline> {
        self.stats.chunks_visited += 1;
        if depth == 0 {
            self.stats.depth_exhausted += 1;
            return Vec::new();
        }
        if chunk.width <= self.chunk_size && chunk.height <= self.chunk_size {
            return self.leaf(chunk);
        }

        let Some(seam) = find_seam(self.bitmap, chunk, self.chunk_size) else {
            self.stats.fallback_leaves += 1;
            return self.leaf(chunk);
        };
        self.stats.splits += 1;
        tracing::trace!(?chunk, ?seam, "split");

        let (first, second) = seam.split(chunk);
        let mut fragments: Option<Vec<Polyline>> = None;
        for half in [first, second] {
            if !not_empty(self.bitmap, half) {
                continue;
            }
            if let Some(rects) = &mut self.rects {
                rects.push(half);
            }
            let traced = self.trace(half, depth - 1);
            fragments = Some(match fragments {
                None => traced,
                Some(existing) => {
                    let before = existing.len() + traced.len();
                    let merged = merge_fragments(existing, traced, seam);
                    self.stats.fragments_joined += before - merged.len();
                    merged
                }
            });
        }
        fragments.unwrap_or_default()
    }

    fn leaf(&mut self, chunk: Rect) -> Vec<Polyline> {
        self.stats.leaf_chunks += 1;
        chunk_to_fragments(self.bitmap, chunk)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::bitmap_from_rows;
    use crate::thin::thin;
    use crate::types::Point;

    fn config(record_rects: bool) -> TraceConfig {
        TraceConfig {
            record_rects,
            ..TraceConfig::default()
        }
    }

    fn pts(coords: &[(u32, u32)]) -> Vec<Point> {
        coords.iter().map(|&(x, y)| Point::new(x, y)).collect()
    }

    fn plus(size: u32) -> Bitmap {
        let mid = size / 2;
        Bitmap::from_fn(size, size, |x, y| x == mid || y == mid).unwrap()
    }

    #[test]
    fn horizontal_line_becomes_one_polyline() {
        let bitmap = bitmap_from_rows(&[
            "....................",
            "####################",
            "....................",
        ]);
        let out = trace(&bitmap, &config(true)).unwrap();
        assert_eq!(out.polylines.len(), 1);
        assert_eq!(out.polylines[0].points(), pts(&[(19, 1), (10, 1), (9, 1), (0, 1)]));
        assert_eq!(
            out.rects,
            Some(vec![Rect::new(0, 0, 10, 3), Rect::new(10, 0, 10, 3)])
        );
        assert_eq!(
            out.stats,
            TraceStats {
                chunks_visited: 3,
                leaf_chunks: 2,
                splits: 1,
                fallback_leaves: 0,
                depth_exhausted: 0,
                fragments_joined: 1,
            }
        );
    }

    #[test]
    fn plus_becomes_four_arms_meeting_at_center() {
        let mut bitmap = plus(21);
        thin(&mut bitmap);
        let out = trace(&bitmap, &config(false)).unwrap();
        assert_eq!(out.polylines.len(), 4);
        assert_eq!(out.rects, None);

        let hub = *out.polylines[0].first().unwrap();
        assert!(hub.manhattan_distance(Point::new(10, 10)) <= 2, "hub at {hub:?}");
        for polyline in &out.polylines {
            assert!(
                polyline.first() == Some(&hub) || polyline.last() == Some(&hub),
                "{polyline:?} does not touch {hub:?}"
            );
        }

        let far_ends: Vec<Point> = out
            .polylines
            .iter()
            .map(|p| {
                if p.first() == Some(&hub) {
                    *p.last().unwrap()
                } else {
                    *p.first().unwrap()
                }
            })
            .collect();
        for arm_end in pts(&[(0, 10), (10, 0), (20, 10), (10, 20)]) {
            assert!(far_ends.contains(&arm_end), "missing arm ending at {arm_end:?}");
        }
    }

    #[test]
    fn blank_image_has_no_polylines_and_no_rects() {
        for (w, h) in [(5, 5), (30, 30), (64, 3)] {
            let bitmap = Bitmap::new(w, h).unwrap();
            let out = trace(&bitmap, &config(true)).unwrap();
            assert!(out.polylines.is_empty());
            assert_eq!(out.rects, Some(vec![]));
        }
    }

    #[test]
    fn small_image_is_a_single_leaf() {
        let bitmap = bitmap_from_rows(&[
            ".....", //
            "#####",
            ".....",
        ]);
        let out = trace(&bitmap, &config(true)).unwrap();
        assert_eq!(out.polylines, vec![Polyline::new(pts(&[(4, 1), (0, 1)]))]);
        assert_eq!(out.rects, Some(vec![]));
        assert_eq!(out.stats.leaf_chunks, 1);
        assert_eq!(out.stats.chunks_visited, 1);
    }

    #[test]
    fn oversize_chunk_without_seam_falls_back_to_extraction() {
        // The 6x6 halves are over the chunk size but leave no room for a
        // seam candidate on either axis.
        let bitmap = Bitmap::from_fn(6, 12, |x, _| x == 2).unwrap();
        let out = trace(
            &bitmap,
            &TraceConfig {
                chunk_size: 4,
                ..TraceConfig::default()
            },
        )
        .unwrap();
        assert_eq!(out.stats.splits, 1);
        assert_eq!(out.stats.fallback_leaves, 2);
        assert_eq!(
            out.polylines,
            vec![Polyline::new(pts(&[(2, 0), (2, 5), (2, 6), (2, 11)]))]
        );
    }

    #[test]
    fn depth_cutoff_drops_sub_chunks() {
        let bitmap = Bitmap::from_fn(20, 3, |_, y| y == 1).unwrap();
        let out = trace(
            &bitmap,
            &TraceConfig {
                max_depth: Some(1),
                record_rects: true,
                ..TraceConfig::default()
            },
        )
        .unwrap();
        assert!(out.polylines.is_empty());
        assert_eq!(out.stats.depth_exhausted, 2);
        assert_eq!(out.rects.map(|r| r.len()), Some(2));
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let bitmap = Bitmap::new(4, 4).unwrap();
        let result = trace(
            &bitmap,
            &TraceConfig {
                chunk_size: 0,
                ..TraceConfig::default()
            },
        );
        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn invalid_chunks_are_rejected() {
        let bitmap = Bitmap::new(10, 10).unwrap();
        for chunk in [
            Rect::new(0, 0, 0, 5),
            Rect::new(2, 2, 5, 0),
            Rect::new(6, 0, 5, 5),
            Rect::new(0, 8, 10, 3),
            Rect::new(u32::MAX, 0, 2, 1),
            Rect::new(0, u32::MAX, 1, 1),
        ] {
            assert!(matches!(
                trace_chunk(&bitmap, chunk, &TraceConfig::default()),
                Err(PipelineError::InvalidChunk(c)) if c == chunk
            ));
        }
    }

    #[test]
    fn trace_chunk_uses_image_coordinates() {
        let bitmap = Bitmap::from_fn(30, 10, |_, y| y == 4).unwrap();
        let out = trace_chunk(&bitmap, Rect::new(20, 2, 6, 5), &TraceConfig::default()).unwrap();
        assert_eq!(out.polylines, vec![Polyline::new(pts(&[(25, 4), (20, 4)]))]);
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        fn arb_thinned() -> impl Strategy<Value = Bitmap> {
            (1u32..48, 1u32..48).prop_flat_map(|(w, h)| {
                proptest::collection::vec(proptest::bool::weighted(0.3), (w * h) as usize)
                    .prop_map(move |cells| {
                        let raw = cells.into_iter().map(u8::from).collect();
                        let mut bitmap = Bitmap::from_raw(w, h, raw).unwrap();
                        thin(&mut bitmap);
                        bitmap
                    })
            })
        }

        proptest! {
            /// trace: same input gives identical output.
            #[test]
            fn deterministic(bitmap in arb_thinned(), cs in 1u32..16) {
                let config = TraceConfig {
                    chunk_size: cs,
                    record_rects: true,
                    ..TraceConfig::default()
                };
                let a = trace(&bitmap, &config).unwrap();
                let b = trace(&bitmap, &config).unwrap();
                prop_assert_eq!(a, b);
            }

            /// trace: every polyline is non-empty and stays inside the image.
            #[test]
            fn polylines_are_well_formed(bitmap in arb_thinned(), cs in 1u32..16) {
                let config = TraceConfig {
                    chunk_size: cs,
                    record_rects: true,
                    ..TraceConfig::default()
                };
                let out = trace(&bitmap, &config).unwrap();
                for polyline in &out.polylines {
                    prop_assert!(!polyline.is_empty());
                    for p in polyline.points() {
                        prop_assert!(p.x < bitmap.width() && p.y < bitmap.height());
                    }
                }
                for rect in out.rects.unwrap() {
                    prop_assert!(!rect.is_empty());
                    prop_assert!(rect.fits_within(bitmap.dimensions()));
                    prop_assert!(not_empty(&bitmap, rect));
                }
            }
        }
    }
}
