//! Fragment extraction: the recursion base case of the tracer.
//!
//! A small chunk is reduced to a handful of straight fragments by walking
//! its boundary and noting where strokes leave the chunk. Each run of
//! foreground boundary pixels becomes one fragment from the middle of the
//! run to an anchor point inside the chunk.
//!
//! - Two exits: the stroke passes straight through, so the two exits are
//!   joined directly and the anchor is dropped.
//! - Three or more exits: a junction. The anchor moves to the interior pixel
//!   with the densest 3x3 neighbourhood, nearest the chunk center on ties.
//! - Zero or one exit: returned as-is, anchored at the chunk center.

use crate::bitmap::Bitmap;
use crate::types::{Point, Polyline, Rect};

/// Turn a chunk into raw fragments.
///
/// `chunk` must be non-empty and lie within the bitmap.
#[must_use]
pub fn chunk_to_fragments(bitmap: &Bitmap, chunk: Rect) -> Vec<Polyline> {
    let center = chunk.center();
    let mut exits: Vec<[Point; 2]> = Vec::new();
    let mut on = false;
    let mut last = Point::new(chunk.x, chunk.y);

    for k in 0..perimeter_len(chunk) {
        let p = boundary_point(chunk, k);
        if bitmap.get(p.x, p.y) {
            if !on {
                on = true;
                exits.push([p, center]);
            }
        } else if on {
            // Stroke ended: move its exit to the middle of the run.
            if let Some([start, _]) = exits.last_mut() {
                *start = Point::new((start.x + last.x) / 2, (start.y + last.y) / 2);
            }
            on = false;
        }
        last = p;
    }

    match exits.as_slice() {
        [[a, _], [b, _]] => vec![Polyline::new(vec![*a, *b])],
        [_, _, _, ..] => {
            if let Some(junction) = densest_interior_pixel(bitmap, chunk) {
                for exit in &mut exits {
                    exit[1] = junction;
                }
            }
            into_polylines(exits)
        }
        _ => into_polylines(exits),
    }
}

fn into_polylines(exits: Vec<[Point; 2]>) -> Vec<Polyline> {
    exits
        .into_iter()
        .map(|pair| Polyline::new(pair.to_vec()))
        .collect()
}

/// Number of steps in the clockwise boundary walk: `2w + 2h - 4`.
///
/// Degenerate one-pixel-wide chunks revisit some pixels; a 1x1 chunk has
/// no steps at all.
const fn perimeter_len(chunk: Rect) -> u32 {
    (2 * chunk.width + 2 * chunk.height).saturating_sub(4)
}

/// The `k`-th pixel of the clockwise boundary walk starting at the top-left
/// corner: along the top edge, down the right edge, back along the bottom
/// edge, then up the left edge.
const fn boundary_point(chunk: Rect, k: u32) -> Point {
    let Rect {
        x,
        y,
        width: w,
        height: h,
    } = chunk;
    if k < w {
        Point::new(x + k, y)
    } else if k < w + h - 1 {
        Point::new(x + w - 1, y + (k + 1 - w))
    } else if k < 2 * w + h - 2 {
        Point::new(x + (w - (k + 3 - w - h)), y + h - 1)
    } else {
        Point::new(x, y + (h - (k + 4 - 2 * w - h)))
    }
}

/// The interior pixel with the most foreground in its 3x3 neighbourhood.
///
/// Scans rows `y+1..y+h-1` and columns `x+1..x+w-1`. The first pixel
/// scanned is always a candidate; later pixels replace it only with a
/// strictly higher sum, or an equal sum strictly closer (Manhattan) to the
/// chunk center. Returns `None` for chunks without interior pixels.
fn densest_interior_pixel(bitmap: &Bitmap, chunk: Rect) -> Option<Point> {
    let center = chunk.center();
    let mut best: Option<(u8, Point)> = None;
    for y in chunk.y + 1..chunk.bottom().saturating_sub(1) {
        for x in chunk.x + 1..chunk.right().saturating_sub(1) {
            let p = Point::new(x, y);
            let sum = neighbourhood_sum(bitmap, p);
            let better = best.is_none_or(|(best_sum, best_p)| {
                sum > best_sum
                    || (sum == best_sum
                        && p.manhattan_distance(center) < best_p.manhattan_distance(center))
            });
            if better {
                best = Some((sum, p));
            }
        }
    }
    best.map(|(_, p)| p)
}

/// Foreground count of the 3x3 block centered on an interior pixel.
fn neighbourhood_sum(bitmap: &Bitmap, p: Point) -> u8 {
    (p.y - 1..=p.y + 1)
        .flat_map(|y| (p.x - 1..=p.x + 1).map(move |x| (x, y)))
        .map(|(x, y)| bitmap.value(x, y))
        .sum()
}
