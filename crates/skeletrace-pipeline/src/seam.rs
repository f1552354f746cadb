//! Seam finding: pick the row or column along which to split an oversize
//! chunk.
//!
//! A good seam crosses as little foreground as possible, so that few strokes
//! are cut and few fragments need merging afterwards. Candidates whose ends
//! touch foreground on the chunk border are skipped: cutting there would
//! leave a stroke running along the seam itself.
//!
//! Rows are scanned first, then columns. Each candidate is scored by the
//! foreground count of the two lines straddling it (`i - 1` and `i`). The
//! running best starts at a budget of `W + H` of the whole image, so a
//! candidate scoring above that is never chosen. Ties go to the candidate
//! nearest the chunk middle, which keeps the recursion balanced. A column
//! that ties the best row still wins.

use crate::bitmap::Bitmap;
use crate::types::{Point, Rect};

/// Candidates closer than this to either chunk edge are never considered.
const EDGE_MARGIN: u32 = 3;

/// A cut line through a chunk, in image coordinates.
///
/// The seam position is the first row (or column) of the second sub-chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seam {
    /// Horizontal cut above row `y`.
    Row(u32),
    /// Vertical cut left of column `x`.
    Column(u32),
}

impl Seam {
    /// The row or column index of the cut.
    #[must_use]
    pub const fn position(self) -> u32 {
        match self {
            Self::Row(p) | Self::Column(p) => p,
        }
    }

    /// Split `chunk` into the part before the seam and the part starting at
    /// the seam.
    ///
    /// The seam must lie strictly inside `chunk`.
    #[must_use]
    pub const fn split(self, chunk: Rect) -> (Rect, Rect) {
        match self {
            Self::Row(i) => (
                Rect::new(chunk.x, chunk.y, chunk.width, i - chunk.y),
                Rect::new(chunk.x, i, chunk.width, chunk.bottom() - i),
            ),
            Self::Column(j) => (
                Rect::new(chunk.x, chunk.y, j - chunk.x, chunk.height),
                Rect::new(j, chunk.y, chunk.right() - j, chunk.height),
            ),
        }
    }

    /// Coordinate of `p` measured across the seam.
    pub(crate) const fn across(self, p: Point) -> u32 {
        match self {
            Self::Row(_) => p.y,
            Self::Column(_) => p.x,
        }
    }

    /// Coordinate of `p` measured along the seam.
    pub(crate) const fn along(self, p: Point) -> u32 {
        match self {
            Self::Row(_) => p.x,
            Self::Column(_) => p.y,
        }
    }
}

/// Find the cheapest seam through `chunk`.
///
/// Rows are only considered when the chunk is taller than `chunk_size`,
/// columns only when it is wider. Returns `None` when no candidate survives
/// the border check and the budget.
#[must_use]
pub fn find_seam(bitmap: &Bitmap, chunk: Rect, chunk_size: u32) -> Option<Seam> {
    let dims = bitmap.dimensions();
    let mut best_score = u64::from(dims.width) + u64::from(dims.height);
    let mut best_row: Option<u32> = None;
    let mut best_col: Option<u32> = None;

    if chunk.height > chunk_size {
        let mid = chunk.y + chunk.height / 2;
        for i in candidates(chunk.y, chunk.height) {
            if row_touches_border(bitmap, chunk, i) {
                continue;
            }
            let score = row_score(bitmap, chunk, i);
            let closer = best_row.is_none_or(|r| i.abs_diff(mid) < r.abs_diff(mid));
            if score < best_score || (score == best_score && closer) {
                best_score = score;
                best_row = Some(i);
            }
        }
    }

    if chunk.width > chunk_size {
        let mid = chunk.x + chunk.width / 2;
        for j in candidates(chunk.x, chunk.width) {
            if column_touches_border(bitmap, chunk, j) {
                continue;
            }
            let score = column_score(bitmap, chunk, j);
            let closer = best_col.is_none_or(|c| j.abs_diff(mid) < c.abs_diff(mid));
            if score < best_score || (score == best_score && closer) {
                best_score = score;
                best_row = None;
                best_col = Some(j);
            }
        }
    }

    best_row
        .map(Seam::Row)
        .or_else(|| best_col.map(Seam::Column))
}

/// Candidate seam positions `[start + 3, start + len - 3)`.
fn candidates(start: u32, len: u32) -> std::ops::Range<u32> {
    start + EDGE_MARGIN..(start + len).saturating_sub(EDGE_MARGIN)
}

fn row_touches_border(bitmap: &Bitmap, chunk: Rect, i: u32) -> bool {
    let (left, right) = (chunk.x, chunk.right() - 1);
    bitmap.get(left, i)
        || bitmap.get(left, i - 1)
        || bitmap.get(right, i)
        || bitmap.get(right, i - 1)
}

fn column_touches_border(bitmap: &Bitmap, chunk: Rect, j: u32) -> bool {
    let (top, bottom) = (chunk.y, chunk.bottom() - 1);
    bitmap.get(j, top)
        || bitmap.get(j, bottom)
        || bitmap.get(j - 1, top)
        || bitmap.get(j - 1, bottom)
}

fn row_score(bitmap: &Bitmap, chunk: Rect, i: u32) -> u64 {
    (chunk.x..chunk.right())
        .map(|x| u64::from(bitmap.value(x, i)) + u64::from(bitmap.value(x, i - 1)))
        .sum()
}

fn column_score(bitmap: &Bitmap, chunk: Rect, j: u32) -> u64 {
    (chunk.y..chunk.bottom())
        .map(|y| u64::from(bitmap.value(j, y)) + u64::from(bitmap.value(j - 1, y)))
        .sum()
}
