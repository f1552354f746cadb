//! Region probing: cheap emptiness checks the tracer uses to skip blank
//! sub-chunks.

use crate::bitmap::Bitmap;
use crate::types::Rect;

/// Returns `true` as soon as any pixel inside `rect` is foreground.
///
/// `rect` must lie within the bitmap.
#[must_use]
pub fn not_empty(bitmap: &Bitmap, rect: Rect) -> bool {
    (rect.y..rect.bottom()).any(|y| (rect.x..rect.right()).any(|x| bitmap.get(x, y)))
}
