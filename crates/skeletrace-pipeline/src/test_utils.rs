//! Helpers shared by unit tests.

use crate::bitmap::Bitmap;

/// Build a bitmap from text rows: `#` is foreground, anything else is
/// background. All rows must have the same length.
#[allow(clippy::unwrap_used)]
pub fn bitmap_from_rows(rows: &[&str]) -> Bitmap {
    let height = u32::try_from(rows.len()).unwrap();
    let width = u32::try_from(rows.first().map_or(0, |r| r.len())).unwrap();
    let pixels = rows
        .iter()
        .flat_map(|row| {
            assert_eq!(row.len(), width as usize, "ragged test bitmap");
            row.bytes().map(|b| u8::from(b == b'#'))
        })
        .collect();
    Bitmap::from_raw(width, height, pixels).unwrap()
}
