//! Zhang-Suen thinning: erode foreground regions to a one-pixel-wide
//! skeleton without changing their topology.
//!
//! Reference: T. Y. Zhang and C. Y. Suen, "A fast parallel algorithm for
//! thinning digital patterns", CACM 27(3), 1984.
//!
//! Each cycle runs two sub-iterations. Deletions within a sub-iteration are
//! decided against an untouched snapshot and applied together afterwards.
//! The outermost ring of pixels is never examined or removed.

use serde::{Deserialize, Serialize};

use crate::bitmap::Bitmap;

/// Summary of a thinning run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThinningStats {
    /// Full even+odd cycles executed, including the final cycle that
    /// removed nothing.
    pub cycles: usize,
    /// Foreground pixels removed in total.
    pub removed: u64,
}

/// Which half of a Zhang-Suen cycle is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubIteration {
    /// Removes south-east boundary points and north-west corners.
    Even,
    /// Removes north-west boundary points and south-east corners.
    Odd,
}

/// Thin `bitmap` in place until it reaches a fixed point.
pub fn thin(bitmap: &mut Bitmap) -> ThinningStats {
    let mut stats = ThinningStats::default();
    let mut marker = vec![false; bitmap.as_raw().len()];
    loop {
        let removed = thinning_pass(bitmap, SubIteration::Even, &mut marker)
            + thinning_pass(bitmap, SubIteration::Odd, &mut marker);
        stats.cycles += 1;
        stats.removed += removed;
        if removed == 0 {
            break;
        }
    }
    tracing::debug!(
        cycles = stats.cycles,
        removed = stats.removed,
        "thinning converged"
    );
    stats
}

/// Run one sub-iteration and return the number of pixels removed.
fn thinning_pass(bitmap: &mut Bitmap, pass: SubIteration, marker: &mut [bool]) -> u64 {
    let (w, h) = (bitmap.width(), bitmap.height());
    if w < 3 || h < 3 {
        return 0;
    }

    marker.fill(false);
    let mut marked = 0u64;
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            if bitmap.get(x, y) && is_deletable(bitmap, x, y, pass) {
                marker[bitmap.index(x, y)] = true;
                marked += 1;
            }
        }
    }

    if marked > 0 {
        for (pixel, &remove) in bitmap.raw_mut().iter_mut().zip(marker.iter()) {
            if remove {
                *pixel = 0;
            }
        }
    }
    marked
}

/// The four Zhang-Suen deletion conditions for the interior pixel `(x, y)`.
fn is_deletable(bitmap: &Bitmap, x: u32, y: u32, pass: SubIteration) -> bool {
    // p2..p9, clockwise from north.
    let p = [
        bitmap.value(x, y - 1),
        bitmap.value(x + 1, y - 1),
        bitmap.value(x + 1, y),
        bitmap.value(x + 1, y + 1),
        bitmap.value(x, y + 1),
        bitmap.value(x - 1, y + 1),
        bitmap.value(x - 1, y),
        bitmap.value(x - 1, y - 1),
    ];
    let [p2, _, p4, _, p6, _, p8, _] = p;

    let neighbours: u8 = p.iter().sum();
    if !(2..=6).contains(&neighbours) {
        return false;
    }

    let transitions = (0..8).filter(|&k| p[k] == 0 && p[(k + 1) % 8] == 1).count();
    if transitions != 1 {
        return false;
    }

    let (m1, m2) = match pass {
        SubIteration::Even => (p2 * p4 * p6, p4 * p6 * p8),
        SubIteration::Odd => (p2 * p4 * p8, p2 * p6 * p8),
    };
    m1 == 0 && m2 == 0
}
