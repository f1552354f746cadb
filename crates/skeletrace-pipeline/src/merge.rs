//! Fragment merging: stitch fragments from two sibling chunks back together
//! across the seam that separated them.
//!
//! Fragments of the second list are visited last to first. Each one is
//! offered to the first list through four endpoint pairings in a fixed
//! priority order; the first pairing that finds a partner wins and the
//! fragment is spliced onto it. Fragments without a partner are appended
//! unchanged, in their original order.

use crate::seam::Seam;
use crate::types::{Point, Polyline};

/// Partners must be strictly closer than this along the seam.
const MAX_ALONG_SEAM_DISTANCE: u32 = 4;

/// One end of a fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum End {
    Head,
    Tail,
}

impl End {
    fn of(self, fragment: &Polyline) -> Option<Point> {
        match self {
            Self::Head => fragment.first().copied(),
            Self::Tail => fragment.last().copied(),
        }
    }
}

/// Which end of a first-list fragment meets which end of a second-list
/// fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EndpointPairing {
    /// First's tail meets second's head: `first + second`.
    TailHead,
    /// Both heads meet: `reversed(second) + first`.
    HeadHead,
    /// Both tails meet: `first + reversed(second)`.
    TailTail,
    /// First's head meets second's tail: `second + first`.
    HeadTail,
}

impl EndpointPairing {
    /// Pairings in the order they are tried.
    const PRIORITY: [Self; 4] = [Self::TailHead, Self::HeadHead, Self::TailTail, Self::HeadTail];

    const fn first_end(self) -> End {
        match self {
            Self::TailHead | Self::TailTail => End::Tail,
            Self::HeadHead | Self::HeadTail => End::Head,
        }
    }

    const fn second_end(self) -> End {
        match self {
            Self::TailHead | Self::HeadHead => End::Head,
            Self::TailTail | Self::HeadTail => End::Tail,
        }
    }

    fn splice(self, target: &mut Polyline, mut other: Polyline) {
        match self {
            Self::TailHead => target.append(other),
            Self::HeadHead => {
                other.reverse();
                target.prepend(other);
            }
            Self::TailTail => {
                other.reverse();
                target.append(other);
            }
            Self::HeadTail => target.prepend(other),
        }
    }
}

/// Merge `second` into `first` across `seam`, consuming both lists.
///
/// A second-list endpoint is eligible only when it lies exactly on the
/// seam; a first-list endpoint when it lies within one pixel of it. Among
/// eligible partners the one nearest along the seam wins, the earliest on
/// ties.
#[must_use]
pub fn merge_fragments(
    mut first: Vec<Polyline>,
    mut second: Vec<Polyline>,
    seam: Seam,
) -> Vec<Polyline> {
    if first.is_empty() {
        return second;
    }

    for i in (0..second.len()).rev() {
        let matched = EndpointPairing::PRIORITY.into_iter().find_map(|pairing| {
            find_partner(&first, &second[i], seam, pairing).map(|j| (pairing, j))
        });
        if let Some((pairing, j)) = matched {
            let fragment = second.remove(i);
            pairing.splice(&mut first[j], fragment);
        }
    }

    first.append(&mut second);
    first
}

/// Index of the first-list fragment that `fragment` should be spliced onto
/// under `pairing`, if any.
fn find_partner(
    first: &[Polyline],
    fragment: &Polyline,
    seam: Seam,
    pairing: EndpointPairing,
) -> Option<usize> {
    let position = seam.position();
    let end = pairing.second_end().of(fragment)?;
    if seam.across(end) != position {
        return None;
    }

    let mut best: Option<(usize, u32)> = None;
    for (j, candidate) in first.iter().enumerate() {
        let Some(p) = pairing.first_end().of(candidate) else {
            continue;
        };
        if seam.across(p).abs_diff(position) > 1 {
            continue;
        }
        let d = seam.along(p).abs_diff(seam.along(end));
        if d < best.map_or(MAX_ALONG_SEAM_DISTANCE, |(_, best_d)| best_d) {
            best = Some((j, d));
        }
    }
    best.map(|(j, _)| j)
}
