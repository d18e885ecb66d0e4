// THEORY:
// The `ContourMerger` turns a close pair into a single sunspot. Where the
// `ProximityDetector` only says "these two might be one feature", the merger
// checks that the two boundaries really run alongside each other and, if they
// do, splices them into one closed polygon.
//
// Algorithm steps:
// 1.  **Canonical ids**: Both ids of the pair are resolved through the identity
//     ledger. A pair whose members were already absorbed by earlier merges is
//     re-examined against the sunspots that now represent them, since the
//     junction indices it carries point into contours that no longer count.
// 2.  **Facing arcs**: On each contour the arc between its topmost and bottommost
//     point (in the rotated frame) that faces the other spot is extracted. Both
//     arcs are walked top to bottom.
// 3.  **Union points**: Every point pair across the two arcs closer than the
//     union distance is collected, in arc order. Too few of them means the
//     boundaries do not actually touch: the pair is left alone.
// 4.  **Junctions**: The first and last union pairs mark where the seam begins
//     and ends. Each contour keeps the arc running away from the seam between
//     its two junction points.
// 5.  **Bridges**: At each junction a handful of points from either side are
//     gathered and a chordal spline is fitted through them. The stretch of the
//     curve between the two junction knots becomes the bridge.
// 6.  **Assembly**: kept arc 1, bridge 1, kept arc 2, bridge 2. The result is
//     validated like any extracted contour, and only then is the ledger touched.

use crate::core_modules::contour::{Contour, Walk, collapse_duplicates};
use crate::core_modules::error::MergeError;
use crate::core_modules::geometry::Point;
use crate::core_modules::identity_tracker::IdentityTracker;
use crate::core_modules::proximity_detector::ClosePairDescriptor;
use crate::core_modules::proximity_detector::proximity_detector::examine_pair;
use crate::core_modules::spline::ChordalSpline;
use crate::core_modules::sunspot::{Sunspot, SunspotId, SunspotRegistry};
use crate::pipeline::PipelineConfig;
use serde::{Deserialize, Serialize};

/// Summary of a successful merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeRecord {
    pub merged_id: SunspotId,
    pub left_id: SunspotId,
    pub right_id: SunspotId,
    /// Number of cross-boundary point pairs within the union distance.
    pub union_points: usize,
    /// Points carried over unchanged from the two input contours.
    pub kept_points: usize,
}

/// What happened to a close pair.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    Merged(MergeRecord),
    /// The boundaries do not run close enough for long enough. Nothing changed.
    InsufficientOverlap {
        left_id: SunspotId,
        right_id: SunspotId,
        found: usize,
    },
    /// Both ids already resolve to the same sunspot.
    AlreadyMerged { root: SunspotId },
    /// The canonical sunspots standing in for the pair are not close any more.
    NoLongerClose { left_id: SunspotId, right_id: SunspotId },
}

enum Splice {
    Joined { points: Vec<Point>, union_points: usize, kept_points: usize },
    Insufficient { found: usize },
}

/// Splices close sunspot pairs into single sunspots.
pub struct ContourMerger<'a> {
    config: &'a PipelineConfig,
}

impl<'a> ContourMerger<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    /// Attempts to merge one close pair, updating `registry` and `tracker` on success.
    ///
    /// On any outcome other than `Merged`, and on error, neither is modified.
    pub fn merge(
        &self,
        registry: &mut SunspotRegistry,
        tracker: &mut IdentityTracker,
        pair: &ClosePairDescriptor,
    ) -> Result<MergeOutcome, MergeError> {
        if registry.len() != tracker.len() {
            return Err(MergeError::IdMismatch {
                expected: tracker.len(),
                found: registry.len(),
            });
        }

        // --- 1. Canonical ids ---
        let left_root = tracker.find(pair.left_id)?;
        let right_root = tracker.find(pair.right_id)?;
        if left_root == right_root {
            return Ok(MergeOutcome::AlreadyMerged { root: left_root });
        }

        let descriptor = if left_root == pair.left_id && right_root == pair.right_id {
            pair.clone()
        } else {
            let left = registry.get(left_root)?;
            let right = registry.get(right_root)?;
            match examine_pair(left, right, self.config) {
                Some(descriptor) => descriptor,
                None => {
                    return Ok(MergeOutcome::NoLongerClose {
                        left_id: left_root,
                        right_id: right_root,
                    });
                }
            }
        };

        // --- 2-7. Splice ---
        let splice = {
            let left = registry.get(descriptor.left_id)?;
            let right = registry.get(descriptor.right_id)?;
            self.splice(&left.contour, &right.contour, &descriptor)?
        };

        let (points, union_points, kept_points) = match splice {
            Splice::Joined {
                points,
                union_points,
                kept_points,
            } => (points, union_points, kept_points),
            Splice::Insufficient { found } => {
                log::debug!(
                    "sunspots {} and {} share only {} union points, not merging",
                    descriptor.left_id,
                    descriptor.right_id,
                    found
                );
                return Ok(MergeOutcome::InsufficientOverlap {
                    left_id: descriptor.left_id,
                    right_id: descriptor.right_id,
                    found,
                });
            }
        };

        // --- 8. Ledger ---
        let merged = Sunspot::from_points(tracker.len(), points)?;
        let merged_id = tracker.union(descriptor.left_id, descriptor.right_id)?;
        registry.insert(merged)?;

        log::debug!(
            "merged sunspots {} and {} into {} ({} union points)",
            descriptor.left_id,
            descriptor.right_id,
            merged_id,
            union_points
        );

        Ok(MergeOutcome::Merged(MergeRecord {
            merged_id,
            left_id: descriptor.left_id,
            right_id: descriptor.right_id,
            union_points,
            kept_points,
        }))
    }

    fn splice(&self, first: &Contour, second: &Contour, d: &ClosePairDescriptor) -> Result<Splice, MergeError> {
        // --- 2. Facing arcs, both running top to bottom ---
        let piece_one = facing_arc(first, d.top_left, d.bottom_left)?;
        let mut piece_two = facing_arc(second, d.bottom_right, d.top_right)?;
        piece_two.reverse();

        // --- 3. Union points ---
        let mut union_points: Vec<(usize, usize)> = Vec::new();
        for &i in &piece_one {
            let p = first.point(i);
            for &j in &piece_two {
                if p.distance(&second.point(j)) < self.config.max_union_distance {
                    union_points.push((i, j));
                }
            }
        }

        if union_points.len() < self.config.min_union_points {
            return Ok(Splice::Insufficient {
                found: union_points.len(),
            });
        }

        // --- 4. Junctions and kept arcs ---
        let (top_one, top_two) = union_points[0];
        let (bottom_one, bottom_two) = union_points[union_points.len() - 1];

        let kept_one = first.arc(bottom_one, top_one)?;
        let kept_two = second.arc(top_two, bottom_two)?;

        // --- 5-6. Bridges ---
        let top_bridge = self.bridge(first, top_one, kept_one.len(), second, top_two, kept_two.len())?;
        let bottom_bridge = self.bridge(second, bottom_two, kept_two.len(), first, bottom_one, kept_one.len())?;

        // --- 7. Assembly ---
        let interior_one = &kept_one[1..kept_one.len() - 1];
        let interior_two = &kept_two[1..kept_two.len() - 1];

        let mut points = Vec::with_capacity(
            interior_one.len() + interior_two.len() + top_bridge.len() + bottom_bridge.len(),
        );
        points.extend(interior_one.iter().map(|&i| first.point(i)));
        points.extend(top_bridge);
        points.extend(interior_two.iter().map(|&i| second.point(i)));
        points.extend(bottom_bridge);

        Ok(Splice::Joined {
            points: collapse_duplicates(points),
            union_points: union_points.len(),
            kept_points: interior_one.len() + interior_two.len(),
        })
    }

    /// Fits the curve joining `from[from_index]` to `to[to_index]`.
    ///
    /// Bridging points are drawn only from the kept arcs next to each junction:
    /// backward along `from`, forward along `to`. A kept arc shorter than the
    /// configured window shrinks the window.
    fn bridge(
        &self,
        from: &Contour,
        from_index: usize,
        from_available: usize,
        to: &Contour,
        to_index: usize,
        to_available: usize,
    ) -> Result<Vec<Point>, MergeError> {
        let window = self.config.bridge_window;
        let stride = self.config.bridge_stride;

        let mut set: Vec<Point> = from
            .neighborhood(from_index, Walk::CounterClockwise, window.min(from_available), stride)
            .into_iter()
            .rev()
            .map(|i| from.point(i))
            .collect();
        let junction = set.len() - 1;
        set.extend(
            to.neighborhood(to_index, Walk::Clockwise, window.min(to_available), stride)
                .into_iter()
                .map(|i| to.point(i)),
        );

        let spline = ChordalSpline::fit(&set)?;
        let start = ChordalSpline::parameter_of(&set, junction);
        let end = ChordalSpline::parameter_of(&set, junction + 1);
        Ok(spline.resample(start, end, self.config.resample_step))
    }
}

/// Clockwise arc between two extremal indices. Equal ends cannot bound a facing arc.
fn facing_arc(contour: &Contour, start: usize, end: usize) -> Result<Vec<usize>, MergeError> {
    if start == end {
        return Err(MergeError::InvalidPieceRange {
            start,
            end,
            len: contour.len(),
        });
    }
    contour.arc(start, end)
}
