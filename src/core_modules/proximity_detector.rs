// THEORY:
// The `ProximityDetector` decides which pairs of sunspots in a frame are close
// enough to be one physical feature that segmentation split in two. It is the
// spatial analysis stage of the merge engine.
//
// Key architectural principles & algorithm steps:
// 1.  **Cheap rejection first**: A pair whose centers are farther apart than the
//     configured center distance is discarded before any contour work is done.
// 2.  **Stable orientation**: The two spots of a pair are ordered by center x,
//     then center y, so that "left" and "right" do not depend on the order in
//     which the pair was visited. Closeness is therefore symmetric.
// 3.  **Rotated frame**: Both contours are rotated rigidly so that the line
//     joining the two centers becomes horizontal. In that frame the edge gap is
//     simply the rightmost x of the left contour subtracted from the leftmost x
//     of the right contour. A negative gap means the contours interpenetrate
//     along the axis.
// 4.  **Junction descriptor**: For a close pair, the topmost and bottommost point
//     of each contour in the rotated frame are recorded. Between them lies the
//     arc of each boundary that faces the other spot, which is where the merge
//     layer later looks for the seam.
// 5.  **Stateless Utility**: Like a blob detector, `find_close_pairs` takes the
//     sunspots of one frame and returns pairs for that same frame. It keeps no
//     memory between calls.

use crate::core_modules::contour::{argmax_by, argmin_by};
use crate::core_modules::geometry::{FrameRotation, bearing};
use crate::core_modules::sunspot::{Sunspot, SunspotId};
use crate::pipeline::PipelineConfig;
use serde::{Deserialize, Serialize};

/// Junction bookkeeping for a pair of sunspots flagged as close.
///
/// The four indices point into the contours of `left_id` and `right_id` and mark
/// their extremal points perpendicular to the line joining the two centers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosePairDescriptor {
    pub left_id: SunspotId,
    pub right_id: SunspotId,
    pub top_left: usize,
    pub bottom_left: usize,
    pub top_right: usize,
    pub bottom_right: usize,
    /// Signed edge gap in the rotated frame, in pixels.
    pub gap: i32,
    pub center_distance: f64,
}

impl ClosePairDescriptor {
    /// The unordered pair key, smaller id first.
    pub fn key(&self) -> (SunspotId, SunspotId) {
        (self.left_id.min(self.right_id), self.left_id.max(self.right_id))
    }
}

pub mod proximity_detector {
    use super::*; // Make structs from parent module available.

    /// Examines every unordered pair of `sunspots` and returns the close ones,
    /// ordered by pair key.
    pub fn find_close_pairs(sunspots: &[&Sunspot], config: &PipelineConfig) -> Vec<ClosePairDescriptor> {
        let mut pairs = Vec::new();

        for i in 0..sunspots.len() {
            for j in (i + 1)..sunspots.len() {
                if let Some(descriptor) = examine_pair(sunspots[i], sunspots[j], config) {
                    log::debug!(
                        "sunspots {} and {} are close: gap {} px, centers {:.1} px apart",
                        descriptor.left_id,
                        descriptor.right_id,
                        descriptor.gap,
                        descriptor.center_distance
                    );
                    pairs.push(descriptor);
                }
            }
        }

        pairs.sort_by_key(|d| d.key());
        pairs
    }

    /// Tests a single pair. The result does not depend on argument order.
    pub fn examine_pair(a: &Sunspot, b: &Sunspot, config: &PipelineConfig) -> Option<ClosePairDescriptor> {
        // --- 1. Center distance ---
        let center_distance = a.center.distance(&b.center);
        if center_distance >= config.max_center_distance {
            return None;
        }

        // --- 2. Orientation ---
        let (left, right) = order_pair(a, b);

        // --- 3. Rotated frame ---
        let rotation = FrameRotation::new(bearing(&left.center, &right.center));
        let rotated_left = rotation.apply_all(left.contour.points());
        let rotated_right = rotation.apply_all(right.contour.points());

        let rightmost_of_left = rotated_left[argmax_by(&rotated_left, |p| p.x)];
        let leftmost_of_right = rotated_right[argmin_by(&rotated_right, |p| p.x)];
        let gap = leftmost_of_right.x - rightmost_of_left.x;

        if gap.unsigned_abs() as f64 >= config.max_edge_gap {
            return None;
        }

        // --- 4. Junction descriptor ---
        Some(ClosePairDescriptor {
            left_id: left.id,
            right_id: right.id,
            top_left: argmax_by(&rotated_left, |p| p.y),
            bottom_left: argmin_by(&rotated_left, |p| p.y),
            top_right: argmax_by(&rotated_right, |p| p.y),
            bottom_right: argmin_by(&rotated_right, |p| p.y),
            gap,
            center_distance,
        })
    }

    /// Orders a pair by center x, then center y, then id.
    fn order_pair<'a>(a: &'a Sunspot, b: &'a Sunspot) -> (&'a Sunspot, &'a Sunspot) {
        let key = |s: &Sunspot| (s.center.x, s.center.y, s.id);
        if key(a) <= key(b) { (a, b) } else { (b, a) }
    }
}
