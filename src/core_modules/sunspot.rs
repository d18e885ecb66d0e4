// THEORY:
// The `sunspot` module holds the data containers of the merge engine. A `Sunspot`
// is one detected region in a single frame: its identifier, the boundary it was
// extracted with (or that a merge produced), and the centroid derived from that
// boundary.
//
// Key architectural principles:
// 1.  **Dumb Data Container**: A `Sunspot` knows nothing about its neighbors or its
//     merge history. Proximity belongs to the `proximity_detector`, history to the
//     `identity_tracker`.
// 2.  **Arena Registry**: The `SunspotRegistry` is a growable arena indexed by id.
//     Ids are dense and assigned in creation order, so an id is the position of
//     its sunspot in the arena and nothing else. Entries are never removed within
//     a frame: a sunspot consumed by a merge stays in place and simply stops being
//     reachable as a canonical root.

use crate::core_modules::contour::Contour;
use crate::core_modules::error::MergeError;
use crate::core_modules::geometry::Point;
use serde::{Deserialize, Serialize};

pub type SunspotId = usize;

/// A single region detected in a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sunspot {
    /// Identifier within the current frame. Not persistent across frames.
    pub id: SunspotId,
    /// The area-weighted centroid of `contour`, rounded to whole pixels.
    pub center: Point,
    /// The closed boundary of the region.
    pub contour: Contour,
}

impl Sunspot {
    pub fn new(id: SunspotId, contour: Contour) -> Self {
        Self {
            id,
            center: contour.center(),
            contour,
        }
    }

    /// Builds a sunspot straight from raw boundary points.
    pub fn from_points(id: SunspotId, points: Vec<Point>) -> Result<Self, MergeError> {
        Ok(Self::new(id, Contour::new(points)?))
    }
}

/// Append-only arena of every sunspot created during one frame.
#[derive(Debug, Clone, Default)]
pub struct SunspotRegistry {
    spots: Vec<Sunspot>,
}

impl SunspotRegistry {
    pub fn new() -> Self {
        Self { spots: Vec::new() }
    }

    /// Registers a contour under the next free id.
    pub fn push(&mut self, contour: Contour) -> SunspotId {
        let id = self.spots.len();
        self.spots.push(Sunspot::new(id, contour));
        id
    }

    /// Inserts a sunspot whose id was allocated elsewhere (by the identity ledger).
    pub fn insert(&mut self, sunspot: Sunspot) -> Result<(), MergeError> {
        if sunspot.id != self.spots.len() {
            return Err(MergeError::IdMismatch {
                expected: self.spots.len(),
                found: sunspot.id,
            });
        }
        self.spots.push(sunspot);
        Ok(())
    }

    pub fn get(&self, id: SunspotId) -> Result<&Sunspot, MergeError> {
        self.spots.get(id).ok_or(MergeError::UnknownId(id))
    }

    pub fn len(&self) -> usize {
        self.spots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sunspot> {
        self.spots.iter()
    }
}
