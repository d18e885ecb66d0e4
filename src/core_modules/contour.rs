// THEORY:
// A `Contour` is the boundary of one segmented region: a closed, cyclic chain of
// pixel coordinates. It is the raw material the whole merge engine works on.
//
// Key architectural principles:
// 1.  **Validated on entry**: A contour is only constructed through `Contour::new`
//     (or deserialization, which routes through it). Consecutive duplicate points
//     are collapsed, and anything with fewer than three distinct points or zero
//     enclosed area is rejected with `DegenerateContour`. Downstream code never
//     has to guard a division by the area again.
// 2.  **Fixed orientation**: The constructor normalizes every contour so that
//     walking forward through the indices traces the boundary clockwise in a
//     y-up frame. "Clockwise" in the merge layer is therefore simply "increasing
//     index, wrapping at the end".
// 3.  **Cyclic addressing**: The start index is arbitrary. Arcs and neighborhoods
//     are expressed as index walks that wrap around the end of the chain.
// 4.  **Exact area**: Twice the signed shoelace area is accumulated in `i64`, so
//     the zero-area test is exact for integer pixel chains.

use crate::core_modules::error::MergeError;
use crate::core_modules::geometry::Point;
use serde::{Deserialize, Serialize};

/// Direction of an index walk around a contour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    /// Increasing index.
    Clockwise,
    /// Decreasing index.
    CounterClockwise,
}

/// A closed polygon boundary with at least three distinct points and non-zero area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Point>", into = "Vec<Point>")]
pub struct Contour {
    points: Vec<Point>,
    /// Twice the signed area. Always negative after orientation normalization.
    doubled_area: i64,
}

impl Contour {
    pub fn new(points: Vec<Point>) -> Result<Self, MergeError> {
        let mut points = collapse_duplicates(points);
        let doubled_area = doubled_signed_area(&points);

        if points.len() < 3 || doubled_area == 0 {
            return Err(MergeError::DegenerateContour {
                points: points.len(),
                doubled_area,
            });
        }

        if doubled_area > 0 {
            points[1..].reverse();
        }

        Ok(Self {
            points,
            doubled_area: -doubled_area.abs(),
        })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// The point at `index`, wrapping around the end of the chain.
    pub fn point(&self, index: usize) -> Point {
        self.points[index % self.points.len()]
    }

    /// Unsigned enclosed area in square pixels.
    pub fn area(&self) -> f64 {
        self.doubled_area.unsigned_abs() as f64 / 2.0
    }

    /// Area-weighted centroid computed from the polygon's first moments.
    pub fn centroid(&self) -> (f64, f64) {
        let n = self.points.len();
        let mut m10 = 0.0;
        let mut m01 = 0.0;

        for i in 0..n {
            let p = self.points[i];
            let q = self.points[(i + 1) % n];
            let cross = (p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64) as f64;
            m10 += (p.x + q.x) as f64 * cross;
            m01 += (p.y + q.y) as f64 * cross;
        }

        // Both moments carry the same orientation sign as the area, so it cancels.
        let denominator = 3.0 * self.doubled_area as f64;
        (m10 / denominator, m01 / denominator)
    }

    /// Integer centroid, rounded to the nearest pixel.
    pub fn center(&self) -> Point {
        let (cx, cy) = self.centroid();
        Point::from_f64(cx, cy)
    }

    /// Indices of the clockwise arc from `start` to `end`, both inclusive.
    ///
    /// When `start == end` the walk covers the whole loop and ends where it began.
    pub fn arc(&self, start: usize, end: usize) -> Result<Vec<usize>, MergeError> {
        let len = self.points.len();
        if start >= len || end >= len {
            return Err(MergeError::InvalidPieceRange { start, end, len });
        }

        let steps = if start == end {
            len
        } else {
            (end + len - start) % len
        };

        Ok((0..=steps).map(|offset| (start + offset) % len).collect())
    }

    /// Every `stride`-th index within `window` steps of `index`, walking in `direction`.
    ///
    /// The first entry is always `index` itself. The window is clamped so a walk
    /// never laps the contour.
    pub fn neighborhood(&self, index: usize, direction: Walk, window: usize, stride: usize) -> Vec<usize> {
        let len = self.points.len();
        let window = window.clamp(1, len);
        let stride = stride.max(1);

        (0..window)
            .step_by(stride)
            .map(|offset| match direction {
                Walk::Clockwise => (index + offset) % len,
                Walk::CounterClockwise => (index + len - offset % len) % len,
            })
            .collect()
    }
}

impl TryFrom<Vec<Point>> for Contour {
    type Error = MergeError;

    fn try_from(points: Vec<Point>) -> Result<Self, Self::Error> {
        Contour::new(points)
    }
}

impl From<Contour> for Vec<Point> {
    fn from(contour: Contour) -> Self {
        contour.points
    }
}

/// Index of the first point maximizing `key`. Returns 0 for an empty slice.
pub fn argmax_by<F: Fn(&Point) -> i32>(points: &[Point], key: F) -> usize {
    let mut best = 0;
    for (i, p) in points.iter().enumerate().skip(1) {
        if key(p) > key(&points[best]) {
            best = i;
        }
    }
    best
}

/// Index of the first point minimizing `key`. Returns 0 for an empty slice.
pub fn argmin_by<F: Fn(&Point) -> i32>(points: &[Point], key: F) -> usize {
    let mut best = 0;
    for (i, p) in points.iter().enumerate().skip(1) {
        if key(p) < key(&points[best]) {
            best = i;
        }
    }
    best
}

/// Drops consecutive repeats, including a last point equal to the first.
pub fn collapse_duplicates(mut points: Vec<Point>) -> Vec<Point> {
    points.dedup();
    while points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    points
}

fn doubled_signed_area(points: &[Point]) -> i64 {
    let n = points.len();
    (0..n)
        .map(|i| {
            let p = points[i];
            let q = points[(i + 1) % n];
            p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::test_utils::{circle_contour, polygon};
    use approx::assert_relative_eq;

    fn square() -> Contour {
        polygon(&[(0, 0), (10, 0), (10, 10), (0, 10)])
    }

    #[test]
    fn rejects_collinear_and_short_chains() {
        let line = vec![Point::new(0, 0), Point::new(5, 5), Point::new(10, 10)];
        assert!(matches!(
            Contour::new(line),
            Err(MergeError::DegenerateContour { points: 3, doubled_area: 0 })
        ));

        let repeated = vec![Point::new(1, 1), Point::new(1, 1), Point::new(4, 2), Point::new(1, 1)];
        assert!(matches!(
            Contour::new(repeated),
            Err(MergeError::DegenerateContour { points: 2, .. })
        ));
    }

    #[test]
    fn normalizes_orientation_to_clockwise() {
        let ccw = square();
        let cw = polygon(&[(0, 0), (0, 10), (10, 10), (10, 0)]);

        assert_eq!(ccw.points(), cw.points());
        assert_relative_eq!(ccw.area(), 100.0);
        assert_eq!(ccw.points()[1], Point::new(0, 10));
    }

    #[test]
    fn centroid_of_square_and_circle() {
        let (cx, cy) = square().centroid();
        assert_relative_eq!(cx, 5.0, epsilon = 1e-9);
        assert_relative_eq!(cy, 5.0, epsilon = 1e-9);

        let circle = circle_contour(100, 100, 20);
        let (cx, cy) = circle.centroid();
        assert_relative_eq!(cx, 100.0, epsilon = 0.5);
        assert_relative_eq!(cy, 100.0, epsilon = 0.5);
    }

    #[test]
    fn arc_wraps_and_covers_full_loop_on_equal_ends() {
        let contour = square();
        assert_eq!(contour.arc(1, 3).unwrap(), vec![1, 2, 3]);
        assert_eq!(contour.arc(3, 1).unwrap(), vec![3, 0, 1]);
        assert_eq!(contour.arc(2, 2).unwrap(), vec![2, 3, 0, 1, 2]);
        assert_eq!(
            contour.arc(0, 4),
            Err(MergeError::InvalidPieceRange { start: 0, end: 4, len: 4 })
        );
    }

    #[test]
    fn neighborhood_walks_both_ways_and_clamps() {
        let circle = circle_contour(0, 0, 20);
        let len = circle.len();

        assert_eq!(circle.neighborhood(2, Walk::Clockwise, 15, 3), vec![2, 5, 8, 11, 14]);
        assert_eq!(
            circle.neighborhood(2, Walk::CounterClockwise, 9, 3),
            vec![2, len - 1, len - 4]
        );

        let small = square();
        assert_eq!(small.neighborhood(0, Walk::Clockwise, 15, 1), vec![0, 1, 2, 3]);
        assert_eq!(small.neighborhood(0, Walk::Clockwise, 0, 3), vec![0]);
    }

    #[test]
    fn deserializes_through_validation() {
        let json = r#"[{"x":0,"y":0},{"x":4,"y":0},{"x":4,"y":3}]"#;
        let contour: Contour = serde_json::from_str(json).unwrap();
        assert_eq!(contour.len(), 3);
        assert_relative_eq!(contour.area(), 6.0);

        let flat = r#"[{"x":0,"y":0},{"x":4,"y":0},{"x":8,"y":0}]"#;
        assert!(serde_json::from_str::<Contour>(flat).is_err());
    }
}
