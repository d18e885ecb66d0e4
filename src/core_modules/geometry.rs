// THEORY:
// The `geometry` module holds the smallest building blocks of the merge engine:
// integer pixel coordinates and the two operations every higher layer needs on
// them, Euclidean distance and a rigid rotation of the coordinate system.
//
// Contours arrive as integer pixel chains, and every geometric decision in the
// proximity and merge layers is taken on integer coordinates again after any
// floating-point transform. Rounding happens here, in one place.

use serde::{Deserialize, Serialize};

/// A 2D pixel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance between two points.
    pub fn distance(&self, other: &Point) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        dx.hypot(dy)
    }

    /// Rounds a floating-point coordinate pair to the nearest pixel.
    pub fn from_f64(x: f64, y: f64) -> Self {
        Self {
            x: x.round() as i32,
            y: y.round() as i32,
        }
    }
}

/// Bearing of the line from `from` to `to`, in radians.
pub fn bearing(from: &Point, to: &Point) -> f64 {
    ((to.y - from.y) as f64).atan2((to.x - from.x) as f64)
}

/// A rotation of the coordinate system by `-angle`.
///
/// Applying it to a point lying on the ray of bearing `angle` from the origin
/// maps that point onto the positive x axis.
#[derive(Debug, Clone, Copy)]
pub struct FrameRotation {
    cos: f64,
    sin: f64,
}

impl FrameRotation {
    pub fn new(angle: f64) -> Self {
        Self {
            cos: angle.cos(),
            sin: angle.sin(),
        }
    }

    pub fn apply(&self, p: &Point) -> Point {
        let x = p.x as f64;
        let y = p.y as f64;
        Point::from_f64(x * self.cos + y * self.sin, -x * self.sin + y * self.cos)
    }

    pub fn apply_all(&self, points: &[Point]) -> Vec<Point> {
        points.iter().map(|p| self.apply(p)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn distance_is_euclidean() {
        assert_relative_eq!(Point::new(0, 0).distance(&Point::new(3, 4)), 5.0);
        assert_relative_eq!(Point::new(-2, 7).distance(&Point::new(-2, 7)), 0.0);
    }

    #[test]
    fn rotation_aligns_bearing_with_x_axis() {
        let from = Point::new(10, 10);
        let to = Point::new(40, 50);
        let rotation = FrameRotation::new(bearing(&from, &to));

        let a = rotation.apply(&from);
        let b = rotation.apply(&to);
        assert_eq!(a.y, b.y);
        assert_eq!(b.x - a.x, 50);
    }

    #[test]
    fn quarter_turn_rounds_to_exact_pixels() {
        let rotation = FrameRotation::new(FRAC_PI_2);
        assert_eq!(rotation.apply(&Point::new(0, 5)), Point::new(5, 0));
        assert_eq!(rotation.apply(&Point::new(3, 0)), Point::new(0, -3));
    }
}
