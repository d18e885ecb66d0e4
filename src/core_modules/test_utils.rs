//! Synthetic contours for unit tests.

use crate::core_modules::contour::Contour;
use crate::core_modules::geometry::Point;

/// A rasterized circle boundary, traced the way a contour follower would: one
/// pixel per step with consecutive duplicates removed.
pub fn circle_contour(cx: i32, cy: i32, radius: i32) -> Contour {
    let steps = (radius.max(1) * 16) as usize;
    let points = (0..steps)
        .map(|i| {
            let theta = std::f64::consts::TAU * i as f64 / steps as f64;
            Point::from_f64(
                cx as f64 + radius as f64 * theta.cos(),
                cy as f64 + radius as f64 * theta.sin(),
            )
        })
        .collect();
    Contour::new(points).expect("circle contour must be valid")
}

/// A polygon contour from its vertices.
pub fn polygon(vertices: &[(i32, i32)]) -> Contour {
    Contour::new(vertices.iter().map(|&(x, y)| Point::new(x, y)).collect())
        .expect("polygon contour must be valid")
}

/// Even-odd ray casting point-in-polygon test.
pub fn contains(contour: &Contour, p: Point) -> bool {
    let points = contour.points();
    let (px, py) = (p.x as f64, p.y as f64);
    let mut inside = false;
    let mut j = points.len() - 1;

    for i in 0..points.len() {
        let (xi, yi) = (points[i].x as f64, points[i].y as f64);
        let (xj, yj) = (points[j].x as f64, points[j].y as f64);
        if (yi > py) != (yj > py) && px < (xj - xi) * (py - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}
