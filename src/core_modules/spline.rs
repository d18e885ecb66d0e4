// THEORY:
// The `spline` module fits the smooth curves that replace the seam between two
// merged boundaries. The bridging point sets it receives are sampled every few
// contour points on two different contours, so their spacing is uneven: close
// together along each boundary, then a jump across the gap.
//
// Key principles:
// 1.  **Chordal parametrization**: The curve parameter of each knot is the
//     cumulative straight-line distance along the point set, not its index. A
//     large gap between two knots gets a proportionally large stretch of
//     parameter, which keeps the fitted curve from overshooting.
// 2.  **Interpolating natural cubic**: x(t) and y(t) are each a natural cubic
//     spline through every knot (second derivative zero at both ends). Two knots
//     degrade gracefully to a straight segment, one knot to a constant.
// 3.  **Integer output**: Resampled curves are rounded back to pixels and
//     consecutive duplicates are collapsed, so a bridge slots directly into a
//     contour.

use crate::core_modules::error::MergeError;
use crate::core_modules::geometry::Point;

/// A parametric interpolating spline through a sequence of pixels.
#[derive(Debug, Clone)]
pub struct ChordalSpline {
    /// Cumulative chord length at each knot. Strictly increasing.
    knots: Vec<f64>,
    x: CubicSpline1D,
    y: CubicSpline1D,
}

impl ChordalSpline {
    /// Fits a spline through `points`. Repeated consecutive points are merged
    /// into a single knot.
    pub fn fit(points: &[Point]) -> Result<Self, MergeError> {
        let mut knots: Vec<f64> = Vec::with_capacity(points.len());
        let mut xs: Vec<f64> = Vec::with_capacity(points.len());
        let mut ys: Vec<f64> = Vec::with_capacity(points.len());
        let mut previous: Option<Point> = None;

        for p in points {
            let t = match previous {
                None => 0.0,
                Some(prev) => {
                    let step = prev.distance(p);
                    if step == 0.0 {
                        continue;
                    }
                    knots[knots.len() - 1] + step
                }
            };
            knots.push(t);
            xs.push(p.x as f64);
            ys.push(p.y as f64);
            previous = Some(*p);
        }

        if knots.is_empty() {
            return Err(MergeError::EmptyBridge);
        }

        Ok(Self {
            x: CubicSpline1D::fit(&knots, &xs),
            y: CubicSpline1D::fit(&knots, &ys),
            knots,
        })
    }

    /// The knot parameters, one per distinct input point.
    pub fn knots(&self) -> &[f64] {
        &self.knots
    }

    /// Parameter of the knot placed at the `index`-th input point.
    ///
    /// Repeated points share the parameter of the first occurrence.
    pub fn parameter_of(points: &[Point], index: usize) -> f64 {
        points
            .windows(2)
            .take(index)
            .map(|pair| pair[0].distance(&pair[1]))
            .sum()
    }

    pub fn evaluate(&self, t: f64) -> (f64, f64) {
        (self.x.evaluate(&self.knots, t), self.y.evaluate(&self.knots, t))
    }

    /// Samples the curve from `from` to `to` every `step`, always including `to`,
    /// rounded to pixels with consecutive duplicates removed.
    pub fn resample(&self, from: f64, to: f64, step: f64) -> Vec<Point> {
        let span = to - from;
        let count = if step > 0.0 { (span.abs() / step).floor() as usize } else { 0 };
        let direction = span.signum();

        let mut curve: Vec<Point> = (0..=count)
            .map(|i| from + direction * step * i as f64)
            .chain(std::iter::once(to))
            .map(|t| {
                let (x, y) = self.evaluate(t);
                Point::from_f64(x, y)
            })
            .collect();
        curve.dedup();
        curve
    }
}

/// Natural cubic spline of one coordinate over shared knots.
#[derive(Debug, Clone)]
struct CubicSpline1D {
    values: Vec<f64>,
    /// Second derivative at each knot.
    moments: Vec<f64>,
}

impl CubicSpline1D {
    fn fit(knots: &[f64], values: &[f64]) -> Self {
        let n = knots.len();
        let mut moments = vec![0.0; n];

        if n > 2 {
            // Tridiagonal system for the interior second derivatives (Thomas algorithm).
            let h: Vec<f64> = knots.windows(2).map(|w| w[1] - w[0]).collect();
            let m = n - 2;
            let mut diag = vec![0.0; m];
            let mut upper = vec![0.0; m];
            let mut rhs = vec![0.0; m];

            for i in 0..m {
                diag[i] = 2.0 * (h[i] + h[i + 1]);
                upper[i] = h[i + 1];
                rhs[i] = 6.0
                    * ((values[i + 2] - values[i + 1]) / h[i + 1] - (values[i + 1] - values[i]) / h[i]);
            }

            for i in 1..m {
                let factor = h[i] / diag[i - 1];
                diag[i] -= factor * upper[i - 1];
                rhs[i] -= factor * rhs[i - 1];
            }

            moments[m] = rhs[m - 1] / diag[m - 1];
            for i in (0..m - 1).rev() {
                moments[i + 1] = (rhs[i] - upper[i] * moments[i + 2]) / diag[i];
            }
        }

        Self {
            values: values.to_vec(),
            moments,
        }
    }

    fn evaluate(&self, knots: &[f64], t: f64) -> f64 {
        let n = knots.len();
        if n == 1 {
            return self.values[0];
        }

        let t = t.clamp(knots[0], knots[n - 1]);
        let segment = match knots.partition_point(|&k| k <= t) {
            0 => 0,
            i => (i - 1).min(n - 2),
        };

        let (t0, t1) = (knots[segment], knots[segment + 1]);
        let (y0, y1) = (self.values[segment], self.values[segment + 1]);
        let (m0, m1) = (self.moments[segment], self.moments[segment + 1]);
        let h = t1 - t0;
        let a = (t1 - t) / h;
        let b = (t - t0) / h;

        a * y0 + b * y1 + ((a.powi(3) - a) * m0 + (b.powi(3) - b) * m1) * h * h / 6.0
    }
}
