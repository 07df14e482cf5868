use crate::config::SplineDegree;

/// Reasons a parametric spline cannot be fitted.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SplineError {
    #[error("need at least {need} control points, got {have}")]
    TooFewPoints { have: usize, need: usize },
    #[error("parameter is not strictly increasing at control point {index}")]
    NonMonotonicParameter { index: usize },
    #[error("non-finite control value at control point {index}")]
    NonFinite { index: usize },
    #[error("control arrays differ in length")]
    LengthMismatch,
}

/// Per-segment coefficients of `a + b*t + c*t^2 + d*t^3`, with `t = u - knot`.
type Segment = [f64; 4];

/// Interpolating (zero smoothing) spline through planar control points,
/// parameterized by a strictly increasing scalar.
#[derive(Debug, Clone)]
pub struct ParametricSpline {
    knots: Vec<f64>,
    x: Vec<Segment>,
    y: Vec<Segment>,
}

impl ParametricSpline {
    pub fn fit(u: &[f64], x: &[f64], y: &[f64], degree: SplineDegree) -> Result<Self, SplineError> {
        if u.len() != x.len() || u.len() != y.len() {
            return Err(SplineError::LengthMismatch);
        }
        let need = degree.min_points();
        if u.len() < need {
            return Err(SplineError::TooFewPoints {
                have: u.len(),
                need,
            });
        }
        for index in 0..u.len() {
            if !u[index].is_finite() || !x[index].is_finite() || !y[index].is_finite() {
                return Err(SplineError::NonFinite { index });
            }
            if index > 0 && u[index] <= u[index - 1] {
                return Err(SplineError::NonMonotonicParameter { index });
            }
        }

        let (x, y) = match degree {
            SplineDegree::Linear => (linear_segments(u, x), linear_segments(u, y)),
            SplineDegree::Cubic => (natural_cubic_segments(u, x), natural_cubic_segments(u, y)),
        };
        Ok(Self {
            knots: u.to_vec(),
            x,
            y,
        })
    }

    /// Evaluates the curve; outside the knot span the end polynomials extrapolate.
    pub fn evaluate(&self, u: f64) -> (f64, f64) {
        let last = self.x.len() - 1;
        let index = self
            .knots
            .partition_point(|&knot| knot <= u)
            .saturating_sub(1)
            .min(last);
        let t = u - self.knots[index];
        (horner(&self.x[index], t), horner(&self.y[index], t))
    }

    pub fn evaluate_all(&self, u: &[f64]) -> Vec<(f64, f64)> {
        u.iter().map(|&value| self.evaluate(value)).collect()
    }
}

fn horner(segment: &Segment, t: f64) -> f64 {
    let [a, b, c, d] = *segment;
    a + t * (b + t * (c + t * d))
}

fn linear_segments(knots: &[f64], values: &[f64]) -> Vec<Segment> {
    knots
        .windows(2)
        .zip(values.windows(2))
        .map(|(k, v)| [v[0], (v[1] - v[0]) / (k[1] - k[0]), 0.0, 0.0])
        .collect()
}

/// Natural cubic spline (zero second derivative at both ends) via the
/// tridiagonal system for the quadratic coefficients.
fn natural_cubic_segments(knots: &[f64], values: &[f64]) -> Vec<Segment> {
    let n = knots.len() - 1;
    let h: Vec<f64> = knots.windows(2).map(|k| k[1] - k[0]).collect();

    let mut alpha = vec![0.0; n];
    for i in 1..n {
        alpha[i] = 3.0 / h[i] * (values[i + 1] - values[i])
            - 3.0 / h[i - 1] * (values[i] - values[i - 1]);
    }

    let mut mu = vec![0.0; n + 1];
    let mut z = vec![0.0; n + 1];
    for i in 1..n {
        let l = 2.0 * (knots[i + 1] - knots[i - 1]) - h[i - 1] * mu[i - 1];
        mu[i] = h[i] / l;
        z[i] = (alpha[i] - h[i - 1] * z[i - 1]) / l;
    }

    let mut c = vec![0.0; n + 1];
    let mut segments = vec![[0.0; 4]; n];
    for j in (0..n).rev() {
        c[j] = z[j] - mu[j] * c[j + 1];
        let b = (values[j + 1] - values[j]) / h[j] - h[j] * (c[j + 1] + 2.0 * c[j]) / 3.0;
        let d = (c[j + 1] - c[j]) / (3.0 * h[j]);
        segments[j] = [values[j], b, c[j], d];
    }
    segments
}
