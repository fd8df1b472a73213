//! Cubic smoothing B-spline through an ordered planar point sequence.
//!
//! The curve is parameterized by normalized chord length. With a smoothing
//! budget `s` the fit is the smoothest clamped cubic spline (second difference
//! penalty on the control points) whose sum of squared residuals stays within
//! `s`. `s = 0` interpolates every point.

use nalgebra::Vector2;

use super::banded::SymmetricBand;
use crate::error::FitError;

pub const DEGREE: usize = 3;
const ORDER: usize = DEGREE + 1;

// Penalty weights are searched over 10^LOG_LAMBDA_MIN..10^LOG_LAMBDA_MAX
// relative to the data term.
const LOG_LAMBDA_MIN: f64 = -6.0;
const LOG_LAMBDA_MAX: f64 = 8.0;
const SEARCH_STEPS: usize = 60;

#[derive(Debug, Clone)]
pub struct SmoothingSpline {
    knots: Vec<f64>,
    coefficients: Vec<Vector2<f64>>,
    params: Vec<f64>,
    residual: f64,
}

impl SmoothingSpline {
    pub fn fit(points: &[Vector2<f64>], smoothness: f64) -> Result<Self, FitError> {
        if points.len() < ORDER {
            return Err(FitError::TooFewPoints { needed: ORDER, got: points.len() });
        }
        if points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(FitError::NonFinite);
        }

        let params = chord_parameters(points)?;
        let knots = clamped_knots(&params);
        let system = NormalSystem::build(&knots, &params, points);

        let mut best = system.solve(0.0)?;
        if smoothness > 0.0 {
            let lambda_unit = system.gram.trace() / system.penalty.trace();
            let smoothest = system.solve(lambda_unit * 10f64.powf(LOG_LAMBDA_MAX))?;

            if smoothest.residual <= smoothness {
                best = smoothest;
            } else {
                // residual grows monotonically with the penalty weight
                let (mut lo, mut hi) = (LOG_LAMBDA_MIN, LOG_LAMBDA_MAX);
                for _ in 0..SEARCH_STEPS {
                    let mid = 0.5 * (lo + hi);
                    let candidate = system.solve(lambda_unit * 10f64.powf(mid))?;
                    if candidate.residual <= smoothness {
                        best = candidate;
                        lo = mid;
                    } else {
                        hi = mid;
                    }
                }
            }
        }

        Ok(Self {
            knots,
            coefficients: best.coefficients,
            params,
            residual: best.residual,
        })
    }

    /// Chord-length parameter of each fitted point, from 0 to 1.
    pub fn params(&self) -> &[f64] {
        &self.params
    }

    /// Sum of squared distances between the points and the curve at their parameters.
    pub fn residual(&self) -> f64 {
        self.residual
    }

    pub fn evaluate(&self, u: f64) -> Vector2<f64> {
        evaluate(&self.knots, &self.coefficients, u)
    }

    /// `count` points evenly spaced in parameter from the first to the last point.
    pub fn sample(&self, count: usize) -> Vec<Vector2<f64>> {
        match count {
            0 => Vec::new(),
            1 => vec![self.evaluate(0.0)],
            _ => (0..count)
                .map(|i| self.evaluate(i as f64 / (count - 1) as f64))
                .collect(),
        }
    }
}

fn chord_parameters(points: &[Vector2<f64>]) -> Result<Vec<f64>, FitError> {
    let mut params = Vec::with_capacity(points.len());
    let mut total = 0.0;
    params.push(0.0);
    for w in points.windows(2) {
        let step = (w[1] - w[0]).norm();
        if step <= 0.0 {
            return Err(FitError::ZeroLength);
        }
        total += step;
        params.push(total);
    }

    params.iter_mut().for_each(|u| *u /= total);
    Ok(params)
}

// Clamped ends with the interior knots at params[2..m-2], one control point per data point.
fn clamped_knots(params: &[f64]) -> Vec<f64> {
    let m = params.len();
    let mut knots = vec![0.0; ORDER];
    knots.extend_from_slice(&params[2..m - 2]);
    knots.extend_from_slice(&[1.0; ORDER]);
    knots
}

fn find_span(knots: &[f64], n: usize, u: f64) -> usize {
    if u >= knots[n] {
        return n - 1;
    }
    if u <= knots[DEGREE] {
        return DEGREE;
    }

    let (mut low, mut high) = (DEGREE, n);
    let mut mid = (low + high) / 2;
    while u < knots[mid] || u >= knots[mid + 1] {
        if u < knots[mid] {
            high = mid;
        } else {
            low = mid;
        }
        mid = (low + high) / 2;
    }
    mid
}

// Non-zero basis functions at `u`, for control points span-3..=span.
fn basis(knots: &[f64], span: usize, u: f64) -> [f64; ORDER] {
    let mut values = [0.0; ORDER];
    let mut left = [0.0; ORDER];
    let mut right = [0.0; ORDER];
    values[0] = 1.0;

    for j in 1..=DEGREE {
        left[j] = u - knots[span + 1 - j];
        right[j] = knots[span + j] - u;
        let mut saved = 0.0;
        for r in 0..j {
            let temp = values[r] / (right[r + 1] + left[j - r]);
            values[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        values[j] = saved;
    }

    values
}

fn evaluate(knots: &[f64], coefficients: &[Vector2<f64>], u: f64) -> Vector2<f64> {
    let n = coefficients.len();
    let u = u.clamp(0.0, 1.0);
    let span = find_span(knots, n, u);
    basis(knots, span, u)
        .iter()
        .enumerate()
        .map(|(r, b)| coefficients[span - DEGREE + r] * *b)
        .sum()
}

struct Solution {
    coefficients: Vec<Vector2<f64>>,
    residual: f64,
}

/// Normal equations `(BᵀB + λ DᵀD) c = Bᵀ p` of the penalized fit.
struct NormalSystem<'a> {
    points: &'a [Vector2<f64>],
    rows: Vec<(usize, [f64; ORDER])>,
    gram: SymmetricBand,
    penalty: SymmetricBand,
    rhs: Vec<Vector2<f64>>,
}

impl<'a> NormalSystem<'a> {
    fn build(knots: &[f64], params: &[f64], points: &'a [Vector2<f64>]) -> Self {
        let n = points.len();
        let mut gram = SymmetricBand::zeros(n, DEGREE);
        let mut rhs = vec![Vector2::zeros(); n];

        let rows: Vec<(usize, [f64; ORDER])> = params
            .iter()
            .map(|&u| {
                let span = find_span(knots, n, u);
                (span, basis(knots, span, u))
            })
            .collect();

        for ((span, values), p) in rows.iter().zip(points) {
            let first = span - DEGREE;
            for a in 0..ORDER {
                rhs[first + a] += p * values[a];
                for b in 0..=a {
                    gram.add(first + a, first + b, values[a] * values[b]);
                }
            }
        }

        let mut penalty = SymmetricBand::zeros(n, 2);
        let second_difference = [1.0, -2.0, 1.0];
        for r in 0..n - 2 {
            for a in 0..3 {
                for b in 0..=a {
                    penalty.add(r + a, r + b, second_difference[a] * second_difference[b]);
                }
            }
        }

        Self { points, rows, gram, penalty, rhs }
    }

    fn solve(&self, lambda: f64) -> Result<Solution, FitError> {
        let system = self.gram.plus_scaled(&self.penalty, lambda);
        let factor = system.cholesky().ok_or(FitError::NotPositiveDefinite)?;
        let coefficients = factor.solve(&self.rhs);

        if coefficients.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
            return Err(FitError::NonFinite);
        }

        let residual = self
            .rows
            .iter()
            .zip(self.points)
            .map(|((span, values), p)| {
                let first = span - DEGREE;
                let fitted: Vector2<f64> = values
                    .iter()
                    .enumerate()
                    .map(|(r, b)| coefficients[first + r] * *b)
                    .sum();
                (fitted - p).norm_squared()
            })
            .sum();

        Ok(Solution { coefficients, residual })
    }
}
