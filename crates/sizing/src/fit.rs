//! Least-squares fits of `r' = a·G^n` to measured regression data.

use serde::Serialize;
use thiserror::Error;

/// One measurement: oxidizer flux (kg/(m²·s)) and regression rate (m/s).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegressionPoint {
    pub flux: f64,
    pub rate: f64,
}

impl From<(f64, f64)> for RegressionPoint {
    fn from((flux, rate): (f64, f64)) -> Self {
        Self { flux, rate }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PowerLawFit {
    pub a: f64,
    pub n: f64,
    /// Root-mean-square residual of the rate (m/s).
    pub rms_residual: f64,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum FitError {
    #[error("need at least {needed} points, got {got}")]
    TooFewPoints { needed: usize, got: usize },
    #[error("point {index} has non-positive flux or rate")]
    NonPositive { index: usize },
    #[error("all points share the same flux; the exponent is undetermined")]
    Degenerate,
}

fn check(points: &[RegressionPoint], needed: usize) -> Result<(), FitError> {
    if points.len() < needed {
        return Err(FitError::TooFewPoints {
            needed,
            got: points.len(),
        });
    }
    match points
        .iter()
        .position(|p| !(p.flux > 0.0 && p.rate > 0.0 && p.flux.is_finite() && p.rate.is_finite()))
    {
        Some(index) => Err(FitError::NonPositive { index }),
        None => Ok(()),
    }
}

fn sum_of_squares(points: &[RegressionPoint], a: f64, n: f64) -> f64 {
    points
        .iter()
        .map(|p| {
            let r = p.rate - a * p.flux.powf(n);
            r * r
        })
        .sum()
}

fn rms_residual(points: &[RegressionPoint], a: f64, n: f64) -> f64 {
    (sum_of_squares(points, a, n) / points.len() as f64).sqrt()
}

const MAX_ITERATIONS: usize = 50;
const MAX_HALVINGS: usize = 30;
const RELATIVE_TOLERANCE: f64 = 1e-12;

/// Fit both coefficients by linear regression of `ln r'` on `ln G`.
///
/// Minimizes relative rather than absolute rate residuals; [`fit_power_law`] starts from it.
pub fn fit_log_linear(points: &[RegressionPoint]) -> Result<PowerLawFit, FitError> {
    check(points, 2)?;
    let count = points.len() as f64;
    let (sx, sy) = points.iter().fold((0.0, 0.0), |(sx, sy), p| {
        (sx + p.flux.ln(), sy + p.rate.ln())
    });
    let (mean_x, mean_y) = (sx / count, sy / count);
    let (sxx, sxy) = points.iter().fold((0.0, 0.0), |(sxx, sxy), p| {
        let dx = p.flux.ln() - mean_x;
        (sxx + dx * dx, sxy + dx * (p.rate.ln() - mean_y))
    });
    if sxx <= f64::EPSILON * count {
        return Err(FitError::Degenerate);
    }

    let n = sxy / sxx;
    let a = (mean_y - n * mean_x).exp();
    Ok(PowerLawFit {
        a,
        n,
        rms_residual: rms_residual(points, a, n),
    })
}

/// Least-squares fit of `a` and `n` on the rate residuals themselves.
///
/// Gauss-Newton in `(ln a, n)` from the log-linear estimate, halving any step that does not
/// reduce the residual sum of squares.
pub fn fit_power_law(points: &[RegressionPoint]) -> Result<PowerLawFit, FitError> {
    let start = fit_log_linear(points)?;
    let (mut ln_a, mut n) = (start.a.ln(), start.n);
    let mut sse = sum_of_squares(points, start.a, n);

    for _ in 0..MAX_ITERATIONS {
        // Normal equations J^T J d = J^T r with J = [f, f ln G].
        let (mut jaa, mut jan, mut jnn, mut ra, mut rn) = (0.0, 0.0, 0.0, 0.0, 0.0);
        for p in points {
            let ln_g = p.flux.ln();
            let model = (ln_a + n * ln_g).exp();
            let residual = p.rate - model;
            jaa += model * model;
            jan += model * model * ln_g;
            jnn += model * model * ln_g * ln_g;
            ra += model * residual;
            rn += model * ln_g * residual;
        }
        let det = jaa * jnn - jan * jan;
        if !(det > 0.0 && det.is_finite()) {
            break;
        }
        let step_a = (jnn * ra - jan * rn) / det;
        let step_n = (jaa * rn - jan * ra) / det;

        let mut scale = 1.0;
        let mut accepted = None;
        for _ in 0..MAX_HALVINGS {
            let (trial_a, trial_n) = (ln_a + scale * step_a, n + scale * step_n);
            let trial = sum_of_squares(points, trial_a.exp(), trial_n);
            if trial < sse {
                accepted = Some((trial_a, trial_n, trial));
                break;
            }
            scale *= 0.5;
        }
        let Some((next_a, next_n, next_sse)) = accepted else {
            break;
        };
        let converged = sse - next_sse <= sse * RELATIVE_TOLERANCE;
        (ln_a, n, sse) = (next_a, next_n, next_sse);
        if converged {
            break;
        }
    }

    let a = ln_a.exp();
    Ok(PowerLawFit {
        a,
        n,
        rms_residual: rms_residual(points, a, n),
    })
}

/// Fit `a` alone for a prescribed exponent: `a = Σ r'·G^n / Σ G^2n`.
pub fn fit_fixed_exponent(points: &[RegressionPoint], n: f64) -> Result<PowerLawFit, FitError> {
    check(points, 1)?;
    let (num, den) = points.iter().fold((0.0, 0.0), |(num, den), p| {
        let g = p.flux.powf(n);
        (num + p.rate * g, den + g * g)
    });
    let a = num / den;
    Ok(PowerLawFit {
        a,
        n,
        rms_residual: rms_residual(points, a, n),
    })
}
