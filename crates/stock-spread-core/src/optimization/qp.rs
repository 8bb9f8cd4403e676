use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::error::SpreadError;
use crate::SpreadResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// `minimize w' Q w + c' w  subject to  sum(w) = 1,  w >= lower`
///
/// `Q` must be symmetric positive semidefinite.
#[derive(Debug, Clone)]
pub struct QuadraticProgram<'a> {
    pub quadratic: &'a DMatrix<f64>,
    pub linear: DVector<f64>,
    pub lower: &'a DVector<f64>,
}

#[derive(Debug, Clone)]
pub struct QpSolution {
    pub weights: DVector<f64>,
    pub iterations: u32,
}

/// Primal active-set method for budget-constrained QPs with lower bounds.
#[derive(Debug, Clone, Copy)]
pub struct ActiveSetSolver {
    pub max_iterations: u32,
    pub tolerance: f64,
}

/// Slack allowed when checking that the floors leave room for a full budget.
const FEASIBILITY_TOLERANCE: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

impl QuadraticProgram<'_> {
    /// `2 Q w + c`
    pub fn gradient(&self, w: &DVector<f64>) -> DVector<f64> {
        self.quadratic * w * 2.0 + &self.linear
    }

    pub fn objective(&self, w: &DVector<f64>) -> f64 {
        w.dot(&(self.quadratic * w)) + self.linear.dot(w)
    }
}

impl ActiveSetSolver {
    /// Solve `qp`. `stage` names the caller in errors and logs.
    ///
    /// Starts from the floors plus an even share of the remaining budget,
    /// which is strictly feasible, and keeps every iterate feasible.
    pub fn solve(&self, qp: &QuadraticProgram, stage: &str) -> SpreadResult<QpSolution> {
        let n = qp.lower.len();
        validate_program(qp, n)?;

        let floor_total = qp.lower.sum();
        let slack = 1.0 - floor_total;
        if slack < -FEASIBILITY_TOLERANCE {
            return Err(SpreadError::OptimizationInfeasible {
                stage: stage.into(),
                reason: format!(
                    "minimum weights sum to {:.6}, leaving no budget-feasible portfolio",
                    floor_total
                ),
            });
        }
        if slack <= FEASIBILITY_TOLERANCE {
            debug!("{}: floors exhaust the budget, solution is the floor vector", stage);
            return Ok(QpSolution {
                weights: qp.lower.clone(),
                iterations: 0,
            });
        }

        let mut w = qp.lower.map(|l| l + slack / n as f64);
        let mut at_bound = vec![false; n];

        for iter in 0..self.max_iterations {
            let grad = qp.gradient(&w);
            let free: Vec<usize> = (0..n).filter(|&i| !at_bound[i]).collect();
            if free.is_empty() {
                return Err(SpreadError::OptimizationInfeasible {
                    stage: stage.into(),
                    reason: "every weight is pinned to its floor".into(),
                });
            }

            let (step, lambda) = equality_step(qp.quadratic, &grad, &free).ok_or_else(|| {
                SpreadError::OptimizationInfeasible {
                    stage: stage.into(),
                    reason: "KKT system could not be solved".into(),
                }
            })?;

            if step.amax() <= self.tolerance {
                // Stationary on the current working set: check the bound multipliers.
                let scale = 1.0 + grad.amax();
                let mut release: Option<(usize, f64)> = None;
                for i in (0..n).filter(|&i| at_bound[i]) {
                    let multiplier = grad[i] + lambda;
                    if multiplier < -self.tolerance * scale
                        && release.map_or(true, |(_, m)| multiplier < m)
                    {
                        release = Some((i, multiplier));
                    }
                }
                match release {
                    None => {
                        debug!(
                            "{}: optimal after {} iterations, objective {:.10}",
                            stage,
                            iter + 1,
                            qp.objective(&w)
                        );
                        return Ok(QpSolution {
                            weights: w,
                            iterations: iter + 1,
                        });
                    }
                    Some((i, multiplier)) => {
                        debug!("{}: releasing weight {} (multiplier {:.3e})", stage, i, multiplier);
                        at_bound[i] = false;
                    }
                }
                continue;
            }

            // Longest step along the direction that keeps every weight above its floor.
            let mut alpha = 1.0;
            let mut blocking = None;
            for (k, &i) in free.iter().enumerate() {
                if step[k] < 0.0 {
                    let ratio = ((qp.lower[i] - w[i]) / step[k]).max(0.0);
                    if ratio < alpha {
                        alpha = ratio;
                        blocking = Some(i);
                    }
                }
            }
            for (k, &i) in free.iter().enumerate() {
                w[i] += alpha * step[k];
            }
            if let Some(i) = blocking {
                w[i] = qp.lower[i];
                at_bound[i] = true;
            }
        }

        Err(SpreadError::OptimizationTimeout {
            stage: stage.into(),
            iterations: self.max_iterations,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn validate_program(qp: &QuadraticProgram, n: usize) -> SpreadResult<()> {
    if n == 0 {
        return Err(SpreadError::InsufficientData("quadratic program has no variables".into()));
    }
    if qp.quadratic.nrows() != n || qp.quadratic.ncols() != n {
        return Err(SpreadError::invalid(
            "quadratic",
            format!(
                "expected {}x{} matrix, got {}x{}",
                n,
                n,
                qp.quadratic.nrows(),
                qp.quadratic.ncols()
            ),
        ));
    }
    if qp.linear.len() != n {
        return Err(SpreadError::invalid(
            "linear",
            format!("expected {} coefficients, got {}", n, qp.linear.len()),
        ));
    }
    if qp.lower.iter().any(|l| !l.is_finite()) || qp.linear.iter().any(|c| !c.is_finite()) {
        return Err(SpreadError::invalid("lower", "bounds and coefficients must be finite"));
    }
    Ok(())
}

/// Newton step restricted to the free weights, keeping the budget fixed:
///
/// ```text
/// [ 2 Q_FF  1 ] [ p ]   [ -g_F ]
/// [ 1'      0 ] [ l ] = [  0   ]
/// ```
///
/// Returns the step over `free` (in that order) and the budget multiplier.
fn equality_step(
    quadratic: &DMatrix<f64>,
    grad: &DVector<f64>,
    free: &[usize],
) -> Option<(DVector<f64>, f64)> {
    let m = free.len();
    let kkt = DMatrix::from_fn(m + 1, m + 1, |a, b| match (a < m, b < m) {
        (true, true) => 2.0 * quadratic[(free[a], free[b])],
        (true, false) | (false, true) => 1.0,
        (false, false) => 0.0,
    });
    let rhs = DVector::from_fn(m + 1, |a, _| if a < m { -grad[free[a]] } else { 0.0 });

    let x = solve_linear(kkt, &rhs)?;
    Some((x.rows(0, m).into_owned(), x[m]))
}

/// LU solve, falling back to an SVD least-squares solve when the system is
/// singular (e.g. several zero-volatility assets free at once).
fn solve_linear(matrix: DMatrix<f64>, rhs: &DVector<f64>) -> Option<DVector<f64>> {
    let scale = 1.0 + rhs.amax();
    if let Some(x) = matrix.clone().lu().solve(rhs) {
        let residual = (&matrix * &x - rhs).amax();
        if x.iter().all(|v| v.is_finite()) && residual <= 1e-9 * scale {
            return Some(x);
        }
    }
    let x = matrix.svd(true, true).solve(rhs, 1e-13).ok()?;
    x.iter().all(|v| v.is_finite()).then_some(x)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
