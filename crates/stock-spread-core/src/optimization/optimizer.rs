use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::covariance_model::CovarianceModel;
use super::qp::{ActiveSetSolver, QpSolution, QuadraticProgram};
use super::risk_target::RiskTargetMapper;
use crate::config::OptimizerConfig;
use crate::data::{Asset, PortfolioTarget};
use crate::error::SpreadError;
use crate::types::{RiskPercentage, Weight};
use crate::SpreadResult;

pub const MIN_RISK_STAGE: &str = "minimum-risk";
pub const TARGET_RISK_STAGE: &str = "target-risk";

/// Relative slack on the variance ceiling `target_std^2`.
const CEILING_SLACK: f64 = 1e-9;
/// A return this close to the largest attainable one is the frontier end.
const RETURN_TOLERANCE: f64 = 1e-12;
/// Upper bound on how often the return weight is doubled while bracketing.
const MAX_DOUBLINGS: u32 = 200;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Weights in asset order plus the risk figures they were chosen against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizedPortfolio {
    pub weights: Vec<Weight>,
    pub portfolio_std: f64,
    pub portfolio_return: f64,
    /// Std of the minimum-variance portfolio under the same floors.
    pub min_achievable_std: f64,
    /// Volatility target after clamping to `min_achievable_std`.
    pub target_std: f64,
    /// The requested risk percentage, or the inverse-mapped one when adjusted.
    pub risk_percentage: RiskPercentage,
    pub risk_adjusted: bool,
    /// Solver iterations summed over every QP solved.
    pub iterations: u32,
}

/// Two-stage long-only optimizer: minimum risk first, then the requested
/// target on the resulting risk level.
#[derive(Debug, Clone)]
pub struct PortfolioOptimizer {
    correlation: f64,
    mapper: RiskTargetMapper,
    solver: ActiveSetSolver,
    bisection_iterations: u32,
}

/// Quadratic and bounds shared by every solve of one request.
struct Problem<'a> {
    model: &'a CovarianceModel,
    quadratic: DMatrix<f64>,
    lower: DVector<f64>,
    returns: DVector<f64>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

impl PortfolioOptimizer {
    pub fn new(config: &OptimizerConfig) -> Self {
        PortfolioOptimizer {
            correlation: config.assumed_correlation,
            mapper: RiskTargetMapper::new(config.risk_band),
            solver: ActiveSetSolver {
                max_iterations: config.max_iterations,
                tolerance: config.tolerance,
            },
            bisection_iterations: config.bisection_iterations,
        }
    }

    pub fn mapper(&self) -> &RiskTargetMapper {
        &self.mapper
    }

    pub fn optimize(
        &self,
        assets: &[Asset],
        target: PortfolioTarget,
        risk_percentage: RiskPercentage,
    ) -> SpreadResult<OptimizedPortfolio> {
        if assets.is_empty() {
            return Err(SpreadError::InsufficientData("no assets to optimize".into()));
        }

        let model = CovarianceModel::from_assets(assets, self.correlation);
        let problem = Problem {
            quadratic: model.regularized(),
            model: &model,
            lower: DVector::from_iterator(assets.len(), assets.iter().map(|a| a.min_weight)),
            returns: DVector::from_iterator(
                assets.len(),
                assets.iter().map(|a| a.expected_return),
            ),
        };
        let mut iterations = 0u32;

        // Stage 1: minimum risk.
        let min_risk = self.solve(&problem, 0.0, MIN_RISK_STAGE)?;
        iterations = iterations.saturating_add(min_risk.iterations);
        let min_weights = min_risk.weights;
        let min_std = model.std(&min_weights);
        debug!("{}: minimum achievable std {:.6}", MIN_RISK_STAGE, min_std);

        // Stage 2: clamp the target, then solve for it.
        let mut target_std = self.mapper.target_std(risk_percentage);
        let mut effective_risk = risk_percentage;
        let mut risk_adjusted = false;
        if target_std < min_std {
            effective_risk = self.mapper.risk_percentage(min_std);
            info!(
                "Target std {:.6} (risk {}) is below the minimum achievable {:.6}; using risk {:.4}",
                target_std, risk_percentage, min_std, effective_risk
            );
            target_std = min_std;
            risk_adjusted = true;
        }

        let weights = match target {
            PortfolioTarget::MaxReturn => {
                let (w, iters) = self.max_return(&problem, target_std, min_weights)?;
                iterations = iterations.saturating_add(iters);
                w
            }
            PortfolioTarget::MinVariance => {
                let sol = self.solve(&problem, 0.0, TARGET_RISK_STAGE)?;
                iterations = iterations.saturating_add(sol.iterations);
                sol.weights
            }
        };

        Ok(OptimizedPortfolio {
            portfolio_std: model.std(&weights),
            portfolio_return: weights.dot(&problem.returns),
            weights: weights.iter().copied().collect(),
            min_achievable_std: min_std,
            target_std,
            risk_percentage: effective_risk,
            risk_adjusted,
            iterations,
        })
    }

    // -----------------------------------------------------------------------
    // Stages
    // -----------------------------------------------------------------------

    /// `min w' Sigma w - tau * mu' w` under the budget and floors.
    fn solve(&self, problem: &Problem, tau: f64, stage: &str) -> SpreadResult<QpSolution> {
        let qp = QuadraticProgram {
            quadratic: &problem.quadratic,
            linear: &problem.returns * -tau,
            lower: &problem.lower,
        };
        self.solver.solve(&qp, stage)
    }

    /// Highest-return portfolio with `w' Sigma w <= target_std^2`.
    ///
    /// Walks the efficient frontier by doubling `tau` from the minimum-variance
    /// end until the ceiling is crossed or the largest attainable return is
    /// reached, then bisects `tau` onto the ceiling. Every returned portfolio
    /// lies on the frontier, so its return is never below the
    /// minimum-variance one.
    fn max_return(
        &self,
        problem: &Problem,
        target_std: f64,
        min_weights: DVector<f64>,
    ) -> SpreadResult<(DVector<f64>, u32)> {
        let ceiling = target_std * target_std * (1.0 + CEILING_SLACK);
        let mu_scale = problem.returns.amax();
        let best_return = attainable_return(&problem.lower, &problem.returns);
        let at_frontier_end =
            |w: &DVector<f64>| w.dot(&problem.returns) >= best_return - RETURN_TOLERANCE;

        if mu_scale == 0.0 || at_frontier_end(&min_weights) {
            debug!("{}: minimum-variance portfolio already maximizes return", TARGET_RISK_STAGE);
            return Ok((min_weights, 0));
        }

        let n = problem.lower.len() as f64;
        let tau_unit = (problem.quadratic.trace() / n) / mu_scale;
        let mut iterations = 0u32;
        let mut lo = 0.0;
        let mut lo_w = min_weights;
        let mut hi = None;

        let mut tau = tau_unit;
        for _ in 0..MAX_DOUBLINGS {
            let sol = self.solve(problem, tau, TARGET_RISK_STAGE)?;
            iterations = iterations.saturating_add(sol.iterations);
            if problem.model.variance(&sol.weights) > ceiling {
                hi = Some(tau);
                break;
            }
            lo = tau;
            lo_w = sol.weights;
            if at_frontier_end(&lo_w) {
                debug!(
                    "{}: ceiling is slack, frontier end reached at tau {:.3e}",
                    TARGET_RISK_STAGE, tau
                );
                return Ok((lo_w, iterations));
            }
            tau *= 2.0;
        }

        let Some(mut hi) = hi else {
            debug!("{}: doubling cap reached at tau {:.3e}", TARGET_RISK_STAGE, lo);
            return Ok((lo_w, iterations));
        };

        for _ in 0..self.bisection_iterations {
            if hi - lo <= 1e-12 * hi {
                break;
            }
            let mid = 0.5 * (lo + hi);
            let sol = self.solve(problem, mid, TARGET_RISK_STAGE)?;
            iterations = iterations.saturating_add(sol.iterations);
            if problem.model.variance(&sol.weights) > ceiling {
                hi = mid;
            } else {
                lo = mid;
                lo_w = sol.weights;
            }
        }
        debug!(
            "{}: ceiling met at tau {:.6e}, std {:.6}",
            TARGET_RISK_STAGE,
            lo,
            problem.model.std(&lo_w)
        );
        Ok((lo_w, iterations))
    }
}

/// Largest `mu' w` over the budget and floors: floors everywhere, the rest on
/// the best-returning asset.
fn attainable_return(lower: &DVector<f64>, returns: &DVector<f64>) -> f64 {
    let slack = (1.0 - lower.sum()).max(0.0);
    lower.dot(returns) + slack * returns.max()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
