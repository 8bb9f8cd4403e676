use serde::{Deserialize, Serialize};

use crate::error::SpreadError;
use crate::SpreadResult;

/// Volatility band that the 1-100 risk scale is stretched over.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskBand {
    /// Target standard deviation at risk percentage 1.
    pub min_std: f64,
    /// Target standard deviation at risk percentage 100.
    pub max_std: f64,
}

impl Default for RiskBand {
    fn default() -> Self {
        RiskBand {
            min_std: 0.003,
            max_std: 0.060,
        }
    }
}

/// Tunables for the allocation pipeline. Every field has a default, so an
/// empty JSON object is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Cross-asset correlation assumed when building the optimizer's covariance matrix.
    pub assumed_correlation: f64,
    pub risk_band: RiskBand,
    /// Iteration bound for a single QP solve.
    pub max_iterations: u32,
    /// Bisection steps used to place the max-return portfolio on the volatility ceiling.
    pub bisection_iterations: u32,
    /// Numerical tolerance for step lengths and multipliers.
    pub tolerance: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig {
            assumed_correlation: 0.5,
            risk_band: RiskBand::default(),
            max_iterations: 500,
            bisection_iterations: 100,
            tolerance: 1e-10,
        }
    }
}

impl OptimizerConfig {
    pub fn validate(&self) -> SpreadResult<()> {
        if !(0.0..=1.0).contains(&self.assumed_correlation) {
            return Err(SpreadError::invalid(
                "config.assumed_correlation",
                format!(
                    "must lie in [0, 1] to keep the covariance matrix PSD, got {}",
                    self.assumed_correlation
                ),
            ));
        }
        let band = &self.risk_band;
        if !band.min_std.is_finite() || !band.max_std.is_finite() || band.min_std < 0.0 {
            return Err(SpreadError::invalid(
                "config.risk_band",
                "band endpoints must be finite and non-negative",
            ));
        }
        if band.max_std <= band.min_std {
            return Err(SpreadError::invalid(
                "config.risk_band",
                format!(
                    "max_std ({}) must exceed min_std ({})",
                    band.max_std, band.min_std
                ),
            ));
        }
        if self.max_iterations == 0 {
            return Err(SpreadError::invalid(
                "config.max_iterations",
                "must be at least 1",
            ));
        }
        if !(self.tolerance > 0.0 && self.tolerance < 1e-3) {
            return Err(SpreadError::invalid(
                "config.tolerance",
                format!("must lie in (0, 1e-3), got {}", self.tolerance),
            ));
        }
        Ok(())
    }
}
