use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Serialize};

use crate::data::Asset;
use crate::error::SpreadError;
use crate::estimation::PairwiseStatistics;
use crate::optimization::OptimizedPortfolio;
use crate::types::{Money, RiskPercentage, Weight};
use crate::SpreadResult;

/// One line of the allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioEntry {
    pub symbol: String,
    pub weight: Weight,
    #[serde(with = "rust_decimal::serde::float")]
    pub investment: Money,
    pub expected_return: f64,
}

/// Allocation returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioResult {
    pub portfolio: Vec<PortfolioEntry>,
    pub portfolio_std: f64,
    pub portfolio_return: f64,
    /// The risk percentage actually targeted.
    pub risk_percentage: RiskPercentage,
    /// True when the requested risk was raised to the minimum achievable.
    pub risk_adjusted: bool,
    /// Empirical pairwise statistics of the selected assets' histories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<PairwiseStatistics>,
}

/// Pair optimized weights with their assets and price them against
/// `money_to_invest`. Entries keep the asset order; `diagnostics` is left
/// for the caller to attach.
pub fn assemble_result(
    assets: &[Asset],
    optimized: &OptimizedPortfolio,
    money_to_invest: Money,
) -> SpreadResult<PortfolioResult> {
    if assets.len() != optimized.weights.len() {
        return Err(SpreadError::invalid(
            "weights",
            format!(
                "{} weights for {} assets",
                optimized.weights.len(),
                assets.len()
            ),
        ));
    }

    let portfolio = assets
        .iter()
        .zip(&optimized.weights)
        .map(|(asset, &weight)| {
            // Solver round-off can leave a weight a hair under its floor.
            let weight = weight.max(asset.min_weight);
            let share = Money::from_f64(weight).ok_or_else(|| {
                SpreadError::invalid(
                    format!("weights.{}", asset.symbol),
                    format!("{} cannot be expressed as money", weight),
                )
            })?;
            Ok(PortfolioEntry {
                symbol: asset.symbol.clone(),
                weight,
                investment: share * money_to_invest,
                expected_return: asset.expected_return,
            })
        })
        .collect::<SpreadResult<Vec<_>>>()?;

    Ok(PortfolioResult {
        portfolio,
        portfolio_std: optimized.portfolio_std,
        portfolio_return: optimized.portfolio_return,
        risk_percentage: optimized.risk_percentage,
        risk_adjusted: optimized.risk_adjusted,
        diagnostics: None,
    })
}
