use std::time::Instant;

use tracing::debug;

use crate::config::OptimizerConfig;
use crate::data::{resolve_assets, AllocationInput, ChangeSeriesStore, PortfolioTarget};
use crate::estimation::estimate_pairwise;
use crate::optimization::PortfolioOptimizer;
use crate::result::{assemble_result, PortfolioResult};
use crate::types::{with_metadata, ComputationOutput};
use crate::SpreadResult;

/// Build a risk-targeted long-only allocation for a request.
///
/// Validates the request and configuration, estimates the pairwise
/// diagnostics from the change histories, runs the two-stage optimizer on the
/// assumed-correlation covariance model and prices the weights.
pub fn optimize_portfolio(
    input: &AllocationInput,
    config: &OptimizerConfig,
) -> SpreadResult<ComputationOutput<PortfolioResult>> {
    let start = Instant::now();
    config.validate()?;
    let request = &input.request;
    let mut warnings = request.validate()?;

    let dataset = input.dataset.clone().sanitize();
    let assets = resolve_assets(request, &dataset)?;
    let symbols: Vec<&str> = assets.iter().map(|a| a.symbol.as_str()).collect();

    // Diagnostics only: the optimizer does not read them.
    let store = ChangeSeriesStore::from_dataset(&dataset, &symbols);
    let stats = estimate_pairwise(&store);
    warnings.extend(stats.warnings());

    let optimizer = PortfolioOptimizer::new(config);
    let optimized =
        optimizer.optimize(&assets, request.portfolio_target, request.risk_percentage)?;
    debug!(
        "Optimized {} assets in {} solver iterations",
        assets.len(),
        optimized.iterations
    );

    if optimized.risk_adjusted {
        warnings.push(format!(
            "Requested risk {} maps to std {:.6}, below the minimum achievable {:.6}; \
             risk raised to {:.4}",
            request.risk_percentage,
            optimizer.mapper().target_std(request.risk_percentage),
            optimized.min_achievable_std,
            optimized.risk_percentage
        ));
    }
    if assets.iter().all(|a| a.expected_return == 0.0)
        && request.portfolio_target == PortfolioTarget::MaxReturn
    {
        warnings.push(
            "No selected asset has an expected return; max-return falls back to minimum variance"
                .into(),
        );
    }

    let mut result = assemble_result(&assets, &optimized, request.money_to_invest)?;
    result.diagnostics = Some(stats);

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Two-stage long-only Markowitz: minimum variance, then the requested target \
         under a volatility ceiling mapped from the 1-100 risk scale",
        &serde_json::json!({
            "target": request.portfolio_target,
            "assumed_correlation": config.assumed_correlation,
            "risk_band": config.risk_band,
            "target_std": optimized.target_std,
            "min_achievable_std": optimized.min_achievable_std,
            "solver": "primal active-set, budget equality and floor bounds",
            "solver_iterations": optimized.iterations,
            "n_assets": assets.len(),
        }),
        warnings,
        elapsed,
        result,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
