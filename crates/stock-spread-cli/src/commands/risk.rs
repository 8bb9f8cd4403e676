use clap::Args;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use stock_spread_core::config::OptimizerConfig;
use stock_spread_core::optimization::RiskTargetMapper;

/// Arguments for the risk scale mapping. Give exactly one direction.
#[derive(Args)]
pub struct RiskTargetArgs {
    /// Risk percentage (1-100) to map to a target standard deviation
    #[arg(long, conflicts_with = "std", required_unless_present = "std")]
    pub risk_percentage: Option<f64>,

    /// Standard deviation to map back onto the risk scale
    #[arg(long)]
    pub std: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RiskTargetOutput {
    risk_percentage: f64,
    target_std: f64,
    band_min_std: f64,
    band_max_std: f64,
    /// False when the pair lies outside the 1-100 scale.
    within_band: bool,
}

pub fn run_risk_target(
    args: RiskTargetArgs,
    config: &OptimizerConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let mapper = RiskTargetMapper::new(config.risk_band);

    let (risk_percentage, target_std) = match (args.risk_percentage, args.std) {
        (Some(risk), _) => (risk, mapper.target_std(risk)),
        (None, Some(std)) => (mapper.risk_percentage(std), std),
        (None, None) => return Err("--risk-percentage or --std required".into()),
    };
    if !risk_percentage.is_finite() || !target_std.is_finite() {
        return Err("risk mapping inputs must be finite".into());
    }

    let output = RiskTargetOutput {
        risk_percentage,
        target_std,
        band_min_std: config.risk_band.min_std,
        band_max_std: config.risk_band.max_std,
        within_band: (1.0..=100.0).contains(&risk_percentage),
    };
    Ok(serde_json::to_value(output)?)
}
