use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use stock_spread_core::allocation::optimize_portfolio;
use stock_spread_core::config::OptimizerConfig;
use stock_spread_core::data::{AllocationInput, PortfolioTarget};

use crate::input;

/// Arguments for portfolio optimization
#[derive(Args)]
pub struct OptimizeArgs {
    /// Path to JSON file with `request` and `dataset`
    #[arg(long)]
    pub input: Option<String>,

    /// Override the request's risk percentage (1-100)
    #[arg(long)]
    pub risk_percentage: Option<f64>,

    /// Override the request's target: "max" for maximum return, anything else for minimum variance
    #[arg(long)]
    pub target: Option<String>,

    /// Override the amount to invest
    #[arg(long)]
    pub money_to_invest: Option<Decimal>,
}

pub fn run_optimize(
    args: OptimizeArgs,
    config: &OptimizerConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let mut alloc_input: AllocationInput =
        input::load_input(args.input.as_deref(), &input::ALLOCATION)?;

    if let Some(risk) = args.risk_percentage {
        alloc_input.request.risk_percentage = risk;
    }
    if let Some(target) = args.target {
        alloc_input.request.portfolio_target = PortfolioTarget::from(target);
    }
    if let Some(money) = args.money_to_invest {
        alloc_input.request.money_to_invest = money;
    }

    let result = optimize_portfolio(&alloc_input, config)?;
    Ok(serde_json::to_value(result)?)
}
