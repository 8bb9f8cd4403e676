use clap::Args;
use serde_json::Value;

use stock_spread_core::data::AllocationInput;
use stock_spread_core::estimation::two_asset::build_two_asset_portfolios;
use stock_spread_core::estimation::{analyze_pairwise, PairwiseInput};

use crate::input;

#[derive(Args)]
pub struct PairwiseArgs {
    /// Path to JSON file with `dataset` and optional `symbols`
    #[arg(long)]
    pub input: Option<String>,

    /// Comma-separated symbols to analyze (e.g. "AAPL,AMZN,NVO")
    #[arg(long, value_delimiter = ',')]
    pub symbols: Option<Vec<String>>,
}

#[derive(Args)]
pub struct TwoAssetArgs {
    /// Path to JSON file with `request` and `dataset`
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_pairwise(args: PairwiseArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut pairwise_input: PairwiseInput =
        input::load_input(args.input.as_deref(), &input::PAIRWISE)?;
    if args.symbols.is_some() {
        pairwise_input.symbols = args.symbols;
    }
    let result = analyze_pairwise(&pairwise_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_two_asset(args: TwoAssetArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let alloc_input: AllocationInput =
        input::load_input(args.input.as_deref(), &input::TWO_ASSET)?;
    let result = build_two_asset_portfolios(&alloc_input)?;
    Ok(serde_json::to_value(result)?)
}
