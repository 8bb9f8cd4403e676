use approx::assert_abs_diff_eq;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use stock_spread_core::allocation::optimize_portfolio;
use stock_spread_core::config::OptimizerConfig;
use stock_spread_core::data::AllocationInput;
use stock_spread_core::optimization::RiskTargetMapper;
use stock_spread_core::result::PortfolioResult;
use stock_spread_core::{ComputationOutput, SpreadError};

// ===========================================================================
// Fixtures
// ===========================================================================

fn two_stock_input(risk: f64, target: &str, floors: (f64, f64)) -> AllocationInput {
    serde_json::from_value(serde_json::json!({
        "request": {
            "risk_percentage": risk,
            "amount_of_stocks": 2,
            "money_to_invest": 5000,
            "selected_stocks": [
                { "name": "AAA", "minimum_weight": floors.0 },
                { "name": "BBB", "minimum_weight": floors.1 }
            ],
            "portfolio_target": target
        },
        "dataset": [
            {
                "symbol": "AAA",
                "standard_deviation": 0.02,
                "expected_return": 0.0008,
                "change_data": [
                    { "date": "2024-03-01", "change": 0.010 },
                    { "date": "2024-03-04", "change": -0.012 },
                    { "date": "2024-03-05", "change": 0.004 },
                    { "date": "2024-03-06", "change": 0.007 }
                ]
            },
            {
                "symbol": "BBB",
                "standard_deviation": 0.04,
                "expected_return": 0.0015,
                "change_data": [
                    { "date": "2024-03-01", "change": 0.021 },
                    { "date": "2024-03-04", "change": -0.030 },
                    { "date": "2024-03-05", "change": 0.002 },
                    { "date": "2024-03-06", "change": null }
                ]
            }
        ]
    }))
    .unwrap()
}

fn five_stock_input(risk: f64, target: &str) -> AllocationInput {
    let names = ["AAPL", "AMZN", "MSFT", "NVO", "KO"];
    let stds = [0.018, 0.024, 0.016, 0.015, 0.010];
    let returns = [0.0011, 0.0016, 0.0010, 0.0009, 0.0003];
    let dataset: Vec<serde_json::Value> = names
        .iter()
        .zip(stds.iter().zip(returns.iter()))
        .map(|(n, (s, r))| {
            serde_json::json!({
                "symbol": n,
                "standard_deviation": s,
                "expected_return": r,
            })
        })
        .collect();
    serde_json::from_value(serde_json::json!({
        "request": {
            "risk_percentage": risk,
            "amount_of_stocks": 5,
            "money_to_invest": 10000,
            "selected_stocks": [
                { "name": "KO", "minimum_weight": 5 },
                { "name": "AMZN", "minimum_weight": 10 },
                { "name": "AAPL", "minimum_weight": 0 },
                { "name": "NVO", "minimum_weight": 15 }
            ],
            "portfolio_target": target
        },
        "dataset": dataset
    }))
    .unwrap()
}

fn symbols(out: &ComputationOutput<PortfolioResult>) -> Vec<String> {
    out.result.portfolio.iter().map(|e| e.symbol.clone()).collect()
}

// ===========================================================================
// Portfolio properties
// ===========================================================================

#[test]
fn test_two_asset_min_variance_matches_closed_form() {
    // rho = 0.5: var_a = 0.0004, var_b = 0.0016, cov = 0.0004
    // w_a = (0.0016 - 0.0004) / (0.0004 + 0.0016 - 0.0008) = 1.0
    let out = optimize_portfolio(
        &two_stock_input(50.0, "min", (0.0, 0.0)),
        &OptimizerConfig::default(),
    )
    .unwrap();
    let r = &out.result;
    assert_abs_diff_eq!(r.portfolio[0].weight, 1.0, epsilon = 1e-4);
    assert_abs_diff_eq!(r.portfolio[1].weight, 0.0, epsilon = 1e-4);
    assert_abs_diff_eq!(r.portfolio_std, 0.02, epsilon = 1e-4);
    assert!((r.portfolio[0].investment - dec!(5000)).abs() < dec!(0.5));
    assert_eq!(r.risk_percentage, 50.0);
    assert!(!r.risk_adjusted);
}

#[test]
fn test_lowest_risk_is_adjusted_and_maps_back() {
    let out = optimize_portfolio(
        &two_stock_input(1.0, "min", (0.0, 0.0)),
        &OptimizerConfig::default(),
    )
    .unwrap();
    let r = &out.result;
    assert!(r.risk_adjusted);
    let mapper = RiskTargetMapper::default();
    assert_abs_diff_eq!(mapper.target_std(r.risk_percentage), r.portfolio_std, epsilon = 1e-9);
    // 1 + (0.02 - 0.003) * 99 / 0.057
    assert_abs_diff_eq!(r.risk_percentage, 1.0 + 0.017 * 99.0 / 0.057, epsilon = 1e-6);
}

#[test]
fn test_weights_sum_to_one_and_respect_floors() {
    for target in ["min", "max"] {
        for risk in [1.0, 20.0, 55.0, 100.0] {
            let input = five_stock_input(risk, target);
            let out = optimize_portfolio(&input, &OptimizerConfig::default()).unwrap();
            let total: f64 = out.result.portfolio.iter().map(|e| e.weight).sum();
            assert_abs_diff_eq!(total, 1.0, epsilon = 1e-6);
            for entry in &out.result.portfolio {
                let floor = input
                    .request
                    .selected_stocks
                    .iter()
                    .find(|s| s.name == entry.symbol)
                    .map(|s| s.minimum_weight / 100.0)
                    .unwrap();
                assert!(
                    entry.weight >= floor - 1e-6,
                    "{} {} {}: weight {} below floor {}",
                    target,
                    risk,
                    entry.symbol,
                    entry.weight,
                    floor
                );
            }
            let invested: Decimal = out.result.portfolio.iter().map(|e| e.investment).sum();
            assert!((invested - dec!(10000)).abs() < dec!(0.01));
        }
    }
}

#[test]
fn test_portfolio_keeps_dataset_order() {
    let out = optimize_portfolio(&five_stock_input(40.0, "min"), &OptimizerConfig::default())
        .unwrap();
    assert_eq!(symbols(&out), vec!["AAPL", "AMZN", "NVO", "KO"]);
}

#[test]
fn test_max_return_dominates_min_variance() {
    let config = OptimizerConfig::default();
    let min = optimize_portfolio(&five_stock_input(45.0, "min"), &config).unwrap();
    let max = optimize_portfolio(&five_stock_input(45.0, "max"), &config).unwrap();
    assert!(max.result.portfolio_return >= min.result.portfolio_return - 1e-12);
    let target = RiskTargetMapper::default().target_std(45.0);
    assert!(max.result.portfolio_std <= target * (1.0 + 1e-6));
}

#[test]
fn test_unknown_target_string_means_min_variance() {
    let config = OptimizerConfig::default();
    let min = optimize_portfolio(&five_stock_input(45.0, "min"), &config).unwrap();
    let other = optimize_portfolio(&five_stock_input(45.0, "balanced"), &config).unwrap();
    for (a, b) in min.result.portfolio.iter().zip(&other.result.portfolio) {
        assert_abs_diff_eq!(a.weight, b.weight, epsilon = 1e-12);
    }
}

#[test]
fn test_amount_mismatch_is_a_warning() {
    let out = optimize_portfolio(&five_stock_input(45.0, "min"), &OptimizerConfig::default())
        .unwrap();
    assert!(out.warnings.iter().any(|w| w.contains("amount_of_stocks")));
}

#[test]
fn test_diagnostics_ride_on_the_result() {
    let out = optimize_portfolio(
        &two_stock_input(50.0, "min", (0.0, 0.0)),
        &OptimizerConfig::default(),
    )
    .unwrap();
    let v = serde_json::to_value(&out).unwrap();
    assert!(v["result"]["diagnostics"]["covariance"].is_object());
    assert!(v["result"]["diagnostics"]["correlation"].is_object());
    assert!(v["assumptions"].get("pairwise_statistics").is_none());

    let stats = out.result.diagnostics.unwrap();
    assert_eq!(
        stats.covariance.get("AAA", "BBB"),
        stats.covariance.get("BBB", "AAA")
    );
}

// ===========================================================================
// Failures
// ===========================================================================

#[test]
fn test_floors_above_budget_are_invalid_input() {
    let err = optimize_portfolio(
        &two_stock_input(50.0, "max", (70.0, 40.0)),
        &OptimizerConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, SpreadError::InvalidInput { .. }));
    assert!(!err.is_optimization_failure());
}

#[test]
fn test_iteration_bound_surfaces_as_timeout() {
    let config = OptimizerConfig {
        max_iterations: 1,
        ..Default::default()
    };
    let err = optimize_portfolio(&five_stock_input(45.0, "min"), &config).unwrap_err();
    assert!(matches!(err, SpreadError::OptimizationTimeout { .. }));
    assert!(err.is_optimization_failure());
}

#[test]
fn test_risk_out_of_range_rejected() {
    for risk in [0.0, 100.5] {
        let err = optimize_portfolio(
            &two_stock_input(risk, "min", (0.0, 0.0)),
            &OptimizerConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SpreadError::InvalidInput { ref field, .. } if field == "risk_percentage"
        ));
    }
}

#[test]
fn test_unknown_symbol_rejected() {
    let mut input = two_stock_input(50.0, "min", (0.0, 0.0));
    input.request.selected_stocks[1].name = "ZZZ".into();
    let err = optimize_portfolio(&input, &OptimizerConfig::default()).unwrap_err();
    assert!(matches!(err, SpreadError::InvalidInput { .. }));
}
