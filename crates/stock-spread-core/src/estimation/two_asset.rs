use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::warn;

use super::{estimate_pairwise, PairwiseMatrix};
use crate::data::{resolve_assets, AllocationInput, Asset, ChangeSeriesStore};
use crate::error::SpreadError;
use crate::types::{with_metadata, ComputationOutput, Money, Weight};
use crate::SpreadResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Closed-form minimum-variance split between two assets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwoAssetPortfolio {
    pub stock_a: String,
    pub weight_a: Weight,
    #[serde(with = "rust_decimal::serde::float")]
    pub investment_a: Money,
    pub stock_b: String,
    pub weight_b: Weight,
    #[serde(with = "rust_decimal::serde::float")]
    pub investment_b: Money,
    /// Empirical covariance the split was computed from.
    pub covariance: f64,
    pub portfolio_std: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwoAssetScreen {
    pub portfolios: Vec<TwoAssetPortfolio>,
    /// Pairs that produced no admissible portfolio.
    pub skipped_pairs: usize,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Minimum-variance two-asset portfolios for every pair of selected assets,
/// using the empirical pairwise covariance.
pub fn build_two_asset_portfolios(
    input: &AllocationInput,
) -> SpreadResult<ComputationOutput<TwoAssetScreen>> {
    let start = Instant::now();
    let mut warnings = input.request.validate()?;

    let dataset = input.dataset.clone().sanitize();
    let assets = resolve_assets(&input.request, &dataset)?;
    if assets.len() < 2 {
        return Err(SpreadError::InsufficientData(
            "two-asset screening needs at least two selected stocks".into(),
        ));
    }

    let symbols: Vec<&str> = assets.iter().map(|a| a.symbol.as_str()).collect();
    let store = ChangeSeriesStore::from_dataset(&dataset, &symbols);
    let stats = estimate_pairwise(&store);

    let (portfolios, skipped) =
        screen_pairs(&assets, &stats.covariance, input.request.money_to_invest)?;
    let skipped_pairs = skipped.len();
    warnings.extend(skipped);

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Two-asset Markowitz minimum variance: w_a = (var_b - cov) / (var_a + var_b - 2 cov)",
        &serde_json::json!({
            "n_assets": assets.len(),
            "n_pairs": assets.len() * (assets.len() - 1) / 2,
            "variance_source": "dataset standard_deviation",
            "covariance_source": "pairwise change history",
        }),
        warnings,
        elapsed,
        TwoAssetScreen {
            portfolios,
            skipped_pairs,
        },
    ))
}

/// Evaluate every unordered pair in asset order. Returns the admissible
/// portfolios and one message per skipped pair.
pub fn screen_pairs(
    assets: &[Asset],
    covariance: &PairwiseMatrix,
    money_to_invest: Money,
) -> SpreadResult<(Vec<TwoAssetPortfolio>, Vec<String>)> {
    let mut portfolios = Vec::new();
    let mut skipped = Vec::new();

    for (i, a) in assets.iter().enumerate() {
        for b in &assets[i + 1..] {
            let cov = covariance
                .get(&a.symbol, &b.symbol)
                .or_else(|| covariance.get(&b.symbol, &a.symbol));
            let Some(cov) = cov else {
                warn!("Missing covariance between {} and {}", a.symbol, b.symbol);
                skipped.push(format!("Missing covariance between {} and {}", a.symbol, b.symbol));
                continue;
            };

            let var_a = a.standard_deviation.powi(2);
            let var_b = b.standard_deviation.powi(2);
            let denom = var_a + var_b - 2.0 * cov;
            if denom == 0.0 {
                warn!("Zero denominator for {}, {}", a.symbol, b.symbol);
                skipped.push(format!("Zero denominator for {}, {}", a.symbol, b.symbol));
                continue;
            }

            let weight_a = (var_b - cov) / denom;
            let weight_b = 1.0 - weight_a;
            if !(0.0..=1.0).contains(&weight_a) || !(0.0..=1.0).contains(&weight_b) {
                warn!(
                    "Invalid weights {:.2}, {:.2} for {}, {}",
                    weight_a, weight_b, a.symbol, b.symbol
                );
                skipped.push(format!(
                    "Invalid weights {:.2}, {:.2} for {}, {}",
                    weight_a, weight_b, a.symbol, b.symbol
                ));
                continue;
            }

            let variance = weight_a.powi(2) * var_a
                + weight_b.powi(2) * var_b
                + 2.0 * weight_a * weight_b * cov;

            portfolios.push(TwoAssetPortfolio {
                stock_a: a.symbol.clone(),
                weight_a,
                investment_a: invest(weight_a, money_to_invest)?,
                stock_b: b.symbol.clone(),
                weight_b,
                investment_b: invest(weight_b, money_to_invest)?,
                covariance: cov,
                portfolio_std: variance.max(0.0).sqrt(),
            });
        }
    }

    Ok((portfolios, skipped))
}

fn invest(weight: Weight, money: Money) -> SpreadResult<Money> {
    let w = Money::from_f64(weight).ok_or_else(|| {
        SpreadError::invalid("weight", format!("{} cannot be expressed as money", weight))
    })?;
    Ok(w * money)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn asset(symbol: &str, std: f64) -> Asset {
        Asset {
            symbol: symbol.into(),
            min_weight: 0.0,
            standard_deviation: std,
            expected_return: 0.0,
        }
    }

    fn cov_matrix(entries: &[(usize, usize, f64)], n: usize) -> PairwiseMatrix {
        let symbols = ["A", "B", "C"][..n].iter().map(|s| s.to_string()).collect();
        let mut m = PairwiseMatrix::undefined(symbols);
        for (i, j, v) in entries {
            m.set(*i, *j, Some(*v));
        }
        m
    }

    #[test]
    fn test_closed_form_split() {
        let assets = vec![asset("A", 0.02), asset("B", 0.04)];
        let cov = cov_matrix(&[(0, 1, 0.0002), (1, 0, 0.0002)], 2);
        let (ports, skipped) = screen_pairs(&assets, &cov, dec!(1000)).unwrap();
        assert!(skipped.is_empty());
        let p = &ports[0];
        // denom = 0.0004 + 0.0016 - 0.0004 = 0.0016 ; w_a = 0.0014 / 0.0016
        assert!((p.weight_a - 0.875).abs() < 1e-12);
        assert!((p.weight_b - 0.125).abs() < 1e-12);
        assert_eq!(p.investment_a.round_dp(6), dec!(875));
        let var = 0.875f64.powi(2) * 0.0004
            + 0.125f64.powi(2) * 0.0016
            + 2.0 * 0.875 * 0.125 * 0.0002;
        assert!((p.portfolio_std - var.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_reverse_direction_fallback() {
        let assets = vec![asset("A", 0.02), asset("B", 0.04)];
        let cov = cov_matrix(&[(1, 0, 0.0002)], 2);
        let (ports, _) = screen_pairs(&assets, &cov, dec!(1000)).unwrap();
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].covariance, 0.0002);
    }

    #[test]
    fn test_missing_covariance_skipped() {
        let assets = vec![asset("A", 0.02), asset("B", 0.04)];
        let cov = cov_matrix(&[], 2);
        let (ports, skipped) = screen_pairs(&assets, &cov, dec!(1000)).unwrap();
        assert!(ports.is_empty());
        assert_eq!(skipped.len(), 1);
    }

    #[test]
    fn test_out_of_range_weights_skipped() {
        // Strong positive covariance pushes the low-vol asset above 100%.
        let assets = vec![asset("A", 0.02), asset("B", 0.04)];
        let cov = cov_matrix(&[(0, 1, 0.0007)], 2);
        let (ports, skipped) = screen_pairs(&assets, &cov, dec!(1000)).unwrap();
        assert!(ports.is_empty());
        assert!(skipped[0].starts_with("Invalid weights"));
    }

    #[test]
    fn test_zero_denominator_skipped() {
        let assets = vec![asset("A", 0.02), asset("B", 0.02)];
        let cov = cov_matrix(&[(0, 1, 0.02f64.powi(2))], 2);
        let (ports, skipped) = screen_pairs(&assets, &cov, dec!(1000)).unwrap();
        assert!(ports.is_empty());
        assert!(skipped[0].starts_with("Zero denominator"));
    }

    #[test]
    fn test_three_assets_give_three_pairs() {
        let assets = vec![asset("A", 0.02), asset("B", 0.03), asset("C", 0.04)];
        let cov = cov_matrix(&[(0, 1, 0.0001), (0, 2, 0.0001), (1, 2, 0.0001)], 3);
        let (ports, _) = screen_pairs(&assets, &cov, dec!(1000)).unwrap();
        let pairs: Vec<(&str, &str)> = ports
            .iter()
            .map(|p| (p.stock_a.as_str(), p.stock_b.as_str()))
            .collect();
        assert_eq!(pairs, vec![("A", "B"), ("A", "C"), ("B", "C")]);
    }
}
