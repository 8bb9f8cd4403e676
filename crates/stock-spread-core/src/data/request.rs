use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::SpreadError;
use crate::types::{Money, RiskPercentage};
use crate::SpreadResult;

/// A stock the caller wants in the portfolio, with its floor as a percentage (0-100).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedStock {
    pub name: String,
    #[serde(default)]
    pub minimum_weight: f64,
}

/// Optimization objective. The wire value `"max"` selects return maximization
/// under the volatility ceiling; every other string means minimum variance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PortfolioTarget {
    MaxReturn,
    #[default]
    MinVariance,
}

impl From<String> for PortfolioTarget {
    fn from(s: String) -> Self {
        PortfolioTarget::from(s.as_str())
    }
}

impl From<&str> for PortfolioTarget {
    fn from(s: &str) -> Self {
        if s == "max" {
            PortfolioTarget::MaxReturn
        } else {
            PortfolioTarget::MinVariance
        }
    }
}

impl From<PortfolioTarget> for String {
    fn from(t: PortfolioTarget) -> Self {
        match t {
            PortfolioTarget::MaxReturn => "max".into(),
            PortfolioTarget::MinVariance => "min".into(),
        }
    }
}

/// An allocation request as handed over by the service layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioRequest {
    pub risk_percentage: RiskPercentage,
    /// Informational only; the selection list is authoritative.
    #[serde(default)]
    pub amount_of_stocks: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub money_to_invest: Money,
    pub selected_stocks: Vec<SelectedStock>,
    #[serde(default)]
    pub portfolio_target: PortfolioTarget,
}

impl PortfolioRequest {
    /// Reject requests that cannot be optimized. Returns non-fatal warnings.
    pub fn validate(&self) -> SpreadResult<Vec<String>> {
        let mut warnings = Vec::new();

        if !self.risk_percentage.is_finite() || !(1.0..=100.0).contains(&self.risk_percentage) {
            return Err(SpreadError::invalid(
                "risk_percentage",
                format!("must lie in [1, 100], got {}", self.risk_percentage),
            ));
        }

        if self.money_to_invest <= Money::ZERO {
            return Err(SpreadError::invalid(
                "money_to_invest",
                format!("must be positive, got {}", self.money_to_invest),
            ));
        }

        if self.selected_stocks.is_empty() {
            return Err(SpreadError::invalid(
                "selected_stocks",
                "at least one stock must be selected",
            ));
        }

        let mut seen = HashSet::with_capacity(self.selected_stocks.len());
        let mut floor_total = 0.0;
        for (i, stock) in self.selected_stocks.iter().enumerate() {
            if !seen.insert(stock.name.as_str()) {
                return Err(SpreadError::invalid(
                    format!("selected_stocks[{}].name", i),
                    format!("'{}' selected more than once", stock.name),
                ));
            }
            let floor = stock.minimum_weight;
            if !floor.is_finite() || !(0.0..=100.0).contains(&floor) {
                return Err(SpreadError::invalid(
                    format!("selected_stocks[{}].minimum_weight", i),
                    format!("must lie in [0, 100], got {}", floor),
                ));
            }
            floor_total += floor;
        }

        // Small slack so floors like 33.3 + 33.3 + 33.4 are not rejected on rounding.
        if floor_total > 100.0 + 1e-9 {
            return Err(SpreadError::invalid(
                "selected_stocks.minimum_weight",
                format!("minimum weights sum to {}%, above 100%", floor_total),
            ));
        }

        if self.amount_of_stocks as usize != self.selected_stocks.len() {
            warnings.push(format!(
                "amount_of_stocks is {} but {} stocks were selected; using the selection",
                self.amount_of_stocks,
                self.selected_stocks.len()
            ));
        }

        Ok(warnings)
    }

    pub fn minimum_weight_of(&self, symbol: &str) -> Option<f64> {
        self.selected_stocks
            .iter()
            .find(|s| s.name == symbol)
            .map(|s| s.minimum_weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request(risk: f64, floors: &[(&str, f64)]) -> PortfolioRequest {
        PortfolioRequest {
            risk_percentage: risk,
            amount_of_stocks: floors.len() as u32,
            money_to_invest: dec!(5000),
            selected_stocks: floors
                .iter()
                .map(|(n, w)| SelectedStock {
                    name: (*n).into(),
                    minimum_weight: *w,
                })
                .collect(),
            portfolio_target: PortfolioTarget::MinVariance,
        }
    }

    #[test]
    fn test_target_parsing() {
        assert_eq!(PortfolioTarget::from("max"), PortfolioTarget::MaxReturn);
        assert_eq!(PortfolioTarget::from("min"), PortfolioTarget::MinVariance);
        assert_eq!(PortfolioTarget::from("MAX"), PortfolioTarget::MinVariance);
        assert_eq!(PortfolioTarget::from("anything"), PortfolioTarget::MinVariance);
    }

    #[test]
    fn test_valid_request_has_no_warnings() {
        let req = request(25.0, &[("AMZN", 10.0), ("NVO", 20.0)]);
        assert!(req.validate().unwrap().is_empty());
    }

    #[test]
    fn test_risk_out_of_range() {
        assert!(request(0.5, &[("AMZN", 0.0)]).validate().is_err());
        assert!(request(100.5, &[("AMZN", 0.0)]).validate().is_err());
        assert!(request(f64::NAN, &[("AMZN", 0.0)]).validate().is_err());
        assert!(request(1.0, &[("AMZN", 0.0)]).validate().is_ok());
        assert!(request(100.0, &[("AMZN", 0.0)]).validate().is_ok());
    }

    #[test]
    fn test_non_positive_money_rejected() {
        let mut req = request(25.0, &[("AMZN", 0.0)]);
        req.money_to_invest = Money::ZERO;
        let err = req.validate().unwrap_err();
        assert!(matches!(
            err,
            SpreadError::InvalidInput { ref field, .. } if field == "money_to_invest"
        ));
    }

    #[test]
    fn test_floors_above_hundred_rejected() {
        let req = request(25.0, &[("AMZN", 60.0), ("NVO", 50.0)]);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_floors_exactly_hundred_accepted() {
        let req = request(25.0, &[("A", 33.3), ("B", 33.3), ("C", 33.4)]);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_duplicate_selection_rejected() {
        let req = request(25.0, &[("AMZN", 0.0), ("AMZN", 0.0)]);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_amount_mismatch_is_warning() {
        let mut req = request(25.0, &[("AMZN", 0.0), ("NVO", 0.0)]);
        req.amount_of_stocks = 3;
        let warnings = req.validate().unwrap();
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_deserialize_wire_request() {
        let json = r#"{
            "risk_percentage": 25.0,
            "amount_of_stocks": 2,
            "money_to_invest": 5000.0,
            "selected_stocks": [{"name": "AMZN", "minimum_weight": 10},
                                {"name": "NVO", "minimum_weight": 0}],
            "portfolio_target": "max"
        }"#;
        let req: PortfolioRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.portfolio_target, PortfolioTarget::MaxReturn);
        assert_eq!(req.money_to_invest, dec!(5000));
        assert_eq!(req.minimum_weight_of("AMZN"), Some(10.0));
        assert_eq!(req.minimum_weight_of("MSFT"), None);
    }
}
