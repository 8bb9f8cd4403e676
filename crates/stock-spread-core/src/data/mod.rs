pub mod dataset;
pub mod request;
pub mod series;

pub use dataset::{AssetRecord, ChangeObservation, Dataset};
pub use request::{PortfolioRequest, PortfolioTarget, SelectedStock};
pub use series::{ChangeSeries, ChangeSeriesStore};

use serde::{Deserialize, Serialize};

use crate::error::SpreadError;
use crate::SpreadResult;

/// A request together with the dataset it refers to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationInput {
    pub request: PortfolioRequest,
    pub dataset: Dataset,
}

/// A selected asset with everything the optimizer needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub symbol: String,
    /// Floor as a fraction of the portfolio (0.10 = 10%).
    pub min_weight: f64,
    pub standard_deviation: f64,
    pub expected_return: f64,
}

/// Join the request's selection with the dataset.
///
/// Assets come back in dataset order. A selected symbol the dataset does not
/// contain is rejected rather than dropped.
pub fn resolve_assets(request: &PortfolioRequest, dataset: &Dataset) -> SpreadResult<Vec<Asset>> {
    for stock in &request.selected_stocks {
        if dataset.get(&stock.name).is_none() {
            return Err(SpreadError::invalid(
                "selected_stocks",
                format!("'{}' is not present in the dataset", stock.name),
            ));
        }
    }

    let mut assets = Vec::with_capacity(request.selected_stocks.len());
    for rec in dataset.records() {
        let Some(floor_pct) = request.minimum_weight_of(&rec.symbol) else {
            continue;
        };
        if !rec.standard_deviation.is_finite() || rec.standard_deviation < 0.0 {
            return Err(SpreadError::invalid(
                format!("dataset.{}.standard_deviation", rec.symbol),
                format!("must be finite and non-negative, got {}", rec.standard_deviation),
            ));
        }
        assets.push(Asset {
            symbol: rec.symbol.clone(),
            min_weight: floor_pct / 100.0,
            standard_deviation: rec.standard_deviation,
            expected_return: rec.expected_return.unwrap_or(0.0),
        });
    }

    if assets.is_empty() {
        return Err(SpreadError::InsufficientData(
            "no selected asset could be resolved against the dataset".into(),
        ));
    }
    Ok(assets)
}
