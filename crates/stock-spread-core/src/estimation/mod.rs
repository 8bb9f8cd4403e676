pub mod correlation;
pub mod covariance;
#[cfg(feature = "two_asset")]
pub mod two_asset;

use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::data::{ChangeSeriesStore, Dataset};
use crate::error::SpreadError;
use crate::types::{with_metadata, ComputationOutput};
use crate::SpreadResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Square matrix of optional statistics keyed by an ordered pair of symbols.
/// `values[i][j]` is the statistic of `symbols[i]` against `symbols[j]`;
/// `None` marks an undefined value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairwiseMatrix {
    symbols: Vec<String>,
    values: Vec<Vec<Option<f64>>>,
}

/// Diagnostic pairwise statistics for a set of assets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairwiseStatistics {
    pub covariance: PairwiseMatrix,
    pub correlation: PairwiseMatrix,
}

/// Input to a standalone pairwise analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairwiseInput {
    pub dataset: Dataset,
    /// Symbols to analyze; every dataset symbol when omitted.
    #[serde(default)]
    pub symbols: Option<Vec<String>>,
}

// ---------------------------------------------------------------------------
// PairwiseMatrix
// ---------------------------------------------------------------------------

impl PairwiseMatrix {
    /// A matrix with every cell undefined.
    pub fn undefined(symbols: Vec<String>) -> Self {
        let n = symbols.len();
        PairwiseMatrix {
            symbols,
            values: vec![vec![None; n]; n],
        }
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn at(&self, row: usize, col: usize) -> Option<f64> {
        self.values.get(row).and_then(|r| r.get(col)).copied().flatten()
    }

    pub fn get(&self, row: &str, col: &str) -> Option<f64> {
        let i = self.index_of(row)?;
        let j = self.index_of(col)?;
        self.at(i, j)
    }

    pub(crate) fn set(&mut self, row: usize, col: usize, value: Option<f64>) {
        self.values[row][col] = value;
    }

    pub fn index_of(&self, symbol: &str) -> Option<usize> {
        self.symbols.iter().position(|s| s == symbol)
    }

    /// Off-diagonal ordered pairs without a value.
    pub fn undefined_pairs(&self) -> Vec<(&str, &str)> {
        let n = self.symbols.len();
        let mut out = Vec::new();
        for i in 0..n {
            for j in 0..n {
                if i != j && self.at(i, j).is_none() {
                    out.push((self.symbols[i].as_str(), self.symbols[j].as_str()));
                }
            }
        }
        out
    }

    /// Unordered pairs whose two directions disagree by more than `tolerance`,
    /// including pairs defined in one direction only.
    pub fn asymmetric_pairs(&self, tolerance: f64) -> Vec<(&str, &str)> {
        let n = self.symbols.len();
        let mut out = Vec::new();
        for i in 0..n {
            for j in (i + 1)..n {
                let differs = match (self.at(i, j), self.at(j, i)) {
                    (Some(a), Some(b)) => (a - b).abs() > tolerance,
                    (None, None) => false,
                    _ => true,
                };
                if differs {
                    out.push((self.symbols[i].as_str(), self.symbols[j].as_str()));
                }
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run the covariance and correlation estimators over a store.
pub fn estimate_pairwise(store: &ChangeSeriesStore) -> PairwiseStatistics {
    let covariance = covariance::estimate_covariance(store);
    let correlation = correlation::estimate_correlation(&covariance, store);
    PairwiseStatistics {
        covariance,
        correlation,
    }
}

impl PairwiseStatistics {
    /// Human-readable notes about undefined or asymmetric cells.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let undefined = self.covariance.undefined_pairs();
        if !undefined.is_empty() {
            let listed: Vec<String> = undefined
                .iter()
                .map(|(a, b)| format!("{}/{}", a, b))
                .collect();
            warnings.push(format!(
                "Covariance undefined for {} ordered pair(s): {}",
                undefined.len(),
                listed.join(", ")
            ));
        }
        for (a, b) in self.covariance.asymmetric_pairs(1e-12) {
            warnings.push(format!(
                "Covariance of {} vs {} differs between directions",
                a, b
            ));
        }
        warnings
    }
}

/// Pairwise covariance and correlation diagnostics for a dataset.
pub fn analyze_pairwise(
    input: &PairwiseInput,
) -> SpreadResult<ComputationOutput<PairwiseStatistics>> {
    let start = Instant::now();
    let dataset = input.dataset.clone().sanitize();

    let symbols: Vec<String> = match &input.symbols {
        Some(list) => {
            for s in list {
                if dataset.get(s).is_none() {
                    return Err(SpreadError::invalid(
                        "symbols",
                        format!("'{}' is not present in the dataset", s),
                    ));
                }
            }
            list.clone()
        }
        None => dataset.symbols().map(String::from).collect(),
    };
    if symbols.len() < 2 {
        return Err(SpreadError::InsufficientData(
            "pairwise analysis needs at least two symbols".into(),
        ));
    }

    let store = ChangeSeriesStore::from_dataset(&dataset, &symbols);
    let stats = estimate_pairwise(&store);
    let warnings = stats.warnings();

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Pairwise sample covariance over common dates; correlation over population std",
        &serde_json::json!({
            "n_assets": symbols.len(),
            "covariance_denominator": "n - 1",
            "std_denominator": "n",
        }),
        warnings,
        elapsed,
        stats,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
