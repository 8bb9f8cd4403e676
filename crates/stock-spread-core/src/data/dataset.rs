use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::SpreadError;
use crate::SpreadResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One day of price-change history. `change` is absent for days the source
/// sheet left blank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeObservation {
    pub date: NaiveDate,
    #[serde(default)]
    pub change: Option<f64>,
}

/// A row of the source dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub symbol: String,
    pub standard_deviation: f64,
    #[serde(default)]
    pub expected_return: Option<f64>,
    /// `None` when the source had no history sheet for the symbol.
    #[serde(default)]
    pub change_data: Option<Vec<ChangeObservation>>,
}

/// The tabular dataset supplied alongside a request: one record per symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<AssetRecord>", into = "Vec<AssetRecord>")]
pub struct Dataset {
    records: Vec<AssetRecord>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

impl Dataset {
    pub fn new(records: Vec<AssetRecord>) -> SpreadResult<Self> {
        let mut seen = HashSet::with_capacity(records.len());
        for (i, rec) in records.iter().enumerate() {
            if rec.symbol.trim().is_empty() {
                return Err(SpreadError::invalid(
                    format!("dataset[{}].symbol", i),
                    "symbol must not be empty",
                ));
            }
            if !seen.insert(rec.symbol.as_str()) {
                return Err(SpreadError::invalid(
                    format!("dataset[{}].symbol", i),
                    format!("duplicate symbol '{}'", rec.symbol),
                ));
            }
        }
        Ok(Dataset { records })
    }

    /// Replace non-finite standard deviations and expected returns with zero,
    /// the same cleanup the ingestion layer applies to spreadsheet exports.
    pub fn sanitize(mut self) -> Self {
        for rec in &mut self.records {
            if !rec.standard_deviation.is_finite() {
                rec.standard_deviation = 0.0;
            }
            if let Some(er) = rec.expected_return {
                if !er.is_finite() {
                    rec.expected_return = Some(0.0);
                }
            }
        }
        self
    }

    pub fn records(&self) -> &[AssetRecord] {
        &self.records
    }

    pub fn get(&self, symbol: &str) -> Option<&AssetRecord> {
        self.records.iter().find(|r| r.symbol == symbol)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.symbol.as_str())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl TryFrom<Vec<AssetRecord>> for Dataset {
    type Error = SpreadError;

    fn try_from(records: Vec<AssetRecord>) -> Result<Self, Self::Error> {
        Dataset::new(records)
    }
}

impl From<Dataset> for Vec<AssetRecord> {
    fn from(dataset: Dataset) -> Self {
        dataset.records
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
