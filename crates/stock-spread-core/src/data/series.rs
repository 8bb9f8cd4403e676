use std::collections::HashMap;

use chrono::NaiveDate;

use super::dataset::Dataset;

/// An asset's change history with missing values removed. Order is the
/// source order; dates are neither sorted nor deduplicated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSeries {
    observations: Vec<(NaiveDate, f64)>,
}

impl ChangeSeries {
    /// Build from raw observations, dropping blank and non-finite changes.
    pub fn from_observations<I>(raw: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, Option<f64>)>,
    {
        let observations = raw
            .into_iter()
            .filter_map(|(date, change)| match change {
                Some(c) if c.is_finite() => Some((date, c)),
                _ => None,
            })
            .collect();
        ChangeSeries { observations }
    }

    pub fn observations(&self) -> &[(NaiveDate, f64)] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Date-keyed view. A later observation for a repeated date wins.
    pub fn by_date(&self) -> HashMap<NaiveDate, f64> {
        self.observations.iter().copied().collect()
    }

    /// Population standard deviation over every stored change.
    /// `None` for an empty series.
    pub fn population_std(&self) -> Option<f64> {
        if self.observations.is_empty() {
            return None;
        }
        let n = self.observations.len() as f64;
        let mean = self.observations.iter().map(|(_, c)| c).sum::<f64>() / n;
        let var = self
            .observations
            .iter()
            .map(|(_, c)| (c - mean).powi(2))
            .sum::<f64>()
            / n;
        Some(var.sqrt())
    }
}

/// Change histories for the assets of one request, in asset order.
/// An entry of `None` means the dataset carried no history for that symbol.
#[derive(Debug, Clone, Default)]
pub struct ChangeSeriesStore {
    entries: Vec<(String, Option<ChangeSeries>)>,
}

impl ChangeSeriesStore {
    pub fn new(entries: Vec<(String, Option<ChangeSeries>)>) -> Self {
        ChangeSeriesStore { entries }
    }

    /// Collect the histories of `symbols` from the dataset. Symbols the
    /// dataset does not know are stored as absent.
    pub fn from_dataset<S: AsRef<str>>(dataset: &Dataset, symbols: &[S]) -> Self {
        let entries = symbols
            .iter()
            .map(|s| {
                let symbol = s.as_ref();
                let series = dataset
                    .get(symbol)
                    .and_then(|rec| rec.change_data.as_ref())
                    .map(|history| {
                        ChangeSeries::from_observations(
                            history.iter().map(|obs| (obs.date, obs.change)),
                        )
                    });
                (symbol.to_string(), series)
            })
            .collect();
        ChangeSeriesStore { entries }
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.entries.iter().map(|(s, _)| s.as_str()).collect()
    }

    pub fn entries(&self) -> &[(String, Option<ChangeSeries>)] {
        &self.entries
    }

    pub fn get(&self, symbol: &str) -> Option<&ChangeSeries> {
        self.entries
            .iter()
            .find(|(s, _)| s == symbol)
            .and_then(|(_, series)| series.as_ref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::{AssetRecord, ChangeObservation};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    #[test]
    fn test_missing_values_dropped() {
        let s = ChangeSeries::from_observations(vec![
            (d(1), Some(0.01)),
            (d(2), None),
            (d(3), Some(f64::NAN)),
            (d(4), Some(-0.02)),
        ]);
        assert_eq!(s.len(), 2);
        assert_eq!(s.observations()[1], (d(4), -0.02));
    }

    #[test]
    fn test_by_date_later_duplicate_wins() {
        let s = ChangeSeries::from_observations(vec![(d(1), Some(0.01)), (d(1), Some(0.05))]);
        assert_eq!(s.len(), 2);
        assert_eq!(s.by_date().get(&d(1)), Some(&0.05));
    }

    #[test]
    fn test_population_std() {
        let s = ChangeSeries::from_observations(vec![
            (d(1), Some(2.0)),
            (d(2), Some(4.0)),
            (d(3), Some(4.0)),
            (d(4), Some(4.0)),
            (d(5), Some(5.0)),
            (d(6), Some(5.0)),
            (d(7), Some(7.0)),
            (d(8), Some(9.0)),
        ]);
        assert!((s.population_std().unwrap() - 2.0).abs() < 1e-12);
        assert_eq!(ChangeSeries::default().population_std(), None);
    }

    #[test]
    fn test_store_marks_absent_history() {
        let ds = Dataset::new(vec![
            AssetRecord {
                symbol: "AMZN".into(),
                standard_deviation: 0.02,
                expected_return: None,
                change_data: Some(vec![ChangeObservation {
                    date: d(1),
                    change: Some(0.01),
                }]),
            },
            AssetRecord {
                symbol: "NVO".into(),
                standard_deviation: 0.02,
                expected_return: None,
                change_data: None,
            },
        ])
        .unwrap();
        let store = ChangeSeriesStore::from_dataset(&ds, &["NVO", "AMZN"]);
        assert_eq!(store.symbols(), vec!["NVO", "AMZN"]);
        assert!(store.get("NVO").is_none());
        assert_eq!(store.get("AMZN").unwrap().len(), 1);
    }
}
