use std::collections::BTreeSet;

use chrono::NaiveDate;
use tracing::{debug, info};

use super::PairwiseMatrix;
use crate::data::{ChangeSeries, ChangeSeriesStore};

/// Sample covariance of two histories over the dates both contain.
///
/// `this` supplies the row values and `other` the column values. Returns the
/// covariance and the number of common dates, or `None` when fewer than two
/// dates overlap. Common dates are summed in calendar order, so both
/// directions of a pair give the same bits.
pub fn pair_covariance(this: &ChangeSeries, other: &ChangeSeries) -> Option<(f64, usize)> {
    let this_by_date = this.by_date();
    let other_by_date = other.by_date();

    let common: BTreeSet<NaiveDate> = other
        .observations()
        .iter()
        .map(|(date, _)| *date)
        .filter(|date| this_by_date.contains_key(date))
        .collect();

    let n = common.len();
    if n < 2 {
        return None;
    }

    let xs: Vec<f64> = common.iter().map(|d| this_by_date[d]).collect();
    let ys: Vec<f64> = common.iter().map(|d| other_by_date[d]).collect();
    let mean_x = xs.iter().sum::<f64>() / n as f64;
    let mean_y = ys.iter().sum::<f64>() / n as f64;
    let cov = xs
        .iter()
        .zip(ys.iter())
        .map(|(x, y)| (x - mean_x) * (y - mean_y))
        .sum::<f64>()
        / (n - 1) as f64;

    Some((cov, n))
}

/// Directed covariance matrix over every ordered pair of distinct assets.
///
/// Each cell `(row, col)` is computed on its own from the row asset's and the
/// column asset's stored series; `(col, row)` is never copied from it. The
/// diagonal is left undefined.
pub fn estimate_covariance(store: &ChangeSeriesStore) -> PairwiseMatrix {
    let symbols: Vec<String> = store.symbols().iter().map(|s| s.to_string()).collect();
    let mut matrix = PairwiseMatrix::undefined(symbols);

    for (i, (this_symbol, this_series)) in store.entries().iter().enumerate() {
        for (j, (other_symbol, other_series)) in store.entries().iter().enumerate() {
            if i == j {
                continue;
            }
            let (Some(this), Some(other)) = (this_series, other_series) else {
                continue;
            };
            match pair_covariance(this, other) {
                Some((cov, common)) => {
                    debug!(
                        "Covariance between {} and {}: {:.6} (using {} common dates)",
                        this_symbol, other_symbol, cov, common
                    );
                    matrix.set(i, j, Some(cov));
                }
                None => {
                    info!(
                        "Not enough common dates between {} and {}",
                        this_symbol, other_symbol
                    );
                }
            }
        }
    }

    matrix
}
