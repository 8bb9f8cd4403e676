use super::PairwiseMatrix;
use crate::data::ChangeSeriesStore;

/// Pearson correlation derived from a directed covariance matrix.
///
/// Each asset's standard deviation is the population std of its own stored
/// history. A cell is undefined when its covariance is undefined or either
/// std is missing, zero, or non-finite.
pub fn estimate_correlation(
    covariance: &PairwiseMatrix,
    store: &ChangeSeriesStore,
) -> PairwiseMatrix {
    let stds: Vec<Option<f64>> = covariance
        .symbols()
        .iter()
        .map(|s| store.get(s).and_then(|series| series.population_std()))
        .collect();

    let mut matrix = PairwiseMatrix::undefined(covariance.symbols().to_vec());
    let n = stds.len();
    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            matrix.set(i, j, correlation(covariance.at(i, j), stds[i], stds[j]));
        }
    }
    matrix
}

/// `cov / (std_a * std_b)` when every input is usable.
pub fn correlation(cov: Option<f64>, std_a: Option<f64>, std_b: Option<f64>) -> Option<f64> {
    let (cov, a, b) = (cov?, std_a?, std_b?);
    if !cov.is_finite() || !a.is_finite() || !b.is_finite() || a <= 0.0 || b <= 0.0 {
        return None;
    }
    Some(cov / (a * b))
}
