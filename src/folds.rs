use std::ops::Range;

use crate::{GridErr, Result};

/// One expanding-window split: train on `train`, validate on the samples right after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub train: Range<usize>,
    pub validation: Range<usize>,
}

/// Splits `n` ordered samples into `k` expanding-window folds.
///
/// The validation windows are `n / (k + 1)` samples long and tile the end of the series; every
/// train range starts at zero and ends where its validation window begins.
///
/// # Arguments
/// * `n` - The amount of samples of the series.
/// * `k` - The amount of folds.
///
/// # Returns
/// The folds in order or an error if `k < 2` or the series is too short for `k` folds.
pub fn time_series_split(n: usize, k: usize) -> Result<Vec<Fold>> {
    if k < 2 {
        return Err(GridErr::InvalidConfig(format!(
            "at least 2 folds are required, got {k}"
        )));
    }

    if k + 1 > n {
        return Err(GridErr::InvalidConfig(format!(
            "cannot split {n} samples into {k} folds"
        )));
    }

    let test_size = n / (k + 1);
    let first = n - k * test_size;

    let folds = (0..k)
        .map(|i| {
            let start = first + i * test_size;
            Fold {
                train: 0..start,
                validation: start..start + test_size,
            }
        })
        .collect();

    Ok(folds)
}
