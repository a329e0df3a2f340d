use log::warn;
use serde::Serialize;

use crate::{
    GridErr, Result,
    config::{HyperParams, RunningMode},
};

/// The amount of combinations kept when running in test mode.
pub const TEST_MODE_LIMIT: usize = 10;

/// One concrete assignment of values to every hyperparameter.
///
/// `index` is the position of the combination in the generated sequence and its only identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Combination {
    pub index: usize,
    pub filter_num1: usize,
    pub filter_num2: usize,
    pub num_of_dense: usize,
    pub dense_len1: usize,
    pub dense_len2: usize,
}

/// Enumerates the cartesian product of the hyperparameter ranges.
///
/// The order is the nested iteration order of `filter_num1`, `filter_num2`, `num_of_dense`,
/// `dense_len1` and `dense_len2`, outermost first.
///
/// # Arguments
/// * `hp` - The hyperparameter ranges.
/// * `mode` - `Test` keeps only the first `TEST_MODE_LIMIT` combinations.
///
/// # Returns
/// The ordered combinations or an error if any range is empty.
pub fn combinations(hp: &HyperParams, mode: RunningMode) -> Result<Vec<Combination>> {
    for (name, range) in hp.ranges() {
        if range.is_empty() {
            return Err(GridErr::EmptyRange(name));
        }
    }

    let limit = match mode {
        RunningMode::Full => usize::MAX,
        RunningMode::Test => {
            let total = match hp.grid_len() {
                Some(len) => len.to_string(),
                None => "more than usize::MAX".to_string(),
            };
            warn!(
                "running in test mode, only the first {TEST_MODE_LIMIT} of {total} combinations are used"
            );
            TEST_MODE_LIMIT
        }
    };

    let product = hp.filter_num1.iter().flat_map(|&f1| {
        hp.filter_num2.iter().flat_map(move |&f2| {
            hp.num_of_dense.iter().flat_map(move |&n| {
                hp.dense_len1.iter().flat_map(move |&d1| {
                    hp.dense_len2.iter().map(move |&d2| (f1, f2, n, d1, d2))
                })
            })
        })
    });

    let combinations = product
        .take(limit)
        .enumerate()
        .map(
            |(index, (filter_num1, filter_num2, num_of_dense, dense_len1, dense_len2))| {
                Combination {
                    index,
                    filter_num1,
                    filter_num2,
                    num_of_dense,
                    dense_len1,
                    dense_len2,
                }
            },
        )
        .collect();

    Ok(combinations)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hp(filter_num1: Vec<usize>, dense_len2: Vec<usize>) -> HyperParams {
        HyperParams {
            filter_num1,
            filter_num2: vec![2, 4],
            num_of_dense: vec![1],
            dense_len1: vec![16],
            dense_len2,
        }
    }

    #[test]
    fn full_mode_is_the_whole_product() {
        let hp = hp(vec![4, 8, 16], vec![8, 16]);
        let combinations = combinations(&hp, RunningMode::Full).unwrap();

        assert_eq!(combinations.len(), 3 * 2 * 2);
        assert!(combinations.iter().enumerate().all(|(i, c)| c.index == i));
    }

    #[test]
    fn outermost_range_varies_slowest() {
        let hp = hp(vec![4, 8], vec![8, 16]);
        let combinations = combinations(&hp, RunningMode::Full).unwrap();

        let firsts: Vec<_> = combinations.iter().map(|c| c.filter_num1).collect();
        let lasts: Vec<_> = combinations.iter().map(|c| c.dense_len2).collect();
        assert_eq!(firsts, [4, 4, 4, 4, 8, 8, 8, 8]);
        assert_eq!(lasts, [8, 16, 8, 16, 8, 16, 8, 16]);
    }

    #[test]
    fn test_mode_truncates_to_ten() {
        let hp = hp((1..=5).collect(), (1..=5).collect());
        assert_eq!(hp.grid_len(), Some(50));

        let combinations = combinations(&hp, RunningMode::Test).unwrap();
        assert_eq!(combinations.len(), TEST_MODE_LIMIT);
        assert_eq!(combinations[9].index, 9);
    }

    #[test]
    fn test_mode_handles_grids_larger_than_usize() {
        let range: Vec<usize> = (1..=10_000).collect();
        let hp = HyperParams {
            filter_num1: range.clone(),
            filter_num2: range.clone(),
            num_of_dense: range.clone(),
            dense_len1: range.clone(),
            dense_len2: range,
        };
        assert_eq!(hp.grid_len(), None);

        let combinations = combinations(&hp, RunningMode::Test).unwrap();
        assert_eq!(combinations.len(), TEST_MODE_LIMIT);
        assert_eq!(combinations[9].dense_len2, 10);
    }

    #[test]
    fn test_mode_keeps_small_grids() {
        let hp = hp(vec![4], vec![8]);
        let combinations = combinations(&hp, RunningMode::Test).unwrap();
        assert_eq!(combinations.len(), 2);
    }

    #[test]
    fn empty_range_fails() {
        let hp = hp(vec![4], Vec::new());
        assert!(matches!(
            combinations(&hp, RunningMode::Full),
            Err(GridErr::EmptyRange("dense_len2"))
        ));
    }
}
