use std::path::Path;

use log::info;
use machine_learning::{
    Series,
    arch::metrics::LOSS,
    training::{Callback, FitOptions, History},
};
use rayon::{ThreadPool, prelude::*};

use crate::{
    GridErr, Result,
    config::FoldPolicy,
    factory::Trainable,
    folds::{Fold, time_series_split},
    partition::{Partition, model_index},
};

/// Trains models with expanding-window cross-validation over a series.
#[derive(Debug, Clone)]
pub struct CrossValidator {
    folds: Vec<Fold>,
    options: FitOptions,
    policy: FoldPolicy,
}

impl CrossValidator {
    /// Creates a new `CrossValidator`, splitting the series once for every model it trains.
    ///
    /// # Arguments
    /// * `series_len` - The amount of samples of the series.
    /// * `folds` - The amount of folds.
    /// * `options` - The epochs and batch size of every fit.
    /// * `policy` - Which fold histories are reported.
    ///
    /// # Returns
    /// An error if the series can't be split in `folds` folds.
    pub fn new(
        series_len: usize,
        folds: usize,
        options: FitOptions,
        policy: FoldPolicy,
    ) -> Result<Self> {
        Ok(Self {
            folds: time_series_split(series_len, folds)?,
            options,
            policy,
        })
    }

    pub fn folds(&self) -> &[Fold] {
        &self.folds
    }

    /// Fits `model` on every fold in order.
    ///
    /// The model keeps training across folds, so every fold starts from the weights the previous
    /// one left.
    ///
    /// # Arguments
    /// * `model` - The model to train.
    /// * `index` - The global index of the model, used to report failures.
    /// * `series` - The whole input series.
    /// * `callbacks` - The callbacks given to every fit.
    ///
    /// # Returns
    /// The history selected by the fold policy, or the first fit failure.
    pub fn train_model<M: Trainable>(
        &self,
        model: &mut M,
        index: usize,
        series: &Series,
        callbacks: &mut [Box<dyn Callback>],
    ) -> Result<History> {
        let training = |source| GridErr::Training {
            model: index,
            source,
        };

        let mut histories = Vec::with_capacity(self.folds.len());
        for fold in &self.folds {
            let train = series.slice(fold.train.clone()).map_err(training)?;
            let validation = series.slice(fold.validation.clone()).map_err(training)?;

            let history = model
                .fit(train, Some(validation), self.options, callbacks)
                .map_err(training)?;
            histories.push(history);
        }

        let history = match self.policy {
            FoldPolicy::LastFold => histories.pop().unwrap_or_default(),
            FoldPolicy::MeanOfFolds => History::mean_of(&histories),
        };

        Ok(history)
    }

    /// Trains and saves every model of a partition.
    ///
    /// Models are written to `dir` as `model_<index>.<ext>` and dropped right after. With a thread
    /// pool the models are trained concurrently, each one with its own copy of the callbacks.
    ///
    /// # Arguments
    /// * `partition` - The batch to train.
    /// * `partition_length` - The configured batch size, used to compute model indices.
    /// * `series` - The whole input series.
    /// * `callbacks` - The callbacks every model gets a copy of.
    /// * `dir` - The directory models are saved into.
    /// * `pool` - An optional local thread pool.
    ///
    /// # Returns
    /// The `(model index, history)` pairs in model index order, or the first failure. A partition
    /// whose key doesn't match `partition_length` is rejected before any model is trained.
    pub fn train_partition<M: Trainable>(
        &self,
        partition: Partition<M>,
        partition_length: usize,
        series: &Series,
        callbacks: &[Box<dyn Callback>],
        dir: &Path,
        pool: Option<&ThreadPool>,
    ) -> Result<Vec<(usize, History)>> {
        partition.check(partition_length)?;
        let key = partition.key;
        let train_one = |position: usize, mut model: M| -> Result<(usize, History)> {
            let index = model_index(position, key, partition_length);
            let mut callbacks: Vec<Box<dyn Callback>> = callbacks.to_vec();

            let history = self.train_model(&mut model, index, series, &mut callbacks)?;

            let path = dir.join(format!("model_{index}.{}", M::FILE_EXTENSION));
            model
                .save(&path)
                .map_err(|source| GridErr::SaveModel { path, source })?;

            let loss = history.get(LOSS).and_then(|l| l.last()).copied();
            info!("model {index} trained, final loss {loss:?}");
            Ok((index, history))
        };

        match pool {
            Some(pool) => pool.install(|| {
                partition
                    .items
                    .into_par_iter()
                    .enumerate()
                    .map(|(position, model)| train_one(position, model))
                    .collect()
            }),
            None => partition
                .items
                .into_iter()
                .enumerate()
                .map(|(position, model)| train_one(position, model))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use machine_learning::{MlErr, SeriesView};
    use ndarray::{Array2, Array3};
    use rayon::ThreadPoolBuilder;

    use super::*;

    /// Reports the train length of every fit as its loss.
    #[derive(Debug, Default)]
    struct Recorder {
        fits: Vec<(usize, usize)>,
        fail: bool,
    }

    impl Trainable for Recorder {
        const FILE_EXTENSION: &'static str = "txt";

        fn fit(
            &mut self,
            train: SeriesView,
            validation: Option<SeriesView>,
            options: FitOptions,
            _callbacks: &mut [Box<dyn Callback>],
        ) -> machine_learning::Result<History> {
            if self.fail {
                return Err(MlErr::NonFinite {
                    epoch: 1,
                    metric: LOSS.to_string(),
                });
            }

            let val_len = validation.map(|v| v.len()).unwrap_or_default();
            self.fits.push((train.len(), val_len));

            let mut history = History::new();
            for _ in 0..options.epochs {
                history.push_epoch([(LOSS, train.len() as f64)]);
            }
            Ok(history)
        }

        fn save(&self, path: &Path) -> machine_learning::Result<()> {
            fs::write(path, format!("{:?}", self.fits))?;
            Ok(())
        }
    }

    fn series(n: usize) -> Series {
        Series::new(Array3::zeros((n, 4, 1)), Array2::ones((n, 1))).unwrap()
    }

    fn validator(policy: FoldPolicy) -> CrossValidator {
        CrossValidator::new(12, 3, FitOptions::new(2, 4), policy).unwrap()
    }

    #[test]
    fn fits_every_fold_in_order() {
        let mut model = Recorder::default();
        validator(FoldPolicy::LastFold)
            .train_model(&mut model, 0, &series(12), &mut [])
            .unwrap();

        assert_eq!(model.fits, [(3, 3), (6, 3), (9, 3)]);
    }

    #[test]
    fn last_fold_policy_keeps_only_the_last_history() {
        let mut model = Recorder::default();
        let history = validator(FoldPolicy::LastFold)
            .train_model(&mut model, 0, &series(12), &mut [])
            .unwrap();

        assert_eq!(history.get(LOSS), Some(&[9., 9.][..]));
    }

    #[test]
    fn mean_policy_averages_folds() {
        let mut model = Recorder::default();
        let history = validator(FoldPolicy::MeanOfFolds)
            .train_model(&mut model, 0, &series(12), &mut [])
            .unwrap();

        assert_eq!(history.get(LOSS), Some(&[6., 6.][..]));
    }

    #[test]
    fn failure_names_the_model() {
        let mut model = Recorder {
            fail: true,
            ..Default::default()
        };

        let err = validator(FoldPolicy::LastFold)
            .train_model(&mut model, 42, &series(12), &mut [])
            .unwrap_err();
        assert!(matches!(err, GridErr::Training { model: 42, .. }));
    }

    #[test]
    fn partition_models_are_saved_by_global_index() {
        let dir = tempfile::tempdir().unwrap();
        let partition = Partition {
            key: 20,
            items: vec![Recorder::default(), Recorder::default()],
        };

        let histories = validator(FoldPolicy::LastFold)
            .train_partition(partition, 10, &series(12), &[], dir.path(), None)
            .unwrap();

        let indices: Vec<_> = histories.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, [10, 11]);
        assert!(dir.path().join("model_10.txt").is_file());
        assert!(dir.path().join("model_11.txt").is_file());
    }

    #[test]
    fn thread_pool_preserves_model_order() {
        let dir = tempfile::tempdir().unwrap();
        let pool = ThreadPoolBuilder::new().num_threads(3).build().unwrap();
        let partition = Partition {
            key: 8,
            items: (0..8).map(|_| Recorder::default()).collect(),
        };

        let histories = validator(FoldPolicy::LastFold)
            .train_partition(partition, 8, &series(12), &[], dir.path(), Some(&pool))
            .unwrap();

        let indices: Vec<_> = histories.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, (0..8).collect::<Vec<_>>());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 8);
    }
}
