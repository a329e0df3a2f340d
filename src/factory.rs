use std::path::Path;

use log::debug;
use machine_learning::{
    GlorotNormal, Network, SeriesView,
    arch::NetworkSpec,
    training::{Callback, FitOptions, History},
};

use crate::{
    GridErr, Result, config::Config, grid::Combination, reproducibility::Reproducibility,
};

/// A model the grid search can train and persist.
///
/// The orchestration only ever talks to models through this trait.
pub trait Trainable: Send {
    /// The extension of the files written by `save`.
    const FILE_EXTENSION: &'static str;

    /// Fits the model on `train`, evaluating `validation` after every epoch.
    fn fit(
        &mut self,
        train: SeriesView,
        validation: Option<SeriesView>,
        options: FitOptions,
        callbacks: &mut [Box<dyn Callback>],
    ) -> machine_learning::Result<History>;

    /// Persists the current state of the model at `path`.
    fn save(&self, path: &Path) -> machine_learning::Result<()>;
}

/// Builds fresh, untrained models out of combinations.
pub trait ModelFactory {
    type Model: Trainable;

    fn build(&self, combination: &Combination) -> machine_learning::Result<Self::Model>;
}

impl Trainable for Network {
    const FILE_EXTENSION: &'static str = "json";

    fn fit(
        &mut self,
        train: SeriesView,
        validation: Option<SeriesView>,
        options: FitOptions,
        callbacks: &mut [Box<dyn Callback>],
    ) -> machine_learning::Result<History> {
        Network::fit(self, train, validation, options, callbacks)
    }

    fn save(&self, path: &Path) -> machine_learning::Result<()> {
        Network::save(self, path)
    }
}

/// Builds the two-convolution regressor explored by the grid.
///
/// Every network is `conv(f1, k) -> prelu -> pool -> conv(f2, k / 2) -> prelu -> pool ->
/// flatten`, followed by `num_of_dense` blocks of `dense -> prelu` (the first one `dense_len1`
/// wide, the rest `dense_len2` wide) and a single unit `dense -> prelu` output.
#[derive(Debug, Clone)]
pub struct CnnFactory {
    input_shape: (usize, usize),
    filter_size: usize,
    learning_rate: f32,
    initializer: GlorotNormal,
}

impl CnnFactory {
    /// Creates a new `CnnFactory`.
    ///
    /// # Arguments
    /// * `input_shape` - The `(timesteps, channels)` shape of every sample.
    /// * `filter_size` - The kernel size of the first convolution.
    /// * `learning_rate` - The learning rate every network is compiled with.
    /// * `initializer` - The seeded initializer shared by every network.
    pub fn new(
        input_shape: (usize, usize),
        filter_size: usize,
        learning_rate: f32,
        initializer: GlorotNormal,
    ) -> Self {
        Self {
            input_shape,
            filter_size,
            learning_rate,
            initializer,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.dataset.input_shape(),
            config.training.filter_size,
            config.training.initial_learning_rate,
            Reproducibility::from_training(&config.training).initializer(),
        )
    }

    /// Returns the architecture of the network for `combination`.
    pub fn spec(&self, combination: &Combination) -> NetworkSpec {
        let mut spec = NetworkSpec::new(self.input_shape)
            .conv1d(combination.filter_num1, self.filter_size)
            .prelu()
            .max_pool1d(2)
            .conv1d(combination.filter_num2, self.filter_size / 2)
            .prelu()
            .max_pool1d(2)
            .flatten();

        for i in 0..combination.num_of_dense {
            let units = match i {
                0 => combination.dense_len1,
                _ => combination.dense_len2,
            };
            spec = spec.dense(units).prelu();
        }

        spec.dense(1).prelu()
    }
}

impl ModelFactory for CnnFactory {
    type Model = Network;

    fn build(&self, combination: &Combination) -> machine_learning::Result<Network> {
        Network::compile(
            self.spec(combination),
            self.learning_rate,
            &self.initializer,
        )
    }
}

/// Builds one model per combination, in order.
///
/// # Returns
/// The models or the first build failure, naming its combination.
pub fn build_all<F: ModelFactory>(
    factory: &F,
    combinations: &[Combination],
) -> Result<Vec<F::Model>> {
    combinations
        .iter()
        .map(|c| {
            debug!("building model for {c:?}");
            factory.build(c).map_err(|source| GridErr::Build {
                combination: c.index,
                source,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use machine_learning::arch::LayerSpec;

    use super::*;

    fn combination(num_of_dense: usize) -> Combination {
        Combination {
            index: 0,
            filter_num1: 4,
            filter_num2: 2,
            num_of_dense,
            dense_len1: 16,
            dense_len2: 8,
        }
    }

    fn factory() -> CnnFactory {
        CnnFactory::new((12, 1), 5, 1e-3, GlorotNormal::new(123))
    }

    #[test]
    fn builds_the_fixed_topology() {
        let spec = factory().spec(&combination(3));
        let layers = spec.layers();

        assert_eq!(
            layers[..7],
            [
                LayerSpec::Conv1d {
                    filters: 4,
                    kernel_size: 5
                },
                LayerSpec::PRelu,
                LayerSpec::MaxPool1d { pool: 2 },
                LayerSpec::Conv1d {
                    filters: 2,
                    kernel_size: 2
                },
                LayerSpec::PRelu,
                LayerSpec::MaxPool1d { pool: 2 },
                LayerSpec::Flatten,
            ]
        );

        let units: Vec<_> = layers
            .iter()
            .filter_map(|l| match l {
                LayerSpec::Dense { units } => Some(*units),
                _ => None,
            })
            .collect();
        assert_eq!(units, [16, 8, 8, 1]);
        assert_eq!(layers.last(), Some(&LayerSpec::PRelu));
    }

    #[test]
    fn same_combination_same_initial_weights() {
        let factory = factory();
        let a = factory.build(&combination(2)).unwrap();
        let b = factory.build(&combination(2)).unwrap();

        assert_eq!(a.params(), b.params());
    }

    #[test]
    fn build_failure_names_the_combination() {
        let factory = CnnFactory::new((2, 1), 5, 1e-3, GlorotNormal::new(123));
        let mut c = combination(1);
        c.index = 7;

        let err = build_all(&factory, &[c]).unwrap_err();
        assert!(matches!(err, GridErr::Build { combination: 7, .. }));
    }
}
