use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

use log::debug;
use ndarray::{Array2, ArrayView3, Ix2, s};
use serde::{Deserialize, Serialize};

use crate::{
    MlErr, Result,
    arch::{
        Model, NetworkSpec, Sequential,
        loss::{LossFn, Mape},
        metrics::MetricAccumulator,
    },
    dataset::SeriesView,
    initialization::GlorotNormal,
    optimization::{Adam, Optimizer},
    training::{Callback, CallbackAction, FitOptions, History},
};

/// The on-disk representation of a `Network`.
#[derive(Debug, Serialize, Deserialize)]
struct NetworkFile {
    spec: NetworkSpec,
    learning_rate: f32,
    params: Vec<f32>,
}

/// A compiled model: architecture, parameters, Adam optimizer and MAPE loss.
#[derive(Debug, Clone)]
pub struct Network {
    spec: NetworkSpec,
    model: Sequential,
    params: Vec<f32>,
    grad: Vec<f32>,
    optimizer: Adam,
    loss_fn: Mape,
}

impl Network {
    /// Builds and compiles a new `Network`.
    ///
    /// # Arguments
    /// * `spec` - The architecture of the network.
    /// * `learning_rate` - The learning rate of the Adam optimizer.
    /// * `initializer` - The seeded initializer for every parameter tensor.
    ///
    /// # Returns
    /// An error if the architecture is invalid.
    pub fn compile(
        spec: NetworkSpec,
        learning_rate: f32,
        initializer: &GlorotNormal,
    ) -> Result<Self> {
        let model = spec.build()?;
        let params = initializer.params_for(&model)?;

        let network = Self::with_params(spec, model, params, learning_rate);
        debug!(
            "compiled network with {} params, {} loss",
            network.params.len(),
            network.loss_fn.name()
        );
        Ok(network)
    }

    fn with_params(
        spec: NetworkSpec,
        model: Sequential,
        params: Vec<f32>,
        learning_rate: f32,
    ) -> Self {
        let size = params.len();

        Self {
            spec,
            model,
            params,
            grad: vec![0.; size],
            optimizer: Adam::with_learning_rate(size, learning_rate),
            loss_fn: Mape::new(),
        }
    }

    pub fn spec(&self) -> &NetworkSpec {
        &self.spec
    }

    pub fn params(&self) -> &[f32] {
        &self.params
    }

    pub fn learning_rate(&self) -> f32 {
        self.optimizer.learning_rate()
    }

    fn check_input(&self, x: &ArrayView3<f32>) -> Result<()> {
        let (_, steps, channels) = x.dim();
        let expected = self.spec.input_shape();

        if (steps, channels) != expected {
            return Err(MlErr::invalid(format!(
                "expected samples shaped {expected:?}, got {:?}",
                (steps, channels)
            )));
        }

        Ok(())
    }

    fn forward_batch(&mut self, x: ArrayView3<f32>) -> Result<Array2<f32>> {
        let y_pred = self.model.forward(&self.params, x.to_owned().into_dyn())?;
        Ok(y_pred.into_dimensionality::<Ix2>()?)
    }

    /// Trains the network on `train` with sequential, unshuffled mini-batches.
    ///
    /// # Arguments
    /// * `train` - The training samples.
    /// * `validation` - The samples evaluated at the end of every epoch, if any.
    /// * `options` - The amount of epochs and the mini-batch size.
    /// * `callbacks` - Hooks called around every epoch.
    ///
    /// # Returns
    /// The per-epoch history or an error if the data is malformed or training diverges.
    pub fn fit(
        &mut self,
        train: SeriesView,
        validation: Option<SeriesView>,
        options: FitOptions,
        callbacks: &mut [Box<dyn Callback>],
    ) -> Result<History> {
        if train.is_empty() {
            return Err(MlErr::invalid("no training samples"));
        }

        if options.batch_size == 0 {
            return Err(MlErr::invalid("batch size must be positive"));
        }

        self.check_input(&train.x)?;
        if let Some(val) = &validation {
            self.check_input(&val.x)?;
        }

        callbacks.iter_mut().for_each(|c| c.on_train_begin());

        let n = train.len();
        let mut history = History::new();
        for epoch in 0..options.epochs {
            let mut acc = MetricAccumulator::new();

            for start in (0..n).step_by(options.batch_size) {
                let end = (start + options.batch_size).min(n);
                let y = train.y.slice(s![start..end, ..]);

                let y_pred = self.forward_batch(train.x.slice(s![start..end, .., ..]))?;
                let loss = self.loss_fn.loss(y_pred.view(), y);
                acc.update(loss, y_pred.view(), y);

                let d = self.loss_fn.loss_prime(y_pred.view(), y).into_dyn();
                self.model.backward(&self.params, &mut self.grad, d)?;
                self.optimizer.update_params(&self.grad, &mut self.params)?;
            }

            let mut logs: Vec<(String, f64)> = acc
                .finish()
                .iter()
                .map(|(name, v)| (name.to_string(), *v))
                .collect();

            if let Some(val) = validation {
                for (name, v) in self.evaluate(val, options.batch_size)? {
                    logs.push((format!("val_{name}"), v));
                }
            }

            if let Some((name, _)) = logs.iter().find(|(_, v)| !v.is_finite()) {
                return Err(MlErr::NonFinite {
                    epoch: epoch + 1,
                    metric: name.clone(),
                });
            }

            debug!("epoch {}/{}: {logs:?}", epoch + 1, options.epochs);
            history.push_epoch(logs.iter().map(|(name, v)| (name.as_str(), *v)));

            let mut stop = false;
            for callback in callbacks.iter_mut() {
                stop |= callback.on_epoch_end(epoch, &logs, &self.params) == CallbackAction::Stop;
            }

            if stop {
                break;
            }
        }

        callbacks
            .iter_mut()
            .for_each(|c| c.on_train_end(&mut self.params));

        Ok(history)
    }

    /// Computes the loss and metrics of the network over `data` without training.
    ///
    /// # Returns
    /// The `(loss, MAE, RMSE)` values or an error if `data` is empty or malformed.
    pub fn evaluate(
        &mut self,
        data: SeriesView,
        batch_size: usize,
    ) -> Result<[(&'static str, f64); 3]> {
        if data.is_empty() {
            return Err(MlErr::invalid("no evaluation samples"));
        }

        self.check_input(&data.x)?;

        let n = data.len();
        let mut acc = MetricAccumulator::new();
        for start in (0..n).step_by(batch_size.max(1)) {
            let end = (start + batch_size.max(1)).min(n);
            let y = data.y.slice(s![start..end, ..]);

            let y_pred = self.forward_batch(data.x.slice(s![start..end, .., ..]))?;
            acc.update(self.loss_fn.loss(y_pred.view(), y), y_pred.view(), y);
        }

        Ok(acc.finish())
    }

    /// Predicts one target per sample of `x`.
    pub fn predict(&mut self, x: ArrayView3<f32>) -> Result<Array2<f32>> {
        self.check_input(&x)?;
        self.forward_batch(x)
    }

    /// Writes the architecture, learning rate and parameters of the network as JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = NetworkFile {
            spec: self.spec.clone(),
            learning_rate: self.learning_rate(),
            params: self.params.clone(),
        };

        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, &file)?;
        Ok(())
    }

    /// Reads a network previously written by `save`.
    ///
    /// # Returns
    /// An error if the file can't be read or its parameters don't fit its architecture.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let file: NetworkFile = serde_json::from_reader(reader)?;

        let model = file.spec.build()?;
        if model.size() != file.params.len() {
            return Err(MlErr::SizeMismatch {
                what: "stored params",
                got: file.params.len(),
                expected: model.size(),
            });
        }

        Ok(Self::with_params(
            file.spec,
            model,
            file.params,
            file.learning_rate,
        ))
    }
}
