use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::arch::metrics::LOSS;

/// The metric values reported at the end of one epoch, in history order.
pub type EpochLogs = [(String, f64)];

/// What the training loop should do after a callback hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    Continue,
    Stop,
}

/// Hooks invoked by `Network::fit` during training.
pub trait Callback: Send + Sync {
    /// Called once before the first epoch of every fit.
    fn on_train_begin(&mut self) {}

    /// Called after every epoch.
    ///
    /// # Arguments
    /// * `epoch` - The zero based index of the finished epoch.
    /// * `logs` - The metrics of the finished epoch.
    /// * `params` - The parameters of the model after the epoch.
    ///
    /// # Returns
    /// Whether training should go on.
    fn on_epoch_end(&mut self, epoch: usize, logs: &EpochLogs, params: &[f32]) -> CallbackAction;

    /// Called once after the last epoch, with the chance to modify the final parameters.
    fn on_train_end(&mut self, _params: &mut [f32]) {}

    /// Clones this callback into a new box, so each model can own a fresh copy.
    fn box_clone(&self) -> Box<dyn Callback>;
}

impl Clone for Box<dyn Callback> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// Stops training once the monitored metric stops improving.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EarlyStopping {
    pub monitor: String,
    pub patience: usize,
    pub min_delta: f64,
    pub restore_best_weights: bool,
    #[serde(skip)]
    best: Option<f64>,
    #[serde(skip)]
    wait: usize,
    #[serde(skip)]
    best_params: Option<Vec<f32>>,
}

impl EarlyStopping {
    /// Creates a new `EarlyStopping` callback monitoring `val_loss`.
    ///
    /// # Arguments
    /// * `patience` - The amount of epochs without improvement tolerated before stopping.
    /// * `min_delta` - The minimum decrease of the monitored value that counts as improvement.
    pub fn new(patience: usize, min_delta: f64) -> Self {
        Self {
            monitor: "val_loss".to_string(),
            patience,
            min_delta,
            restore_best_weights: false,
            best: None,
            wait: 0,
            best_params: None,
        }
    }

    pub fn monitor(mut self, metric: impl Into<String>) -> Self {
        self.monitor = metric.into();
        self
    }

    pub fn restore_best_weights(mut self) -> Self {
        self.restore_best_weights = true;
        self
    }

    fn monitored(&self, logs: &EpochLogs) -> Option<f64> {
        let find = |name: &str| logs.iter().find(|(n, _)| n == name).map(|(_, v)| *v);

        find(&self.monitor).or_else(|| {
            warn!(
                "early stopping metric {} is not available, falling back to {LOSS}",
                self.monitor
            );
            find(LOSS)
        })
    }
}

impl Default for EarlyStopping {
    fn default() -> Self {
        Self::new(0, 0.)
    }
}

impl Callback for EarlyStopping {
    fn on_train_begin(&mut self) {
        self.best = None;
        self.wait = 0;
        self.best_params = None;
    }

    fn on_epoch_end(&mut self, epoch: usize, logs: &EpochLogs, params: &[f32]) -> CallbackAction {
        let Some(current) = self.monitored(logs) else {
            return CallbackAction::Continue;
        };

        let improved = match self.best {
            None => true,
            Some(best) => current < best - self.min_delta,
        };

        if improved {
            self.best = Some(current);
            self.wait = 0;
            if self.restore_best_weights {
                self.best_params = Some(params.to_vec());
            }
            return CallbackAction::Continue;
        }

        self.wait += 1;
        if self.wait >= self.patience {
            info!(
                "early stopping at epoch {}, no improvement of {} for {} epochs",
                epoch + 1,
                self.monitor,
                self.wait
            );
            return CallbackAction::Stop;
        }

        CallbackAction::Continue
    }

    fn on_train_end(&mut self, params: &mut [f32]) {
        if let Some(best) = self.best_params.take() {
            if best.len() == params.len() {
                params.copy_from_slice(&best);
            }
        }
    }

    fn box_clone(&self) -> Box<dyn Callback> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logs(val_loss: f64) -> Vec<(String, f64)> {
        vec![("loss".to_string(), 1.), ("val_loss".to_string(), val_loss)]
    }

    #[test]
    fn stops_after_patience() {
        let mut es = EarlyStopping::new(2, 0.01);
        es.on_train_begin();

        assert_eq!(es.on_epoch_end(0, &logs(1.), &[]), CallbackAction::Continue);
        assert_eq!(es.on_epoch_end(1, &logs(0.995), &[]), CallbackAction::Continue);
        assert_eq!(es.on_epoch_end(2, &logs(0.995), &[]), CallbackAction::Stop);
    }

    #[test]
    fn improvement_resets_wait() {
        let mut es = EarlyStopping::new(2, 0.);
        es.on_train_begin();

        assert_eq!(es.on_epoch_end(0, &logs(1.), &[]), CallbackAction::Continue);
        assert_eq!(es.on_epoch_end(1, &logs(1.), &[]), CallbackAction::Continue);
        assert_eq!(es.on_epoch_end(2, &logs(0.5), &[]), CallbackAction::Continue);
        assert_eq!(es.on_epoch_end(3, &logs(0.5), &[]), CallbackAction::Continue);
        assert_eq!(es.on_epoch_end(4, &logs(0.5), &[]), CallbackAction::Stop);
    }

    #[test]
    fn falls_back_to_loss() {
        let mut es = EarlyStopping::new(0, 0.).monitor("missing");
        es.on_train_begin();

        let logs = vec![("loss".to_string(), 1.)];
        assert_eq!(es.on_epoch_end(0, &logs, &[]), CallbackAction::Continue);
        assert_eq!(es.on_epoch_end(1, &logs, &[]), CallbackAction::Stop);
    }

    #[test]
    fn restores_best_params() {
        let mut es = EarlyStopping::new(0, 0.).restore_best_weights();
        es.on_train_begin();

        es.on_epoch_end(0, &logs(0.5), &[1., 2.]);
        es.on_epoch_end(1, &logs(0.9), &[3., 4.]);

        let mut params = [3., 4.];
        es.on_train_end(&mut params);
        assert_eq!(params, [1., 2.]);
    }

    #[test]
    fn box_clone_is_independent() {
        let mut es: Box<dyn Callback> = Box::new(EarlyStopping::new(0, 0.));
        es.on_epoch_end(0, &logs(1.), &[]);

        let mut copy = es.box_clone();
        copy.on_train_begin();
        assert_eq!(copy.on_epoch_end(0, &logs(2.), &[]), CallbackAction::Continue);
        assert_eq!(es.on_epoch_end(1, &logs(2.), &[]), CallbackAction::Stop);
    }
}
