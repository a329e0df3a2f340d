use ndarray::{ArrayView2, Zip};

/// Name of the mean absolute error metric.
pub const MAE: &str = "MAE";
/// Name of the root mean squared error metric.
pub const RMSE: &str = "RMSE";
/// Name of the loss entry.
pub const LOSS: &str = "loss";

/// Accumulates the loss, the absolute errors and the squared errors of every batch of an epoch,
/// so that the epoch values are sample weighted means rather than means of batch means.
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricAccumulator {
    samples: usize,
    weighted_loss: f64,
    abs_err: f64,
    sq_err: f64,
}

impl MetricAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one batch worth of predictions.
    ///
    /// # Arguments
    /// * `loss` - The batch loss, already averaged over the batch.
    /// * `y_pred` - The predictions for the batch.
    /// * `y` - The targets for the batch.
    pub fn update(&mut self, loss: f32, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) {
        let n = y_pred.nrows();
        self.samples += n;
        self.weighted_loss += loss as f64 * n as f64;

        Zip::from(&y_pred).and(&y).for_each(|&p, &t| {
            let err = (p - t) as f64;
            self.abs_err += err.abs();
            self.sq_err += err * err;
        });
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Returns the `(loss, MAE, RMSE)` of everything accumulated so far.
    pub fn finish(&self) -> [(&'static str, f64); 3] {
        let n = self.samples.max(1) as f64;

        [
            (LOSS, self.weighted_loss / n),
            (MAE, self.abs_err / n),
            (RMSE, (self.sq_err / n).sqrt()),
        ]
    }
}
