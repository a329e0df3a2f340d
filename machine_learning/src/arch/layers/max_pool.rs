use ndarray::prelude::*;

use crate::{MlErr, Result};

/// Max pooling over the steps axis with `valid` padding and a stride equal to the pool size.
#[derive(Debug, Clone)]
pub struct MaxPool1d {
    pool: usize,
    steps: usize,
    channels: usize,

    // Forward metadata
    argmax: Array3<usize>,
}

impl MaxPool1d {
    /// Creates a new `MaxPool1d` layer.
    ///
    /// # Arguments
    /// * `input` - The `(steps, channels)` shape of a single sample.
    /// * `pool` - The size of the pooling window.
    pub fn new(input: (usize, usize), pool: usize) -> Self {
        let (steps, channels) = input;

        Self {
            pool,
            steps,
            channels,
            argmax: Array3::zeros((0, 0, channels)),
        }
    }

    pub fn output_shape(&self) -> (usize, usize) {
        (self.steps / self.pool, self.channels)
    }

    pub fn forward(&mut self, x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let x = x.into_dimensionality::<Ix3>()?;
        let (batch, steps, channels) = x.dim();
        if (steps, channels) != (self.steps, self.channels) {
            return Err(MlErr::SizeMismatch {
                what: "max pool input steps * channels",
                got: steps * channels,
                expected: self.steps * self.channels,
            });
        }

        let (out_steps, _) = self.output_shape();
        let mut y = Array3::zeros((batch, out_steps, channels));
        let mut argmax = Array3::zeros((batch, out_steps, channels));

        for ((n, t, c), v) in y.indexed_iter_mut() {
            let start = t * self.pool;
            let mut best = start;
            for i in start + 1..start + self.pool {
                if x[[n, i, c]] > x[[n, best, c]] {
                    best = i;
                }
            }

            *v = x[[n, best, c]];
            argmax[[n, t, c]] = best;
        }

        self.argmax = argmax;
        Ok(y.into_dyn())
    }

    pub fn backward(&mut self, d: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let d = d.into_dimensionality::<Ix3>()?;
        let batch = d.len_of(Axis(0));
        let mut dx = Array3::zeros((batch, self.steps, self.channels));

        for ((n, t, c), g) in d.indexed_iter() {
            dx[[n, self.argmax[[n, t, c]], c]] += *g;
        }

        Ok(dx.into_dyn())
    }
}
