use ndarray::ArrayD;

use super::{Model, layers::Layer};
use crate::{MlErr, Result};

/// A sequential model: information flows forward when computing an output and backward when
/// computing the *deltas* of its layers.
#[derive(Debug, Clone)]
pub struct Sequential {
    layers: Vec<Layer>,
}

impl Sequential {
    /// Creates a new `Sequential`.
    ///
    /// # Arguments
    /// * `layers` - The layers the sequential is composed of.
    ///
    /// # Returns
    /// A new `Sequential` instance.
    pub fn new<I>(layers: I) -> Self
    where
        I: IntoIterator<Item = Layer>,
    {
        Self {
            layers: layers.into_iter().collect(),
        }
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    fn check_len(&self, what: &'static str, got: usize) -> Result<()> {
        let expected = self.size();
        if got != expected {
            return Err(MlErr::SizeMismatch {
                what,
                got,
                expected,
            });
        }

        Ok(())
    }
}

impl Model for Sequential {
    fn size(&self) -> usize {
        self.layers.iter().map(Layer::size).sum()
    }

    fn forward(&mut self, params: &[f32], mut x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        self.check_len("params", params.len())?;

        let mut rest = params;
        for layer in self.layers.iter_mut() {
            let (front, back) = rest.split_at(layer.size());
            x = layer.forward(front, x)?;
            rest = back;
        }

        Ok(x)
    }

    fn backward(&mut self, params: &[f32], grad: &mut [f32], mut d: ArrayD<f32>) -> Result<()> {
        self.check_len("params", params.len())?;
        self.check_len("grad", grad.len())?;

        let mut end = params.len();
        let mut grad_rest = grad;
        for layer in self.layers.iter_mut().rev() {
            let start = end - layer.size();
            let (front, back) = std::mem::take(&mut grad_rest).split_at_mut(start);
            d = layer.backward(&params[start..end], back, d)?;
            grad_rest = front;
            end = start;
        }

        Ok(())
    }
}
