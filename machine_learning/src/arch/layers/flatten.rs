use ndarray::prelude::*;

use crate::Result;

/// Collapses every non-batch axis into one, in row-major order.
#[derive(Debug, Clone)]
pub struct Flatten {
    shape: Vec<usize>,
}

impl Flatten {
    pub fn new() -> Self {
        Self { shape: Vec::new() }
    }

    pub fn forward(&mut self, x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        self.shape = x.shape().to_vec();

        let batch = self.shape.first().copied().unwrap_or_default();
        let features: usize = self.shape.iter().skip(1).product();
        let x = x.as_standard_layout().into_owned();
        Ok(x.into_shape_with_order((batch, features))?.into_dyn())
    }

    pub fn backward(&mut self, d: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let d = d.as_standard_layout().into_owned();
        Ok(d.into_shape_with_order(IxDyn(&self.shape))?)
    }
}

impl Default for Flatten {
    fn default() -> Self {
        Self::new()
    }
}
