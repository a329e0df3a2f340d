use ndarray::ArrayD;

use super::{Conv1d, Dense, Flatten, MaxPool1d, PRelu};
use crate::Result;

#[derive(Debug, Clone)]
pub enum Layer {
    Conv1d(Conv1d),
    PRelu(PRelu),
    MaxPool1d(MaxPool1d),
    Flatten(Flatten),
    Dense(Dense),
}
use Layer::*;

impl Layer {
    pub fn conv1d(input: (usize, usize), filters: usize, kernel_size: usize) -> Self {
        Self::Conv1d(Conv1d::new(input, filters, kernel_size))
    }

    pub fn prelu(shape: &[usize]) -> Self {
        Self::PRelu(PRelu::new(shape))
    }

    pub fn max_pool1d(input: (usize, usize), pool: usize) -> Self {
        Self::MaxPool1d(MaxPool1d::new(input, pool))
    }

    pub fn flatten() -> Self {
        Self::Flatten(Flatten::new())
    }

    pub fn dense(dim: (usize, usize)) -> Self {
        Self::Dense(Dense::new(dim))
    }

    /// Returns the amount of parameters this layer owns in the flat buffer.
    pub fn size(&self) -> usize {
        match self {
            Conv1d(l) => l.size(),
            PRelu(l) => l.size(),
            Dense(l) => l.size(),
            MaxPool1d(_) | Flatten(_) => 0,
        }
    }

    /// Returns the shape of every parameter tensor of this layer, in buffer order.
    pub fn param_shapes(&self) -> Vec<Vec<usize>> {
        match self {
            Conv1d(l) => l.param_shapes(),
            PRelu(l) => l.param_shapes(),
            Dense(l) => l.param_shapes(),
            MaxPool1d(_) | Flatten(_) => Vec::new(),
        }
    }

    pub fn forward(&mut self, params: &[f32], x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        match self {
            Conv1d(l) => l.forward(params, x),
            PRelu(l) => l.forward(params, x),
            MaxPool1d(l) => l.forward(x),
            Flatten(l) => l.forward(x),
            Dense(l) => l.forward(params, x),
        }
    }

    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        d: ArrayD<f32>,
    ) -> Result<ArrayD<f32>> {
        match self {
            Conv1d(l) => l.backward(params, grad, d),
            PRelu(l) => l.backward(params, grad, d),
            MaxPool1d(l) => l.backward(d),
            Flatten(l) => l.backward(d),
            Dense(l) => l.backward(params, grad, d),
        }
    }
}
