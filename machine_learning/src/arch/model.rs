use ndarray::ArrayD;

use crate::Result;

pub trait Model {
    /// Returns the amount of parameters in the model.
    fn size(&self) -> usize;

    /// Makes a forward pass through the model, caching whatever the backward pass needs.
    ///
    /// # Arguments
    /// * `params` - The model's parameters.
    /// * `x` - The input batch.
    ///
    /// # Returns
    /// The prediction for the given input or an error if occurred.
    fn forward(&mut self, params: &[f32], x: ArrayD<f32>) -> Result<ArrayD<f32>>;

    /// Propagates the loss derivative backwards through the model, **overwriting** `grad` with
    /// the gradient of the loss with respect to `params`.
    ///
    /// # Arguments
    /// * `params` - The model's parameters, the same ones used in the last forward pass.
    /// * `grad` - A buffer for writing the computed gradient.
    /// * `d` - The derivative of the loss with respect to the model's output.
    fn backward(&mut self, params: &[f32], grad: &mut [f32], d: ArrayD<f32>) -> Result<()>;
}
