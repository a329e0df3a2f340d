use ndarray::{Zip, prelude::*};

use crate::{MlErr, Result};

/// Parametric ReLU: `x` when positive, `alpha * x` otherwise, with one learnable `alpha` per
/// element of a sample.
#[derive(Debug, Clone)]
pub struct PRelu {
    shape: Vec<usize>,
    size: usize,

    // Forward metadata
    x: ArrayD<f32>,
}

impl PRelu {
    /// Creates a new `PRelu` layer.
    ///
    /// # Arguments
    /// * `shape` - The shape of a single sample, without the batch axis.
    pub fn new(shape: &[usize]) -> Self {
        Self {
            shape: shape.to_vec(),
            size: shape.iter().product(),
            x: ArrayD::zeros(IxDyn(&[0])),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn param_shapes(&self) -> Vec<Vec<usize>> {
        vec![self.shape.clone()]
    }

    pub fn forward(&mut self, params: &[f32], x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        if x.ndim() == 0 || x.shape()[1..] != self.shape[..] {
            return Err(MlErr::SizeMismatch {
                what: "prelu input elements",
                got: x.shape().iter().skip(1).product(),
                expected: self.size,
            });
        }

        let alpha = ArrayViewD::from_shape(IxDyn(&self.shape), params)?;
        let mut y = x.clone();
        for row in y.outer_iter_mut() {
            Zip::from(row).and(&alpha).for_each(|v, &a| {
                if *v <= 0. {
                    *v *= a;
                }
            });
        }

        self.x = x;
        Ok(y)
    }

    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        mut d: ArrayD<f32>,
    ) -> Result<ArrayD<f32>> {
        let alpha = ArrayViewD::from_shape(IxDyn(&self.shape), params)?;
        let mut dalpha = ArrayViewMutD::from_shape(IxDyn(&self.shape), grad)?;
        dalpha.fill(0.);

        for (d_row, x_row) in d.outer_iter_mut().zip(self.x.outer_iter()) {
            Zip::from(d_row)
                .and(x_row)
                .and(&mut dalpha)
                .and(&alpha)
                .for_each(|g, &x, da, &a| {
                    if x <= 0. {
                        *da += *g * x;
                        *g *= a;
                    }
                });
        }

        Ok(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_negative_values_only() {
        let mut prelu = PRelu::new(&[3]);
        let params = [0.1, 0.2, 0.3];
        let x = array![[-1.0, 2.0, -3.0], [1.0, -2.0, 0.0]].into_dyn();

        let y = prelu.forward(&params, x).unwrap();
        let expected = array![[-0.1, 2.0, -0.9], [1.0, -0.4, 0.0]].into_dyn();
        assert!(y.iter().zip(&expected).all(|(a, b)| (a - b).abs() < 1e-6));
    }

    #[test]
    fn backward_accumulates_slopes_over_batch() {
        let mut prelu = PRelu::new(&[2]);
        let params = [0.5, 0.5];
        let mut grad = [9.0, 9.0];
        let x = array![[-1.0, 2.0], [-3.0, 4.0]].into_dyn();

        prelu.forward(&params, x).unwrap();
        let dx = prelu
            .backward(&params, &mut grad, Array2::ones((2, 2)).into_dyn())
            .unwrap();

        assert_eq!(grad, [-4.0, 0.0]);
        assert_eq!(dx, array![[0.5, 1.0], [0.5, 1.0]].into_dyn());
    }

    #[test]
    fn rejects_wrong_sample_shape() {
        let mut prelu = PRelu::new(&[4, 2]);
        let params = [0.0; 8];
        let x = ArrayD::<f32>::zeros(IxDyn(&[1, 2, 4]));

        assert!(prelu.forward(&params, x).is_err());
    }
}
