use std::{cell::RefCell, rc::Rc};

use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use super::{ParamGen, RandParamGen};
use crate::{MlErr, Result, arch::Sequential};

/// Computes the `(fan_in, fan_out)` pair of a parameter tensor of the given shape.
///
/// Vectors use their length for both fans, matrices use their rows and columns, and higher rank
/// tensors treat every leading axis as part of the receptive field.
pub fn fans(shape: &[usize]) -> (usize, usize) {
    match shape {
        [] => (1, 1),
        [n] => (*n, *n),
        [rows, cols] => (*rows, *cols),
        [field @ .., fan_in, fan_out] => {
            let receptive: usize = field.iter().product();
            (fan_in * receptive, fan_out * receptive)
        }
    }
}

/// Seeded Glorot (Xavier) truncated normal initializer.
///
/// Every kernel, bias and activation slope of the network is drawn from the same generator, so two
/// networks built from the same seed and the same layer sequence start from identical parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlorotNormal {
    pub seed: u64,
}

impl GlorotNormal {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Generates the full flat parameter buffer of the given model.
    ///
    /// # Arguments
    /// * `model` - The network whose parameter tensors are to be initialized.
    ///
    /// # Returns
    /// The initial parameters in buffer order or an error if any tensor has a degenerate shape.
    pub fn params_for(&self, model: &Sequential) -> Result<Vec<f32>> {
        let rng = Rc::new(RefCell::new(StdRng::seed_from_u64(self.seed)));
        let mut params = Vec::new();

        for shape in model.layers().iter().flat_map(|l| l.param_shapes()) {
            let (fan_in, fan_out) = fans(&shape);
            if fan_in + fan_out == 0 {
                return Err(MlErr::InvalidInitializer(format!(
                    "tensor of shape {shape:?} has no fans"
                )));
            }

            let n: usize = shape.iter().product();
            let mut param_gen = RandParamGen::glorot_normal(rng.clone(), n, fan_in, fan_out)?;
            params.extend(param_gen.sample(n).unwrap_or_default());
        }

        Ok(params)
    }
}

impl Default for GlorotNormal {
    fn default() -> Self {
        Self::new(123)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::{Model, NetworkSpec};

    fn network() -> Sequential {
        NetworkSpec::new((8, 2))
            .conv1d(3, 5)
            .prelu()
            .max_pool1d(2)
            .flatten()
            .dense(4)
            .prelu()
            .dense(1)
            .build()
            .unwrap()
    }

    #[test]
    fn keras_fans() {
        assert_eq!(fans(&[7]), (7, 7));
        assert_eq!(fans(&[3, 4]), (3, 4));
        assert_eq!(fans(&[5, 2, 3]), (10, 15));
    }

    #[test]
    fn fills_every_parameter() {
        let model = network();
        let params = GlorotNormal::new(123).params_for(&model).unwrap();
        assert_eq!(params.len(), model.size());
        assert!(params.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn same_seed_same_params() {
        let model = network();
        let a = GlorotNormal::new(123).params_for(&model).unwrap();
        let b = GlorotNormal::new(123).params_for(&model).unwrap();
        let c = GlorotNormal::new(124).params_for(&model).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
