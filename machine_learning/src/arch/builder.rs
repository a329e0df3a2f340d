use serde::{Deserialize, Serialize};

use super::{Sequential, layers::Layer};
use crate::{MlErr, Result};

/// A serializable description of a single layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerSpec {
    Conv1d { filters: usize, kernel_size: usize },
    PRelu,
    MaxPool1d { pool: usize },
    Flatten,
    Dense { units: usize },
}

/// The architecture of a `Sequential` model over `(steps, channels)` samples.
///
/// Built fluently, then resolved into layers by `build`, which tracks the running shape and
/// rejects architectures that can't be evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSpec {
    input_shape: (usize, usize),
    layers: Vec<LayerSpec>,
}

#[derive(Debug, Clone, Copy)]
enum Shape {
    Sequence(usize, usize),
    Flat(usize),
}

impl Shape {
    fn dims(self) -> Vec<usize> {
        match self {
            Shape::Sequence(steps, channels) => vec![steps, channels],
            Shape::Flat(features) => vec![features],
        }
    }
}

impl NetworkSpec {
    /// Creates an empty `NetworkSpec`.
    ///
    /// # Arguments
    /// * `input_shape` - The `(steps, channels)` shape of a single sample.
    pub fn new(input_shape: (usize, usize)) -> Self {
        Self {
            input_shape,
            layers: Vec::new(),
        }
    }

    pub fn input_shape(&self) -> (usize, usize) {
        self.input_shape
    }

    pub fn layers(&self) -> &[LayerSpec] {
        &self.layers
    }

    pub fn push(mut self, layer: LayerSpec) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn conv1d(self, filters: usize, kernel_size: usize) -> Self {
        self.push(LayerSpec::Conv1d {
            filters,
            kernel_size,
        })
    }

    pub fn prelu(self) -> Self {
        self.push(LayerSpec::PRelu)
    }

    pub fn max_pool1d(self, pool: usize) -> Self {
        self.push(LayerSpec::MaxPool1d { pool })
    }

    pub fn flatten(self) -> Self {
        self.push(LayerSpec::Flatten)
    }

    pub fn dense(self, units: usize) -> Self {
        self.push(LayerSpec::Dense { units })
    }

    /// Resolves the spec into a `Sequential` model.
    ///
    /// # Errors
    /// Returns `MlErr::InvalidInput` if a layer has a zero dimension, if a layer receives an
    /// input of the wrong rank or if pooling shrinks the sequence to nothing.
    pub fn build(&self) -> Result<Sequential> {
        let (steps, channels) = self.input_shape;
        if steps == 0 || channels == 0 {
            return Err(MlErr::invalid(format!(
                "input shape ({steps}, {channels}) must not have zero dimensions"
            )));
        }

        let mut shape = Shape::Sequence(steps, channels);
        let mut layers = Vec::with_capacity(self.layers.len());

        for (i, spec) in self.layers.iter().enumerate() {
            let (layer, next) = Self::resolve(i, *spec, shape)?;
            layers.push(layer);
            shape = next;
        }

        match shape {
            Shape::Flat(_) => Ok(Sequential::new(layers)),
            Shape::Sequence(..) => Err(MlErr::invalid(
                "the model must end with a flat output, add a flatten layer",
            )),
        }
    }

    fn resolve(i: usize, spec: LayerSpec, shape: Shape) -> Result<(Layer, Shape)> {
        let ctx = |msg: &str| MlErr::invalid(format!("layer {i} ({spec:?}): {msg}"));

        match (spec, shape) {
            (LayerSpec::Conv1d { filters, kernel_size }, Shape::Sequence(steps, channels)) => {
                if filters == 0 || kernel_size == 0 {
                    return Err(ctx("filters and kernel size must be positive"));
                }

                let layer = Layer::conv1d((steps, channels), filters, kernel_size);
                Ok((layer, Shape::Sequence(steps, filters)))
            }
            (LayerSpec::PRelu, shape) => Ok((Layer::prelu(&shape.dims()), shape)),
            (LayerSpec::MaxPool1d { pool }, Shape::Sequence(steps, channels)) => {
                if pool == 0 {
                    return Err(ctx("pool size must be positive"));
                }
                if steps / pool == 0 {
                    return Err(ctx(&format!("cannot pool {steps} steps by {pool}")));
                }

                let layer = Layer::max_pool1d((steps, channels), pool);
                Ok((layer, Shape::Sequence(steps / pool, channels)))
            }
            (LayerSpec::Flatten, shape) => {
                let features = shape.dims().iter().product();
                Ok((Layer::flatten(), Shape::Flat(features)))
            }
            (LayerSpec::Dense { units }, Shape::Flat(features)) => {
                if units == 0 {
                    return Err(ctx("units must be positive"));
                }

                Ok((Layer::dense((features, units)), Shape::Flat(units)))
            }
            (_, Shape::Flat(_)) => Err(ctx("expected a sequence input, got a flat one")),
            (_, Shape::Sequence(..)) => Err(ctx("expected a flat input, got a sequence")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::Model;

    #[test]
    fn tracks_shapes_through_pooling() {
        let spec = NetworkSpec::new((20, 1))
            .conv1d(4, 5)
            .prelu()
            .max_pool1d(2)
            .conv1d(2, 2)
            .prelu()
            .max_pool1d(2)
            .flatten()
            .dense(16)
            .prelu()
            .dense(1);

        let model = spec.build().unwrap();
        let conv1 = 5 * 4 + 4 + 20 * 4;
        let conv2 = 2 * 4 * 2 + 2 + 10 * 2;
        let dense = (10 + 1) * 16 + 16 + (16 + 1);
        assert_eq!(model.size(), conv1 + conv2 + dense);
    }

    #[test]
    fn rejects_overpooling() {
        let spec = NetworkSpec::new((3, 1)).max_pool1d(2).max_pool1d(2).flatten();
        assert!(matches!(spec.build(), Err(MlErr::InvalidInput(_))));
    }

    #[test]
    fn rejects_dense_before_flatten() {
        let spec = NetworkSpec::new((3, 1)).dense(4).flatten();
        assert!(spec.build().is_err());
    }

    #[test]
    fn roundtrips_through_json() {
        let spec = NetworkSpec::new((8, 2)).conv1d(3, 2).flatten().dense(1);
        let json = serde_json::to_string(&spec).unwrap();
        assert_eq!(serde_json::from_str::<NetworkSpec>(&json).unwrap(), spec);
    }
}
