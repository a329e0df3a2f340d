use ndarray::{Array2, ArrayView2, Zip};

use super::LossFn;

/// Smallest denominator used when a target is (close to) zero.
pub const EPSILON: f32 = 1e-7;

/// Mean absolute percentage error loss function, `100 * mean(|y - y_pred| / |y|)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Mape;

impl Mape {
    /// Returns a new `Mape`.
    pub fn new() -> Self {
        Self
    }
}

impl LossFn for Mape {
    fn name(&self) -> &'static str {
        "MAPE"
    }

    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
        let mut total = 0.0;
        Zip::from(&y_pred).and(&y).for_each(|&p, &t| {
            total += (t - p).abs() / t.abs().max(EPSILON);
        });

        100. * total / y_pred.len().max(1) as f32
    }

    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32> {
        let scale = 100. / y_pred.len().max(1) as f32;
        Zip::from(&y_pred)
            .and(&y)
            .map_collect(|&p, &t| {
                let sign = if p > t {
                    1.
                } else if p < t {
                    -1.
                } else {
                    0.
                };

                scale * sign / t.abs().max(EPSILON)
            })
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn percentage_of_the_target() {
        let y = array![[2.0], [4.0]];
        let y_pred = array![[1.0], [5.0]];

        // |2 - 1| / 2 = 0.5, |4 - 5| / 4 = 0.25
        assert_eq!(Mape.loss(y_pred.view(), y.view()), 37.5);
    }

    #[test]
    fn zero_targets_do_not_divide_by_zero() {
        let y = array![[0.0]];
        let y_pred = array![[1e-7]];

        assert!(Mape.loss(y_pred.view(), y.view()).is_finite());
    }

    #[test]
    fn derivative_points_towards_the_target() {
        let y = array![[2.0], [4.0]];
        let y_pred = array![[1.0], [5.0]];

        let d = Mape.loss_prime(y_pred.view(), y.view());
        assert_eq!(d, array![[-25.0], [12.5]]);
    }
}
