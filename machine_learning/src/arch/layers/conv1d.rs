use std::ops::Range;

use ndarray::prelude::*;

use crate::{MlErr, Result};

/// A one dimensional convolution over `(batch, steps, channels)` inputs with stride 1 and
/// `same` zero padding.
#[derive(Debug, Clone)]
pub struct Conv1d {
    steps: usize,
    channels: usize,
    filters: usize,
    kernel_size: usize,
    size: usize,

    // Forward metadata
    x: Array3<f32>,
}

impl Conv1d {
    /// Creates a new `Conv1d` layer.
    ///
    /// # Arguments
    /// * `input` - The `(steps, channels)` shape of a single sample.
    /// * `filters` - The amount of output channels.
    /// * `kernel_size` - The length of the convolution window.
    ///
    /// # Returns
    /// A new `Conv1d` instance.
    pub fn new(input: (usize, usize), filters: usize, kernel_size: usize) -> Self {
        let (steps, channels) = input;

        Self {
            steps,
            channels,
            filters,
            kernel_size,
            size: kernel_size * channels * filters + filters,
            x: Array3::zeros((0, steps, channels)),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn param_shapes(&self) -> Vec<Vec<usize>> {
        vec![
            vec![self.kernel_size, self.channels, self.filters],
            vec![self.filters],
        ]
    }

    pub fn forward(&mut self, params: &[f32], x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let x = x.into_dimensionality::<Ix3>()?;
        let (batch, steps, channels) = x.dim();
        if (steps, channels) != (self.steps, self.channels) {
            return Err(MlErr::SizeMismatch {
                what: "conv1d input steps * channels",
                got: steps * channels,
                expected: self.steps * self.channels,
            });
        }

        let (w, b) = self.view_params(params)?;
        let mut y = Array3::zeros((batch, steps, self.filters));
        y += &b;

        for j in 0..self.kernel_size {
            let Some((out, inp)) = self.overlap(j) else {
                continue;
            };

            let w_j = w.index_axis(Axis(0), j);
            for n in 0..batch {
                let contrib = x.slice(s![n, inp.clone(), ..]).dot(&w_j);
                y.slice_mut(s![n, out.clone(), ..]).scaled_add(1.0, &contrib);
            }
        }

        self.x = x;
        Ok(y.into_dyn())
    }

    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        d: ArrayD<f32>,
    ) -> Result<ArrayD<f32>> {
        let d = d.into_dimensionality::<Ix3>()?;
        let batch = d.len_of(Axis(0));

        let (w, _) = self.view_params(params)?;
        let (mut dw, mut db) = self.view_grad(grad)?;
        db.assign(&d.sum_axis(Axis(0)).sum_axis(Axis(0)));
        dw.fill(0.);

        let mut dx = Array3::zeros(self.x.dim());

        for j in 0..self.kernel_size {
            let Some((out, inp)) = self.overlap(j) else {
                continue;
            };

            let w_j = w.index_axis(Axis(0), j);
            let mut dw_j = dw.index_axis_mut(Axis(0), j);
            for n in 0..batch {
                let x_n = self.x.slice(s![n, inp.clone(), ..]);
                let d_n = d.slice(s![n, out.clone(), ..]);

                dw_j.scaled_add(1.0, &x_n.t().dot(&d_n));
                dx.slice_mut(s![n, inp.clone(), ..])
                    .scaled_add(1.0, &d_n.dot(&w_j.t()));
            }
        }

        Ok(dx.into_dyn())
    }

    /// Computes which output steps the `j`-th kernel tap contributes to and which input steps
    /// it reads from.
    ///
    /// # Returns
    /// The `(output, input)` ranges, or `None` if the tap only ever reads padding.
    fn overlap(&self, j: usize) -> Option<(Range<usize>, Range<usize>)> {
        let left = (self.kernel_size as isize - 1) / 2;
        let shift = j as isize - left;
        let steps = self.steps as isize;

        let start = (-shift).max(0);
        let end = (steps - shift).min(steps);
        if start >= end {
            return None;
        }

        let out = start as usize..end as usize;
        let inp = (start + shift) as usize..(end + shift) as usize;
        Some((out, inp))
    }

    fn view_grad<'a>(
        &self,
        grad: &'a mut [f32],
    ) -> Result<(ArrayViewMut3<'a, f32>, ArrayViewMut1<'a, f32>)> {
        let w_size = self.size - self.filters;
        let (dw_raw, db_raw) = grad.split_at_mut(w_size);
        let shape = (self.kernel_size, self.channels, self.filters);
        let dw = ArrayViewMut3::from_shape(shape, dw_raw)?;
        let db = ArrayViewMut1::from_shape(self.filters, db_raw)?;
        Ok((dw, db))
    }

    fn view_params<'a>(&self, params: &'a [f32]) -> Result<(ArrayView3<'a, f32>, ArrayView1<'a, f32>)> {
        let w_size = self.size - self.filters;
        let (w_raw, b_raw) = params.split_at(w_size);
        let shape = (self.kernel_size, self.channels, self.filters);
        let w = ArrayView3::from_shape(shape, w_raw)?;
        let b = ArrayView1::from_shape(self.filters, b_raw)?;
        Ok((w, b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_padding_keeps_length() {
        // kernel [1, 1, 1] over a single channel is a moving sum with zero padding
        let mut conv = Conv1d::new((4, 1), 1, 3);
        let params = [1.0, 1.0, 1.0, 0.0];
        let x = array![[[1.0], [2.0], [3.0], [4.0]]].into_dyn();

        let y = conv.forward(&params, x).unwrap();
        assert_eq!(y, array![[[3.0], [6.0], [9.0], [7.0]]].into_dyn());
    }

    #[test]
    fn even_kernel_pads_right() {
        let mut conv = Conv1d::new((3, 1), 1, 2);
        let params = [1.0, 10.0, 0.5];
        let x = array![[[1.0], [2.0], [3.0]]].into_dyn();

        let y = conv.forward(&params, x).unwrap();
        assert_eq!(y, array![[[21.5], [32.5], [3.5]]].into_dyn());
    }

    #[test]
    fn gradient_matches_finite_differences() {
        let mut conv = Conv1d::new((5, 2), 3, 3);
        let params: Vec<f32> = (0..conv.size()).map(|i| (i as f32 * 0.37).sin()).collect();
        let x: Array3<f32> = Array3::from_shape_fn((2, 5, 2), |(n, t, c)| {
            ((n * 10 + t * 2 + c) as f32 * 0.21).cos()
        });
        let r: Array3<f32> =
            Array3::from_shape_fn((2, 5, 3), |(n, t, f)| ((n + t + f) as f32 * 0.5).sin());

        // objective = sum(y * r), which is linear in the parameters
        let objective = |conv: &mut Conv1d, params: &[f32]| -> f32 {
            let y = conv.forward(params, x.clone().into_dyn()).unwrap();
            (&y * &r.clone().into_dyn()).sum()
        };

        let mut grad = vec![0.0; conv.size()];
        conv.forward(&params, x.clone().into_dyn()).unwrap();
        conv.backward(&params, &mut grad, r.clone().into_dyn()).unwrap();

        let eps = 1e-2;
        for i in 0..params.len() {
            let mut plus = params.clone();
            plus[i] += eps;
            let mut minus = params.clone();
            minus[i] -= eps;

            let numeric = (objective(&mut conv, &plus) - objective(&mut conv, &minus)) / (2. * eps);
            assert!(
                (numeric - grad[i]).abs() < 1e-2,
                "param {i}: numeric {numeric} vs analytic {}",
                grad[i]
            );
        }
    }

    #[test]
    fn rejects_wrong_channels() {
        let mut conv = Conv1d::new((4, 2), 1, 3);
        let params = vec![0.0; conv.size()];
        let x = Array3::<f32>::zeros((1, 4, 1)).into_dyn();

        assert!(conv.forward(&params, x).is_err());
    }
}
