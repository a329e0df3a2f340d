use std::ops::Range;

use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis, s};

use crate::{MlErr, Result};

/// A supervised time series: `(samples, timesteps, channels)` windows and one target per window.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    x: Array3<f32>,
    y: Array2<f32>,
}

/// A borrowed, contiguous range of samples of a `Series`.
#[derive(Debug, Clone, Copy)]
pub struct SeriesView<'a> {
    pub x: ArrayView3<'a, f32>,
    pub y: ArrayView2<'a, f32>,
}

impl Series {
    /// Creates a new `Series`.
    ///
    /// # Arguments
    /// * `x` - The features, shaped `(samples, timesteps, channels)`.
    /// * `y` - The targets, shaped `(samples, 1)`.
    ///
    /// # Returns
    /// An error if the amount of samples differ or the targets are not a single column.
    pub fn new(x: Array3<f32>, y: Array2<f32>) -> Result<Self> {
        if x.len_of(Axis(0)) != y.nrows() {
            return Err(MlErr::SizeMismatch {
                what: "series targets",
                got: y.nrows(),
                expected: x.len_of(Axis(0)),
            });
        }

        if y.ncols() != 1 {
            return Err(MlErr::SizeMismatch {
                what: "target columns",
                got: y.ncols(),
                expected: 1,
            });
        }

        Ok(Self { x, y })
    }

    /// Builds a series out of flat rows, each holding `timesteps * channels` features followed by
    /// the target.
    ///
    /// # Arguments
    /// * `rows` - The raw records.
    /// * `timesteps` - The length of every window.
    /// * `channels` - The amount of features per timestep.
    ///
    /// # Returns
    /// An error if any row has the wrong length.
    pub fn from_rows(rows: &[Vec<f32>], timesteps: usize, channels: usize) -> Result<Self> {
        let features = timesteps * channels;

        let mut x = Vec::with_capacity(rows.len() * features);
        let mut y = Vec::with_capacity(rows.len());
        for row in rows {
            if row.len() != features + 1 {
                return Err(MlErr::SizeMismatch {
                    what: "record fields",
                    got: row.len(),
                    expected: features + 1,
                });
            }

            x.extend_from_slice(&row[..features]);
            y.push(row[features]);
        }

        let n = rows.len();
        Self::new(
            Array3::from_shape_vec((n, timesteps, channels), x)?,
            Array2::from_shape_vec((n, 1), y)?,
        )
    }

    pub fn len(&self) -> usize {
        self.y.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the `(timesteps, channels)` shape of a single sample.
    pub fn input_shape(&self) -> (usize, usize) {
        let (_, steps, channels) = self.x.dim();
        (steps, channels)
    }

    pub fn view(&self) -> SeriesView<'_> {
        SeriesView {
            x: self.x.view(),
            y: self.y.view(),
        }
    }

    /// Borrows the samples in `range`.
    ///
    /// # Returns
    /// An error if the range falls outside of the series.
    pub fn slice(&self, range: Range<usize>) -> Result<SeriesView<'_>> {
        if range.start > range.end || range.end > self.len() {
            return Err(MlErr::invalid(format!(
                "range {range:?} out of a series of {} samples",
                self.len()
            )));
        }

        Ok(SeriesView {
            x: self.x.slice(s![range.clone(), .., ..]),
            y: self.y.slice(s![range, ..]),
        })
    }
}

impl SeriesView<'_> {
    pub fn len(&self) -> usize {
        self.y.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<Vec<f32>> {
        (0..4)
            .map(|i| {
                let i = i as f32;
                vec![i, i + 0.5, i + 1., i + 1.5, 10. * i]
            })
            .collect()
    }

    #[test]
    fn from_rows_splits_features_and_target() {
        let series = Series::from_rows(&rows(), 2, 2).unwrap();

        assert_eq!(series.len(), 4);
        assert_eq!(series.input_shape(), (2, 2));

        let view = series.view();
        assert_eq!(view.x[[1, 1, 0]], 2.);
        assert_eq!(view.y[[3, 0]], 30.);
    }

    #[test]
    fn slice_keeps_order() {
        let series = Series::from_rows(&rows(), 2, 2).unwrap();
        let view = series.slice(1..3).unwrap();

        assert_eq!(view.len(), 2);
        assert_eq!(view.y.column(0).to_vec(), [10., 20.]);
    }

    #[test]
    fn rejects_out_of_range_slice() {
        let series = Series::from_rows(&rows(), 2, 2).unwrap();
        assert!(series.slice(2..5).is_err());
    }

    #[test]
    fn rejects_short_row() {
        let mut rows = rows();
        rows[2].pop();
        assert!(Series::from_rows(&rows, 2, 2).is_err());
    }
}
