use std::{cell::RefCell, rc::Rc};

use rand::Rng;
use rand_distr::{Distribution, Normal};

use super::ParamGen;
use crate::{MlErr, Result};

/// Ratio between the standard deviation of a standard normal truncated at two standard
/// deviations and the one of the untruncated distribution.
const TRUNCATION_STD_RATIO: f32 = 0.879_625_66;

/// A normal distribution whose samples further than two standard deviations from the mean are
/// discarded and drawn again.
#[derive(Debug, Clone, Copy)]
pub struct TruncatedNormal {
    normal: Normal<f32>,
    mean: f32,
    bound: f32,
}

impl TruncatedNormal {
    /// Creates a new `TruncatedNormal`.
    ///
    /// # Arguments
    /// * `mean` - The mean of the distribution.
    /// * `std_dev` - The standard deviation of the *untruncated* distribution.
    ///
    /// # Returns
    /// An error if `std_dev` is not finite (Nan or infinite).
    pub fn new(mean: f32, std_dev: f32) -> Result<Self> {
        let normal =
            Normal::new(mean, std_dev).map_err(|e| MlErr::InvalidInitializer(e.to_string()))?;

        Ok(Self {
            normal,
            mean,
            bound: 2. * std_dev,
        })
    }
}

impl Distribution<f32> for TruncatedNormal {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        loop {
            let v = self.normal.sample(rng);
            if (v - self.mean).abs() <= self.bound {
                return v;
            }
        }
    }
}

/// A parameter generator that follows a certain probabilistic distribution.
pub struct RandParamGen<R: Rng, D: Distribution<f32>> {
    rng: Rc<RefCell<R>>,
    distribution: D,
    remaining: usize,
}

impl<R: Rng, D: Distribution<f32>> RandParamGen<R, D> {
    /// Creates a new `RandParamGen` parameter generator.
    ///
    /// # Arguments
    /// * `rng` - A random number generator.
    /// * `distribution` - The distribution to sample the random numbers from.
    /// * `limit` - The maximum amount of numbers to generate.
    pub fn new(rng: Rc<RefCell<R>>, distribution: D, limit: usize) -> Self {
        Self {
            rng,
            distribution,
            remaining: limit,
        }
    }
}

impl<R: Rng> RandParamGen<R, TruncatedNormal> {
    /// Creates a new `RandParamGen` parameter generator using Glorot (Xavier) truncated normal
    /// initialization.
    ///
    /// # Arguments
    /// * `rng` - A random number generator.
    /// * `limit` - The maximum amount of numbers to generate.
    /// * `fan_in` - The number of input units in the weight tensor.
    /// * `fan_out` - The number of output units in the weight tensor.
    ///
    /// # Returns
    /// An error if the calculated standard deviation is not finite (Nan or infinite).
    pub fn glorot_normal(
        rng: Rc<RefCell<R>>,
        limit: usize,
        fan_in: usize,
        fan_out: usize,
    ) -> Result<Self> {
        let std_dev = (2. / (fan_in + fan_out) as f32).sqrt() / TRUNCATION_STD_RATIO;
        Ok(Self::new(rng, TruncatedNormal::new(0., std_dev)?, limit))
    }
}

impl<R: Rng, D: Distribution<f32>> ParamGen for RandParamGen<R, D> {
    fn sample(&mut self, mut n: usize) -> Option<Vec<f32>> {
        if self.remaining == 0 {
            return None;
        }

        n = n.min(self.remaining);
        self.remaining -= n;

        let mut rng = self.rng.borrow_mut();
        let sample = (0..n).map(|_| self.distribution.sample(&mut *rng)).collect();
        Some(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn seeded_rng() -> Rc<RefCell<StdRng>> {
        Rc::new(RefCell::new(StdRng::seed_from_u64(42)))
    }

    #[test]
    fn empty() {
        let mut param_gen = RandParamGen::glorot_normal(seeded_rng(), 0, 1, 1).unwrap();
        assert!(param_gen.sample(1).is_none());
    }

    #[test]
    fn partial() {
        let mut param_gen = RandParamGen::glorot_normal(seeded_rng(), 10, 4, 4).unwrap();

        let sample = param_gen.sample(7).unwrap();
        assert_eq!(sample.len(), 7);

        let sample = param_gen.sample(7).unwrap();
        assert_eq!(sample.len(), 3);

        assert!(param_gen.sample(1).is_none());
    }

    #[test]
    fn truncated_samples_stay_within_two_std_devs() {
        let dist = TruncatedNormal::new(0., 1.).unwrap();
        let mut param_gen = RandParamGen::new(seeded_rng(), dist, 10_000);

        let sample = param_gen.sample(10_000).unwrap();
        assert!(sample.iter().all(|v| v.abs() <= 2.));
    }

    #[test]
    fn rejects_non_finite_std_dev() {
        assert!(TruncatedNormal::new(0., f32::NAN).is_err());
    }
}
