use machine_learning::GlorotNormal;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::{Result, config::TrainingParams};

/// The seed and thread settings of a run.
///
/// A plain value: it hands out seeded initializers and local thread pools instead of touching any
/// process wide random or threading state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reproducibility {
    pub seed: u64,
    pub workers: usize,
}

impl Reproducibility {
    pub fn new(seed: u64, workers: usize) -> Self {
        Self { seed, workers }
    }

    pub fn from_training(training: &TrainingParams) -> Self {
        Self::new(training.seed, training.workers)
    }

    /// Returns the initializer every model of the run is built with.
    pub fn initializer(&self) -> GlorotNormal {
        GlorotNormal::new(self.seed)
    }

    /// Builds a local thread pool when more than one worker is configured.
    ///
    /// # Returns
    /// `None` for sequential runs, or an error if the pool can't be started.
    pub fn thread_pool(&self) -> Result<Option<ThreadPool>> {
        if self.workers <= 1 {
            return Ok(None);
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("grid-worker-{i}"))
            .build()?;
        Ok(Some(pool))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_worker_runs_sequentially() {
        let repro = Reproducibility::new(123, 1);
        assert!(repro.thread_pool().unwrap().is_none());
    }

    #[test]
    fn builds_a_local_pool() {
        let pool = Reproducibility::new(123, 3).thread_pool().unwrap().unwrap();
        assert_eq!(pool.current_num_threads(), 3);
    }

    #[test]
    fn initializer_uses_the_seed() {
        assert_eq!(Reproducibility::new(7, 1).initializer(), GlorotNormal::new(7));
    }
}
