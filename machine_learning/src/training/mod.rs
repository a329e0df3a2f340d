mod callbacks;
mod history;

pub use callbacks::{Callback, CallbackAction, EarlyStopping, EpochLogs};
pub use history::History;

/// How a single `fit` call iterates over its training data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitOptions {
    pub epochs: usize,
    pub batch_size: usize,
}

impl FitOptions {
    pub fn new(epochs: usize, batch_size: usize) -> Self {
        Self { epochs, batch_size }
    }
}
