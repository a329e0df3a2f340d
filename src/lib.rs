pub mod config;
pub mod cv;
pub mod dataset;
pub mod error;
pub mod factory;
pub mod folds;
pub mod grid;
pub mod guard;
pub mod partition;
pub mod pipeline;
pub mod report;
pub mod reproducibility;

pub use config::Config;
pub use error::{GridErr, Result};
pub use factory::{CnnFactory, ModelFactory, Trainable};
pub use pipeline::{BatchOutcome, BatchState, GridSearch};
