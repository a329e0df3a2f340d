pub mod arch;
pub mod dataset;
pub mod error;
pub mod initialization;
mod network;
pub mod optimization;
pub mod training;

pub use dataset::{Series, SeriesView};
pub use error::{MlErr, Result};
pub use initialization::GlorotNormal;
pub use network::Network;
