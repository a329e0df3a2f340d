mod builder;
pub mod layers;
pub mod loss;
pub mod metrics;
mod model;
mod sequential;

pub use builder::{LayerSpec, NetworkSpec};
pub use model::Model;
pub use sequential::Sequential;
