mod conv1d;
mod dense;
mod flatten;
mod layer;
mod max_pool;
mod prelu;

pub use conv1d::Conv1d;
pub use dense::Dense;
pub use flatten::Flatten;
pub use layer::Layer;
pub use max_pool::MaxPool1d;
pub use prelu::PRelu;
