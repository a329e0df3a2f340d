mod loss_fn;
mod mape;

pub use loss_fn::LossFn;
pub use mape::{EPSILON, Mape};
