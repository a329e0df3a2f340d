mod glorot;
mod param_gen;
mod random;

pub use glorot::{GlorotNormal, fans};
pub use param_gen::ParamGen;
pub use random::{RandParamGen, TruncatedNormal};
