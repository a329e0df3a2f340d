use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

use ndarray::ShapeError;

/// The result type used in the entire machine learning module.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The machine learning module's error type.
#[derive(Debug)]
pub enum MlErr {
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    Shape(ShapeError),
    InvalidInput(String),
    InvalidInitializer(String),
    NonFinite {
        epoch: usize,
        metric: String,
    },
    Io(io::Error),
    Serde(serde_json::Error),
}

impl MlErr {
    /// Shorthand for building an `InvalidInput` error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "size mismatch for {what}: got {got}, expected {expected}"
            ),
            MlErr::Shape(e) => write!(f, "shape error: {e}"),
            MlErr::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            MlErr::InvalidInitializer(msg) => write!(f, "invalid initializer: {msg}"),
            MlErr::NonFinite { epoch, metric } => {
                write!(f, "{metric} became non-finite at epoch {epoch}")
            }
            MlErr::Io(e) => write!(f, "io error: {e}"),
            MlErr::Serde(e) => write!(f, "serialization error: {e}"),
        }
    }
}

impl Error for MlErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MlErr::Shape(e) => Some(e),
            MlErr::Io(e) => Some(e),
            MlErr::Serde(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ShapeError> for MlErr {
    fn from(value: ShapeError) -> Self {
        Self::Shape(value)
    }
}

impl From<io::Error> for MlErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for MlErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Serde(value)
    }
}
