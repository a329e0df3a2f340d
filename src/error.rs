use std::{error::Error, fmt, io, path::PathBuf};

use machine_learning::MlErr;

/// The grid search result type.
pub type Result<T> = std::result::Result<T, GridErr>;

/// All errors that can occur while running a grid search.
#[derive(Debug)]
pub enum GridErr {
    /// Invalid configuration, caught before any model is built.
    InvalidConfig(String),
    /// The running mode is neither `full` nor `test`.
    InvalidMode(String),
    /// A hyperparameter range has no values.
    EmptyRange(&'static str),
    /// The configuration document could not be parsed.
    Parse(serde_json::Error),
    /// The input series could not be loaded.
    Dataset(String),
    /// A model could not be built out of its combination.
    Build { combination: usize, source: MlErr },
    /// A model failed while being fitted.
    Training { model: usize, source: MlErr },
    /// A trained model could not be written.
    SaveModel { path: PathBuf, source: MlErr },
    /// A file or directory of the output root could not be accessed.
    Persistence { path: PathBuf, source: io::Error },
    /// A batch report could not be written.
    Report(csv::Error),
    /// The local thread pool could not be started.
    ThreadPool(rayon::ThreadPoolBuildError),
}

impl GridErr {
    pub(crate) fn persistence(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Persistence { path, source }
    }
}

impl fmt::Display for GridErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Self::InvalidMode(mode) => write!(
                f,
                "running mode {mode:?} is not valid, expected \"test\" or \"full\""
            ),
            Self::EmptyRange(name) => write!(f, "hyperparameter range {name} is empty"),
            Self::Parse(e) => write!(f, "config parse error: {e}"),
            Self::Dataset(msg) => write!(f, "dataset error: {msg}"),
            Self::Build {
                combination,
                source,
            } => write!(f, "failed to build combination {combination}: {source}"),
            Self::Training { model, source } => {
                write!(f, "training of model {model} failed: {source}")
            }
            Self::SaveModel { path, source } => {
                write!(f, "failed to save model to {}: {source}", path.display())
            }
            Self::Persistence { path, source } => {
                write!(f, "persistence failure at {}: {source}", path.display())
            }
            Self::Report(e) => write!(f, "report write failure: {e}"),
            Self::ThreadPool(e) => write!(f, "thread pool error: {e}"),
        }
    }
}

impl Error for GridErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(e) => Some(e),
            Self::Build { source, .. }
            | Self::Training { source, .. }
            | Self::SaveModel { source, .. } => Some(source),
            Self::Persistence { source, .. } => Some(source),
            Self::Report(e) => Some(e),
            Self::ThreadPool(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for GridErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

impl From<csv::Error> for GridErr {
    fn from(value: csv::Error) -> Self {
        Self::Report(value)
    }
}

impl From<rayon::ThreadPoolBuildError> for GridErr {
    fn from(value: rayon::ThreadPoolBuildError) -> Self {
        Self::ThreadPool(value)
    }
}
