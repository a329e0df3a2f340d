use std::{fmt, fs, path::Path, path::PathBuf, str::FromStr};

use machine_learning::training::{Callback, EarlyStopping};
use serde::{Deserialize, Serialize};

use crate::{GridErr, Result};

/// The enumerable ranges of the five hyperparameters of the grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HyperParams {
    pub filter_num1: Vec<usize>,
    pub filter_num2: Vec<usize>,
    pub num_of_dense: Vec<usize>,
    pub dense_len1: Vec<usize>,
    pub dense_len2: Vec<usize>,
}

impl HyperParams {
    /// Returns every range along with its name, outermost first.
    pub fn ranges(&self) -> [(&'static str, &[usize]); 5] {
        [
            ("filter_num1", &self.filter_num1),
            ("filter_num2", &self.filter_num2),
            ("num_of_dense", &self.num_of_dense),
            ("dense_len1", &self.dense_len1),
            ("dense_len2", &self.dense_len2),
        ]
    }

    /// Returns the amount of combinations of the full grid, or `None` if it overflows `usize`.
    pub fn grid_len(&self) -> Option<usize> {
        self.ranges()
            .iter()
            .try_fold(1usize, |acc, (_, r)| acc.checked_mul(r.len()))
    }
}

/// Which fold histories end up in the report of a model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoldPolicy {
    /// Only the history of the last fold is kept.
    #[default]
    LastFold,
    /// The per-epoch mean of every fold's history.
    MeanOfFolds,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingParams {
    pub initial_learning_rate: f32,
    pub epochs: usize,
    pub batch_size: usize,
    pub folds: usize,
    pub partition_length: usize,
    pub filter_size: usize,
    pub seed: u64,
    pub fold_policy: FoldPolicy,
    pub workers: usize,
    pub output_dir: PathBuf,
    pub early_stopping: Option<EarlyStopping>,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            initial_learning_rate: 0.001,
            epochs: 100,
            batch_size: 32,
            folds: 5,
            partition_length: 60,
            filter_size: 5,
            seed: 123,
            fold_policy: FoldPolicy::LastFold,
            workers: 1,
            output_dir: PathBuf::from("."),
            early_stopping: None,
        }
    }
}

/// The shape of every sample of the input series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub timesteps: usize,
    pub channels: usize,
}

impl DatasetConfig {
    pub fn input_shape(&self) -> (usize, usize) {
        (self.timesteps, self.channels)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum RunningMode {
    /// Every combination of the grid.
    #[default]
    Full,
    /// Only the first few combinations, to validate the pipeline quickly.
    Test,
}

impl FromStr for RunningMode {
    type Err = GridErr;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "full" => Ok(Self::Full),
            "test" => Ok(Self::Test),
            other => Err(GridErr::InvalidMode(other.to_string())),
        }
    }
}

impl TryFrom<String> for RunningMode {
    type Error = GridErr;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl fmt::Display for RunningMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Test => write!(f, "test"),
        }
    }
}

/// The whole configuration of a grid search run, read once at start up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub hyper_params: HyperParams,
    #[serde(default)]
    pub training: TrainingParams,
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub mode: RunningMode,
}

impl Config {
    /// Reads and validates a JSON configuration file.
    ///
    /// # Arguments
    /// * `path` - The path of the configuration document.
    ///
    /// # Returns
    /// The configuration or an error if it can't be read, parsed or is invalid.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(GridErr::persistence(path))?;
        Self::from_json_str(&raw)
    }

    /// Parses and validates a JSON configuration document.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every value of the configuration, without building anything.
    pub fn validate(&self) -> Result<()> {
        for (name, range) in self.hyper_params.ranges() {
            if range.is_empty() {
                return Err(GridErr::EmptyRange(name));
            }
        }

        let hp = &self.hyper_params;
        let widths = [
            ("filter_num1", &hp.filter_num1),
            ("filter_num2", &hp.filter_num2),
            ("dense_len1", &hp.dense_len1),
            ("dense_len2", &hp.dense_len2),
        ];
        for (name, range) in widths {
            if range.contains(&0) {
                return Err(invalid(format!("{name} values must be positive")));
            }
        }

        let t = &self.training;
        if !t.initial_learning_rate.is_finite() || t.initial_learning_rate <= 0. {
            return Err(invalid("initial_learning_rate must be a positive number"));
        }

        let positive = [
            ("epochs", t.epochs),
            ("batch_size", t.batch_size),
            ("partition_length", t.partition_length),
            ("workers", t.workers),
            ("timesteps", self.dataset.timesteps),
            ("channels", self.dataset.channels),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(invalid(format!("{name} must be positive")));
            }
        }

        if t.folds < 2 {
            return Err(invalid("folds must be at least 2"));
        }

        // The second convolution uses half the kernel.
        if t.filter_size < 2 {
            return Err(invalid("filter_size must be at least 2"));
        }

        // Two poolings halve the sequence twice.
        if self.dataset.timesteps < 4 {
            return Err(invalid("timesteps must be at least 4"));
        }

        Ok(())
    }

    /// Builds the callbacks every fit of the run is given.
    pub fn callbacks(&self) -> Vec<Box<dyn Callback>> {
        self.training
            .early_stopping
            .iter()
            .map(|es| Box::new(es.clone()) as Box<dyn Callback>)
            .collect()
    }
}

fn invalid(msg: impl Into<String>) -> GridErr {
    GridErr::InvalidConfig(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"{
        "hyper_params": {
            "filter_num1": [4, 8],
            "filter_num2": [2],
            "num_of_dense": [1],
            "dense_len1": [16],
            "dense_len2": [16]
        },
        "training": { "epochs": 3, "fold_policy": "mean_of_folds" },
        "dataset": { "timesteps": 8, "channels": 1 }
    }"#;

    #[test]
    fn fills_defaults() {
        let config = Config::from_json_str(CONFIG).unwrap();

        assert_eq!(config.training.epochs, 3);
        assert_eq!(config.training.batch_size, 32);
        assert_eq!(config.training.partition_length, 60);
        assert_eq!(config.training.folds, 5);
        assert_eq!(config.training.seed, 123);
        assert_eq!(config.training.fold_policy, FoldPolicy::MeanOfFolds);
        assert_eq!(config.mode, RunningMode::Full);
        assert_eq!(config.hyper_params.grid_len(), Some(2));
        assert!(config.callbacks().is_empty());
    }

    #[test]
    fn rejects_invalid_mode() {
        let raw = CONFIG.replacen('{', r#"{ "mode": "quick","#, 1);
        let err = Config::from_json_str(&raw).unwrap_err();
        assert!(err.to_string().contains("not valid"));

        assert!(matches!(
            "quick".parse::<RunningMode>(),
            Err(GridErr::InvalidMode(_))
        ));
    }

    #[test]
    fn parses_test_mode() {
        let raw = CONFIG.replacen('{', r#"{ "mode": "test","#, 1);
        let config = Config::from_json_str(&raw).unwrap();
        assert_eq!(config.mode, RunningMode::Test);
    }

    #[test]
    fn rejects_empty_range() {
        let raw = CONFIG.replace(r#""filter_num2": [2]"#, r#""filter_num2": []"#);
        let err = Config::from_json_str(&raw).unwrap_err();
        assert!(matches!(err, GridErr::EmptyRange("filter_num2")));
    }

    #[test]
    fn rejects_single_fold() {
        let raw = CONFIG.replace(r#""epochs": 3"#, r#""epochs": 3, "folds": 1"#);
        let err = Config::from_json_str(&raw).unwrap_err();
        assert!(matches!(err, GridErr::InvalidConfig(_)));
    }

    #[test]
    fn early_stopping_becomes_a_callback() {
        let raw = CONFIG.replace(
            r#""epochs": 3"#,
            r#""epochs": 3, "early_stopping": { "patience": 2 }"#,
        );
        let config = Config::from_json_str(&raw).unwrap();

        let es = config.training.early_stopping.as_ref().unwrap();
        assert_eq!(es.monitor, "val_loss");
        assert_eq!(es.patience, 2);
        assert_eq!(config.callbacks().len(), 1);
    }
}
