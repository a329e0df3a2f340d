use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use chrono::Local;
use log::{info, warn};
use machine_learning::{
    Series,
    training::{Callback, FitOptions},
};
use rayon::ThreadPool;

use crate::{
    GridErr, Result,
    config::Config,
    cv::CrossValidator,
    factory::{ModelFactory, build_all},
    grid::{Combination, combinations},
    guard::ResumeGuard,
    partition::{self, Partition},
    report::Report,
    reproducibility::Reproducibility,
};

/// The format of the timestamp shared by every artifact of a run.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// The lifecycle of a batch. `Skipped` and `Reported` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Pending,
    Skipped,
    Training,
    Saved,
    Reported,
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Skipped => "skipped",
            Self::Training => "training",
            Self::Saved => "saved",
            Self::Reported => "reported",
        };
        write!(f, "{name}")
    }
}

/// What happened to one batch of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub key: usize,
    pub state: BatchState,
    /// The global indices of the models trained in this batch.
    pub models: Vec<usize>,
    /// The report written for this batch, if it was trained.
    pub report: Option<PathBuf>,
}

/// Grid search over the CNN hyperparameters, batch by batch, with resumable progress.
pub struct GridSearch<F: ModelFactory> {
    config: Config,
    factory: F,
    timestamp: String,
    guard: ResumeGuard,
    reproducibility: Reproducibility,
}

impl<F: ModelFactory> GridSearch<F> {
    /// Creates a new `GridSearch`.
    ///
    /// # Arguments
    /// * `config` - The configuration of the run, validated here.
    /// * `factory` - Builds the models of the grid.
    ///
    /// # Returns
    /// An error if the configuration is invalid. Nothing is built or written yet.
    pub fn new(config: Config, factory: F) -> Result<Self> {
        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        Self::with_timestamp(config, factory, timestamp)
    }

    /// Creates a new `GridSearch` whose artifacts carry the given timestamp.
    pub fn with_timestamp(config: Config, factory: F, timestamp: String) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            guard: ResumeGuard::new(&config.training.output_dir),
            reproducibility: Reproducibility::from_training(&config.training),
            config,
            factory,
            timestamp,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    fn root(&self) -> &Path {
        &self.config.training.output_dir
    }

    /// Returns the directory the models of the batch keyed `key` are saved into.
    pub fn models_dir(&self, key: usize) -> PathBuf {
        self.root()
            .join(format!("saved_models{key}_{}", self.timestamp))
    }

    /// Returns the path of the report of the batch keyed `key`.
    pub fn report_path(&self, key: usize) -> PathBuf {
        self.root()
            .join(format!("{}{}.csv", ResumeGuard::prefix(key), self.timestamp))
    }

    pub fn combinations(&self) -> Result<Vec<Combination>> {
        combinations(&self.config.hyper_params, self.config.mode)
    }

    /// Generates every combination, builds its model and splits the models into batches.
    pub fn partitions(&self) -> Result<Vec<Partition<F::Model>>> {
        let combinations = self.combinations()?;
        info!("building {} models", combinations.len());

        let models = build_all(&self.factory, &combinations)?;
        partition::split(models, self.config.training.partition_length)
    }

    fn validator(&self, series: &Series) -> Result<CrossValidator> {
        let t = &self.config.training;
        CrossValidator::new(
            series.len(),
            t.folds,
            FitOptions::new(t.epochs, t.batch_size),
            t.fold_policy,
        )
    }

    /// Processes every batch in key order, skipping the ones that already have a report.
    ///
    /// # Arguments
    /// * `series` - The whole input series.
    /// * `callbacks` - The callbacks every model gets a copy of.
    ///
    /// # Returns
    /// One outcome per batch, or the first failure. Batches reported before a failure stay on
    /// disk and are skipped by the next run.
    pub fn run_auto(
        &self,
        series: &Series,
        callbacks: &[Box<dyn Callback>],
    ) -> Result<Vec<BatchOutcome>> {
        let root = self.root();
        fs::create_dir_all(root).map_err(GridErr::persistence(root))?;

        let partitions = self.partitions()?;
        let pool = self.reproducibility.thread_pool()?;

        let mut outcomes = Vec::with_capacity(partitions.len());
        for partition in partitions {
            let key = partition.key;
            if self.guard.exists(key)? {
                info!("report already exists for batch {key}");
                transition(key, BatchState::Pending, BatchState::Skipped);
                outcomes.push(BatchOutcome {
                    key,
                    state: BatchState::Skipped,
                    models: Vec::new(),
                    report: None,
                });
                continue;
            }

            info!("new report for batch {key}");
            outcomes.push(self.run_batch(partition, series, callbacks, pool.as_ref())?);
        }

        Ok(outcomes)
    }

    /// Trains one explicitly supplied batch, regardless of any existing report.
    ///
    /// # Arguments
    /// * `partition` - The batch to train.
    /// * `series` - The whole input series.
    /// * `callbacks` - The callbacks every model gets a copy of.
    ///
    /// # Returns
    /// The outcome of the batch. A key that is not a positive multiple of the partition length
    /// fails before anything is written.
    pub fn run_manual(
        &self,
        partition: Partition<F::Model>,
        series: &Series,
        callbacks: &[Box<dyn Callback>],
    ) -> Result<BatchOutcome> {
        partition.check(self.config.training.partition_length)?;

        let root = self.root();
        fs::create_dir_all(root).map_err(GridErr::persistence(root))?;

        let pool = self.reproducibility.thread_pool()?;
        self.run_batch(partition, series, callbacks, pool.as_ref())
    }

    fn run_batch(
        &self,
        partition: Partition<F::Model>,
        series: &Series,
        callbacks: &[Box<dyn Callback>],
        pool: Option<&ThreadPool>,
    ) -> Result<BatchOutcome> {
        let key = partition.key;
        let validator = self.validator(series)?;

        let dir = self.models_dir(key);
        fs::create_dir_all(&dir).map_err(GridErr::persistence(&dir))?;

        transition(key, BatchState::Pending, BatchState::Training);
        let histories = validator.train_partition(
            partition,
            self.config.training.partition_length,
            series,
            callbacks,
            &dir,
            pool,
        )?;
        transition(key, BatchState::Training, BatchState::Saved);

        let report = Report::concat(histories.iter().map(|(i, h)| Report::build(*i, h)));
        if report.is_empty() {
            warn!("batch {key} produced an empty report");
        }

        let path = self.report_path(key);
        report.persist(&path)?;
        transition(key, BatchState::Saved, BatchState::Reported);

        Ok(BatchOutcome {
            key,
            state: BatchState::Reported,
            models: histories.into_iter().map(|(i, _)| i).collect(),
            report: Some(path),
        })
    }
}

fn transition(key: usize, from: BatchState, to: BatchState) {
    info!("batch {key}: {from} -> {to}");
}
