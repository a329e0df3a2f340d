use std::path::Path;

use log::info;
use machine_learning::Series;

use crate::{GridErr, Result, config::DatasetConfig};

/// Loads the input series from a headerless CSV file.
///
/// Every record holds `timesteps * channels` features, timestep major, followed by the target.
///
/// # Arguments
/// * `path` - The path of the CSV file.
/// * `config` - The shape of every sample.
///
/// # Returns
/// The series or an error if the file can't be read or a record is malformed.
pub fn load_series<P: AsRef<Path>>(path: P, config: &DatasetConfig) -> Result<Series> {
    let path = path.as_ref();
    let dataset_err = |msg: String| GridErr::Dataset(format!("{}: {msg}", path.display()));

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| dataset_err(e.to_string()))?;

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|e| dataset_err(e.to_string()))?;
        let row = record
            .iter()
            .map(|field| field.parse::<f32>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| dataset_err(format!("record {}: {e}", line + 1)))?;
        rows.push(row);
    }

    let series = Series::from_rows(&rows, config.timesteps, config.channels)
        .map_err(|e| dataset_err(e.to_string()))?;
    info!("loaded {} samples from {}", series.len(), path.display());
    Ok(series)
}
