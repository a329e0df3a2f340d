use std::path::Path;

use machine_learning::training::History;

use crate::Result;

/// Name of the model index column.
pub const MODEL_COLUMN: &str = "models";
/// Name of the epoch column.
pub const EPOCH_COLUMN: &str = "epochs";

#[derive(Debug, Clone, PartialEq)]
struct Row {
    model: usize,
    epoch: usize,
    values: Vec<Option<f64>>,
}

/// A table with one row per model and epoch, and one column per metric.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    metrics: Vec<String>,
    rows: Vec<Row>,
}

impl Report {
    /// Builds the report of a single model.
    ///
    /// # Arguments
    /// * `model` - The global index of the model.
    /// * `history` - The history reported for the model.
    ///
    /// # Returns
    /// A report with one row per epoch, numbered from 1.
    pub fn build(model: usize, history: &History) -> Self {
        let metrics = history.keys().map(str::to_string).collect();
        let rows = (0..history.epochs())
            .map(|e| Row {
                model,
                epoch: e + 1,
                values: history.iter().map(|(_, v)| v.get(e).copied()).collect(),
            })
            .collect();

        Self { metrics, rows }
    }

    /// Concatenates reports row-wise.
    ///
    /// The columns are the union of every report's metrics in order of first appearance; cells of
    /// metrics a report doesn't carry stay empty.
    pub fn concat<I>(reports: I) -> Self
    where
        I: IntoIterator<Item = Report>,
    {
        let mut out = Report::default();

        for report in reports {
            for metric in &report.metrics {
                if !out.metrics.contains(metric) {
                    out.metrics.push(metric.clone());
                }
            }

            let columns: Vec<usize> = report
                .metrics
                .iter()
                .map(|m| out.metrics.iter().position(|o| o == m).unwrap_or_default())
                .collect();

            for row in report.rows {
                let mut values = vec![None; out.metrics.len()];
                for (column, value) in columns.iter().zip(row.values) {
                    values[*column] = value;
                }
                out.rows.push(Row { values, ..row });
            }
        }

        let width = out.metrics.len();
        out.rows.iter_mut().for_each(|r| r.values.resize(width, None));
        out
    }

    /// Returns the header of the report.
    pub fn columns(&self) -> Vec<&str> {
        [MODEL_COLUMN, EPOCH_COLUMN]
            .into_iter()
            .chain(self.metrics.iter().map(String::as_str))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Writes the report as a comma separated file, without an index column.
    ///
    /// # Returns
    /// An error if the file can't be created or written.
    pub fn persist<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(self.columns())?;

        for row in &self.rows {
            let mut record = vec![row.model.to_string(), row.epoch.to_string()];
            record.extend(
                row.values
                    .iter()
                    .map(|v| v.map(|v| v.to_string()).unwrap_or_default()),
            );
            writer.write_record(&record)?;
        }

        writer.flush().map_err(csv::Error::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(metrics: &[&str], epochs: usize) -> History {
        let mut history = History::new();
        for e in 0..epochs {
            history.push_epoch(metrics.iter().map(|m| (*m, e as f64)));
        }
        history
    }

    #[test]
    fn one_row_per_epoch() {
        let report = Report::build(3, &history(&["loss", "MAE", "RMSE"], 4));

        assert_eq!(report.len(), 4);
        assert_eq!(report.columns(), ["models", "epochs", "loss", "MAE", "RMSE"]);
        assert_eq!(report.rows[0].model, 3);
        assert_eq!(report.rows[3].epoch, 4);
    }

    #[test]
    fn concat_unions_columns() {
        let a = Report::build(0, &history(&["loss"], 2));
        let b = Report::build(1, &history(&["loss", "val_loss"], 1));

        let report = Report::concat([a, b]);
        assert_eq!(report.columns(), ["models", "epochs", "loss", "val_loss"]);
        assert_eq!(report.len(), 3);
        assert_eq!(report.rows[0].values, [Some(0.), None]);
        assert_eq!(report.rows[2].values, [Some(0.), Some(0.)]);
    }

    #[test]
    fn persists_without_index_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report60_20240101_000000.csv");

        let a = Report::build(0, &history(&["loss"], 1));
        let b = Report::build(1, &history(&["loss", "MAE"], 1));
        Report::concat([a, b]).persist(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "models,epochs,loss,MAE\n0,1,0,\n1,1,0,0\n");
    }
}
