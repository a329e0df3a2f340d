use serde::{Deserialize, Serialize};

/// Per-epoch metric values of one training run, keyed by metric name in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    metrics: Vec<(String, Vec<f64>)>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the values of one finished epoch.
    ///
    /// Metrics that were not seen before are added after the existing ones.
    pub fn push_epoch<'a, I>(&mut self, logs: I)
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        for (name, value) in logs {
            match self.metrics.iter_mut().find(|(n, _)| n == name) {
                Some((_, values)) => values.push(value),
                None => self.metrics.push((name.to_string(), vec![value])),
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.metrics
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, values)| values.as_slice())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.metrics.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.metrics.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
    }

    /// Returns the amount of recorded epochs, the length of the longest metric.
    pub fn epochs(&self) -> usize {
        self.metrics.iter().map(|(_, v)| v.len()).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.epochs() == 0
    }

    /// Averages several histories epoch by epoch.
    ///
    /// Each epoch is averaged over the histories that reached it, so early stopped runs only
    /// contribute to the epochs they trained.
    ///
    /// # Arguments
    /// * `histories` - The histories to average.
    ///
    /// # Returns
    /// A history with the union of the metric names, in order of first appearance.
    pub fn mean_of(histories: &[History]) -> History {
        let mut mean = History::new();

        for history in histories {
            for (name, _) in &history.metrics {
                if mean.get(name).is_none() {
                    mean.metrics.push((name.clone(), Vec::new()));
                }
            }
        }

        for (name, values) in mean.metrics.iter_mut() {
            let runs: Vec<&[f64]> = histories.iter().filter_map(|h| h.get(name)).collect();
            let epochs = runs.iter().map(|r| r.len()).max().unwrap_or(0);

            *values = (0..epochs)
                .map(|e| {
                    let reached: Vec<f64> = runs.iter().filter_map(|r| r.get(e).copied()).collect();
                    reached.iter().sum::<f64>() / reached.len() as f64
                })
                .collect();
        }

        mean
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_insertion_order() {
        let mut history = History::new();
        history.push_epoch([("loss", 3.), ("MAE", 2.), ("RMSE", 1.)]);
        history.push_epoch([("loss", 2.), ("MAE", 1.), ("RMSE", 0.5)]);

        assert_eq!(history.keys().collect::<Vec<_>>(), ["loss", "MAE", "RMSE"]);
        assert_eq!(history.get("loss"), Some(&[3., 2.][..]));
        assert_eq!(history.epochs(), 2);
    }

    #[test]
    fn mean_over_folds_that_reached_the_epoch() {
        let mut a = History::new();
        a.push_epoch([("loss", 2.)]);
        a.push_epoch([("loss", 4.)]);

        let mut b = History::new();
        b.push_epoch([("loss", 4.)]);

        let mean = History::mean_of(&[a, b]);
        assert_eq!(mean.get("loss"), Some(&[3., 4.][..]));
    }

    #[test]
    fn mean_of_nothing_is_empty() {
        assert!(History::mean_of(&[]).is_empty());
    }
}
