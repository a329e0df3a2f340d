use crate::{GridErr, Result};

/// A contiguous group of models trained and reported together.
///
/// `key` is the cumulative position marker of the batch, `(i + 1) * partition_length` for the
/// `i`-th batch, not the amount of items it holds.
#[derive(Debug)]
pub struct Partition<T> {
    pub key: usize,
    pub items: Vec<T>,
}

impl<T> Partition<T> {
    /// Returns the global index of the item at `position` inside this partition.
    pub fn model_index(&self, position: usize, partition_length: usize) -> usize {
        model_index(position, self.key, partition_length)
    }

    /// Checks that this partition could have come out of [`split`] with `partition_length`.
    ///
    /// # Returns
    /// An error if the key is not a positive multiple of `partition_length` or the partition
    /// holds more than `partition_length` items.
    pub fn check(&self, partition_length: usize) -> Result<()> {
        if partition_length == 0 {
            return Err(GridErr::InvalidConfig(
                "partition_length must be positive".into(),
            ));
        }

        if self.key < partition_length || self.key % partition_length != 0 {
            return Err(GridErr::InvalidConfig(format!(
                "batch key {} is not a positive multiple of the partition length {partition_length}",
                self.key
            )));
        }

        if self.items.len() > partition_length {
            return Err(GridErr::InvalidConfig(format!(
                "batch {} holds {} models, more than the partition length {partition_length}",
                self.key,
                self.items.len()
            )));
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Computes the global index of a model from its position in its batch.
///
/// `key` must be at least `partition_length`, see [`Partition::check`].
pub fn model_index(position: usize, key: usize, partition_length: usize) -> usize {
    position + key - partition_length
}

/// Splits `items` into ordered batches of at most `partition_length` items.
///
/// A sequence no longer than `partition_length` yields a single batch keyed `partition_length`.
///
/// # Arguments
/// * `items` - The ordered sequence to split.
/// * `partition_length` - The maximum amount of items per batch.
///
/// # Returns
/// The batches in order or an error if `partition_length` is zero.
pub fn split<T>(items: Vec<T>, partition_length: usize) -> Result<Vec<Partition<T>>> {
    if partition_length == 0 {
        return Err(GridErr::InvalidConfig(
            "partition_length must be positive".into(),
        ));
    }

    if items.len() <= partition_length {
        return Ok(vec![Partition {
            key: partition_length,
            items,
        }]);
    }

    let mut partitions = Vec::with_capacity(items.len().div_ceil(partition_length));
    let mut rest = items.into_iter().peekable();
    while rest.peek().is_some() {
        let items: Vec<T> = rest.by_ref().take(partition_length).collect();
        partitions.push(Partition {
            key: (partitions.len() + 1) * partition_length,
            items,
        });
    }

    Ok(partitions)
}
