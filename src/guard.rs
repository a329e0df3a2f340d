use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{GridErr, Result};

/// Decides whether a batch was already processed by looking for its report in the output root.
///
/// The check is best-effort: nothing prevents two concurrent runs from both deciding to train
/// the same batch.
#[derive(Debug, Clone)]
pub struct ResumeGuard {
    root: PathBuf,
}

impl ResumeGuard {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the file name prefix of every report of the batch keyed `key`.
    pub fn prefix(key: usize) -> String {
        format!("report{key}_")
    }

    /// Checks whether a report of the batch keyed `key` exists.
    ///
    /// # Returns
    /// Whether the batch can be skipped, or an error if the output root can't be listed.
    pub fn exists(&self, key: usize) -> Result<bool> {
        let prefix = Self::prefix(key);
        let entries = fs::read_dir(&self.root).map_err(GridErr::persistence(&self.root))?;

        for entry in entries {
            let entry = entry.map_err(GridErr::persistence(&self.root))?;
            if entry.file_name().to_string_lossy().starts_with(&prefix) {
                return Ok(true);
            }
        }

        Ok(false)
    }
}
