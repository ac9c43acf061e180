//! Where the raw dataset comes from.
//!
//! Acquisition itself (downloads, archive extraction) happens elsewhere; the
//! pipeline only needs a local directory once it is complete.

use std::path::{Path, PathBuf};

use crate::error::PrepError;

/// Yields the local directory holding annotation documents and images.
pub trait DatasetSource {
    /// Make the dataset available locally and return its root.
    ///
    /// Errors here are fatal; no pipeline work starts.
    fn fetch(&self) -> Result<PathBuf, PrepError>;
}

/// A dataset that is already on local disk.
#[derive(Clone, Debug)]
pub struct LocalDirSource {
    root: PathBuf,
}

impl LocalDirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl DatasetSource for LocalDirSource {
    fn fetch(&self) -> Result<PathBuf, PrepError> {
        if !self.root.exists() {
            return Err(PrepError::DatasetFetch {
                path: self.root.clone(),
                message: "directory does not exist".to_string(),
            });
        }
        if !self.root.is_dir() {
            return Err(PrepError::DatasetFetch {
                path: self.root.clone(),
                message: "not a directory".to_string(),
            });
        }
        std::path::absolute(&self.root).map_err(|source| PrepError::DatasetFetch {
            path: self.root.clone(),
            message: format!("cannot resolve absolute path: {source}"),
        })
    }
}
