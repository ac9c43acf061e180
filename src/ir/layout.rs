//! On-disk layout of a prepared YOLO dataset.
//!
//! ```text
//! <root>/images/train/*.<ext>
//! <root>/images/val/*.<ext>
//! <root>/labels/train/*.txt
//! <root>/labels/val/*.txt
//! <root>/data.yaml
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::PrepError;

pub const IMAGES_DIR: &str = "images";
pub const LABELS_DIR: &str = "labels";
pub const MANIFEST_FILE: &str = "data.yaml";

/// Dataset partition a document is assigned to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Split {
    Train,
    Val,
}

impl Split {
    pub const ALL: [Split; 2] = [Split::Train, Split::Val];

    /// Directory name used under `images/` and `labels/`.
    pub fn dir_name(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Val => "val",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Paths of a prepared dataset rooted at one output directory.
#[derive(Clone, Debug)]
pub struct DatasetLayout {
    root: PathBuf,
}

impl DatasetLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `images/<split>`, relative to the root.
    pub fn image_rel_dir(split: Split) -> String {
        format!("{IMAGES_DIR}/{}", split.dir_name())
    }

    /// `labels/<split>`, relative to the root.
    pub fn label_rel_dir(split: Split) -> String {
        format!("{LABELS_DIR}/{}", split.dir_name())
    }

    pub fn images_dir(&self, split: Split) -> PathBuf {
        self.root.join(IMAGES_DIR).join(split.dir_name())
    }

    pub fn labels_dir(&self, split: Split) -> PathBuf {
        self.root.join(LABELS_DIR).join(split.dir_name())
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    /// Creates all four split directories.
    pub fn create_dirs(&self) -> Result<(), PrepError> {
        for split in Split::ALL {
            for dir in [self.images_dir(split), self.labels_dir(split)] {
                fs::create_dir_all(&dir).map_err(|source| PrepError::OutputDir {
                    path: dir.clone(),
                    source,
                })?;
            }
        }
        Ok(())
    }

    /// Removes `images/` and `labels/` under the root, if present.
    pub fn clean(&self) -> Result<(), PrepError> {
        for dir in [self.root.join(IMAGES_DIR), self.root.join(LABELS_DIR)] {
            if dir.is_dir() {
                fs::remove_dir_all(&dir).map_err(|source| PrepError::OutputDir {
                    path: dir.clone(),
                    source,
                })?;
            }
        }
        Ok(())
    }
}
