//! Finding the image that belongs to an annotation document.
//!
//! Datasets disagree on where images live: next to their XML file, in a
//! sibling `images/` folder, or somewhere else entirely. The locator tries an
//! explicit, ordered list of strategies and returns the first hit.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::ir::io_voc_xml::document_stem;

/// Accepted image extensions, in priority order.
pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

/// One way of looking for an image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocateStrategy {
    /// `<document dir>/<document stem>.<ext>` for each accepted extension.
    Sibling,
    /// First file under the dataset root, in file-name order, whose stem is
    /// the document stem and whose extension is accepted.
    Recursive,
}

/// Ordered image lookup.
#[derive(Clone, Debug)]
pub struct ImageLocator {
    strategies: Vec<LocateStrategy>,
    exclude: Vec<PathBuf>,
}

impl Default for ImageLocator {
    fn default() -> Self {
        Self::new(vec![LocateStrategy::Sibling, LocateStrategy::Recursive])
    }
}

impl ImageLocator {
    pub fn new(strategies: Vec<LocateStrategy>) -> Self {
        Self {
            strategies,
            exclude: Vec::new(),
        }
    }

    /// Never return images from below `dir`, e.g. the output split trees.
    pub fn excluding(mut self, dir: impl Into<PathBuf>) -> Self {
        self.exclude.push(dir.into());
        self
    }

    /// Locate the image for `document` under `dataset_root`.
    pub fn locate(&self, document: &Path, dataset_root: &Path) -> Option<PathBuf> {
        let stem = document_stem(document)?;
        self.strategies.iter().find_map(|strategy| match strategy {
            LocateStrategy::Sibling => {
                let dir = document.parent().unwrap_or_else(|| Path::new("."));
                find_sibling(dir, stem)
            }
            LocateStrategy::Recursive => {
                find_recursive(dataset_root, stem, &self.exclude)
            }
        })
    }
}

fn find_sibling(dir: &Path, stem: &str) -> Option<PathBuf> {
    IMAGE_EXTENSIONS
        .iter()
        .flat_map(|ext| [ext.to_string(), ext.to_ascii_uppercase()])
        .map(|ext| dir.join(format!("{stem}.{ext}")))
        .find(|candidate| candidate.is_file())
}

fn find_recursive(root: &Path, stem: &str, exclude: &[PathBuf]) -> Option<PathBuf> {
    WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !exclude.iter().any(|excluded| entry.path().starts_with(excluded)))
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .find(|path| document_stem(path) == Some(stem) && has_image_extension(path))
}

/// True if the path has one of [`IMAGE_EXTENSIONS`] (case-insensitive).
pub fn has_image_extension(path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };

    IMAGE_EXTENSIONS
        .iter()
        .any(|allowed| ext.eq_ignore_ascii_case(allowed))
}
