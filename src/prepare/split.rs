//! Seeded train/validation partitioning.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::{rngs::StdRng, SeedableRng};

use crate::error::PrepError;
use crate::ir::Split;

/// Default share of documents held out for validation.
pub const DEFAULT_VAL_FRACTION: f64 = 0.2;

/// Default shuffle seed.
pub const DEFAULT_SEED: u64 = 42;

/// Read-only mapping from document path to split.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SplitAssignment {
    by_document: BTreeMap<PathBuf, Split>,
}

impl SplitAssignment {
    pub fn get(&self, document: &Path) -> Option<Split> {
        self.by_document.get(document).copied()
    }

    pub fn len(&self) -> usize {
        self.by_document.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_document.is_empty()
    }

    /// Documents assigned to `split`, in path order.
    pub fn documents(&self, split: Split) -> impl Iterator<Item = &Path> {
        self.by_document
            .iter()
            .filter(move |(_, assigned)| **assigned == split)
            .map(|(path, _)| path.as_path())
    }

    pub fn count(&self, split: Split) -> usize {
        self.documents(split).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, Split)> {
        self.by_document
            .iter()
            .map(|(path, split)| (path.as_path(), *split))
    }
}

/// Validate split parameters before running.
pub fn validate_fraction(fraction: f64) -> Result<(), PrepError> {
    if !fraction.is_finite() || !(0.0..=1.0).contains(&fraction) {
        return Err(PrepError::InvalidSplitParams {
            message: format!("validation fraction must be within [0.0, 1.0], got {fraction}"),
        });
    }
    Ok(())
}

/// Number of validation documents for `total` documents.
pub fn validation_count(total: usize, fraction: f64) -> usize {
    ((total as f64 * fraction).round() as usize).min(total)
}

/// Partition `documents` into train and validation sets.
///
/// The input is deduplicated and sorted before a seeded shuffle, so the
/// result depends only on the set of paths, `fraction` and `seed`. The first
/// `round(n * fraction)` shuffled documents become validation.
pub fn assign<P: AsRef<Path>>(
    documents: &[P],
    fraction: f64,
    seed: u64,
) -> Result<SplitAssignment, PrepError> {
    validate_fraction(fraction)?;

    let unique: BTreeSet<PathBuf> = documents
        .iter()
        .map(|doc| doc.as_ref().to_path_buf())
        .collect();
    let mut ordered: Vec<PathBuf> = unique.into_iter().collect();

    let val_count = validation_count(ordered.len(), fraction);

    let mut rng = StdRng::seed_from_u64(seed);
    ordered.shuffle(&mut rng);

    let by_document = ordered
        .into_iter()
        .enumerate()
        .map(|(index, path)| {
            let split = if index < val_count {
                Split::Val
            } else {
                Split::Train
            };
            (path, split)
        })
        .collect();

    Ok(SplitAssignment { by_document })
}
