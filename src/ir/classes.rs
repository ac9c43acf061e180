//! Canonical class table and free-text label resolution.
//!
//! Annotation documents collected from different sources spell the same
//! defect class in many ways (`"Oil spot"`, `"oil_spot"`, `"4"`). The
//! [`ClassTable`] maps every accepted spelling onto a closed, contiguous
//! class index space that the trainer understands.

use std::collections::HashMap;
use std::fmt;

use crate::error::PrepError;

/// Canonical display names of the GC10-DET steel surface defect classes.
const DEFAULT_CLASS_NAMES: [&str; 10] = [
    "Punching",
    "Weld_line",
    "Crescent_gap",
    "Water_spot",
    "Oil_spot",
    "Silk_spot",
    "Inclusion",
    "Rolled_pit",
    "Crease",
    "Waist_folding",
];

/// Accepted labels, in lookup order for the substring fallback.
///
/// GC10-DET ships some annotations with bare numeric folder ids instead of
/// names, so those come first.
const DEFAULT_SYNONYMS: [(&str, usize); 20] = [
    ("1", 0),
    ("2", 1),
    ("3", 2),
    ("4", 3),
    ("5", 4),
    ("6", 5),
    ("7", 6),
    ("8", 7),
    ("9", 8),
    ("10", 9),
    ("punching", 0),
    ("weld_line", 1),
    ("crescent_gap", 2),
    ("water_spot", 3),
    ("oil_spot", 4),
    ("silk_spot", 5),
    ("inclusion", 6),
    ("rolled_pit", 7),
    ("crease", 8),
    ("waist_folding", 9),
];

/// Index into the canonical class table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClassIndex(usize);

impl ClassIndex {
    #[inline]
    pub fn as_usize(self) -> usize {
        self.0
    }
}

impl fmt::Display for ClassIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Immutable class table shared by label resolution and the manifest.
#[derive(Clone, Debug)]
pub struct ClassTable {
    names: Vec<String>,
    synonyms: Vec<(String, ClassIndex)>,
    exact: HashMap<String, ClassIndex>,
}

impl ClassTable {
    /// Builds a table from display names and `(label, index)` synonyms.
    ///
    /// Synonym labels are normalized with [`normalize_label`]; their order is
    /// kept and decides which class wins a substring match.
    pub fn new<N, S>(names: N, synonyms: S) -> Result<Self, PrepError>
    where
        N: IntoIterator,
        N::Item: Into<String>,
        S: IntoIterator<Item = (String, usize)>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(PrepError::ClassTableInvalid {
                message: "class table must define at least one class".to_string(),
            });
        }

        for (index, name) in names.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(PrepError::ClassTableInvalid {
                    message: format!("class {index} has an empty name"),
                });
            }
            if names[..index].contains(name) {
                return Err(PrepError::ClassTableInvalid {
                    message: format!("class name '{name}' is defined more than once"),
                });
            }
        }

        let mut ordered = Vec::new();
        let mut exact = HashMap::new();
        for (label, index) in synonyms {
            if index >= names.len() {
                return Err(PrepError::ClassTableInvalid {
                    message: format!(
                        "synonym '{label}' maps to class {index}, but only {} class(es) are defined",
                        names.len()
                    ),
                });
            }

            let key = normalize_label(&label);
            if key.is_empty() {
                return Err(PrepError::ClassTableInvalid {
                    message: "synonym labels must not be blank".to_string(),
                });
            }

            // First declaration wins, mirroring the substring scan order.
            if !exact.contains_key(&key) {
                exact.insert(key.clone(), ClassIndex(index));
                ordered.push((key, ClassIndex(index)));
            }
        }

        Ok(Self {
            names,
            synonyms: ordered,
            exact,
        })
    }

    /// Resolves a free-text label to a class index.
    ///
    /// Tries an exact match on the normalized label first, then returns the
    /// first synonym (in declaration order) contained in it. `None` means the
    /// label is unresolved; this is total and never fails.
    pub fn resolve(&self, label: &str) -> Option<ClassIndex> {
        let normalized = normalize_label(label);
        if normalized.is_empty() {
            return None;
        }

        if let Some(index) = self.exact.get(&normalized) {
            return Some(*index);
        }

        self.synonyms
            .iter()
            .find(|(key, _)| normalized.contains(key.as_str()))
            .map(|(_, index)| *index)
    }

    /// Number of canonical classes.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, index: ClassIndex) -> Option<&str> {
        self.names.get(index.0).map(String::as_str)
    }

    /// Display names in index order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Normalized synonyms in lookup order.
    pub fn synonyms(&self) -> impl Iterator<Item = (&str, ClassIndex)> {
        self.synonyms.iter().map(|(key, index)| (key.as_str(), *index))
    }

    pub fn index(&self, raw: usize) -> Option<ClassIndex> {
        (raw < self.names.len()).then_some(ClassIndex(raw))
    }
}

impl Default for ClassTable {
    fn default() -> Self {
        let names = DEFAULT_CLASS_NAMES.iter().map(|name| name.to_string()).collect();
        let synonyms: Vec<(String, ClassIndex)> = DEFAULT_SYNONYMS
            .iter()
            .map(|(label, index)| (label.to_string(), ClassIndex(*index)))
            .collect();
        let exact = synonyms.iter().cloned().collect();

        Self {
            names,
            synonyms,
            exact,
        }
    }
}

/// Lower-cases a label and joins its whitespace-separated words with `_`.
pub fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}
