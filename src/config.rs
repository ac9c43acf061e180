//! Class table files.
//!
//! ```yaml
//! classes: [Punching, Weld_line, Crescent_gap]
//! synonyms:
//!   - { label: "1", class: 0 }
//!   - { label: weld line, class: 1 }
//! ```
//!
//! `synonyms` may be omitted, in which case every class name is accepted as
//! its own (normalized) label. Order matters: the first synonym contained in
//! an otherwise unknown label wins.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::PrepError;
use crate::ir::ClassTable;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ClassTableFile {
    classes: Vec<String>,
    synonyms: Option<Vec<SynonymEntry>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SynonymEntry {
    label: String,
    class: usize,
}

/// Load and validate a class table from a YAML file.
pub fn load_class_table(path: &Path) -> Result<ClassTable, PrepError> {
    let text = fs::read_to_string(path)?;
    parse_class_table(&text, path)
}

/// Parse a class table from YAML text; `path` is used in error messages.
pub fn parse_class_table(text: &str, path: &Path) -> Result<ClassTable, PrepError> {
    let file: ClassTableFile =
        serde_yaml::from_str(text).map_err(|source| PrepError::ClassTableParse {
            path: path.to_path_buf(),
            source,
        })?;

    let synonyms: Vec<(String, usize)> = match file.synonyms {
        Some(entries) => entries
            .into_iter()
            .map(|entry| (entry.label, entry.class))
            .collect(),
        None => file
            .classes
            .iter()
            .cloned()
            .enumerate()
            .map(|(index, name)| (name, index))
            .collect(),
    };

    ClassTable::new(file.classes, synonyms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synonyms_keep_declared_order() {
        let yaml = r#"
classes: [Porosity, Crack]
synonyms:
  - { label: "pore", class: 0 }
  - { label: "crack", class: 1 }
"#;
        let table = parse_class_table(yaml, Path::new("classes.yaml")).expect("parse");
        assert_eq!(table.len(), 2);
        assert_eq!(table.resolve("Pore Cluster").map(|c| c.as_usize()), Some(0));
        // Both keys are substrings; the first declared wins.
        assert_eq!(table.resolve("crack_near_pore").map(|c| c.as_usize()), Some(0));
    }

    #[test]
    fn class_names_are_default_synonyms() {
        let yaml = "classes: [Porosity, Under Cut]\n";
        let table = parse_class_table(yaml, Path::new("classes.yaml")).expect("parse");
        assert_eq!(table.resolve("UNDER   CUT").map(|c| c.as_usize()), Some(1));
    }

    #[test]
    fn out_of_range_synonym_is_invalid() {
        let yaml = "classes: [A]\nsynonyms:\n  - { label: b, class: 3 }\n";
        let err = parse_class_table(yaml, Path::new("classes.yaml")).unwrap_err();
        assert!(matches!(err, PrepError::ClassTableInvalid { .. }));
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let err = parse_class_table("classes: {", Path::new("classes.yaml")).unwrap_err();
        assert!(matches!(err, PrepError::ClassTableParse { .. }));

        let err = parse_class_table("names: [A]\n", Path::new("classes.yaml")).unwrap_err();
        assert!(matches!(err, PrepError::ClassTableParse { .. }));
    }

    #[test]
    fn empty_class_list_is_invalid() {
        let err = parse_class_table("classes: []\n", Path::new("classes.yaml")).unwrap_err();
        assert!(matches!(err, PrepError::ClassTableInvalid { .. }));
    }
}
