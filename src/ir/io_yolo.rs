//! Ultralytics-style YOLO label files and `data.yaml` manifest.
//!
//! Label files hold one `<class> <cx> <cy> <w> <h>` row per object with
//! normalized coordinates. The manifest names the dataset root, the
//! per-split image directories and the class index → name table.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::layout::{DatasetLayout, Split, IMAGES_DIR, LABELS_DIR};
use super::{BBoxCxCyWh, ClassIndex, ClassTable, Normalized};
use crate::error::PrepError;

pub const LABEL_EXTENSION: &str = "txt";

/// Fractional digits written for normalized values.
const FLOAT_PRECISION: usize = 6;

/// A class-resolved, normalized object ready to be written.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResolvedRecord {
    pub class: ClassIndex,
    pub bbox: BBoxCxCyWh<Normalized>,
}

/// Format one label row, e.g. `1 0.3 0.35 0.4 0.5`.
pub fn format_label_line(record: &ResolvedRecord) -> String {
    let (cx, cy, w, h) = record.bbox.to_tuple();
    format!(
        "{} {} {} {} {}",
        record.class,
        format_fixed(cx),
        format_fixed(cy),
        format_fixed(w),
        format_fixed(h)
    )
}

/// Fixed-point decimal with [`FLOAT_PRECISION`] digits, trailing zeros trimmed.
pub fn format_fixed(value: f64) -> String {
    // Normalize -0.0 so it never prints as "-0".
    let value = if value == 0.0 { 0.0 } else { value };
    let raw = format!("{:.*}", FLOAT_PRECISION, value);
    if !raw.contains('.') {
        return raw;
    }
    raw.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Render a whole label file, one newline-terminated row per record.
pub fn render_label_file(records: &[ResolvedRecord]) -> String {
    let mut out = String::new();
    for record in records {
        out.push_str(&format_label_line(record));
        out.push('\n');
    }
    out
}

/// A parsed label row.
#[derive(Debug, PartialEq)]
pub struct YoloLabelRow {
    pub class_id: usize,
    pub cx: f64,
    pub cy: f64,
    pub w: f64,
    pub h: f64,
}

/// Parse one label row. Blank lines yield `Ok(None)`.
pub fn parse_label_line(
    line: &str,
    file_path: &Path,
    line_num: usize,
) -> Result<Option<YoloLabelRow>, PrepError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    // Take at most 6 tokens so pathological inputs do not allocate unbounded memory.
    let tokens: Vec<&str> = trimmed.split_whitespace().take(6).collect();

    if tokens.len() != 5 {
        return Err(PrepError::LabelParse {
            path: file_path.to_path_buf(),
            line: line_num,
            message: format!("expected 5 tokens, found {}", tokens.len()),
        });
    }

    let class_id = tokens[0]
        .parse::<usize>()
        .map_err(|_| PrepError::LabelParse {
            path: file_path.to_path_buf(),
            line: line_num,
            message: format!(
                "invalid class_id '{}'; expected non-negative integer",
                tokens[0]
            ),
        })?;

    let cx = parse_f64_token(tokens[1], "x_center", file_path, line_num)?;
    let cy = parse_f64_token(tokens[2], "y_center", file_path, line_num)?;
    let w = parse_f64_token(tokens[3], "width", file_path, line_num)?;
    let h = parse_f64_token(tokens[4], "height", file_path, line_num)?;

    Ok(Some(YoloLabelRow {
        class_id,
        cx,
        cy,
        w,
        h,
    }))
}

/// Fuzz-only entrypoint for single-line label parsing.
#[cfg(feature = "fuzzing")]
pub fn fuzz_parse_label_line(input: &str) -> Result<(), PrepError> {
    let _ = parse_label_line(input, Path::new("<fuzz>"), 1)?;
    Ok(())
}

fn parse_f64_token(
    raw: &str,
    field_name: &str,
    file_path: &Path,
    line_num: usize,
) -> Result<f64, PrepError> {
    raw.parse::<f64>().map_err(|_| PrepError::LabelParse {
        path: file_path.to_path_buf(),
        line: line_num,
        message: format!("invalid {field_name} '{raw}'; expected floating-point number"),
    })
}

/// The descriptor handed to the trainer.
#[derive(Clone, Debug, PartialEq)]
pub struct DatasetManifest {
    pub root: PathBuf,
    pub train_images: String,
    pub val_images: String,
    pub train_labels: String,
    pub val_labels: String,
    /// Class display names in index order.
    pub names: Vec<String>,
}

impl DatasetManifest {
    /// Describe the dataset at `layout` using the canonical class names.
    pub fn new(layout: &DatasetLayout, classes: &ClassTable) -> Self {
        Self {
            root: layout.root().to_path_buf(),
            train_images: DatasetLayout::image_rel_dir(Split::Train),
            val_images: DatasetLayout::image_rel_dir(Split::Val),
            train_labels: DatasetLayout::label_rel_dir(Split::Train),
            val_labels: DatasetLayout::label_rel_dir(Split::Val),
            names: classes.names().to_vec(),
        }
    }

    pub fn image_dir(&self, split: Split) -> &str {
        match split {
            Split::Train => &self.train_images,
            Split::Val => &self.val_images,
        }
    }

    pub fn label_dir(&self, split: Split) -> &str {
        match split {
            Split::Train => &self.train_labels,
            Split::Val => &self.val_labels,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct DataYaml {
    path: String,
    train: String,
    val: String,
    names: DataYamlNames,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum DataYamlNames {
    Mapping(BTreeMap<usize, String>),
    Sequence(Vec<String>),
}

/// Write `data.yaml` atomically.
///
/// The root is made absolute so the trainer can be launched from any
/// working directory.
pub fn write_manifest(path: &Path, manifest: &DatasetManifest) -> Result<(), PrepError> {
    let root = std::path::absolute(&manifest.root).map_err(|source| PrepError::ManifestWrite {
        path: path.to_path_buf(),
        source,
    })?;

    let data = DataYaml {
        path: root.to_string_lossy().into_owned(),
        train: manifest.train_images.clone(),
        val: manifest.val_images.clone(),
        names: DataYamlNames::Mapping(manifest.names.iter().cloned().enumerate().collect()),
    };

    let yaml = serde_yaml::to_string(&data).map_err(PrepError::ManifestSerialize)?;
    write_atomic(path, yaml.as_bytes()).map_err(|source| PrepError::ManifestWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// Read a `data.yaml` manifest.
///
/// Label directories are derived from the image directories the way the
/// trainer does it: the last `images` path component becomes `labels`.
pub fn read_manifest(path: &Path) -> Result<DatasetManifest, PrepError> {
    let data = fs::read_to_string(path)?;
    let parsed: DataYaml =
        serde_yaml::from_str(&data).map_err(|source| PrepError::ManifestParse {
            path: path.to_path_buf(),
            source,
        })?;

    let names = match parsed.names {
        DataYamlNames::Sequence(names) => names,
        DataYamlNames::Mapping(mapping) => {
            if mapping.keys().copied().ne(0..mapping.len()) {
                return Err(PrepError::ClassTableInvalid {
                    message: format!(
                        "class indices in {} are not contiguous from 0",
                        path.display()
                    ),
                });
            }
            mapping.into_values().collect()
        }
    };

    Ok(DatasetManifest {
        root: PathBuf::from(parsed.path),
        train_labels: label_dir_for(&parsed.train),
        val_labels: label_dir_for(&parsed.val),
        train_images: parsed.train,
        val_images: parsed.val,
        names,
    })
}

fn label_dir_for(image_dir: &str) -> String {
    match image_dir.rfind(IMAGES_DIR) {
        Some(pos) => format!(
            "{}{}{}",
            &image_dir[..pos],
            LABELS_DIR,
            &image_dir[pos + IMAGES_DIR.len()..]
        ),
        None => image_dir.to_string(),
    }
}

/// Write `contents` to a hidden temporary sibling, then rename into place.
///
/// Readers never observe a partially written file.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let tmp = temp_sibling(path);
    let result = fs::File::create(&tmp).and_then(|mut file| {
        file.write_all(contents)?;
        file.sync_all()
    });
    finish_atomic(&tmp, path, result)
}

/// Copy `src` to a hidden temporary sibling of `dst`, then rename into place.
pub(crate) fn copy_atomic(src: &Path, dst: &Path) -> std::io::Result<()> {
    let tmp = temp_sibling(dst);
    let result = fs::copy(src, &tmp).map(|_| ());
    finish_atomic(&tmp, dst, result)
}

fn finish_atomic(tmp: &Path, dst: &Path, written: std::io::Result<()>) -> std::io::Result<()> {
    match written.and_then(|()| fs::rename(tmp, dst)) {
        Ok(()) => Ok(()),
        Err(err) => {
            let _ = fs::remove_file(tmp);
            Err(err)
        }
    }
}

/// Fixed per-destination name: concurrent writers must never share a
/// destination, which holds as long as each stem is materialized once per run.
fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.tmp"))
}
