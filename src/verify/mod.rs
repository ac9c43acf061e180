//! Verification of a prepared dataset against what the trainer expects.
//!
//! Checks the manifest, the pairing of images and label files in each split,
//! and every label row. All findings are collected in a [`VerifyReport`];
//! nothing here modifies the dataset.

mod report;

pub use report::{IssueCode, IssueContext, Severity, VerifyIssue, VerifyReport};

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::PrepError;
use crate::ir::io_voc_xml::document_stem;
use crate::ir::io_yolo::{parse_label_line, read_manifest, LABEL_EXTENSION};
use crate::ir::layout::MANIFEST_FILE;
use crate::ir::{DatasetManifest, Split};
use crate::prepare::locate::has_image_extension;

/// Options for verification behavior.
#[derive(Clone, Debug, Default)]
pub struct VerifyOptions {
    /// If true, warnings fail verification too.
    pub strict: bool,
}

/// Files of one split, keyed by stem.
#[derive(Default)]
struct SplitFiles {
    images: BTreeMap<String, Vec<PathBuf>>,
    labels: BTreeMap<String, PathBuf>,
}

/// Verify the dataset rooted at `root`.
///
/// Only I/O errors while listing directories are returned as `Err`; every
/// problem with the dataset itself becomes an issue in the report.
pub fn verify_dataset(root: &Path, opts: &VerifyOptions) -> Result<VerifyReport, PrepError> {
    let mut report = VerifyReport {
        strict: opts.strict,
        ..VerifyReport::new()
    };

    let manifest_path = root.join(MANIFEST_FILE);
    let manifest = match read_manifest(&manifest_path) {
        Ok(manifest) => manifest,
        Err(err) => {
            report.add(VerifyIssue::error(
                IssueCode::ManifestUnreadable,
                err.to_string(),
                IssueContext::file(&manifest_path),
            ));
            return Ok(report);
        }
    };

    verify_manifest(root, &manifest, &manifest_path, &mut report);

    let mut stems_by_split: HashMap<String, Split> = HashMap::new();
    for split in Split::ALL {
        let Some(files) = collect_split(root, &manifest, split, &mut report)? else {
            continue;
        };

        for (stem, images) in &files.images {
            match split {
                Split::Train => report.images.train += images.len(),
                Split::Val => report.images.val += images.len(),
            }

            if images.len() > 1 {
                report.add(VerifyIssue::error(
                    IssueCode::DuplicateImageStem,
                    format!("{} images share the stem '{stem}'", images.len()),
                    IssueContext::file(&images[0]),
                ));
            }
            if !files.labels.contains_key(stem) {
                report.add(VerifyIssue::error(
                    IssueCode::MissingLabel,
                    "image has no label file",
                    IssueContext::file(&images[0]),
                ));
            }
            if let Some(other) = stems_by_split.insert(stem.clone(), split) {
                report.add(VerifyIssue::error(
                    IssueCode::CrossSplitDuplicate,
                    format!("stem '{stem}' appears in both {other} and {split}"),
                    IssueContext::file(&images[0]),
                ));
            }
        }

        for (stem, label) in &files.labels {
            if !files.images.contains_key(stem) {
                report.add(VerifyIssue::error(
                    IssueCode::OrphanLabel,
                    "label file has no image",
                    IssueContext::file(label),
                ));
            }
            let rows = verify_label_file(label, manifest.names.len(), &mut report)?;
            report.objects += rows;
        }
        match split {
            Split::Train => report.labels.train = files.labels.len(),
            Split::Val => report.labels.val = files.labels.len(),
        }
    }

    info!(
        root = %root.display(),
        errors = report.error_count(),
        warnings = report.warning_count(),
        "verified dataset"
    );
    Ok(report)
}

fn verify_manifest(
    root: &Path,
    manifest: &DatasetManifest,
    manifest_path: &Path,
    report: &mut VerifyReport,
) {
    if manifest.names.is_empty() {
        report.add(VerifyIssue::error(
            IssueCode::EmptyClassList,
            "manifest declares no classes",
            IssueContext::file(manifest_path),
        ));
    }

    let declared = std::path::absolute(&manifest.root).ok();
    let actual = std::path::absolute(root).ok();
    if declared != actual {
        report.add(VerifyIssue::warning(
            IssueCode::ManifestRootMismatch,
            format!(
                "manifest path '{}' does not point at {}",
                manifest.root.display(),
                root.display()
            ),
            IssueContext::file(manifest_path),
        ));
    }
}

/// List the images and labels of one split. `None` if a directory is missing.
fn collect_split(
    root: &Path,
    manifest: &DatasetManifest,
    split: Split,
    report: &mut VerifyReport,
) -> Result<Option<SplitFiles>, PrepError> {
    let images_dir = root.join(manifest.image_dir(split));
    let labels_dir = root.join(manifest.label_dir(split));

    let mut missing = false;
    for dir in [&images_dir, &labels_dir] {
        if !dir.is_dir() {
            report.add(VerifyIssue::error(
                IssueCode::MissingSplitDirectory,
                format!("{split} directory does not exist"),
                IssueContext::file(dir),
            ));
            missing = true;
        }
    }
    if missing {
        return Ok(None);
    }

    let mut files = SplitFiles::default();
    for path in list_files(&images_dir, report)? {
        let stem = document_stem(&path).map(str::to_owned);
        match stem {
            Some(stem) if has_image_extension(&path) => {
                files.images.entry(stem).or_default().push(path);
            }
            _ => debug!(path = %path.display(), "ignoring non-image file"),
        }
    }
    for path in list_files(&labels_dir, report)? {
        let is_label = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == LABEL_EXTENSION);
        let stem = document_stem(&path).map(str::to_owned);
        match stem {
            Some(stem) if is_label => {
                files.labels.insert(stem, path);
            }
            _ => debug!(path = %path.display(), "ignoring non-label file"),
        }
    }

    Ok(Some(files))
}

/// Regular files directly inside `dir`, sorted by name. Leftover temporary
/// files are reported and left out.
fn list_files(dir: &Path, report: &mut VerifyReport) -> Result<Vec<PathBuf>, PrepError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|err| {
            PrepError::Io(
                err.into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory walk failed")),
            )
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let is_temp = {
            let name = entry.file_name().to_string_lossy();
            name.starts_with('.') && name.ends_with(".tmp")
        };
        if is_temp {
            report.add(VerifyIssue::warning(
                IssueCode::LeftoverTempFile,
                "temporary file left by an interrupted write",
                IssueContext::file(entry.path()),
            ));
            continue;
        }
        files.push(entry.into_path());
    }
    Ok(files)
}

/// Check every row of one label file; returns the number of rows parsed.
fn verify_label_file(
    path: &Path,
    class_count: usize,
    report: &mut VerifyReport,
) -> Result<usize, PrepError> {
    let text = fs::read_to_string(path)?;
    let mut rows = 0;

    for (index, line) in text.lines().enumerate() {
        let line_num = index + 1;
        let row = match parse_label_line(line, path, line_num) {
            Ok(Some(row)) => row,
            Ok(None) => continue,
            Err(err) => {
                let message = match err {
                    PrepError::LabelParse { message, .. } => message,
                    other => other.to_string(),
                };
                report.add(VerifyIssue::error(
                    IssueCode::MalformedLabelLine,
                    message,
                    IssueContext::line(path, line_num),
                ));
                continue;
            }
        };
        rows += 1;

        if row.class_id >= class_count {
            report.add(VerifyIssue::error(
                IssueCode::ClassOutOfRange,
                format!(
                    "class {} is not in the manifest ({} class(es))",
                    row.class_id, class_count
                ),
                IssueContext::line(path, line_num),
            ));
        }

        let values = [("cx", row.cx), ("cy", row.cy), ("w", row.w), ("h", row.h)];
        for (name, value) in values {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                report.add(VerifyIssue::error(
                    IssueCode::CoordinateOutOfRange,
                    format!("{name} = {value} is outside [0, 1]"),
                    IssueContext::line(path, line_num),
                ));
            }
        }

        if row.w == 0.0 || row.h == 0.0 {
            report.add(VerifyIssue::warning(
                IssueCode::DegenerateBox,
                format!("box has zero extent ({} x {})", row.w, row.h),
                IssueContext::line(path, line_num),
            ));
        }
    }

    if rows == 0 {
        report.add(VerifyIssue::warning(
            IssueCode::EmptyLabelFile,
            "label file has no rows",
            IssueContext::file(path),
        ));
    }

    Ok(rows)
}
