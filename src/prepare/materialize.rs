//! Per-document materialization into the split directories.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use super::locate::{has_image_extension, ImageLocator};
use super::report::DropCounts;
use crate::error::{DocumentError, PrepError};
use crate::ir::io_voc_xml::{document_stem, read_voc_xml};
use crate::ir::io_yolo::{copy_atomic, render_label_file, write_atomic, LABEL_EXTENSION};
use crate::ir::{normalize, AnnotationDocument, ClassTable, DatasetLayout, ResolvedRecord, Split};

/// What happened to one annotation document.
#[derive(Debug)]
pub enum DocumentOutcome {
    /// Image copied and label file written.
    Written { split: Split, objects: usize },
    /// No object survived resolution; nothing was written.
    Empty,
    /// The document could not be used.
    Failed(DocumentError),
    /// Another document with the same stem was processed first.
    Duplicate { stem: String },
}

/// Outcome plus per-object drop counts for one document.
#[derive(Debug)]
pub struct DocumentResult {
    pub path: PathBuf,
    pub outcome: DocumentOutcome,
    pub dropped: DropCounts,
}

impl DocumentResult {
    fn failed(path: &Path, err: DocumentError) -> Self {
        Self {
            path: path.to_path_buf(),
            outcome: DocumentOutcome::Failed(err),
            dropped: DropCounts::default(),
        }
    }
}

/// Writes documents into a [`DatasetLayout`].
///
/// Holds only shared references, so one materializer can be used from many
/// worker threads at once; each document touches only paths derived from
/// its own stem.
#[derive(Clone, Copy, Debug)]
pub struct Materializer<'a> {
    pub layout: &'a DatasetLayout,
    pub classes: &'a ClassTable,
    pub locator: &'a ImageLocator,
    pub dataset_root: &'a Path,
}

impl Materializer<'_> {
    /// Parse, locate, resolve and write one document into `split`.
    ///
    /// Re-running with the same inputs rewrites identical files. Outputs
    /// left under the same stem by an earlier run (in either split) are
    /// removed first.
    pub fn materialize(&self, document: &Path, split: Split) -> DocumentResult {
        let parsed = match read_voc_xml(document) {
            Ok(parsed) => parsed,
            Err(err) => {
                let message = match err {
                    PrepError::AnnotationParse { message, .. } => message,
                    other => other.to_string(),
                };
                return DocumentResult::failed(document, DocumentError::Parse { message });
            }
        };

        let Some(stem) = parsed.stem().map(str::to_owned) else {
            return DocumentResult::failed(
                document,
                DocumentError::Parse {
                    message: "document file name is not valid UTF-8".to_string(),
                },
            );
        };

        let Some(image_path) = self.locator.locate(document, self.dataset_root) else {
            return DocumentResult::failed(document, DocumentError::ImageNotFound { stem });
        };

        let (width, height) = match read_image_dimensions(&image_path) {
            Ok(dims) => dims,
            Err(err) => {
                let message = match err {
                    PrepError::ImageDimensionRead { source, .. } => source.to_string(),
                    PrepError::ImageDimensionInvalid { message, .. } => message,
                    other => other.to_string(),
                };
                return DocumentResult::failed(
                    document,
                    DocumentError::ImageDecode {
                        path: image_path,
                        message,
                    },
                );
            }
        };

        let (records, dropped) = self.resolve_records(&parsed, width, height);

        let outcome = match self.write_outputs(&stem, &image_path, split, &records) {
            Ok(()) if records.is_empty() => DocumentOutcome::Empty,
            Ok(()) => {
                debug!(
                    document = %document.display(),
                    image = %image_path.display(),
                    %split,
                    objects = records.len(),
                    "materialized document"
                );
                DocumentOutcome::Written {
                    split,
                    objects: records.len(),
                }
            }
            Err(err) => DocumentOutcome::Failed(err),
        };

        DocumentResult {
            path: document.to_path_buf(),
            outcome,
            dropped,
        }
    }

    fn resolve_records(
        &self,
        document: &AnnotationDocument,
        width: u32,
        height: u32,
    ) -> (Vec<ResolvedRecord>, DropCounts) {
        let mut dropped = DropCounts::default();
        let mut records = Vec::with_capacity(document.objects.len());

        for object in &document.objects {
            let Some(class) = self.classes.resolve(&object.label) else {
                debug!(document = %document.path.display(), label = %object.label, "unresolved class label");
                dropped.unresolved_objects += 1;
                continue;
            };

            if !object.bbox.is_well_formed() {
                debug!(document = %document.path.display(), bbox = ?object.bbox, "dropping malformed box");
                dropped.invalid_boxes += 1;
                continue;
            }

            records.push(ResolvedRecord {
                class,
                bbox: normalize(&object.bbox, width, height),
            });
        }

        (records, dropped)
    }

    /// Clears previous outputs for `stem`, then writes the label file followed
    /// by the image so an image never appears without its label. If the image
    /// copy fails the new label is removed again.
    fn write_outputs(
        &self,
        stem: &str,
        image_path: &Path,
        split: Split,
        records: &[ResolvedRecord],
    ) -> Result<(), DocumentError> {
        self.remove_previous_outputs(stem)?;

        if records.is_empty() {
            return Ok(());
        }

        let label_path = self
            .layout
            .labels_dir(split)
            .join(format!("{stem}.{LABEL_EXTENSION}"));
        write_atomic(&label_path, render_label_file(records).as_bytes()).map_err(|source| {
            DocumentError::Write {
                path: label_path.clone(),
                source,
            }
        })?;

        let image_name = image_path
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(stem));
        let image_dst = self.layout.images_dir(split).join(image_name);
        if let Err(source) = copy_atomic(image_path, &image_dst) {
            // A label without its image would be an orphan.
            remove_if_present(&label_path)?;
            return Err(DocumentError::Write {
                path: image_dst,
                source,
            });
        }
        Ok(())
    }

    fn remove_previous_outputs(&self, stem: &str) -> Result<(), DocumentError> {
        for split in Split::ALL {
            for image in previous_images(&self.layout.images_dir(split), stem)? {
                remove_if_present(&image)?;
            }
        }
        for split in Split::ALL {
            remove_if_present(
                &self
                    .layout
                    .labels_dir(split)
                    .join(format!("{stem}.{LABEL_EXTENSION}")),
            )?;
        }
        Ok(())
    }
}

fn remove_if_present(path: &Path) -> Result<(), DocumentError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(DocumentError::Write {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Images in `dir` named `<stem>.<ext>` with any accepted extension, in any
/// letter case.
fn previous_images(dir: &Path, stem: &str) -> Result<Vec<PathBuf>, DocumentError> {
    let mut found = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.io_error().map(|e| e.kind()) == Some(ErrorKind::NotFound) => {
                return Ok(found)
            }
            Err(err) => {
                return Err(DocumentError::Write {
                    path: dir.to_path_buf(),
                    source: err.into(),
                })
            }
        };
        let path = entry.path();
        if entry.file_type().is_file()
            && document_stem(path) == Some(stem)
            && has_image_extension(path)
        {
            found.push(entry.into_path());
        }
    }
    Ok(found)
}

/// Read `(width, height)` from an image header.
///
/// Zero-sized images are rejected since they cannot be normalized against.
pub fn read_image_dimensions(path: &Path) -> Result<(u32, u32), PrepError> {
    let size = imagesize::size(path).map_err(|source| PrepError::ImageDimensionRead {
        path: path.to_path_buf(),
        source,
    })?;

    let width: u32 = size
        .width
        .try_into()
        .map_err(|_| PrepError::ImageDimensionInvalid {
            path: path.to_path_buf(),
            message: format!("image width {} does not fit in u32", size.width),
        })?;
    let height: u32 = size
        .height
        .try_into()
        .map_err(|_| PrepError::ImageDimensionInvalid {
            path: path.to_path_buf(),
            message: format!("image height {} does not fit in u32", size.height),
        })?;

    if width == 0 || height == 0 {
        return Err(PrepError::ImageDimensionInvalid {
            path: path.to_path_buf(),
            message: format!("image has zero dimension {width}x{height}"),
        });
    }

    Ok((width, height))
}
