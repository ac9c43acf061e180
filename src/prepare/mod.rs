//! The dataset preparation pipeline.
//!
//! A run discovers every annotation document under the dataset root,
//! assigns each one to a split, materializes documents in parallel and
//! finally writes `data.yaml`. Problems with single documents are collected
//! in a [`PrepareReport`]; only setup failures and a failed manifest write
//! abort the run.
//!
//! # Example
//!
//! ```no_run
//! use weldprep::ir::ClassTable;
//! use weldprep::prepare::{prepare_dataset, LocalDirSource, PrepareOptions};
//!
//! let options = PrepareOptions {
//!     output_root: "gc10_yolo_dataset".into(),
//!     ..Default::default()
//! };
//! let report = prepare_dataset(&LocalDirSource::new("GC10-DET"), &ClassTable::default(), &options)?;
//! println!("{report}");
//! # Ok::<(), weldprep::PrepError>(())
//! ```

pub mod locate;
pub mod materialize;
pub mod report;
pub mod source;
pub mod split;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info, warn};

pub use locate::{ImageLocator, LocateStrategy};
pub use materialize::{DocumentOutcome, DocumentResult, Materializer};
pub use report::{PrepareIssue, PrepareIssueCode, PrepareReport, PrepareSeverity};
pub use source::{DatasetSource, LocalDirSource};
pub use split::{assign, SplitAssignment, DEFAULT_SEED, DEFAULT_VAL_FRACTION};

use crate::error::{DocumentError, PrepError};
use crate::ir::io_voc_xml::{collect_documents, document_stem};
use crate::ir::io_yolo::write_manifest;
use crate::ir::{ClassTable, DatasetLayout, DatasetManifest, Split};

/// Default output directory name.
pub const DEFAULT_OUTPUT_ROOT: &str = "gc10_yolo_dataset";

/// Options for one preparation run.
#[derive(Clone, Debug)]
pub struct PrepareOptions {
    /// Directory receiving `images/`, `labels/` and `data.yaml`.
    pub output_root: PathBuf,
    /// Share of documents assigned to the validation split, in `[0, 1]`.
    pub val_fraction: f64,
    pub seed: u64,
    /// Worker threads; 0 picks the rayon default, 1 runs sequentially.
    pub workers: usize,
    /// Remove existing `images/` and `labels/` before writing.
    pub clean: bool,
    pub locator: ImageLocator,
}

impl Default for PrepareOptions {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from(DEFAULT_OUTPUT_ROOT),
            val_fraction: DEFAULT_VAL_FRACTION,
            seed: DEFAULT_SEED,
            workers: 0,
            clean: false,
            locator: ImageLocator::default(),
        }
    }
}

/// Unit of work handed to the worker pool.
enum Task<'a> {
    Materialize(&'a Path, Split),
    Duplicate(&'a Path, String),
}

/// Run the whole pipeline for the dataset provided by `source`.
pub fn prepare_dataset(
    source: &dyn DatasetSource,
    classes: &ClassTable,
    options: &PrepareOptions,
) -> Result<PrepareReport, PrepError> {
    split::validate_fraction(options.val_fraction)?;

    let dataset_root = source.fetch()?;
    let dataset_root = std::path::absolute(&dataset_root).map_err(|err| PrepError::DatasetFetch {
        path: dataset_root.clone(),
        message: format!("cannot resolve absolute path: {err}"),
    })?;
    let output_root =
        std::path::absolute(&options.output_root).map_err(|source| PrepError::OutputDir {
            path: options.output_root.clone(),
            source,
        })?;
    let layout = DatasetLayout::new(&output_root);

    if options.clean && dataset_root.starts_with(&output_root) {
        return Err(PrepError::InvalidOutputRoot {
            path: output_root,
            message: "refusing to clean an output root that contains the dataset".to_string(),
        });
    }

    let exclude = output_dirs(&layout);
    let documents = collect_documents(&dataset_root, &exclude)?;
    info!(
        root = %dataset_root.display(),
        documents = documents.len(),
        "discovered annotation documents"
    );

    let mut report = PrepareReport {
        documents: documents.len(),
        ..Default::default()
    };
    if documents.is_empty() {
        warn!(root = %dataset_root.display(), "no annotation documents found");
        report.add(
            PrepareIssue::warning(
                PrepareIssueCode::NoDocuments,
                "no *.xml annotation documents found",
            )
            .at(&dataset_root),
        );
    }

    let assignment = split::assign(&documents, options.val_fraction, options.seed)?;
    report.assigned.train = assignment.count(Split::Train);
    report.assigned.val = assignment.count(Split::Val);
    info!(
        train = report.assigned.train,
        val = report.assigned.val,
        seed = options.seed,
        "assigned splits"
    );

    if options.clean {
        layout.clean()?;
    }
    layout.create_dirs()?;

    let tasks = plan_tasks(&documents, &assignment);
    let locator = exclude
        .iter()
        .fold(options.locator.clone(), |locator, dir| locator.excluding(dir));
    let materializer = Materializer {
        layout: &layout,
        classes,
        locator: &locator,
        dataset_root: &dataset_root,
    };

    let results = run_tasks(&materializer, &tasks, options.workers)?;
    for result in results {
        merge_result(&mut report, result);
    }

    if report.materialized_total() == 0 {
        warn!(root = %output_root.display(), "no documents were materialized; dataset is empty");
        report.add(
            PrepareIssue::warning(
                PrepareIssueCode::EmptyDataset,
                "manifest written for a dataset without any images",
            )
            .at(&layout.manifest_path()),
        );
    }

    let manifest = DatasetManifest::new(&layout, classes);
    write_manifest(&layout.manifest_path(), &manifest)?;

    info!(
        written = report.materialized_total(),
        train = report.materialized.train,
        val = report.materialized.val,
        objects = report.objects_written,
        failed = report.failure_count(),
        empty = report.skipped.empty_documents,
        manifest = %layout.manifest_path().display(),
        "dataset prepared"
    );

    Ok(report)
}

/// The split directories the pipeline writes into. Nothing below them is
/// treated as input.
fn output_dirs(layout: &DatasetLayout) -> Vec<PathBuf> {
    Split::ALL
        .iter()
        .flat_map(|&split| [layout.images_dir(split), layout.labels_dir(split)])
        .collect()
}

/// Pair each document with its split. Later documents whose stem was
/// already seen would overwrite earlier outputs and are marked duplicate.
/// Parallel writes rely on this: temporary file names derive from the stem.
fn plan_tasks<'a>(documents: &'a [PathBuf], assignment: &SplitAssignment) -> Vec<Task<'a>> {
    let mut seen = HashSet::new();
    documents
        .iter()
        .filter_map(|path| {
            let split = assignment.get(path)?;
            match document_stem(path) {
                Some(stem) if !seen.insert(stem) => {
                    Some(Task::Duplicate(path.as_path(), stem.to_string()))
                }
                _ => Some(Task::Materialize(path.as_path(), split)),
            }
        })
        .collect()
}

fn run_tasks(
    materializer: &Materializer<'_>,
    tasks: &[Task<'_>],
    workers: usize,
) -> Result<Vec<DocumentResult>, PrepError> {
    let run = |task: &Task<'_>| match task {
        Task::Materialize(path, split) => materializer.materialize(path, *split),
        Task::Duplicate(path, stem) => DocumentResult {
            path: path.to_path_buf(),
            outcome: DocumentOutcome::Duplicate { stem: stem.clone() },
            dropped: Default::default(),
        },
    };

    if workers == 1 {
        return Ok(tasks.iter().map(run).collect());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()?;
    debug!(threads = pool.current_num_threads(), "materializing in parallel");
    Ok(pool.install(|| tasks.par_iter().map(run).collect()))
}

fn merge_result(report: &mut PrepareReport, result: DocumentResult) {
    let DocumentResult {
        path,
        outcome,
        dropped,
    } = result;

    report.dropped.unresolved_objects += dropped.unresolved_objects;
    report.dropped.invalid_boxes += dropped.invalid_boxes;

    match outcome {
        DocumentOutcome::Written { split, objects } => {
            report.materialized.increment(split);
            report.objects_written += objects;
        }
        DocumentOutcome::Empty => {
            report.skipped.empty_documents += 1;
            debug!(document = %path.display(), "no usable objects; nothing written");
            report.add(
                PrepareIssue::info(
                    PrepareIssueCode::EmptyDocument,
                    "no resolvable, well-formed objects; nothing written",
                )
                .at(&path),
            );
        }
        DocumentOutcome::Duplicate { stem } => {
            report.skipped.duplicate_documents += 1;
            warn!(document = %path.display(), %stem, "skipping document with duplicate stem");
            report.add(
                PrepareIssue::warning(
                    PrepareIssueCode::DuplicateDocumentStem,
                    format!("stem '{stem}' was already used by an earlier document"),
                )
                .at(&path),
            );
        }
        DocumentOutcome::Failed(err) => {
            let code = match &err {
                DocumentError::Parse { .. } => {
                    report.skipped.parse_failures += 1;
                    PrepareIssueCode::DocumentParseFailure
                }
                DocumentError::ImageNotFound { .. } => {
                    report.skipped.image_not_found += 1;
                    PrepareIssueCode::ImageNotFound
                }
                DocumentError::ImageDecode { .. } => {
                    report.skipped.image_decode_failures += 1;
                    PrepareIssueCode::ImageDecodeFailure
                }
                DocumentError::Write { .. } => {
                    report.skipped.write_failures += 1;
                    PrepareIssueCode::OutputWriteFailure
                }
            };
            warn!(document = %path.display(), error = %err, "skipping document");
            report.add(PrepareIssue::warning(code, err.to_string()).at(&path));
        }
    }
}
