use std::path::PathBuf;
use thiserror::Error;

use crate::verify::VerifyReport;

/// The main error type for weldprep operations.
///
/// Only run-level failures live here. Problems confined to a single
/// annotation document are reported as [`DocumentError`] values and never
/// abort a batch.
#[derive(Debug, Error)]
pub enum PrepError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Dataset source {path} is unavailable: {message}")]
    DatasetFetch { path: PathBuf, message: String },

    #[error("Invalid split parameters: {message}")]
    InvalidSplitParams { message: String },

    #[error("Invalid class table: {message}")]
    ClassTableInvalid { message: String },

    #[error("Failed to parse class table from {path}: {source}")]
    ClassTableParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid output root {path}: {message}")]
    InvalidOutputRoot { path: PathBuf, message: String },

    #[error("Failed to create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write dataset manifest {path}: {source}")]
    ManifestWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize dataset manifest: {0}")]
    ManifestSerialize(#[source] serde_yaml::Error),

    #[error("Failed to parse dataset manifest {path}: {source}")]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to parse annotation document {path}: {message}")]
    AnnotationParse { path: PathBuf, message: String },

    #[error("Failed to read image dimensions from {path}: {source}")]
    ImageDimensionRead {
        path: PathBuf,
        #[source]
        source: imagesize::ImageError,
    },

    #[error("Unusable image {path}: {message}")]
    ImageDimensionInvalid { path: PathBuf, message: String },

    #[error("Failed to parse label file {path} line {line}: {message}")]
    LabelParse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Verification failed with {error_count} error(s) and {warning_count} warning(s)")]
    VerificationFailed {
        error_count: usize,
        warning_count: usize,
        report: VerifyReport,
    },

    #[error("Failed to serialize report: {0}")]
    ReportSerialize(#[from] serde_json::Error),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Why a single annotation document was skipped.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("{message}")]
    Parse { message: String },

    #[error("no image found for document stem '{stem}'")]
    ImageNotFound { stem: String },

    #[error("cannot read image {path}: {message}")]
    ImageDecode { path: PathBuf, message: String },

    #[error("failed to write outputs to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

