//! Run summary for dataset preparation.
//!
//! Every skipped document and dropped object ends up here as a count and,
//! for documents, as an issue naming the file. The pipeline always returns
//! a report rather than stopping at the first bad record.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::ir::Split;

/// Summary of one `prepare` run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct PrepareReport {
    /// Annotation documents discovered under the dataset root.
    pub documents: usize,
    /// Documents assigned to each split before materialization.
    pub assigned: SplitCounts,
    /// Documents whose image and label file were written.
    pub materialized: SplitCounts,
    /// Label rows written across all documents.
    pub objects_written: usize,
    pub skipped: SkipCounts,
    pub dropped: DropCounts,
    pub issues: Vec<PrepareIssue>,
}

impl PrepareReport {
    pub fn add(&mut self, issue: PrepareIssue) {
        self.issues.push(issue);
    }

    /// Documents that produced output in either split.
    pub fn materialized_total(&self) -> usize {
        self.materialized.train + self.materialized.val
    }

    /// Documents skipped because of a failure (empty documents excluded).
    pub fn failure_count(&self) -> usize {
        self.skipped.parse_failures
            + self.skipped.image_not_found
            + self.skipped.image_decode_failures
            + self.skipped.duplicate_documents
            + self.skipped.write_failures
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == PrepareSeverity::Warning)
            .count()
    }

    pub fn info_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == PrepareSeverity::Info)
            .count()
    }
}

impl fmt::Display for PrepareReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Prepared {} of {} annotation document(s)",
            self.materialized_total(),
            self.documents
        )?;
        writeln!(
            f,
            "  train: {} assigned, {} written",
            self.assigned.train, self.materialized.train
        )?;
        writeln!(
            f,
            "  val:   {} assigned, {} written",
            self.assigned.val, self.materialized.val
        )?;
        writeln!(f, "  objects written: {}", self.objects_written)?;

        writeln!(f)?;
        writeln!(f, "Skipped documents:")?;
        writeln!(f, "  parse failures:        {}", self.skipped.parse_failures)?;
        writeln!(f, "  image not found:       {}", self.skipped.image_not_found)?;
        writeln!(f, "  image decode failures: {}", self.skipped.image_decode_failures)?;
        writeln!(f, "  empty (no usable objects): {}", self.skipped.empty_documents)?;
        if self.skipped.duplicate_documents > 0 {
            writeln!(f, "  duplicate stems:       {}", self.skipped.duplicate_documents)?;
        }
        if self.skipped.write_failures > 0 {
            writeln!(f, "  write failures:        {}", self.skipped.write_failures)?;
        }

        writeln!(f)?;
        writeln!(f, "Dropped objects:")?;
        writeln!(f, "  unresolved class: {}", self.dropped.unresolved_objects)?;
        writeln!(f, "  invalid box:      {}", self.dropped.invalid_boxes)?;

        let warnings = self.warning_count();
        if warnings > 0 {
            writeln!(f)?;
            writeln!(f, "Warnings ({}):", warnings)?;
            for issue in self
                .issues
                .iter()
                .filter(|i| i.severity == PrepareSeverity::Warning)
            {
                writeln!(f, "  - {}", issue)?;
            }
        }

        let infos = self.info_count();
        if infos > 0 {
            writeln!(f)?;
            writeln!(f, "Notes ({}):", infos)?;
            for issue in self
                .issues
                .iter()
                .filter(|i| i.severity == PrepareSeverity::Info)
            {
                writeln!(f, "  - {}", issue)?;
            }
        }

        Ok(())
    }
}

/// Per-split document counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SplitCounts {
    pub train: usize,
    pub val: usize,
}

impl SplitCounts {
    pub fn increment(&mut self, split: Split) {
        match split {
            Split::Train => self.train += 1,
            Split::Val => self.val += 1,
        }
    }

    pub fn get(&self, split: Split) -> usize {
        match split {
            Split::Train => self.train,
            Split::Val => self.val,
        }
    }
}

/// Whole documents left out of the output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SkipCounts {
    pub parse_failures: usize,
    pub image_not_found: usize,
    pub image_decode_failures: usize,
    /// Documents with no resolvable, well-formed object. Not a failure.
    pub empty_documents: usize,
    /// Later documents sharing a stem with an earlier one.
    pub duplicate_documents: usize,
    pub write_failures: usize,
}

/// Single objects dropped from otherwise usable documents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DropCounts {
    pub unresolved_objects: usize,
    pub invalid_boxes: usize,
}

/// A single issue raised while preparing the dataset.
#[derive(Clone, Debug, Serialize)]
pub struct PrepareIssue {
    pub severity: PrepareSeverity,
    pub code: PrepareIssueCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl PrepareIssue {
    pub fn warning(code: PrepareIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: PrepareSeverity::Warning,
            code,
            message: message.into(),
            path: None,
        }
    }

    pub fn info(code: PrepareIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: PrepareSeverity::Info,
            code,
            message: message.into(),
            path: None,
        }
    }

    pub fn at(mut self, path: &Path) -> Self {
        self.path = Some(path.to_path_buf());
        self
    }
}

impl fmt::Display for PrepareIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}: {}", path.display(), self.message),
            None => f.write_str(&self.message),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrepareSeverity {
    Warning,
    Info,
}

/// Stable issue codes for programmatic consumption.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrepareIssueCode {
    DocumentParseFailure,
    ImageNotFound,
    ImageDecodeFailure,
    EmptyDocument,
    DuplicateDocumentStem,
    OutputWriteFailure,
    /// No annotation documents were found under the dataset root.
    NoDocuments,
    /// The manifest describes a dataset without a single usable document.
    EmptyDataset,
}
