//! Verification report types.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::prepare::report::SplitCounts;

/// The result of verifying a prepared dataset.
#[derive(Clone, Debug, Default, Serialize)]
pub struct VerifyReport {
    /// Images found per split.
    pub images: SplitCounts,
    /// Label files found per split.
    pub labels: SplitCounts,
    /// Label rows that parsed.
    pub objects: usize,
    /// Whether warnings count against [`VerifyReport::passed`].
    pub strict: bool,
    pub issues: Vec<VerifyIssue>,
}

impl VerifyReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, issue: VerifyIssue) {
        self.issues.push(issue);
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    /// True if there are no errors.
    pub fn is_ok(&self) -> bool {
        self.error_count() == 0
    }

    /// True if there are no issues at all.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// True if there are no errors or warnings.
    pub fn is_ok_strict(&self) -> bool {
        self.error_count() == 0 && self.warning_count() == 0
    }

    /// Pass/fail under the mode the report was produced with.
    pub fn passed(&self) -> bool {
        if self.strict {
            self.is_ok_strict()
        } else {
            self.is_ok()
        }
    }

    /// Issues carrying `code`.
    pub fn with_code(&self, code: IssueCode) -> impl Iterator<Item = &VerifyIssue> {
        self.issues.iter().filter(move |issue| issue.code == code)
    }
}

impl fmt::Display for VerifyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Images: {} train, {} val; labels: {} train, {} val; {} object(s)",
            self.images.train, self.images.val, self.labels.train, self.labels.val, self.objects
        )?;

        if self.issues.is_empty() {
            return writeln!(f, "Verification passed: no issues found");
        }

        writeln!(
            f,
            "Verification completed with {} error(s) and {} warning(s):",
            self.error_count(),
            self.warning_count()
        )?;
        writeln!(f)?;

        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }

        Ok(())
    }
}

/// A single verification issue.
#[derive(Clone, Debug, Serialize)]
pub struct VerifyIssue {
    pub severity: Severity,
    /// Stable code for the issue type.
    pub code: IssueCode,
    pub message: String,
    /// Where the issue occurred.
    pub context: IssueContext,
}

impl VerifyIssue {
    pub fn error(code: IssueCode, message: impl Into<String>, context: IssueContext) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            context,
        }
    }

    pub fn warning(code: IssueCode, message: impl Into<String>, context: IssueContext) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            context,
        }
    }
}

impl fmt::Display for VerifyIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARN ",
        };
        write!(
            f,
            "[{}] {:?} in {}: {}",
            severity, self.code, self.context, self.message
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Suspicious, but the trainer will still load the dataset.
    Warning,
    /// The dataset breaks the trainer contract.
    Error,
}

/// Stable codes identifying the type of verification issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    // Manifest issues
    /// `data.yaml` is missing or cannot be parsed.
    ManifestUnreadable,
    /// The manifest declares no classes.
    EmptyClassList,
    /// The manifest `path` does not point at the verified directory.
    ManifestRootMismatch,

    // Layout issues
    /// A split directory named by the manifest does not exist.
    MissingSplitDirectory,
    /// An image has no label file with the same stem.
    MissingLabel,
    /// A label file has no image with the same stem.
    OrphanLabel,
    /// Two images in one split share a stem.
    DuplicateImageStem,
    /// The same stem appears in both splits.
    CrossSplitDuplicate,
    /// A hidden temporary file from an interrupted write.
    LeftoverTempFile,

    // Label content issues
    /// A label row is not `<class> <cx> <cy> <w> <h>`.
    MalformedLabelLine,
    /// A class index has no entry in the manifest.
    ClassOutOfRange,
    /// A normalized value is outside `[0, 1]` or not finite.
    CoordinateOutOfRange,
    /// A box with zero width or height.
    DegenerateBox,
    /// A label file without any rows.
    EmptyLabelFile,
}

/// Where a verification issue occurred.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueContext {
    Dataset,
    File { path: PathBuf },
    Line { path: PathBuf, line: usize },
}

impl IssueContext {
    pub fn file(path: &Path) -> Self {
        IssueContext::File {
            path: path.to_path_buf(),
        }
    }

    pub fn line(path: &Path, line: usize) -> Self {
        IssueContext::Line {
            path: path.to_path_buf(),
            line,
        }
    }
}

impl fmt::Display for IssueContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueContext::Dataset => write!(f, "dataset"),
            IssueContext::File { path } => write!(f, "{}", path.display()),
            IssueContext::Line { path, line } => write!(f, "{}:{}", path.display(), line),
        }
    }
}
