//! Weldprep: prepare weld and steel-surface defect annotations for training.
//!
//! Weldprep turns a directory of Pascal VOC XML annotation documents and
//! their images into the YOLO dataset layout a detector trainer consumes:
//! split image directories, one normalized label file per image and a
//! `data.yaml` manifest.
//!
//! # Modules
//!
//! - [`ir`]: Annotation documents, boxes, class table and on-disk formats
//! - [`prepare`]: The conversion pipeline and its run report
//! - [`verify`]: Checks a prepared dataset against the trainer contract
//! - [`config`]: Class table files
//! - [`error`]: Error types for weldprep operations

pub mod config;
pub mod error;
pub mod ir;
pub mod logging;
pub mod prepare;
pub mod verify;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;

pub use error::PrepError;

use ir::ClassTable;
use prepare::{
    LocalDirSource, PrepareOptions, DEFAULT_OUTPUT_ROOT, DEFAULT_SEED, DEFAULT_VAL_FRACTION,
};

/// The weldprep CLI application.
#[derive(Parser)]
#[command(name = "weldprep")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    /// Emit log events as JSON lines on stderr.
    #[arg(long, global = true, env = "WELDPREP_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Convert VOC XML annotations into a split YOLO dataset.
    Prepare(PrepareArgs),
    /// Show the class table and test label resolution.
    Classes(ClassesArgs),
    /// Check a prepared dataset for missing or malformed files.
    Verify(VerifyArgs),
}

/// Arguments for the prepare subcommand.
#[derive(clap::Args)]
struct PrepareArgs {
    /// Dataset root containing *.xml documents and their images.
    #[arg(env = "WELDPREP_DATASET")]
    dataset: PathBuf,

    /// Output directory for images/, labels/ and data.yaml.
    #[arg(short, long, env = "WELDPREP_OUTPUT", default_value = DEFAULT_OUTPUT_ROOT)]
    output: PathBuf,

    /// Share of documents assigned to the validation split.
    #[arg(long, env = "WELDPREP_VAL_FRACTION", default_value_t = DEFAULT_VAL_FRACTION)]
    val_fraction: f64,

    /// Seed for the train/validation shuffle.
    #[arg(long, env = "WELDPREP_SEED", default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Worker threads (0 = one per core, 1 = sequential).
    #[arg(long, env = "WELDPREP_WORKERS", default_value_t = 0)]
    workers: usize,

    /// Class table YAML file (defaults to the built-in GC10-DET table).
    #[arg(long, env = "WELDPREP_CLASSES")]
    classes: Option<PathBuf>,

    /// Remove existing images/ and labels/ under the output directory first.
    #[arg(long, env = "WELDPREP_CLEAN")]
    clean: bool,

    /// Output format for the run report ('text' or 'json').
    #[arg(long, env = "WELDPREP_REPORT", default_value = "text")]
    report: String,
}

/// Arguments for the classes subcommand.
#[derive(clap::Args)]
struct ClassesArgs {
    /// Class table YAML file (defaults to the built-in GC10-DET table).
    #[arg(long, env = "WELDPREP_CLASSES")]
    classes: Option<PathBuf>,

    /// Resolve these labels against the table.
    #[arg(long = "resolve", value_name = "LABEL")]
    labels: Vec<String>,

    /// Output format ('text' or 'json').
    #[arg(long, env = "WELDPREP_REPORT", default_value = "text")]
    report: String,
}

/// Arguments for the verify subcommand.
#[derive(clap::Args)]
struct VerifyArgs {
    /// Root of a prepared dataset (the directory holding data.yaml).
    #[arg(env = "WELDPREP_OUTPUT", default_value = DEFAULT_OUTPUT_ROOT)]
    root: PathBuf,

    /// Treat warnings as errors (exit non-zero if any warnings).
    #[arg(long)]
    strict: bool,

    /// Output format for the report ('text' or 'json').
    #[arg(long, env = "WELDPREP_REPORT", default_value = "text")]
    report: String,
}

/// How a report is printed to stdout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    fn parse(raw: &str) -> Result<Self, PrepError> {
        match raw {
            "text" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            other => Err(PrepError::UnsupportedFormat(format!(
                "'{}' (supported: text, json)",
                other
            ))),
        }
    }

    fn print<T>(self, report: &T) -> Result<(), PrepError>
    where
        T: Serialize + std::fmt::Display,
    {
        match self {
            ReportFormat::Text => print!("{}", report),
            ReportFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        }
        Ok(())
    }
}

/// Run the weldprep CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), PrepError> {
    let cli = Cli::parse();
    logging::init_tracing(cli.log_json);

    match cli.command {
        Some(Commands::Prepare(args)) => run_prepare(args),
        Some(Commands::Classes(args)) => run_classes(args),
        Some(Commands::Verify(args)) => run_verify(args),
        None => {
            println!("weldprep {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Prepare weld and steel-surface defect annotations as a YOLO dataset.");
            println!();
            println!("Run 'weldprep --help' for usage information.");
            Ok(())
        }
    }
}

fn load_classes(path: Option<&PathBuf>) -> Result<ClassTable, PrepError> {
    match path {
        Some(path) => config::load_class_table(path),
        None => Ok(ClassTable::default()),
    }
}

/// Execute the prepare subcommand.
fn run_prepare(args: PrepareArgs) -> Result<(), PrepError> {
    let format = ReportFormat::parse(&args.report)?;
    let classes = load_classes(args.classes.as_ref())?;

    let options = PrepareOptions {
        output_root: args.output,
        val_fraction: args.val_fraction,
        seed: args.seed,
        workers: args.workers,
        clean: args.clean,
        ..Default::default()
    };

    let report = prepare::prepare_dataset(&LocalDirSource::new(args.dataset), &classes, &options)?;
    format.print(&report)
}

/// Resolution result for one label, as printed by `classes --resolve`.
#[derive(Serialize)]
struct Resolution {
    label: String,
    class: Option<usize>,
    name: Option<String>,
}

#[derive(Serialize)]
struct ClassListing {
    names: Vec<String>,
    synonyms: Vec<(String, usize)>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    resolved: Vec<Resolution>,
}

impl std::fmt::Display for ClassListing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Classes ({}):", self.names.len())?;
        for (index, name) in self.names.iter().enumerate() {
            writeln!(f, "  {index}: {name}")?;
        }
        writeln!(f)?;
        writeln!(f, "Synonyms (lookup order):")?;
        for (label, index) in &self.synonyms {
            writeln!(f, "  {label} -> {index}")?;
        }

        if !self.resolved.is_empty() {
            writeln!(f)?;
            for resolution in &self.resolved {
                match (&resolution.class, &resolution.name) {
                    (Some(class), Some(name)) => {
                        writeln!(f, "{:?} -> {class} ({name})", resolution.label)?
                    }
                    _ => writeln!(f, "{:?} -> unresolved", resolution.label)?,
                }
            }
        }
        Ok(())
    }
}

/// Execute the classes subcommand.
fn run_classes(args: ClassesArgs) -> Result<(), PrepError> {
    let format = ReportFormat::parse(&args.report)?;
    let classes = load_classes(args.classes.as_ref())?;

    let resolved = args
        .labels
        .into_iter()
        .map(|label| {
            let class = classes.resolve(&label);
            Resolution {
                name: class.and_then(|c| classes.name(c)).map(str::to_owned),
                class: class.map(|c| c.as_usize()),
                label,
            }
        })
        .collect();

    let listing = ClassListing {
        names: classes.names().to_vec(),
        synonyms: classes
            .synonyms()
            .map(|(label, index)| (label.to_string(), index.as_usize()))
            .collect(),
        resolved,
    };
    format.print(&listing)
}

/// Execute the verify subcommand.
fn run_verify(args: VerifyArgs) -> Result<(), PrepError> {
    let format = ReportFormat::parse(&args.report)?;
    let opts = verify::VerifyOptions {
        strict: args.strict,
    };
    let report = verify::verify_dataset(&args.root, &opts)?;
    format.print(&report)?;

    if !report.passed() {
        Err(PrepError::VerificationFailed {
            error_count: report.error_count(),
            warning_count: report.warning_count(),
            report,
        })
    } else {
        Ok(())
    }
}
