//! Pascal VOC XML annotation reader.
//!
//! Each document describes one image: a `<filename>`, an optional `<size>`
//! and any number of `<object>` elements carrying a class `<name>` and a
//! pixel-space `<bndbox>`. Documents are discovered recursively under a
//! dataset root; where they sit relative to their images varies by source.

use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::Node;
use tracing::debug;
use walkdir::WalkDir;

use super::{BBoxXYXY, Pixel};
use crate::error::PrepError;

pub const VOC_XML_EXTENSION: &str = "xml";

/// One parsed annotation document.
#[derive(Clone, Debug, PartialEq)]
pub struct AnnotationDocument {
    /// Path the document was read from; its identity in the pipeline.
    pub path: PathBuf,
    /// Image file name as declared by `<filename>`.
    pub filename: String,
    /// `(width, height)` from `<size>`, when embedded.
    pub size: Option<(u32, u32)>,
    pub objects: Vec<ObjectRecord>,
}

impl AnnotationDocument {
    /// File stem of the document; shared by its image and label file.
    pub fn stem(&self) -> Option<&str> {
        document_stem(&self.path)
    }
}

/// One `<object>` of an annotation document.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectRecord {
    /// Class label exactly as written in the document.
    pub label: String,
    pub bbox: BBoxXYXY<Pixel>,
}

/// Read and parse one annotation document.
pub fn read_voc_xml(path: &Path) -> Result<AnnotationDocument, PrepError> {
    let bytes = fs::read(path).map_err(|source| PrepError::AnnotationParse {
        path: path.to_path_buf(),
        message: format!("cannot read file: {source}"),
    })?;
    let xml = std::str::from_utf8(&bytes).map_err(|source| PrepError::AnnotationParse {
        path: path.to_path_buf(),
        message: format!("input is not valid UTF-8: {source}"),
    })?;
    parse_voc_xml_str(xml, path)
}

/// Parse VOC XML from a UTF-8 string.
///
/// `path` is recorded as the document identity and used in error messages.
pub fn parse_voc_xml_str(xml: &str, path: &Path) -> Result<AnnotationDocument, PrepError> {
    let document =
        roxmltree::Document::parse(xml).map_err(|source| PrepError::AnnotationParse {
            path: path.to_path_buf(),
            message: source.to_string(),
        })?;

    let annotation = document.root_element();
    if annotation.tag_name().name() != "annotation" {
        return Err(PrepError::AnnotationParse {
            path: path.to_path_buf(),
            message: "missing <annotation> root element".to_string(),
        });
    }

    let filename = required_child_text(annotation, "filename", path, "<annotation>")?;

    // Dimensions come from the image header; a broken <size> is ignored.
    let size = child_element(annotation, "size").and_then(|size| {
        let dimension =
            |tag: &str| optional_child_text(size, tag).and_then(|raw| raw.parse::<u32>().ok());
        let parsed = dimension("width").zip(dimension("height"));
        if parsed.is_none() {
            debug!(document = %path.display(), "ignoring malformed <size>");
        }
        parsed
    });

    let mut objects = Vec::new();
    for object in annotation
        .children()
        .filter(|node| node.is_element() && node.tag_name().name() == "object")
    {
        let label = required_child_text(object, "name", path, "<object>")?;
        let bndbox = required_child_element(object, "bndbox", path, "<object>")?;

        let xmin = parse_required_f64(bndbox, "xmin", path, "<bndbox>")?;
        let ymin = parse_required_f64(bndbox, "ymin", path, "<bndbox>")?;
        let xmax = parse_required_f64(bndbox, "xmax", path, "<bndbox>")?;
        let ymax = parse_required_f64(bndbox, "ymax", path, "<bndbox>")?;

        objects.push(ObjectRecord {
            label,
            bbox: BBoxXYXY::from_xyxy(xmin, ymin, xmax, ymax),
        });
    }

    Ok(AnnotationDocument {
        path: path.to_path_buf(),
        filename,
        size,
        objects,
    })
}

/// Parse VOC XML from bytes.
///
/// This helper is primarily useful for fuzzing parse behavior in-memory.
pub fn from_voc_xml_slice(bytes: &[u8]) -> Result<AnnotationDocument, PrepError> {
    let path = Path::new("<memory>");
    let xml = std::str::from_utf8(bytes).map_err(|source| PrepError::AnnotationParse {
        path: path.to_path_buf(),
        message: format!("input is not valid UTF-8: {source}"),
    })?;
    parse_voc_xml_str(xml, path)
}

/// Collect every `*.xml` document under `root`, sorted by relative path.
///
/// Anything below one of the `exclude` directories is skipped, so output
/// written inside the dataset root is never re-ingested.
pub fn collect_documents(root: &Path, exclude: &[PathBuf]) -> Result<Vec<PathBuf>, PrepError> {
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !exclude.iter().any(|excluded| entry.path().starts_with(excluded)));

    for entry in walker {
        let entry = entry.map_err(|source| PrepError::DatasetFetch {
            path: root.to_path_buf(),
            message: format!("failed while traversing dataset directory: {source}"),
        })?;

        if entry.file_type().is_file() && has_xml_extension(entry.path()) {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_by_cached_key(|path| rel_string(root, path));
    Ok(files)
}

/// File stem of a path as UTF-8, if any.
pub fn document_stem(path: &Path) -> Option<&str> {
    path.file_stem().and_then(|stem| stem.to_str())
}

fn required_child_element<'a, 'input>(
    node: Node<'a, 'input>,
    tag: &str,
    path: &Path,
    context: &str,
) -> Result<Node<'a, 'input>, PrepError> {
    child_element(node, tag).ok_or_else(|| PrepError::AnnotationParse {
        path: path.to_path_buf(),
        message: format!("missing <{tag}> in {context}"),
    })
}

fn required_child_text(
    node: Node<'_, '_>,
    tag: &str,
    path: &Path,
    context: &str,
) -> Result<String, PrepError> {
    optional_child_text(node, tag).ok_or_else(|| PrepError::AnnotationParse {
        path: path.to_path_buf(),
        message: format!("missing <{tag}> in {context}"),
    })
}

fn parse_required_f64(
    node: Node<'_, '_>,
    tag: &str,
    path: &Path,
    context: &str,
) -> Result<f64, PrepError> {
    let raw = required_child_text(node, tag, path, context)?;
    raw.parse::<f64>().map_err(|_| PrepError::AnnotationParse {
        path: path.to_path_buf(),
        message: format!(
            "invalid <{tag}> value '{raw}' in {context}; expected floating-point number"
        ),
    })
}

fn child_element<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|child| child.is_element() && child.tag_name().name() == tag)
}

fn optional_child_text(node: Node<'_, '_>, tag: &str) -> Option<String> {
    child_element(node, tag)
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(ToOwned::to_owned)
}

fn has_xml_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(VOC_XML_EXTENSION))
        .unwrap_or(false)
}

pub(crate) fn rel_string(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.to_string_lossy().replace('\\', "/")
}
