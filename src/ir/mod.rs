//! Annotation and dataset representations.
//!
//! Two coordinate systems meet here: annotation documents carry pixel
//! corner boxes, label files carry normalized center/extent boxes. The
//! [`Pixel`] and [`Normalized`] marker types keep them apart at compile time.
//!
//! # Example
//!
//! ```
//! use weldprep::ir::{normalize, BBoxXYXY, ClassTable, Pixel};
//!
//! let classes = ClassTable::default();
//! assert_eq!(classes.resolve("Weld Line").map(|c| c.as_usize()), Some(1));
//!
//! let bbox = BBoxXYXY::<Pixel>::from_xyxy(10.0, 10.0, 50.0, 60.0);
//! let (cx, cy, w, h) = normalize(&bbox, 100, 100).to_tuple();
//! assert!((cx - 0.3).abs() < 1e-12 && (h - 0.5).abs() < 1e-12);
//! # let _ = (cy, w);
//! ```

mod bbox;
mod classes;
pub mod io_voc_xml;
pub mod io_yolo;
pub mod layout;
mod space;

pub use bbox::{denormalize, normalize, BBoxCxCyWh, BBoxXYXY};
pub use classes::{normalize_label, ClassIndex, ClassTable};
pub use io_voc_xml::{AnnotationDocument, ObjectRecord};
pub use io_yolo::{DatasetManifest, ResolvedRecord};
pub use layout::{DatasetLayout, Split};
pub use space::{Normalized, Pixel};
