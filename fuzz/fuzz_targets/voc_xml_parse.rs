//! Fuzz target for annotation document parsing.
//!
//! Feeds arbitrary bytes to the VOC XML parser, checking for panics,
//! crashes, or hangs.

#![no_main]

use libfuzzer_sys::fuzz_target;
use weldprep::ir::io_voc_xml::from_voc_xml_slice;

fuzz_target!(|data: &[u8]| {
    // Cap input size to avoid excessive memory usage.
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    if let Ok(document) = from_voc_xml_slice(data) {
        for object in &document.objects {
            let _ = object.bbox.is_well_formed();
        }
    }
});
