//! Fuzz target for class label resolution.
//!
//! Resolution must be total: any string resolves to an in-range index or
//! to nothing, and normalizing first never changes the answer.

#![no_main]

use libfuzzer_sys::fuzz_target;
use weldprep::ir::{normalize_label, ClassTable};

fuzz_target!(|data: &[u8]| {
    let Ok(label) = std::str::from_utf8(data) else {
        return;
    };

    let table = ClassTable::default();
    let resolved = table.resolve(label);
    if let Some(index) = resolved {
        assert!(index.as_usize() < table.len());
    }
    assert_eq!(resolved, table.resolve(&normalize_label(label)));
});
