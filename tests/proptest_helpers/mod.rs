#![allow(dead_code)]

use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};
use weldprep::ir::{BBoxXYXY, Pixel};

/// Tolerance for normalize → denormalize in pixel units.
pub fn eps_pixels(image_w: u32, image_h: u32) -> f64 {
    image_w.max(image_h) as f64 * 1e-9
}

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// Image dimensions large enough to hold a box of at least one pixel.
pub fn arb_image_dims() -> impl Strategy<Value = (u32, u32)> {
    (2u32..=4096, 2u32..=4096)
}

/// A well-formed box fully inside a `width` × `height` image.
pub fn arb_bbox_within(width: u32, height: u32) -> BoxedStrategy<BBoxXYXY<Pixel>> {
    (any::<u32>(), any::<u32>(), any::<u32>(), any::<u32>())
        .prop_map(move |(sx, sy, sw, sh)| bbox_from_seed(width, height, sx, sy, sw, sh))
        .boxed()
}

/// Free-text labels: words of mixed case separated by arbitrary whitespace.
pub fn arb_label() -> BoxedStrategy<String> {
    proptest::string::string_regex("[ \\t]{0,2}[A-Za-z0-9_]{1,10}([ \\t\\n]{1,3}[A-Za-z0-9_]{1,10}){0,2}[ \\t]{0,2}")
        .expect("valid label regex")
        .boxed()
}

/// Distinct document paths, as the pipeline would discover them.
pub fn arb_document_paths(max: usize) -> BoxedStrategy<Vec<std::path::PathBuf>> {
    proptest::collection::btree_set("[a-z0-9_]{1,12}", 0..=max)
        .prop_map(|stems| {
            stems
                .into_iter()
                .map(|stem| std::path::PathBuf::from(format!("label/{stem}.xml")))
                .collect()
        })
        .boxed()
}

fn bbox_from_seed(width: u32, height: u32, sx: u32, sy: u32, sw: u32, sh: u32) -> BBoxXYXY<Pixel> {
    let xmin = sx % (width - 1);
    let ymin = sy % (height - 1);
    let xmax = xmin + 1 + (sw % (width - xmin));
    let ymax = ymin + 1 + (sh % (height - ymin));

    BBoxXYXY::from_xyxy(xmin as f64, ymin as f64, xmax as f64, ymax as f64)
}
