use std::fs;
use std::path::Path;

use weldprep::ir::io_yolo::read_manifest;
use weldprep::ir::{ClassTable, DatasetLayout, Split};
use weldprep::prepare::{prepare_dataset, LocalDirSource, PrepareIssueCode, PrepareOptions};
use weldprep::verify::{verify_dataset, VerifyOptions};
use weldprep::PrepError;

mod common;

fn options(output: &Path, val_fraction: f64, seed: u64) -> PrepareOptions {
    PrepareOptions {
        output_root: output.to_path_buf(),
        val_fraction,
        seed,
        ..Default::default()
    }
}

fn run(dataset: &Path, opts: &PrepareOptions) -> weldprep::prepare::PrepareReport {
    prepare_dataset(&LocalDirSource::new(dataset), &ClassTable::default(), opts)
        .expect("prepare dataset")
}

fn all_stems(layout: &DatasetLayout, split: Split) -> Vec<String> {
    common::file_names(&layout.labels_dir(split))
        .into_iter()
        .map(|name| name.trim_end_matches(".txt").to_string())
        .collect()
}

#[test]
fn weld_line_box_is_normalized_into_label_file() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let dataset = temp.path().join("raw");
    let output = temp.path().join("out");
    common::add_document(
        &dataset,
        "img_01",
        &[("weld_line", [10.0, 10.0, 50.0, 60.0])],
        Some((100, 100)),
    );

    let report = run(&dataset, &options(&output, 0.0, 42));
    assert_eq!(report.documents, 1);
    assert_eq!(report.materialized.train, 1);
    assert_eq!(report.objects_written, 1);

    let layout = DatasetLayout::new(&output);
    let label = fs::read_to_string(layout.labels_dir(Split::Train).join("img_01.txt"))
        .expect("read label");
    assert_eq!(label, "1 0.3 0.35 0.4 0.5\n");
    assert_eq!(
        common::file_names(&layout.images_dir(Split::Train)),
        vec!["img_01.bmp"]
    );
}

#[test]
fn missing_image_excludes_document() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let dataset = temp.path().join("raw");
    let output = temp.path().join("out");
    common::add_document(&dataset, "img_01", &[("crease", [1.0, 1.0, 5.0, 5.0])], None);

    let report = run(&dataset, &options(&output, 0.2, 42));
    assert_eq!(report.skipped.image_not_found, 1);
    assert_eq!(report.materialized_total(), 0);

    let layout = DatasetLayout::new(&output);
    for split in Split::ALL {
        assert!(common::file_names(&layout.images_dir(split)).is_empty());
        assert!(common::file_names(&layout.labels_dir(split)).is_empty());
    }
    assert!(report
        .issues
        .iter()
        .any(|issue| issue.code == PrepareIssueCode::ImageNotFound));
    assert!(report
        .issues
        .iter()
        .any(|issue| issue.code == PrepareIssueCode::EmptyDataset));
    assert!(layout.manifest_path().is_file());
}

#[test]
fn ten_documents_split_two_to_validation_reproducibly() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let dataset = temp.path().join("raw");
    for i in 0..10 {
        common::add_document(
            &dataset,
            &format!("img_{i:02}"),
            &[("inclusion", [2.0, 2.0, 6.0, 6.0])],
            Some((8, 8)),
        );
    }

    let first_out = temp.path().join("first");
    let second_out = temp.path().join("second");
    let first = run(&dataset, &options(&first_out, 0.2, 7));
    let second = run(&dataset, &options(&second_out, 0.2, 7));

    assert_eq!(first.assigned.val, 2);
    assert_eq!(first.materialized.val, 2);
    assert_eq!(first.materialized.train, 8);

    let first_layout = DatasetLayout::new(&first_out);
    let second_layout = DatasetLayout::new(&second_out);
    assert_eq!(
        all_stems(&first_layout, Split::Val),
        all_stems(&second_layout, Split::Val)
    );
    assert_eq!(first.materialized, second.materialized);
}

#[test]
fn upper_case_synonym_resolves_like_canonical_label() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let dataset = temp.path().join("raw");
    let output = temp.path().join("out");
    common::add_document(
        &dataset,
        "a",
        &[("OIL SPOT", [0.0, 0.0, 2.0, 2.0]), ("oil_spot", [2.0, 2.0, 4.0, 4.0])],
        Some((4, 4)),
    );

    run(&dataset, &options(&output, 0.0, 1));
    let label = fs::read_to_string(DatasetLayout::new(&output).labels_dir(Split::Train).join("a.txt"))
        .expect("read label");
    let classes: Vec<&str> = label
        .lines()
        .map(|line| line.split(' ').next().unwrap_or_default())
        .collect();
    assert_eq!(classes, vec!["4", "4"]);
}

#[test]
fn unresolved_document_produces_no_files() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let dataset = temp.path().join("raw");
    let output = temp.path().join("out");
    common::add_document(&dataset, "a", &[("scratch", [0.0, 0.0, 2.0, 2.0])], Some((4, 4)));

    let report = run(&dataset, &options(&output, 0.0, 1));
    assert_eq!(report.skipped.empty_documents, 1);
    assert_eq!(report.dropped.unresolved_objects, 1);
    assert_eq!(report.failure_count(), 0);

    let layout = DatasetLayout::new(&output);
    assert!(common::file_names(&layout.labels_dir(Split::Train)).is_empty());
    assert!(common::file_names(&layout.images_dir(Split::Train)).is_empty());
}

#[test]
fn rerun_is_byte_identical() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let dataset = temp.path().join("raw");
    let output = temp.path().join("out");
    for (i, label) in ["punching", "water spot", "7", "Rolled Pit"].iter().enumerate() {
        common::add_document(
            &dataset,
            &format!("img_{i}"),
            &[(*label, [3.0, 7.0, 91.5, 40.25])],
            Some((123, 77)),
        );
    }

    let opts = options(&output, 0.5, 42);
    run(&dataset, &opts);
    let layout = DatasetLayout::new(&output);
    let snapshot = |layout: &DatasetLayout| {
        let mut files = Vec::new();
        for split in Split::ALL {
            for name in common::file_names(&layout.labels_dir(split)) {
                let bytes = fs::read(layout.labels_dir(split).join(&name)).expect("read label");
                files.push((split, name, bytes));
            }
            for name in common::file_names(&layout.images_dir(split)) {
                files.push((split, name, Vec::new()));
            }
        }
        files
    };
    let before = snapshot(&layout);

    run(&dataset, &opts);
    assert_eq!(before, snapshot(&layout));
}

#[test]
fn changed_seed_leaves_no_cross_split_orphans() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let dataset = temp.path().join("raw");
    let output = temp.path().join("out");
    for i in 0..12 {
        common::add_document(
            &dataset,
            &format!("img_{i:02}"),
            &[("crease", [1.0, 1.0, 3.0, 3.0])],
            Some((4, 4)),
        );
    }

    run(&dataset, &options(&output, 0.5, 1));
    run(&dataset, &options(&output, 0.5, 2));

    let layout = DatasetLayout::new(&output);
    let train = all_stems(&layout, Split::Train);
    let val = all_stems(&layout, Split::Val);
    assert_eq!(train.len() + val.len(), 12);
    assert!(train.iter().all(|stem| !val.contains(stem)));
    for split in Split::ALL {
        assert_eq!(
            common::file_names(&layout.images_dir(split)).len(),
            common::file_names(&layout.labels_dir(split)).len()
        );
    }
}

#[test]
fn parse_failures_and_invalid_boxes_are_counted() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let dataset = temp.path().join("raw");
    let output = temp.path().join("out");
    common::write_file(&dataset.join("label/label/broken.xml"), "<annotation><object>");
    common::write_bmp(&dataset.join("images/broken.bmp"), 4, 4);
    common::add_document(
        &dataset,
        "ok",
        &[("crease", [3.0, 1.0, 1.0, 3.0]), ("crease", [1.0, 1.0, 3.0, 3.0])],
        Some((4, 4)),
    );

    let report = run(&dataset, &options(&output, 0.0, 1));
    assert_eq!(report.documents, 2);
    assert_eq!(report.skipped.parse_failures, 1);
    assert_eq!(report.dropped.invalid_boxes, 1);
    assert_eq!(report.materialized.train, 1);
}

#[test]
fn duplicate_stems_keep_first_document() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let dataset = temp.path().join("raw");
    let output = temp.path().join("out");
    common::write_file(
        &dataset.join("a/img.xml"),
        &common::voc_xml("img.bmp", None, &[("crease", [0.0, 0.0, 1.0, 1.0])]),
    );
    common::write_file(
        &dataset.join("b/img.xml"),
        &common::voc_xml("img.bmp", None, &[("punching", [0.0, 0.0, 1.0, 1.0])]),
    );
    common::write_bmp(&dataset.join("a/img.bmp"), 2, 2);
    common::write_bmp(&dataset.join("b/img.bmp"), 2, 2);

    let report = run(&dataset, &options(&output, 0.0, 1));
    assert_eq!(report.skipped.duplicate_documents, 1);
    assert_eq!(report.materialized.train, 1);

    let label = fs::read_to_string(DatasetLayout::new(&output).labels_dir(Split::Train).join("img.txt"))
        .expect("read label");
    assert!(label.starts_with("8 "));
}

#[test]
fn output_nested_in_dataset_is_not_reingested() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let dataset = temp.path().join("raw");
    let output = dataset.join("yolo");
    common::add_document(&dataset, "a", &[("crease", [0.0, 0.0, 1.0, 1.0])], Some((2, 2)));

    let first = run(&dataset, &options(&output, 0.0, 1));
    assert_eq!(first.materialized.train, 1);

    // Only the copy under the output root is left.
    fs::remove_file(dataset.join("images/a.bmp")).expect("remove source image");
    let second = run(&dataset, &options(&output, 0.0, 1));
    assert_eq!(second.documents, 1);
    assert_eq!(second.skipped.image_not_found, 1);
}

#[test]
fn manifest_names_absolute_root_and_classes() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let dataset = temp.path().join("raw");
    let output = temp.path().join("out");
    common::add_document(&dataset, "a", &[("crease", [0.0, 0.0, 1.0, 1.0])], Some((2, 2)));
    run(&dataset, &options(&output, 0.0, 1));

    let layout = DatasetLayout::new(&output);
    let manifest = read_manifest(&layout.manifest_path()).expect("read manifest");
    assert!(manifest.root.is_absolute());
    assert_eq!(manifest.train_images, "images/train");
    assert_eq!(manifest.val_images, "images/val");
    assert_eq!(manifest.names.len(), 10);
    assert_eq!(manifest.names[0], "Punching");
    assert_eq!(manifest.names[9], "Waist_folding");

    let text = fs::read_to_string(layout.manifest_path()).expect("read data.yaml");
    assert!(text.contains("0: Punching"));

    let verified = verify_dataset(&output, &VerifyOptions::default()).expect("verify");
    assert!(verified.is_clean(), "{verified}");
}

#[test]
fn worker_count_does_not_change_results() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let dataset = temp.path().join("raw");
    for i in 0..20 {
        let objects: &[(&str, [f64; 4])] = if i % 5 == 0 {
            &[("rust", [0.0, 0.0, 1.0, 1.0])]
        } else {
            &[("silk spot", [0.0, 0.0, 1.0, 1.0])]
        };
        common::add_document(&dataset, &format!("img_{i:02}"), objects, Some((2, 2)));
    }

    let sequential_out = temp.path().join("seq");
    let parallel_out = temp.path().join("par");
    let sequential = run(
        &dataset,
        &PrepareOptions {
            workers: 1,
            ..options(&sequential_out, 0.25, 9)
        },
    );
    let parallel = run(
        &dataset,
        &PrepareOptions {
            workers: 4,
            ..options(&parallel_out, 0.25, 9)
        },
    );

    assert_eq!(sequential.materialized, parallel.materialized);
    assert_eq!(sequential.skipped, parallel.skipped);
    assert_eq!(sequential.issues.len(), parallel.issues.len());
    for split in Split::ALL {
        assert_eq!(
            all_stems(&DatasetLayout::new(&sequential_out), split),
            all_stems(&DatasetLayout::new(&parallel_out), split)
        );
    }
}

#[test]
fn empty_source_still_writes_manifest() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let dataset = temp.path().join("raw");
    fs::create_dir_all(&dataset).expect("create dataset dir");
    let output = temp.path().join("out");

    let report = run(&dataset, &options(&output, 0.2, 42));
    assert_eq!(report.documents, 0);
    let codes: Vec<_> = report.issues.iter().map(|issue| issue.code).collect();
    assert!(codes.contains(&PrepareIssueCode::NoDocuments));
    assert!(codes.contains(&PrepareIssueCode::EmptyDataset));
    assert!(output.join("data.yaml").is_file());
}

#[test]
fn setup_errors_abort_before_writing() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let output = temp.path().join("out");

    let err = prepare_dataset(
        &LocalDirSource::new(temp.path().join("missing")),
        &ClassTable::default(),
        &options(&output, 0.2, 42),
    )
    .unwrap_err();
    assert!(matches!(err, PrepError::DatasetFetch { .. }));

    let err = prepare_dataset(
        &LocalDirSource::new(temp.path()),
        &ClassTable::default(),
        &options(&output, 1.5, 42),
    )
    .unwrap_err();
    assert!(matches!(err, PrepError::InvalidSplitParams { .. }));
    assert!(!output.exists());
}

#[test]
fn clean_refuses_output_root_containing_dataset() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let dataset = temp.path().join("raw");
    fs::create_dir_all(&dataset).expect("create dataset dir");

    let opts = PrepareOptions {
        clean: true,
        ..options(temp.path(), 0.2, 42)
    };
    let err = prepare_dataset(&LocalDirSource::new(&dataset), &ClassTable::default(), &opts)
        .unwrap_err();
    assert!(matches!(err, PrepError::InvalidOutputRoot { .. }));
}

#[test]
fn clean_removes_stale_outputs() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let dataset = temp.path().join("raw");
    let output = temp.path().join("out");
    common::add_document(&dataset, "a", &[("crease", [0.0, 0.0, 1.0, 1.0])], Some((2, 2)));
    let layout = DatasetLayout::new(&output);
    common::write_file(&layout.labels_dir(Split::Val).join("stale.txt"), "0 0.5 0.5 1 1\n");

    let opts = PrepareOptions {
        clean: true,
        ..options(&output, 0.0, 1)
    };
    run(&dataset, &opts);
    assert_eq!(common::file_names(&layout.labels_dir(Split::Val)), Vec::<String>::new());
    assert_eq!(all_stems(&layout, Split::Train), vec!["a"]);
}
