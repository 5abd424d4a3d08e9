mod common;

use layerforge::apps::run_inspect_dataset;
use tempfile::tempdir;

use common::{write_grouped, write_pairs};

fn args(values: &[&str]) -> impl Iterator<Item = String> {
    values
        .iter()
        .map(|value| value.to_string())
        .collect::<Vec<_>>()
        .into_iter()
}

#[test]
fn inspects_grouped_layout() {
    let temp = tempdir().unwrap();
    write_grouped(
        temp.path(),
        "train",
        &[("cola", 3), ("tea", 2)],
        &["object", "scene", "structure", "image"],
    );
    let root = temp.path().to_string_lossy().to_string();
    run_inspect_dataset(args(&[
        "--dataroot",
        &root,
        "--layout",
        "advnet-cyclic",
        "--group",
        "cola",
        "--group",
        "tea",
        "--show",
        "2",
        "--decode",
        "--emit-options",
    ]))
    .unwrap();
}

#[test]
fn inspects_pair_layout_with_cap() {
    let temp = tempdir().unwrap();
    write_pairs(temp.path(), "val", "kitchen", 4);
    let root = temp.path().to_string_lossy().to_string();
    run_inspect_dataset(args(&[
        "--dataroot",
        &root,
        "--layout",
        "ade20k",
        "--dataset-class",
        "kitchen",
        "--phase",
        "val",
        "--max-dataset-size",
        "2",
    ]))
    .unwrap();
}

#[test]
fn reports_misaligned_layouts() {
    let temp = tempdir().unwrap();
    write_grouped(temp.path(), "train", &[("cola", 2)], &["object", "scene", "image"]);
    write_grouped(temp.path(), "train", &[("cola", 1)], &["structure"]);
    let root = temp.path().to_string_lossy().to_string();
    let err = run_inspect_dataset(args(&["--dataroot", &root, "--group", "cola"])).unwrap_err();
    assert!(err.to_string().contains("misaligned"), "{err}");
}

#[test]
fn requires_a_dataset_source() {
    assert!(run_inspect_dataset(args(&["--layout", "ade20k"])).is_err());
    assert!(run_inspect_dataset(args(&["--help"])).is_ok());
}
