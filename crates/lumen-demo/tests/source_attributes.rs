#![forbid(unsafe_code)]

//! Every library and binary source file in the workspace forbids unsafe code.

use std::fs;
use std::path::{Path, PathBuf};

fn rust_sources(dir: &Path, out: &mut Vec<PathBuf>) {
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            rust_sources(&path, out);
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            out.push(path);
        }
    }
}

#[test]
fn every_source_file_forbids_unsafe() {
    let crates = Path::new(env!("CARGO_MANIFEST_DIR")).parent().unwrap();
    let mut files = Vec::new();
    for name in ["lumen-store", "lumen-view", "lumen-demo"] {
        rust_sources(&crates.join(name).join("src"), &mut files);
    }
    assert!(files.len() >= 10, "found only {} files", files.len());

    let missing: Vec<String> = files
        .iter()
        .filter(|path| {
            let text = fs::read_to_string(path).unwrap();
            text.lines().next() != Some("#![forbid(unsafe_code)]")
        })
        .map(|path| path.display().to_string())
        .collect();
    assert!(missing.is_empty(), "missing #![forbid(unsafe_code)]: {missing:?}");
}
