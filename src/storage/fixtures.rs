//! Zip fixtures shared by unit tests

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use zip::write::FileOptions;

/// Build an in-memory zip; names ending in `/` become directory entries
pub(crate) fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, FileOptions::default()).unwrap();
        } else {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(data).unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}

/// A small project with a working tree and `.git` at the archive root
pub(crate) fn project_zip(marker: &str) -> Vec<u8> {
    let head = format!("ref: refs/heads/{marker}\n");
    let readme = format!("# {marker}\n");
    zip_bytes(&[
        ("README.md", readme.as_bytes()),
        ("src/", b""),
        ("src/main.rs", b"fn main() {}\n"),
        (".git/", b""),
        (".git/HEAD", head.as_bytes()),
        (".git/config", b"[core]\n\tbare = false\n"),
        (".git/objects/ab/cdef01", marker.as_bytes()),
    ])
}

/// The `.git` file entries [`project_zip`] produces for `marker`
pub(crate) fn expected_git_entries(marker: &str) -> BTreeMap<String, Vec<u8>> {
    BTreeMap::from([
        (
            ".git/HEAD".to_string(),
            format!("ref: refs/heads/{marker}\n").into_bytes(),
        ),
        (
            ".git/config".to_string(),
            b"[core]\n\tbare = false\n".to_vec(),
        ),
        (
            ".git/objects/ab/cdef01".to_string(),
            marker.as_bytes().to_vec(),
        ),
    ])
}

/// File entries (name to contents) of the zip at `path`; directories omitted
pub(crate) fn read_zip_files(path: &Path) -> BTreeMap<String, Vec<u8>> {
    let file = std::fs::File::open(path).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    let mut files = BTreeMap::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).unwrap();
        if entry.is_dir() {
            continue;
        }
        let mut data = Vec::new();
        entry.read_to_end(&mut data).unwrap();
        files.insert(entry.name().to_string(), data);
    }
    files
}

/// All entry names of the zip at `path`, directories included
pub(crate) fn read_zip_names(path: &Path) -> Vec<String> {
    let file = std::fs::File::open(path).unwrap();
    let archive = zip::ZipArchive::new(file).unwrap();
    archive.file_names().map(str::to_string).collect()
}
