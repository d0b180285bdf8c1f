//! Zip archive fixtures

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};
use zip::write::FileOptions;

/// Build an in-memory zip; names ending in `/` become directory entries
pub fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        if name.ends_with('/') {
            writer
                .add_directory(*name, FileOptions::default())
                .expect("add directory");
        } else {
            writer
                .start_file(*name, FileOptions::default())
                .expect("start file");
            writer.write_all(data).expect("write entry");
        }
    }
    writer.finish().expect("finish zip").into_inner()
}

/// Git metadata files for a repository whose HEAD points at `branch`
pub fn git_files(branch: &str) -> BTreeMap<String, Vec<u8>> {
    BTreeMap::from([
        (
            ".git/HEAD".to_string(),
            format!("ref: refs/heads/{branch}\n").into_bytes(),
        ),
        (
            ".git/refs/heads/".to_string() + branch,
            format!("{:040x}\n", branch.len()).into_bytes(),
        ),
        (
            ".git/description".to_string(),
            format!("project on {branch}\n").into_bytes(),
        ),
    ])
}

/// A project archive with the working tree and `.git` at the archive root
pub fn repo_archive(branch: &str) -> Vec<u8> {
    let git = git_files(branch);
    let mut entries: Vec<(&str, &[u8])> = vec![
        ("Cargo.toml", b"[package]\nname = \"sample\"\n"),
        ("src/", b""),
        ("src/lib.rs", b"pub fn sample() {}\n"),
        (".git/", b""),
    ];
    entries.extend(git.iter().map(|(name, data)| (name.as_str(), data.as_slice())));
    build_zip(&entries)
}

/// The same project, wrapped in a single top-level directory
pub fn wrapped_repo_archive(wrapper: &str, branch: &str) -> Vec<u8> {
    let git = git_files(branch);
    let names: Vec<(String, Vec<u8>)> = [
        ("README".to_string(), b"wrapped\n".to_vec()),
        (".git/".to_string(), Vec::new()),
    ]
    .into_iter()
    .chain(git)
    .map(|(name, data)| (format!("{wrapper}/{name}"), data))
    .collect();

    let mut entries: Vec<(&str, &[u8])> = vec![];
    let dir = format!("{wrapper}/");
    entries.push((dir.as_str(), b""));
    entries.extend(names.iter().map(|(name, data)| (name.as_str(), data.as_slice())));
    build_zip(&entries)
}

/// File entries (name to contents) of an in-memory zip; directories omitted
pub fn zip_entries(bytes: &[u8]) -> BTreeMap<String, Vec<u8>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("open zip");
    let mut files = BTreeMap::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).expect("read entry");
        if entry.is_dir() {
            continue;
        }
        let mut data = Vec::new();
        entry.read_to_end(&mut data).expect("read entry data");
        files.insert(entry.name().to_string(), data);
    }
    files
}
