mod projects;

use crate::db::NewProject;
use crate::types::ProjectId;
use std::path::PathBuf;

/// A project record as ingestion would build it, rooted at `/data`
pub(super) fn new_project(name: &str) -> NewProject {
    let id = ProjectId::new();
    let root = PathBuf::from("/data").join(id.to_string());
    NewProject {
        id,
        name: name.to_string(),
        unzipped_path: root.join("unzip"),
        zipped_path: root.join(format!("zip/{name}.zip")),
        git_zipped_path: root.join(format!("git/{name}.zip")),
        size_bytes: 2048,
        sha256: "ab".repeat(32),
    }
}
