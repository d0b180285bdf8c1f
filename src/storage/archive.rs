//! Blocking zip codec: expand an archive, find the metadata subtree, pack it

use crate::error::ArchiveError;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;
use zip::result::ZipError;
use zip::write::FileOptions;

type Result<T> = std::result::Result<T, ArchiveError>;

fn corrupt(archive: &Path, e: ZipError) -> ArchiveError {
    match e {
        ZipError::Io(source) => ArchiveError::io(archive, source),
        other => ArchiveError::Corrupt {
            archive: archive.to_path_buf(),
            reason: other.to_string(),
        },
    }
}

/// Extract every safe entry of `archive_path` into `dest`
pub(crate) fn extract_archive(archive_path: &Path, dest: &Path) -> Result<Vec<PathBuf>> {
    let file = File::open(archive_path).map_err(|source| ArchiveError::Open {
        archive: archive_path.to_path_buf(),
        source,
    })?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| corrupt(archive_path, e))?;

    std::fs::create_dir_all(dest).map_err(|e| ArchiveError::io(dest, e))?;

    let mut extracted = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| corrupt(archive_path, e))?;

        let out_path = match entry.enclosed_name() {
            Some(name) => dest.join(name),
            None => {
                warn!(entry = entry.name(), "skipping entry with unsafe path");
                continue;
            }
        };

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|e| ArchiveError::io(&out_path, e))?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ArchiveError::io(parent, e))?;
        }

        let mut out = File::create(&out_path).map_err(|e| ArchiveError::io(&out_path, e))?;
        io::copy(&mut entry, &mut out).map_err(|e| {
            // The codec reports checksum and inflate failures as InvalidData
            if e.kind() == io::ErrorKind::InvalidData {
                ArchiveError::Corrupt {
                    archive: archive_path.to_path_buf(),
                    reason: format!("{}: {e}", entry.name()),
                }
            } else {
                ArchiveError::io(&out_path, e)
            }
        })?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            // Owner must keep read/write access to the expanded tree
            let perms = std::fs::Permissions::from_mode((mode & 0o7777) | 0o600);
            if let Err(e) = std::fs::set_permissions(&out_path, perms) {
                debug!(path = ?out_path, error = %e, "could not apply entry permissions");
            }
        }

        extracted.push(out_path);
    }

    Ok(extracted)
}

/// Find the `subdir` tree of an expanded project
///
/// Looks at `root/subdir` first. Archives that wrap the project in a single
/// top-level folder are also accepted: when `root` holds exactly one
/// directory and that directory contains `subdir`, that one is returned.
pub fn locate_subtree(root: &Path, subdir: &str) -> Result<PathBuf> {
    let not_found = || ArchiveError::SubtreeNotFound {
        root: root.to_path_buf(),
        subdir: subdir.to_string(),
    };

    let direct = root.join(subdir);
    if direct.is_dir() {
        return Ok(direct);
    }

    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(not_found()),
        Err(e) => return Err(ArchiveError::io(root, e)),
    };

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ArchiveError::io(root, e))?;
        if entry.file_type().map_err(|e| ArchiveError::io(entry.path(), e))?.is_dir() {
            dirs.push(entry.path());
        }
    }

    match dirs.as_slice() {
        [only] if only.join(subdir).is_dir() => {
            debug!(wrapper = ?only, "found subtree inside single top-level directory");
            Ok(only.join(subdir))
        }
        _ => Err(not_found()),
    }
}

/// Pack `subtree` into `dest`, naming entries relative to the subtree's parent
///
/// Writes to a hidden sibling of `dest` and renames it into place on success.
pub(crate) fn pack_subtree(subtree: &Path, dest: &Path) -> Result<()> {
    let parent = subtree.parent().unwrap_or(subtree);
    let file_name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = dest.with_file_name(format!(".{file_name}.partial"));

    match write_archive(subtree, parent, &tmp, dest) {
        Ok(entries) => {
            std::fs::rename(&tmp, dest).map_err(|e| ArchiveError::io(dest, e))?;
            debug!(?dest, entries, "archive written");
            Ok(())
        }
        Err(e) => {
            if let Err(rm) = std::fs::remove_file(&tmp) {
                if rm.kind() != io::ErrorKind::NotFound {
                    warn!(path = ?tmp, error = %rm, "failed to remove partial archive");
                }
            }
            Err(e)
        }
    }
}

fn write_archive(subtree: &Path, parent: &Path, tmp: &Path, dest: &Path) -> Result<usize> {
    let write_err = |e: ZipError| match e {
        ZipError::Io(source) => ArchiveError::io(tmp, source),
        other => ArchiveError::Write {
            archive: dest.to_path_buf(),
            reason: other.to_string(),
        },
    };

    let out = File::create(tmp).map_err(|e| ArchiveError::io(tmp, e))?;
    let mut writer = zip::ZipWriter::new(out);
    let mut entries = 0usize;

    for item in WalkDir::new(subtree).sort_by_file_name() {
        let item = item.map_err(|e| {
            let path = e.path().unwrap_or(subtree).to_path_buf();
            ArchiveError::io(path, io::Error::from(e))
        })?;

        let rel = item
            .path()
            .strip_prefix(parent)
            .map_err(|e| ArchiveError::io(item.path(), io::Error::other(e)))?;
        let name = entry_name(rel);

        let file_type = item.file_type();
        if file_type.is_dir() {
            writer
                .add_directory(format!("{name}/"), FileOptions::default())
                .map_err(write_err)?;
        } else if file_type.is_file() {
            let metadata = item
                .metadata()
                .map_err(|e| ArchiveError::io(item.path(), io::Error::from(e)))?;
            let options = FileOptions::default()
                .compression_method(zip::CompressionMethod::Deflated)
                .large_file(metadata.len() >= u64::from(u32::MAX));
            #[cfg(unix)]
            let options = {
                use std::os::unix::fs::PermissionsExt;
                options.unix_permissions(metadata.permissions().mode())
            };

            writer.start_file(name, options).map_err(write_err)?;
            let mut input = File::open(item.path()).map_err(|e| ArchiveError::io(item.path(), e))?;
            io::copy(&mut input, &mut writer).map_err(|e| ArchiveError::io(item.path(), e))?;
        } else {
            debug!(path = ?item.path(), "skipping non-regular file");
            continue;
        }
        entries += 1;
    }

    let out = writer.finish().map_err(write_err)?;
    out.sync_all().map_err(|e| ArchiveError::io(tmp, e))?;
    Ok(entries)
}

/// Zip entry names always use `/`, whatever the host separator
fn entry_name(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
