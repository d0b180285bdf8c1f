//! Local filesystem storage for raw uploads and derived archives
//!
//! Every path handed to [`LocalStorage::save`], [`LocalStorage::get`] and
//! [`LocalStorage::full_path`] is relative to the base directory. The archive
//! operations [`LocalStorage::unzip`] and [`LocalStorage::zip`] take absolute
//! paths produced by `full_path`; neither ever reads or changes the process
//! working directory.

mod archive;

#[cfg(test)]
pub(crate) mod fixtures;

use crate::error::{ArchiveError, Error, Result, StorageError};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, warn};

pub use archive::locate_subtree;

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Result of a successful [`LocalStorage::save`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SavedFile {
    /// Absolute path the bytes were written to
    pub path: PathBuf,
    /// Number of bytes written
    pub size_bytes: u64,
    /// Hex-encoded SHA-256 of the written bytes
    pub sha256: String,
}

/// Byte storage rooted at a single base directory
#[derive(Clone, Debug)]
pub struct LocalStorage {
    base: PathBuf,
    max_file_size: u64,
}

impl LocalStorage {
    /// Create storage rooted at `base`
    ///
    /// The base is made absolute and created if missing.
    pub fn new(base: impl AsRef<Path>, max_file_size: u64) -> Result<Self> {
        let base = std::path::absolute(base.as_ref()).map_err(|source| StorageError::CreateDir {
            path: base.as_ref().to_path_buf(),
            source,
        })?;
        std::fs::create_dir_all(&base).map_err(|source| StorageError::CreateDir {
            path: base.clone(),
            source,
        })?;

        debug!(base = ?base, max_file_size, "storage initialized");
        Ok(Self {
            base,
            max_file_size,
        })
    }

    /// Absolute base directory
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Largest accepted upload in bytes
    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Resolve a relative path against the base directory
    pub fn full_path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.base.join(relative)
    }

    /// Stream `reader` into the file at `relative`, replacing any existing file
    ///
    /// Steps run in order (create parents, inspect, delete, create, copy) and
    /// each reports its own [`StorageError`] variant. A copy that fails or
    /// exceeds the size limit removes the truncated file.
    pub async fn save<R>(&self, relative: impl AsRef<Path>, mut reader: R) -> Result<SavedFile>
    where
        R: AsyncRead + Unpin,
    {
        let path = self.full_path(relative);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| StorageError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        match fs::metadata(&path).await {
            Ok(_) => {
                fs::remove_file(&path)
                    .await
                    .map_err(|source| StorageError::Delete {
                        path: path.clone(),
                        source,
                    })?;
                debug!(?path, "removed existing file before overwrite");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(StorageError::Stat {
                    path: path.clone(),
                    source,
                }
                .into());
            }
        }

        let mut file = fs::File::create(&path)
            .await
            .map_err(|source| StorageError::Create {
                path: path.clone(),
                source,
            })?;

        match self.copy_limited(&mut reader, &mut file, &path).await {
            Ok((size_bytes, sha256)) => {
                info!(?path, size_bytes, "file saved");
                Ok(SavedFile {
                    path,
                    size_bytes,
                    sha256,
                })
            }
            Err(e) => {
                drop(file);
                if let Err(rm) = fs::remove_file(&path).await {
                    warn!(?path, error = %rm, "failed to remove truncated file");
                }
                Err(e.into())
            }
        }
    }

    async fn copy_limited<R>(
        &self,
        reader: &mut R,
        file: &mut fs::File,
        path: &Path,
    ) -> std::result::Result<(u64, String), StorageError>
    where
        R: AsyncRead + Unpin,
    {
        let write_err = |source| StorageError::Write {
            path: path.to_path_buf(),
            source,
        };

        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; COPY_BUFFER_SIZE];
        let mut written: u64 = 0;

        loop {
            let n = reader.read(&mut buf).await.map_err(write_err)?;
            if n == 0 {
                break;
            }
            written += n as u64;
            if written > self.max_file_size {
                return Err(StorageError::TooLarge {
                    path: path.to_path_buf(),
                    limit: self.max_file_size,
                });
            }
            hasher.update(&buf[..n]);
            file.write_all(&buf[..n]).await.map_err(write_err)?;
        }

        file.flush().await.map_err(write_err)?;
        file.sync_all().await.map_err(write_err)?;

        Ok((written, format!("{:x}", hasher.finalize())))
    }

    /// Open the file at `relative` for reading
    ///
    /// The caller owns the returned handle.
    pub async fn get(&self, relative: impl AsRef<Path>) -> Result<fs::File> {
        let path = self.full_path(relative);
        fs::File::open(&path).await.map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound { path }.into()
            } else {
                StorageError::Open { path, source }.into()
            }
        })
    }

    /// Expand `archive` into `target_dir/project_name`
    ///
    /// Returns the files written. Entries whose names would escape the
    /// target are skipped.
    pub async fn unzip(
        &self,
        archive: &Path,
        target_dir: &Path,
        project_name: &str,
    ) -> Result<Vec<PathBuf>> {
        let archive = archive.to_path_buf();
        let dest = target_dir.join(project_name);

        info!(?archive, ?dest, "unpacking archive");
        let files = run_blocking(move || archive::extract_archive(&archive, &dest)).await?;
        debug!(count = files.len(), "archive unpacked");
        Ok(files)
    }

    /// Archive the `subdir_name` subtree of `source_dir/archive_base_name`
    /// into `dest_dir/archive_base_name.zip`
    ///
    /// Entry names start with `subdir_name/`. The archive is written to a
    /// temporary sibling and renamed into place once complete.
    pub async fn zip(
        &self,
        source_dir: &Path,
        dest_dir: &Path,
        subdir_name: &str,
        archive_base_name: &str,
    ) -> Result<PathBuf> {
        let expanded_root = source_dir.join(archive_base_name);
        let dest_dir = dest_dir.to_path_buf();
        let dest = dest_dir.join(format!("{archive_base_name}.{}", crate::layout::ARCHIVE_EXT));
        let subdir_name = subdir_name.to_string();

        run_blocking(move || {
            std::fs::create_dir_all(&dest_dir).map_err(|e| ArchiveError::io(&dest_dir, e))?;
            let subtree = archive::locate_subtree(&expanded_root, &subdir_name)?;
            info!(?subtree, ?dest, "repackaging subtree");
            archive::pack_subtree(&subtree, &dest)?;
            Ok(dest)
        })
        .await
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> std::result::Result<T, ArchiveError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Archive(ArchiveError::TaskFailed(e.to_string())))?
        .map_err(Error::from)
}
