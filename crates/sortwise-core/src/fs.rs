//! Filesystem collaborator.
//!
//! The executor and undo manager perform every mutation through
//! [`FileSystem`], so tests can swap the recoverable trash for a staging
//! directory while keeping real file operations.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Result, SortError};

/// The only I/O boundary the rule engine uses.
pub trait FileSystem {
    fn exists(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    /// Create a single directory level. The parent must already exist.
    fn create_dir(&self, path: &Path) -> Result<()>;

    /// Move a file. `to` must not exist.
    fn move_file(&self, from: &Path, to: &Path) -> Result<()>;

    /// Copy a file. `to` must not exist.
    fn copy_file(&self, from: &Path, to: &Path) -> Result<()>;

    /// Send a file to the recoverable trash.
    fn trash(&self, path: &Path) -> Result<()>;

    fn remove_file(&self, path: &Path) -> Result<()>;

    /// Remove an empty directory.
    fn remove_dir(&self, path: &Path) -> Result<()>;

    fn is_dir_empty(&self, path: &Path) -> Result<bool>;

    /// Regular files under `dir`, sorted by path.
    fn list_files(&self, dir: &Path, recursive: bool) -> Result<Vec<PathBuf>>;

    fn metadata(&self, path: &Path) -> Result<fs::Metadata>;
}

/// [`FileSystem`] backed by the local disk and the platform trash.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl FileSystem for LocalFs {
    fn exists(&self, path: &Path) -> bool {
        path.symlink_metadata().is_ok()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn create_dir(&self, path: &Path) -> Result<()> {
        fs::create_dir(path)?;
        Ok(())
    }

    fn move_file(&self, from: &Path, to: &Path) -> Result<()> {
        if !self.exists(from) {
            return Err(SortError::SourceMissing {
                path: from.to_path_buf(),
            });
        }
        if self.exists(to) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("Destination already exists: {}", to.display()),
            )
            .into());
        }

        // Try rename first (same filesystem), fall back to copy+delete
        if fs::rename(from, to).is_err() {
            fs::copy(from, to)?;
            fs::remove_file(from)?;
        }
        Ok(())
    }

    fn copy_file(&self, from: &Path, to: &Path) -> Result<()> {
        if !self.exists(from) {
            return Err(SortError::SourceMissing {
                path: from.to_path_buf(),
            });
        }
        if self.exists(to) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("Destination already exists: {}", to.display()),
            )
            .into());
        }
        fs::copy(from, to)?;
        Ok(())
    }

    fn trash(&self, path: &Path) -> Result<()> {
        if !self.exists(path) {
            return Err(SortError::SourceMissing {
                path: path.to_path_buf(),
            });
        }
        trash::delete(path).map_err(|e| SortError::Trash {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        fs::remove_file(path)?;
        Ok(())
    }

    fn remove_dir(&self, path: &Path) -> Result<()> {
        fs::remove_dir(path)?;
        Ok(())
    }

    fn is_dir_empty(&self, path: &Path) -> Result<bool> {
        Ok(fs::read_dir(path)?.next().is_none())
    }

    fn list_files(&self, dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Err(SortError::DirectoryNotFound {
                path: dir.to_path_buf(),
            });
        }

        let max_depth = if recursive { usize::MAX } else { 1 };
        let mut files: Vec<PathBuf> = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(max_depth)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .collect();
        files.sort();
        Ok(files)
    }

    fn metadata(&self, path: &Path) -> Result<fs::Metadata> {
        fs::metadata(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SortError::SourceMissing {
                    path: path.to_path_buf(),
                }
            } else {
                e.into()
            }
        })
    }
}
