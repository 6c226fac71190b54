//! Undo log for the last organize batch.
//!
//! Each [`UndoEntry`] stores the net original -> final transformation of one
//! file plus the side effects needed to reverse it. [`undo`] replays the log
//! in reverse and then removes folders the batch created, deepest first,
//! when they are empty.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SortError};
use crate::execute::unique_path;
use crate::fs::FileSystem;

pub const UNDO_FILE: &str = "undo.json";

/// Where a file was when it was sent to the trash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrashRecord {
    pub path: PathBuf,
    pub trashed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoEntry {
    pub original_dir: PathBuf,
    pub original_name: String,
    pub final_dir: PathBuf,
    /// Empty when the file ended in the trash.
    pub final_name: String,
    /// Folders created while handling this file, innermost first.
    #[serde(default)]
    pub created_dirs: Vec<PathBuf>,
    #[serde(default)]
    pub copies: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trashed: Option<TrashRecord>,
}

fn split_path(path: &Path) -> (PathBuf, String) {
    let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    (dir, name)
}

impl UndoEntry {
    /// `final_path` is `None` when the file was trashed.
    pub fn new(original: &Path, final_path: Option<&Path>) -> Self {
        let (original_dir, original_name) = split_path(original);
        let (final_dir, final_name) = match final_path {
            Some(p) => split_path(p),
            None => (PathBuf::new(), String::new()),
        };
        Self {
            original_dir,
            original_name,
            final_dir,
            final_name,
            created_dirs: Vec::new(),
            copies: Vec::new(),
            trashed: None,
        }
    }

    pub fn with_created_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.created_dirs = dirs;
        self
    }

    pub fn with_copies(mut self, copies: Vec<PathBuf>) -> Self {
        self.copies = copies;
        self
    }

    pub fn with_trash(mut self, trashed: Option<TrashRecord>) -> Self {
        self.trashed = trashed;
        self
    }

    pub fn original_path(&self) -> PathBuf {
        self.original_dir.join(&self.original_name)
    }

    pub fn final_path(&self) -> Option<PathBuf> {
        if self.is_deletion() {
            None
        } else {
            Some(self.final_dir.join(&self.final_name))
        }
    }

    pub fn is_deletion(&self) -> bool {
        self.final_name.is_empty()
    }
}

/// Everything needed to reverse one organize batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UndoLog {
    pub batch_id: String,
    pub created_at: DateTime<Utc>,
    pub root: PathBuf,
    #[serde(default)]
    pub entries: Vec<UndoEntry>,
}

impl UndoLog {
    pub fn new(root: &Path) -> Self {
        Self {
            batch_id: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            root: root.to_path_buf(),
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, entry: UndoEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load a persisted log. `Ok(None)` when there is none.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        let log: UndoLog = serde_json::from_str(&content).map_err(|e| SortError::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(Some(log))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Remove a persisted log, if any.
    pub fn discard(path: &Path) -> Result<()> {
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// A trashed file that has to be restored from the trash by hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualRestore {
    pub original: PathBuf,
    pub trashed_from: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct UndoResult {
    pub restored: usize,
    pub copies_removed: usize,
    pub folders_removed: usize,
    pub manual_restore: Vec<ManualRestore>,
    pub errors: Vec<String>,
}

impl UndoResult {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.manual_restore.is_empty()
    }
}

/// Reverse `log`, newest entry first. Individual failures are collected and
/// do not stop the remaining entries.
pub fn undo(fs: &dyn FileSystem, log: &UndoLog) -> UndoResult {
    let mut result = UndoResult::default();

    for entry in log.entries.iter().rev() {
        for copy in &entry.copies {
            if !fs.exists(copy) {
                tracing::debug!(path = %copy.display(), "copy already gone");
                continue;
            }
            match fs.remove_file(copy) {
                Ok(()) => result.copies_removed += 1,
                Err(e) => result.errors.push(format!("{}: {}", copy.display(), e)),
            }
        }

        if let Some(trashed) = &entry.trashed {
            tracing::info!(path = %trashed.path.display(), "trashed file must be restored manually");
            result.manual_restore.push(ManualRestore {
                original: entry.original_path(),
                trashed_from: trashed.path.clone(),
            });
            continue;
        }

        let Some(final_path) = entry.final_path() else {
            continue;
        };
        let original = entry.original_path();
        if final_path == original {
            continue;
        }

        if let Err(e) = restore(fs, &final_path, &original, &mut result) {
            tracing::warn!(path = %final_path.display(), error = %e, "restore failed");
            result.errors.push(format!("{}: {}", final_path.display(), e));
        }
    }

    remove_created_dirs(fs, log, &mut result);

    tracing::info!(
        restored = result.restored,
        copies_removed = result.copies_removed,
        folders_removed = result.folders_removed,
        errors = result.errors.len(),
        "undo finished"
    );
    result
}

fn restore(fs: &dyn FileSystem, from: &Path, original: &Path, result: &mut UndoResult) -> Result<()> {
    if !fs.exists(from) {
        return Err(SortError::SourceMissing {
            path: from.to_path_buf(),
        });
    }

    if let Some(dir) = original.parent() {
        let mut missing = Vec::new();
        let mut cursor = Some(dir);
        while let Some(d) = cursor {
            if d.as_os_str().is_empty() || fs.exists(d) {
                break;
            }
            missing.push(d);
            cursor = d.parent();
        }
        for d in missing.into_iter().rev() {
            fs.create_dir(d)?;
        }
    }

    // Something new may occupy the old slot
    let target = unique_path(fs, original);
    fs.move_file(from, &target)?;
    tracing::info!(from = %from.display(), to = %target.display(), "restored");
    result.restored += 1;
    Ok(())
}

fn remove_created_dirs(fs: &dyn FileSystem, log: &UndoLog, result: &mut UndoResult) {
    let mut dirs: Vec<&PathBuf> = log
        .entries
        .iter()
        .flat_map(|e| e.created_dirs.iter())
        .collect();
    dirs.sort_by(|a, b| {
        b.components()
            .count()
            .cmp(&a.components().count())
            .then_with(|| b.cmp(a))
    });
    dirs.dedup();

    for dir in dirs {
        if !fs.is_dir(dir) {
            continue;
        }
        match fs.is_dir_empty(dir) {
            Ok(true) => match fs.remove_dir(dir) {
                Ok(()) => result.folders_removed += 1,
                Err(e) => result.errors.push(format!("{}: {}", dir.display(), e)),
            },
            Ok(false) => tracing::debug!(dir = %dir.display(), "folder not empty; kept"),
            Err(e) => result.errors.push(format!("{}: {}", dir.display(), e)),
        }
    }
}
