//! Organizer session: the single owner of the undo log and the busy flag.
//!
//! ```text
//! Idle --organize--> Organizing --done--> OrganizedWithUndoAvailable
//!                                  \--nothing changed--> Idle
//! OrganizedWithUndoAvailable --undo--> Undoing --done--> Idle
//! OrganizedWithUndoAvailable --organize--> Organizing (old log discarded)
//! ```
//!
//! The session also remembers what its batches wrote. Later scans skip those
//! paths and [`OrganizerSession::is_own_change`] lets a watcher drop the
//! events they cause.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use glob::{MatchOptions, Pattern};

use crate::category::CategoryStore;
use crate::error::{Result, SortError};
use crate::execute::{organize_batch, BatchReport};
use crate::file::FileInfo;
use crate::fs::FileSystem;
use crate::resolve::{FileOrganizeResult, ResolveContext};
use crate::rule::{ActionType, Rule};
use crate::undo::{undo, UndoLog, UndoResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Organizing,
    OrganizedWithUndoAvailable,
    Undoing,
}

impl SessionState {
    pub fn is_busy(self) -> bool {
        matches!(self, Self::Organizing | Self::Undoing)
    }
}

/// Which files a scan picks up.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    pub recursive: bool,
    pub include_hidden: bool,
    /// File-name globs to skip, e.g. `*.tmp`.
    pub exclude: Vec<String>,
}

struct Inner {
    state: SessionState,
    undo_log: Option<UndoLog>,
    /// Files and folders written by this session's batches.
    produced: HashSet<PathBuf>,
    /// Paths the last batch moved files away from.
    vacated: HashSet<PathBuf>,
}

impl Inner {
    fn record_batch(&mut self, report: &BatchReport) {
        self.vacated.clear();
        for result in &report.results {
            for taken in &result.actions_taken {
                if let Some(to) = &taken.to {
                    self.produced.insert(to.clone());
                }
                if taken.action != ActionType::CopyToFolder {
                    self.vacated.insert(taken.from.clone());
                }
            }
            if let (Some(entry), Some(path)) = (&result.undo, &result.final_path) {
                self.produced.insert(path.clone());
                self.produced.extend(entry.created_dirs.iter().cloned());
            }
        }
    }

    fn forget_log(&mut self, log: &UndoLog) {
        for entry in &log.entries {
            if let Some(path) = entry.final_path() {
                self.produced.remove(&path);
            }
            for path in entry.copies.iter().chain(&entry.created_dirs) {
                self.produced.remove(path);
            }
        }
    }
}

/// Returns the session to `Idle` if an operation unwinds without finishing.
struct BusyGuard<'a> {
    inner: &'a Mutex<Inner>,
    done: bool,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        if !self.done {
            if let Ok(mut inner) = self.inner.lock() {
                inner.state = SessionState::Idle;
            }
        }
    }
}

pub struct OrganizerSession<F: FileSystem> {
    fs: F,
    categories: CategoryStore,
    inner: Mutex<Inner>,
}

impl<F: FileSystem> OrganizerSession<F> {
    pub fn new(fs: F, categories: CategoryStore) -> Self {
        Self {
            fs,
            categories,
            inner: Mutex::new(Inner {
                state: SessionState::Idle,
                undo_log: None,
                produced: HashSet::new(),
                vacated: HashSet::new(),
            }),
        }
    }

    pub fn fs(&self) -> &F {
        &self.fs
    }

    pub fn categories(&self) -> &CategoryStore {
        &self.categories
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A poisoned lock only means a panic happened mid-update; the state
        // itself is still a plain value.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    pub fn is_busy(&self) -> bool {
        self.state().is_busy()
    }

    /// Collect file metadata under `root`.
    ///
    /// Files that disappear between listing and reading are skipped, and so
    /// are files an earlier batch of this session put in place.
    pub fn scan(&self, root: &Path, options: &ScanOptions) -> Result<Vec<FileInfo>> {
        let produced = self.lock().produced.clone();
        let excludes: Vec<Pattern> = options
            .exclude
            .iter()
            .filter_map(|p| match Pattern::new(p) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    tracing::warn!(pattern = %p, error = %e, "invalid exclude pattern; ignored");
                    None
                }
            })
            .collect();
        let match_options = MatchOptions {
            case_sensitive: false,
            ..MatchOptions::new()
        };

        let mut files = Vec::new();
        for path in self.fs.list_files(root, options.recursive)? {
            if produced.contains(&path) {
                continue;
            }
            let info = match FileInfo::scan(&self.fs, &path, &self.categories) {
                Ok(info) => info,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable file");
                    continue;
                }
            };
            if info.hidden && !options.include_hidden {
                continue;
            }
            if excludes
                .iter()
                .any(|p| p.matches_with(&info.full_name, match_options))
            {
                continue;
            }
            files.push(info);
        }

        tracing::debug!(root = %root.display(), count = files.len(), "scanned");
        Ok(files)
    }

    pub fn preview(&self, root: &Path, files: &[FileInfo], rules: &[Rule]) -> Vec<FileOrganizeResult> {
        ResolveContext::new(root, &self.categories).preview(files, rules)
    }

    /// Execute `rules` against `files`, replacing any previous undo log.
    pub fn organize(&self, root: &Path, files: &[FileInfo], rules: &[Rule]) -> Result<BatchReport> {
        let mut guard = {
            let mut inner = self.lock();
            if inner.state.is_busy() {
                return Err(SortError::Busy);
            }
            if inner.undo_log.take().is_some() {
                tracing::debug!("previous undo log discarded");
            }
            inner.state = SessionState::Organizing;
            BusyGuard {
                inner: &self.inner,
                done: false,
            }
        };

        let ctx = ResolveContext::new(root, &self.categories);
        let report = organize_batch(files, rules, &ctx, &self.fs);

        let mut inner = self.lock();
        inner.record_batch(&report);
        if report.undo_log.is_empty() {
            inner.state = SessionState::Idle;
        } else {
            inner.undo_log = Some(report.undo_log.clone());
            inner.state = SessionState::OrganizedWithUndoAvailable;
        }
        guard.done = true;
        Ok(report)
    }

    /// Reverse the last batch. The log is consumed whatever the outcome.
    pub fn undo(&self) -> Result<UndoResult> {
        let (mut guard, log) = {
            let mut inner = self.lock();
            if inner.state.is_busy() {
                return Err(SortError::Busy);
            }
            let log = match inner.undo_log.take() {
                Some(log) if !log.is_empty() => log,
                _ => return Err(SortError::NothingToUndo),
            };
            inner.state = SessionState::Undoing;
            (
                BusyGuard {
                    inner: &self.inner,
                    done: false,
                },
                log,
            )
        };

        let result = undo(&self.fs, &log);

        let mut inner = self.lock();
        inner.forget_log(&log);
        inner.vacated.clear();
        inner.state = SessionState::Idle;
        drop(inner);
        guard.done = true;
        Ok(result)
    }

    /// Adopt a log persisted by an earlier process.
    pub fn restore_undo_log(&self, log: UndoLog) -> Result<()> {
        let mut inner = self.lock();
        if inner.state.is_busy() {
            return Err(SortError::Busy);
        }
        if log.is_empty() {
            inner.undo_log = None;
            inner.state = SessionState::Idle;
        } else {
            inner.undo_log = Some(log);
            inner.state = SessionState::OrganizedWithUndoAvailable;
        }
        Ok(())
    }

    pub fn undo_log(&self) -> Option<UndoLog> {
        self.lock().undo_log.clone()
    }

    /// Whether a change at `path` was caused by this session's own batches:
    /// something it wrote, or a file it moved away that is still gone.
    pub fn is_own_change(&self, path: &Path) -> bool {
        let inner = self.lock();
        if inner.produced.contains(path) {
            return true;
        }
        inner.vacated.contains(path) && !self.fs.exists(path)
    }
}
