//! Action execution.
//!
//! [`ActionExecutor`] walks an action list with the same path selection as
//! [`ResolveContext::resolve`], but performs the moves, copies and trash
//! operations for real and records what it takes to reverse them.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::file::{split_name, FileInfo};
use crate::fs::FileSystem;
use crate::resolve::{chain_actions, ResolveContext};
use crate::rule::{ActionType, Rule, RuleAction, RuleMatcher};
use crate::undo::{TrashRecord, UndoEntry, UndoLog};

/// One filesystem mutation performed for a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TakenAction {
    pub action: ActionType,
    pub from: PathBuf,
    /// `None` for trash.
    pub to: Option<PathBuf>,
}

/// Outcome of running one file's action chain.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub source: PathBuf,
    pub success: bool,
    pub actions_taken: Vec<TakenAction>,
    pub errors: Vec<String>,
    pub ignored: bool,
    pub continued: bool,
    /// Where the file is now; `None` once it was sent to the trash.
    pub final_path: Option<PathBuf>,
    pub undo: Option<UndoEntry>,
}

impl ExecutionResult {
    pub fn changed(&self) -> bool {
        self.undo.is_some()
    }
}

/// Mutable progress of one file through its action chain.
struct ExecState {
    path: PathBuf,
    created_dirs: Vec<PathBuf>,
    copies: Vec<PathBuf>,
    trashed: Option<TrashRecord>,
    taken: Vec<TakenAction>,
    ignored: bool,
    continued: bool,
}

impl ExecState {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            created_dirs: Vec::new(),
            copies: Vec::new(),
            trashed: None,
            taken: Vec::new(),
            ignored: false,
            continued: false,
        }
    }

    fn current_dir(&self) -> PathBuf {
        self.path.parent().map(Path::to_path_buf).unwrap_or_default()
    }

    fn current_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    fn record(&mut self, action: ActionType, from: PathBuf, to: Option<PathBuf>) {
        self.taken.push(TakenAction { action, from, to });
    }

    /// Net original -> final transformation, if anything changed.
    fn undo_entry(&self, original: &Path) -> Option<UndoEntry> {
        let changed = self.path != original
            || self.trashed.is_some()
            || !self.copies.is_empty()
            || !self.created_dirs.is_empty();
        if !changed {
            return None;
        }

        let final_path = if self.trashed.is_some() {
            None
        } else {
            Some(self.path.as_path())
        };
        let mut created_dirs = self.created_dirs.clone();
        created_dirs.sort_by_key(|d| std::cmp::Reverse(d.components().count()));

        Some(
            UndoEntry::new(original, final_path)
                .with_created_dirs(created_dirs)
                .with_copies(self.copies.clone())
                .with_trash(self.trashed.clone()),
        )
    }
}

/// Performs the actions of a rule chain on the real filesystem.
pub struct ActionExecutor<'a> {
    fs: &'a dyn FileSystem,
    ctx: &'a ResolveContext<'a>,
}

impl<'a> ActionExecutor<'a> {
    pub fn new(fs: &'a dyn FileSystem, ctx: &'a ResolveContext<'a>) -> Self {
        Self { fs, ctx }
    }

    /// Run `actions` against `file`.
    ///
    /// The first failing step stops the chain; the file stays where the last
    /// successful step left it and the returned undo entry covers the
    /// partial progress.
    pub fn execute(&self, actions: &[RuleAction], file: &FileInfo) -> ExecutionResult {
        let mut state = ExecState::new(&file.path);
        let mut errors = Vec::new();

        if let Err(e) = self.run(actions, file, &mut state) {
            tracing::warn!(file = %file.path.display(), error = %e, "action chain failed");
            errors.push(e.to_string());
        }

        let undo = state.undo_entry(&file.path);
        ExecutionResult {
            source: file.path.clone(),
            success: errors.is_empty(),
            final_path: state.trashed.is_none().then(|| state.path.clone()),
            actions_taken: state.taken,
            errors,
            ignored: state.ignored,
            continued: state.continued,
            undo,
        }
    }

    fn run(&self, actions: &[RuleAction], file: &FileInfo, state: &mut ExecState) -> Result<()> {
        // Ignore overrides everything before it, exactly as in resolution
        if matches!(actions.iter().find(|a| a.is_terminal()), Some(RuleAction::Ignore)) {
            tracing::debug!(file = %file.full_name, "ignored by rule");
            state.ignored = true;
            return Ok(());
        }

        for action in actions {
            match action {
                RuleAction::MoveToFolder(_)
                | RuleAction::MoveToCategory(_)
                | RuleAction::SortIntoSubfolder(_) => {
                    let Some(dir) = self.ctx.target_directory(action, file, &state.current_dir())
                    else {
                        continue;
                    };
                    let dest = dir.join(state.current_name());
                    self.relocate(action.kind(), &dir, dest, state)?;
                }
                RuleAction::CopyToFolder(_) => {
                    let Some(dir) = self.ctx.target_directory(action, file, &state.current_dir())
                    else {
                        continue;
                    };
                    self.ensure_dir(&dir, state)?;
                    let dest = unique_path(self.fs, &dir.join(state.current_name()));
                    self.fs.copy_file(&state.path, &dest)?;
                    tracing::info!(from = %state.path.display(), to = %dest.display(), "copied");
                    state.copies.push(dest.clone());
                    state.record(ActionType::CopyToFolder, state.path.clone(), Some(dest));
                }
                RuleAction::Rename(pattern) => {
                    let Some(name) = self.ctx.rename_target(pattern, file) else {
                        continue;
                    };
                    let dir = state.current_dir();
                    let dest = dir.join(name);
                    self.relocate(ActionType::Rename, &dir, dest, state)?;
                }
                RuleAction::Delete => {
                    self.fs.trash(&state.path)?;
                    tracing::info!(path = %state.path.display(), "moved to trash");
                    state.trashed = Some(TrashRecord {
                        path: state.path.clone(),
                        trashed_at: Utc::now(),
                    });
                    state.record(ActionType::Delete, state.path.clone(), None);
                    return Ok(());
                }
                RuleAction::Ignore => {
                    state.ignored = true;
                    return Ok(());
                }
                RuleAction::Continue => state.continued = true,
            }
        }

        Ok(())
    }

    /// Move the file to `dest` inside `dir`, avoiding collisions.
    fn relocate(
        &self,
        action: ActionType,
        dir: &Path,
        dest: PathBuf,
        state: &mut ExecState,
    ) -> Result<()> {
        if dest == state.path {
            tracing::debug!(path = %dest.display(), "already in place");
            return Ok(());
        }

        self.ensure_dir(dir, state)?;
        let dest = unique_path(self.fs, &dest);
        self.fs.move_file(&state.path, &dest)?;
        tracing::info!(action = %action, from = %state.path.display(), to = %dest.display(), "moved");

        let from = std::mem::replace(&mut state.path, dest.clone());
        state.record(action, from, Some(dest));
        Ok(())
    }

    /// Create `dir` and any missing ancestors, remembering each new folder.
    fn ensure_dir(&self, dir: &Path, state: &mut ExecState) -> Result<()> {
        let mut missing = Vec::new();
        let mut cursor = Some(dir);
        while let Some(d) = cursor {
            if d.as_os_str().is_empty() || self.fs.exists(d) {
                break;
            }
            missing.push(d.to_path_buf());
            cursor = d.parent();
        }

        for d in missing.into_iter().rev() {
            self.fs.create_dir(&d)?;
            tracing::debug!(dir = %d.display(), "created folder");
            state.created_dirs.push(d);
        }
        Ok(())
    }
}

/// First free variant of `desired`: `name.ext`, `name (1).ext`, `name (2).ext`...
///
/// An existing ` (N)` suffix on the desired name is stripped before numbering.
pub fn unique_path(fs: &dyn FileSystem, desired: &Path) -> PathBuf {
    if !fs.exists(desired) {
        return desired.to_path_buf();
    }

    let dir = desired.parent().map(Path::to_path_buf).unwrap_or_default();
    let full_name = desired
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let (stem, ext) = split_name(&full_name);
    let base = strip_counter(&stem);

    let mut n: u32 = 0;
    loop {
        n += 1;
        let name = if ext.is_empty() {
            format!("{} ({})", base, n)
        } else {
            format!("{} ({}).{}", base, n, ext)
        };
        let candidate = dir.join(name);
        if !fs.exists(&candidate) {
            return candidate;
        }
    }
}

/// `document (3)` -> `document`; anything else is returned unchanged.
fn strip_counter(stem: &str) -> &str {
    let Some(inner) = stem.strip_suffix(')') else {
        return stem;
    };
    match inner.rfind(" (") {
        Some(idx) => {
            let digits = &inner[idx + 2..];
            if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
                &stem[..idx]
            } else {
                stem
            }
        }
        None => stem,
    }
}

// ============================================================================
// Batch
// ============================================================================

/// A per-file failure in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileError {
    pub path: PathBuf,
    pub message: String,
}

/// Summary of an organize batch. Never an early exit: every file is tried.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub results: Vec<ExecutionResult>,
    pub succeeded: usize,
    pub failed: usize,
    pub unchanged: usize,
    pub unmatched: usize,
    pub errors: Vec<FileError>,
    pub undo_log: UndoLog,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed + self.unchanged + self.unmatched
    }
}

/// Match, then execute, every file in order.
///
/// Files are processed sequentially since collision avoidance for a file
/// depends on what earlier files left behind.
pub fn organize_batch(
    files: &[FileInfo],
    rules: &[Rule],
    ctx: &ResolveContext<'_>,
    fs: &dyn FileSystem,
) -> BatchReport {
    let matcher = RuleMatcher::new(rules);
    let executor = ActionExecutor::new(fs, ctx);
    let mut report = BatchReport {
        results: Vec::new(),
        succeeded: 0,
        failed: 0,
        unchanged: 0,
        unmatched: 0,
        errors: Vec::new(),
        undo_log: UndoLog::new(&ctx.base_path),
    };

    for file in files {
        let chain = matcher.match_chain(file, ctx.now);
        if chain.is_empty() {
            report.unmatched += 1;
            continue;
        }

        let actions = chain_actions(&chain);
        let result = executor.execute(&actions, file);

        if let Some(entry) = &result.undo {
            report.undo_log.push(entry.clone());
        }
        if !result.success {
            report.failed += 1;
            report.errors.extend(result.errors.iter().map(|message| FileError {
                path: file.path.clone(),
                message: message.clone(),
            }));
        } else if result.changed() {
            report.succeeded += 1;
        } else {
            report.unchanged += 1;
        }
        report.results.push(result);
    }

    tracing::info!(
        succeeded = report.succeeded,
        failed = report.failed,
        unchanged = report.unchanged,
        unmatched = report.unmatched,
        "organize batch finished"
    );
    report
}
