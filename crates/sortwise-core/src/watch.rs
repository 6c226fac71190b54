//! Change filtering for watched folders.
//!
//! The watcher backend and its debouncer live in the CLI; this module only
//! decides which settled events matter and when a refresh may run.

use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Suffixes of files that are still being written by another program.
const PARTIAL_SUFFIXES: &[&str] = &[".tmp", ".crdownload", ".part", ".download", ".partial"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
    Renamed,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl WatchEvent {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Whether this event should schedule a refresh.
    pub fn is_relevant(&self) -> bool {
        !matches!(self.kind, ChangeKind::Other) && !is_ignored_path(&self.path)
    }
}

/// Temporary, partial or hidden files never trigger a refresh.
pub fn is_ignored_path(path: &Path) -> bool {
    let Some(name) = path.file_name().map(|n| n.to_string_lossy().to_lowercase()) else {
        return true;
    };
    name.starts_with('.')
        || name.starts_with("~$")
        || PARTIAL_SUFFIXES.iter().any(|s| name.ends_with(s))
}

/// Holds a pending refresh until the session is free.
///
/// Quiet-window coalescing happens in the watcher backend; this gate only
/// filters what it is handed and defers the refresh while an organize or
/// undo is running.
#[derive(Debug, Default)]
pub struct RefreshGate {
    refresh_needed: bool,
}

impl RefreshGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a settled event. Returns `false` for events that are filtered out.
    pub fn on_event(&mut self, event: &WatchEvent) -> bool {
        if !event.is_relevant() {
            return false;
        }
        self.refresh_needed = true;
        true
    }

    /// `true` when a refresh should run now.
    pub fn poll(&mut self, busy: bool) -> bool {
        if self.refresh_needed && !busy {
            self.refresh_needed = false;
            return true;
        }
        false
    }

    pub fn is_pending(&self) -> bool {
        self.refresh_needed
    }
}
