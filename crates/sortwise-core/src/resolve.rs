//! Destination resolution and preview.
//!
//! [`ResolveContext::resolve`] projects where a file would end up under an
//! action list without touching the filesystem. The path-selection helpers on
//! [`ResolveContext`] are shared with the executor so preview and execution
//! pick the same targets. The one intentional difference is collision
//! renaming, which only the executor performs.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::category::{CategoryDef, CategoryLookup};
use crate::file::FileInfo;
use crate::pattern::{expand, expand_file_name, normalize_separators};
use crate::rule::{ActionType, Rule, RuleAction, RuleMatcher};

/// Destination reported for `Delete`.
pub const TRASH_MARKER: &str = "[Trash]";

/// One predicted path and the action that produces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub path: PathBuf,
    pub action: ActionType,
}

impl Destination {
    pub fn new(path: impl Into<PathBuf>, action: ActionType) -> Self {
        Self {
            path: path.into(),
            action,
        }
    }

    pub fn is_trash(&self) -> bool {
        self.action == ActionType::Delete
    }
}

/// Inputs shared by resolution and execution of one batch.
pub struct ResolveContext<'a> {
    /// Folder being organized; relative destinations resolve against it.
    pub base_path: PathBuf,
    pub categories: &'a dyn CategoryLookup,
    /// Reference time for date conditions and `{Today}` tokens.
    pub now: DateTime<Local>,
}

impl<'a> ResolveContext<'a> {
    pub fn new(base_path: impl Into<PathBuf>, categories: &'a dyn CategoryLookup) -> Self {
        Self {
            base_path: base_path.into(),
            categories,
            now: Local::now(),
        }
    }

    /// Pin the reference time.
    pub fn at(mut self, now: DateTime<Local>) -> Self {
        self.now = now;
        self
    }

    // ------------------------------------------------------------------------
    // Shared path selection
    // ------------------------------------------------------------------------

    /// Folder that `action` sends the file (or its copy) to, given the
    /// cursor's current folder. `None` means a configuration error: the
    /// action leaves the cursor unchanged.
    pub(crate) fn target_directory(
        &self,
        action: &RuleAction,
        file: &FileInfo,
        current_dir: &Path,
    ) -> Option<PathBuf> {
        let target = match action {
            RuleAction::MoveToFolder(folder) | RuleAction::CopyToFolder(folder) => {
                self.folder_path(folder, file)
            }
            RuleAction::MoveToCategory(id) => self
                .category(id, file)
                .and_then(|c| self.folder_path(&c.destination, file)),
            RuleAction::SortIntoSubfolder(pattern) => {
                let expanded = expand(pattern.trim(), file, self.now);
                let sub = expanded.trim().trim_matches('/');
                if sub.is_empty() {
                    None
                } else {
                    Some(current_dir.join(normalize_separators(sub)))
                }
            }
            RuleAction::Rename(_)
            | RuleAction::Delete
            | RuleAction::Ignore
            | RuleAction::Continue => return None,
        };

        if target.is_none() {
            tracing::warn!(
                action = %action.kind(),
                value = action.value().unwrap_or_default(),
                file = %file.full_name,
                "action has no usable destination; skipped"
            );
        }
        target
    }

    /// New file name for a `Rename` pattern, computed from the original
    /// metadata. Path separators in the result are replaced with `_`.
    pub(crate) fn rename_target(&self, pattern: &str, file: &FileInfo) -> Option<String> {
        let expanded = expand_file_name(pattern.trim(), file, self.now).replace(['/', '\\'], "_");
        let name = expanded.trim();
        if name.is_empty() || name == "." || name == ".." {
            tracing::warn!(pattern, file = %file.full_name, "rename pattern expands to an empty name; skipped");
            return None;
        }
        Some(name.to_string())
    }

    fn folder_path(&self, folder: &str, file: &FileInfo) -> Option<PathBuf> {
        let folder = folder.trim();
        if folder.is_empty() {
            return None;
        }
        let expanded = normalize_separators(&expand(folder, file, self.now));
        Some(self.absolutize(&expanded))
    }

    fn absolutize(&self, folder: &str) -> PathBuf {
        if let Some(rest) = folder.strip_prefix("~/").or_else(|| folder.strip_prefix("~\\")) {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        let path = Path::new(folder);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_path.join(path)
        }
    }

    /// Category named by `id`, or the file's own category when `id` is blank.
    fn category(&self, id: &str, file: &FileInfo) -> Option<&'a CategoryDef> {
        let id = id.trim();
        if !id.is_empty() {
            return self.categories.category_by_id(id);
        }
        file.category
            .as_deref()
            .and_then(|c| self.categories.category_by_id(c))
            .or_else(|| self.categories.category_for_extension(&file.extension))
    }

    // ------------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------------

    /// Predict every path `actions` produce for `file`, in action order.
    ///
    /// Relocating actions share a single primary entry that is replaced in
    /// place; copies are appended with the name current at the time of the
    /// copy.
    pub fn resolve(&self, actions: &[RuleAction], file: &FileInfo) -> Vec<Destination> {
        let mut destinations: Vec<Destination> = Vec::new();
        let mut primary: Option<usize> = None;
        let mut dir = file.directory().to_path_buf();
        let mut name = file.full_name.clone();

        for action in actions {
            match action {
                RuleAction::MoveToFolder(_)
                | RuleAction::MoveToCategory(_)
                | RuleAction::SortIntoSubfolder(_) => {
                    let Some(target) = self.target_directory(action, file, &dir) else {
                        continue;
                    };
                    dir = target;
                    set_primary(
                        &mut destinations,
                        &mut primary,
                        Destination::new(dir.join(&name), action.kind()),
                    );
                }
                RuleAction::CopyToFolder(_) => {
                    let Some(target) = self.target_directory(action, file, &dir) else {
                        continue;
                    };
                    destinations.push(Destination::new(target.join(&name), ActionType::CopyToFolder));
                }
                RuleAction::Rename(pattern) => {
                    let Some(new_name) = self.rename_target(pattern, file) else {
                        continue;
                    };
                    name = new_name;
                    set_primary(
                        &mut destinations,
                        &mut primary,
                        Destination::new(dir.join(&name), ActionType::Rename),
                    );
                }
                RuleAction::Delete => {
                    destinations.push(Destination::new(TRASH_MARKER, ActionType::Delete));
                    break;
                }
                RuleAction::Ignore => return Vec::new(),
                RuleAction::Continue => {}
            }
        }

        destinations
    }

    /// Match and resolve each file against `rules`.
    pub fn preview(&self, files: &[FileInfo], rules: &[Rule]) -> Vec<FileOrganizeResult> {
        let matcher = RuleMatcher::new(rules);
        files
            .iter()
            .map(|file| {
                let chain = matcher.match_chain(file, self.now);
                let actions = chain_actions(&chain);
                let destinations = self.resolve(&actions, file);
                FileOrganizeResult::new(file, &chain, destinations)
            })
            .collect()
    }
}

fn set_primary(destinations: &mut Vec<Destination>, primary: &mut Option<usize>, entry: Destination) {
    match *primary {
        Some(idx) => destinations[idx] = entry,
        None => {
            *primary = Some(destinations.len());
            destinations.push(entry);
        }
    }
}

/// The union of a rule chain's actions, in rule order then action order.
pub fn chain_actions(chain: &[&Rule]) -> Vec<RuleAction> {
    chain
        .iter()
        .flat_map(|r| r.actions.iter().cloned())
        .collect()
}

// ============================================================================
// Preview results
// ============================================================================

/// Predicted outcome for one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileOrganizeResult {
    pub source: PathBuf,
    pub destinations: Vec<Destination>,
    pub rule_ids: Vec<String>,
    pub rule_names: Vec<String>,
    pub category: Option<String>,
    pub size: u64,
    pub will_organize: bool,
}

impl FileOrganizeResult {
    pub fn new(file: &FileInfo, chain: &[&Rule], destinations: Vec<Destination>) -> Self {
        let will_organize = destinations.iter().any(|d| d.path != file.path);
        Self {
            source: file.path.clone(),
            destinations,
            rule_ids: chain.iter().map(|r| r.id.clone()).collect(),
            rule_names: chain.iter().map(|r| r.name.clone()).collect(),
            category: file.category.clone(),
            size: file.size,
            will_organize,
        }
    }

    pub fn is_matched(&self) -> bool {
        !self.rule_ids.is_empty()
    }

    /// Where the file itself ends up (relocation or trash), if it moves.
    pub fn primary(&self) -> Option<&Destination> {
        self.destinations
            .iter()
            .rev()
            .find(|d| d.action.is_relocation() || d.is_trash())
    }

    pub fn copies(&self) -> impl Iterator<Item = &Destination> {
        self.destinations
            .iter()
            .filter(|d| d.action == ActionType::CopyToFolder)
    }
}

/// Immutable grouping of preview results, built in one pass.
#[derive(Debug, Clone, Default)]
pub struct PreviewSnapshot {
    pub results: Vec<FileOrganizeResult>,
    /// Destination folder -> indices into `results`.
    pub by_folder: BTreeMap<PathBuf, Vec<usize>>,
    /// Category id -> indices into `results` of files that will be organized.
    pub by_category: BTreeMap<String, Vec<usize>>,
    pub total_files: usize,
    pub organized_files: usize,
    pub unmatched_files: usize,
    pub organized_bytes: u64,
}

impl PreviewSnapshot {
    pub fn build(results: Vec<FileOrganizeResult>) -> Self {
        let mut snapshot = Self {
            total_files: results.len(),
            ..Default::default()
        };

        for (idx, result) in results.iter().enumerate() {
            if !result.is_matched() {
                snapshot.unmatched_files += 1;
            }
            if !result.will_organize {
                continue;
            }
            snapshot.organized_files += 1;
            snapshot.organized_bytes += result.size;

            let category = result
                .category
                .clone()
                .unwrap_or_else(|| "uncategorized".to_string());
            snapshot.by_category.entry(category).or_default().push(idx);

            let mut seen: Vec<PathBuf> = Vec::new();
            for dest in &result.destinations {
                let folder = if dest.is_trash() {
                    PathBuf::from(TRASH_MARKER)
                } else {
                    dest.path.parent().map(Path::to_path_buf).unwrap_or_default()
                };
                if seen.contains(&folder) {
                    continue;
                }
                snapshot.by_folder.entry(folder.clone()).or_default().push(idx);
                seen.push(folder);
            }
        }

        snapshot.results = results;
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::CategoryStore;
    use crate::rule::{Attribute, Condition, Operator};
    use chrono::TimeZone;

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap()
    }

    fn file(name: &str) -> FileInfo {
        FileInfo::new(Path::new("/base").join(name))
            .with_modified(Local.with_ymd_and_hms(2024, 6, 15, 10, 0, 0).unwrap())
            .with_category_from(&CategoryStore::builtin())
    }

    fn ctx(store: &CategoryStore) -> ResolveContext<'_> {
        ResolveContext::new("/base", store).at(now())
    }

    fn paths(dests: &[Destination]) -> Vec<PathBuf> {
        dests.iter().map(|d| d.path.clone()).collect()
    }

    #[test]
    fn test_move_relative_and_absolute() {
        let store = CategoryStore::builtin();
        let ctx = ctx(&store);
        let f = file("a.pdf");

        let d = ctx.resolve(&[RuleAction::MoveToFolder("Docs".into())], &f);
        assert_eq!(paths(&d), vec![PathBuf::from("/base/Docs/a.pdf")]);

        let d = ctx.resolve(&[RuleAction::MoveToFolder("/archive/{Year}".into())], &f);
        assert_eq!(paths(&d), vec![PathBuf::from("/archive/2024/a.pdf")]);
    }

    #[test]
    fn test_later_move_replaces_primary() {
        let store = CategoryStore::builtin();
        let d = ctx(&store).resolve(
            &[
                RuleAction::MoveToFolder("A".into()),
                RuleAction::MoveToFolder("B".into()),
            ],
            &file("a.pdf"),
        );
        assert_eq!(d, vec![Destination::new("/base/B/a.pdf", ActionType::MoveToFolder)]);
    }

    #[test]
    fn test_sort_into_subfolder_nests_under_cursor() {
        let store = CategoryStore::builtin();
        let d = ctx(&store).resolve(
            &[
                RuleAction::MoveToFolder("Docs".into()),
                RuleAction::SortIntoSubfolder("{Year}/{Month}".into()),
            ],
            &file("a.pdf"),
        );
        assert_eq!(paths(&d), vec![PathBuf::from("/base/Docs/2024/06/a.pdf")]);
    }

    #[test]
    fn test_move_to_category() {
        let store = CategoryStore::builtin();
        let ctx = ctx(&store);

        let d = ctx.resolve(&[RuleAction::MoveToCategory("images".into())], &file("a.pdf"));
        assert_eq!(paths(&d), vec![PathBuf::from("/base/Images/a.pdf")]);

        let d = ctx.resolve(&[RuleAction::MoveToCategory(String::new())], &file("a.pdf"));
        assert_eq!(paths(&d), vec![PathBuf::from("/base/Documents/a.pdf")]);

        let d = ctx.resolve(&[RuleAction::MoveToCategory("missing".into())], &file("a.pdf"));
        assert!(d.is_empty());
    }

    #[test]
    fn test_copy_uses_name_current_at_copy_time() {
        let store = CategoryStore::builtin();
        let ctx = ctx(&store);
        let f = file("a.pdf");

        let d = ctx.resolve(
            &[
                RuleAction::Rename("renamed.pdf".into()),
                RuleAction::CopyToFolder("Backup".into()),
            ],
            &f,
        );
        assert_eq!(
            d,
            vec![
                Destination::new("/base/renamed.pdf", ActionType::Rename),
                Destination::new("/base/Backup/renamed.pdf", ActionType::CopyToFolder),
            ]
        );

        let d = ctx.resolve(
            &[
                RuleAction::CopyToFolder("Backup".into()),
                RuleAction::Rename("renamed.pdf".into()),
            ],
            &f,
        );
        assert_eq!(
            d,
            vec![
                Destination::new("/base/Backup/a.pdf", ActionType::CopyToFolder),
                Destination::new("/base/renamed.pdf", ActionType::Rename),
            ]
        );
    }

    #[test]
    fn test_copy_does_not_move_cursor() {
        let store = CategoryStore::builtin();
        let d = ctx(&store).resolve(
            &[
                RuleAction::CopyToFolder("Backup".into()),
                RuleAction::SortIntoSubfolder("Sorted".into()),
            ],
            &file("a.pdf"),
        );
        assert_eq!(
            paths(&d),
            vec![
                PathBuf::from("/base/Backup/a.pdf"),
                PathBuf::from("/base/Sorted/a.pdf"),
            ]
        );
    }

    #[test]
    fn test_rename_uses_original_metadata_and_strips_separators() {
        let store = CategoryStore::builtin();
        let d = ctx(&store).resolve(
            &[
                RuleAction::Rename("{Name}-old.{ext}".into()),
                RuleAction::Rename("{Year}/{Name}.{ext}".into()),
            ],
            &file("a.pdf"),
        );
        assert_eq!(paths(&d), vec![PathBuf::from("/base/2024_a.pdf")]);
    }

    #[test]
    fn test_identity_rename_without_extension() {
        let store = CategoryStore::builtin();
        let rename = [RuleAction::Rename("{Name}.{ext}".into())];
        for path in ["/base/Makefile", "/base/.bashrc"] {
            let d = ctx(&store).resolve(&rename, &FileInfo::new(path));
            assert_eq!(paths(&d), vec![PathBuf::from(path)]);
        }
    }

    #[test]
    fn test_delete_is_terminal() {
        let store = CategoryStore::builtin();
        let d = ctx(&store).resolve(
            &[RuleAction::Delete, RuleAction::CopyToFolder("Backup".into())],
            &file("a.pdf"),
        );
        assert_eq!(d, vec![Destination::new(TRASH_MARKER, ActionType::Delete)]);
    }

    #[test]
    fn test_ignore_clears_everything() {
        let store = CategoryStore::builtin();
        let d = ctx(&store).resolve(
            &[RuleAction::CopyToFolder("Backup".into()), RuleAction::Ignore],
            &file("a.pdf"),
        );
        assert!(d.is_empty());
    }

    #[test]
    fn test_blank_values_are_skipped() {
        let store = CategoryStore::builtin();
        let d = ctx(&store).resolve(
            &[
                RuleAction::MoveToFolder(" ".into()),
                RuleAction::Rename("".into()),
                RuleAction::SortIntoSubfolder("/".into()),
                RuleAction::Continue,
            ],
            &file("a.pdf"),
        );
        assert!(d.is_empty());
    }

    #[test]
    fn test_preview_and_snapshot() {
        let store = CategoryStore::builtin();
        let ctx = ctx(&store);
        let rules = vec![
            Rule::new("Backup")
                .with_id("backup")
                .with_priority(1)
                .with_condition(Condition::new(Attribute::Extension, Operator::Is, "pdf"))
                .with_action(RuleAction::CopyToFolder("Backup".into()))
                .with_action(RuleAction::Continue),
            Rule::new("Docs")
                .with_id("docs")
                .with_priority(2)
                .with_condition(Condition::new(Attribute::Extension, Operator::Is, "pdf"))
                .with_action(RuleAction::MoveToFolder("Docs".into())),
        ];
        let files = vec![file("a.pdf").with_size(10), file("b.png").with_size(5)];

        let results = ctx.preview(&files, &rules);
        assert_eq!(results[0].rule_ids, vec!["backup", "docs"]);
        assert!(results[0].will_organize);
        assert_eq!(
            results[0].primary().unwrap().path,
            PathBuf::from("/base/Docs/a.pdf")
        );
        assert_eq!(results[0].copies().count(), 1);
        assert!(!results[1].is_matched());

        let snapshot = PreviewSnapshot::build(results);
        assert_eq!(snapshot.total_files, 2);
        assert_eq!(snapshot.organized_files, 1);
        assert_eq!(snapshot.unmatched_files, 1);
        assert_eq!(snapshot.organized_bytes, 10);
        assert_eq!(snapshot.by_folder[Path::new("/base/Backup")], vec![0]);
        assert_eq!(snapshot.by_folder[Path::new("/base/Docs")], vec![0]);
        assert_eq!(snapshot.by_category["documents"], vec![0]);
    }
}
