pub mod category;
pub mod config;
pub mod error;
pub mod execute;
pub mod file;
pub mod fs;
pub mod pattern;
pub mod resolve;
pub mod rule;
pub mod session;
pub mod undo;
pub mod watch;

pub use config::{resolve_base_dir, Config, OrganizeConfig, WatchConfig};
pub use error::{Result, SortError};
pub use execute::{
    organize_batch, unique_path, ActionExecutor, BatchReport, ExecutionResult, FileError,
    TakenAction,
};
pub use file::FileInfo;
pub use fs::{FileSystem, LocalFs};
pub use pattern::{expand, format_date};
pub use resolve::{
    chain_actions, Destination, FileOrganizeResult, PreviewSnapshot, ResolveContext, TRASH_MARKER,
};
pub use rule::{
    first_match, match_chain, ActionType, Attribute, Condition, ConditionGroup, MatchType,
    Operator, Rule, RuleAction, RuleMatcher, RuleSet, RULES_FILE,
};
pub use session::{OrganizerSession, ScanOptions, SessionState};
pub use undo::{undo, ManualRestore, TrashRecord, UndoEntry, UndoLog, UndoResult, UNDO_FILE};
pub use watch::{is_ignored_path, ChangeKind, RefreshGate, WatchEvent, DEFAULT_DEBOUNCE};

// Category system
pub use category::{
    BuiltinCategory, CategoriesConfig, CategoryConfigEntry, CategoryDef, CategoryLookup,
    CategoryStore, BUILTIN_CATEGORIES,
};
