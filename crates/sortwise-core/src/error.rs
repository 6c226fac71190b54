use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SortError {
    #[error("Directory does not exist: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Source file no longer exists: {path}")]
    SourceMissing { path: PathBuf },

    #[error("Category not found: {id}")]
    CategoryNotFound { id: String },

    #[error("Rule not found: {id}")]
    RuleNotFound { id: String },

    #[error("Invalid rule '{name}': {reason}")]
    InvalidRule { name: String, reason: String },

    #[error("Failed to parse config {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    #[error("Unknown config key: {key}")]
    ConfigKeyNotFound { key: String },

    #[error("Failed to move {path} to trash: {message}")]
    Trash { path: PathBuf, message: String },

    #[error("An organize or undo operation is already in progress")]
    Busy,

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Watcher error: {0}")]
    Watch(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Home directory not found")]
    HomeNotFound,
}

pub type Result<T> = std::result::Result<T, SortError>;

impl SortError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::DirectoryNotFound { .. } => 2,
            Self::NothingToUndo => 3,
            Self::Busy => 4,
            Self::InvalidRule { .. } | Self::ConfigParse { .. } => 5,
            Self::CategoryNotFound { .. } | Self::RuleNotFound { .. } => 6,
            _ => 1,
        }
    }
}
