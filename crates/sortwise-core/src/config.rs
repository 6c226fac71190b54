use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::category::{CategoriesConfig, CategoryStore};
use crate::error::{Result, SortError};
use crate::rule::RULES_FILE;
use crate::session::ScanOptions;
use crate::undo::UNDO_FILE;
use crate::watch::DEFAULT_DEBOUNCE;

const CONFIG_FILE: &str = "config.toml";
const BASE_DIR_NAME: &str = ".sortwise";
pub const BASE_DIR_ENV: &str = "SORTWISE_BASE";

/// Default config template with rich comments
const DEFAULT_CONFIG_TEMPLATE: &str = r#"# sortwise configuration file
# Location: ~/.sortwise/config.toml

[organize]
# Descend into subfolders when scanning
recursive = false

# Include dot-files when scanning
include_hidden = false

# File-name globs never picked up by a scan
# Example: exclude = ["*.tmp", "desktop.ini"]
exclude = []

# Rules file, relative to this directory unless absolute
rules_file = "rules.toml"

[watch]
# Quiet period after the last change before re-running, in milliseconds
debounce_ms = 500

# Override or add categories. Unset fields keep the built-in values.
# [categories.documents]
# destination = "~/Documents/Sorted"
#
# [categories.ebooks]
# name = "E-books"
# extensions = ["epub", "mobi"]
# destination = "Books"
"#;

/// Global configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub organize: OrganizeConfig,

    #[serde(default)]
    pub watch: WatchConfig,

    #[serde(default)]
    pub categories: CategoriesConfig,
}

/// Scan and rule-file settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizeConfig {
    #[serde(default)]
    pub recursive: bool,

    #[serde(default)]
    pub include_hidden: bool,

    #[serde(default)]
    pub exclude: Vec<String>,

    #[serde(default = "default_rules_file")]
    pub rules_file: String,
}

fn default_rules_file() -> String {
    RULES_FILE.to_string()
}

impl Default for OrganizeConfig {
    fn default() -> Self {
        Self {
            recursive: false,
            include_hidden: false,
            exclude: Vec::new(),
            rules_file: default_rules_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE.as_millis() as u64
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

/// Base directory: explicit override, then `$SORTWISE_BASE`, then `~/.sortwise`.
pub fn resolve_base_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir.to_path_buf());
    }
    if let Some(dir) = std::env::var_os(BASE_DIR_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(BASE_DIR_NAME))
        .ok_or(SortError::HomeNotFound)
}

impl Config {
    /// Load config from base directory
    pub fn load(base_dir: &Path) -> Result<Self> {
        let path = base_dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content).map_err(|e| SortError::ConfigParse {
            path: path.clone(),
            message: e.to_string(),
        })?;

        Ok(config)
    }

    /// Save config to base directory
    pub fn save(&self, base_dir: &Path) -> Result<()> {
        let path = base_dir.join(CONFIG_FILE);
        fs::create_dir_all(base_dir)?;

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    /// Get config file path
    pub fn path(base_dir: &Path) -> PathBuf {
        base_dir.join(CONFIG_FILE)
    }

    /// Initialize config with default template (rich comments)
    pub fn init(base_dir: &Path) -> Result<PathBuf> {
        let path = base_dir.join(CONFIG_FILE);
        fs::create_dir_all(base_dir)?;

        if !path.exists() {
            fs::write(&path, DEFAULT_CONFIG_TEMPLATE)?;
        }

        Ok(path)
    }

    pub fn rules_path(&self, base_dir: &Path) -> PathBuf {
        let rules = Path::new(&self.organize.rules_file);
        if rules.is_absolute() {
            rules.to_path_buf()
        } else {
            base_dir.join(rules)
        }
    }

    pub fn undo_path(base_dir: &Path) -> PathBuf {
        base_dir.join(UNDO_FILE)
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            recursive: self.organize.recursive,
            include_hidden: self.organize.include_hidden,
            exclude: self.organize.exclude.clone(),
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.watch.debounce_ms)
    }

    /// Built-in categories with the `[categories]` overrides applied
    pub fn category_store(&self) -> CategoryStore {
        CategoryStore::builtin().with_config(&self.categories)
    }

    /// Get a config value by dot-notation key
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "organize.recursive" => Some(self.organize.recursive.to_string()),
            "organize.include_hidden" => Some(self.organize.include_hidden.to_string()),
            "organize.exclude" => Some(format!("{:?}", self.organize.exclude)),
            "organize.rules_file" => Some(self.organize.rules_file.clone()),
            "watch.debounce_ms" => Some(self.watch.debounce_ms.to_string()),
            _ => None,
        }
    }

    /// Set a config value by dot-notation key
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "organize.recursive" => self.organize.recursive = parse_bool(key, value)?,
            "organize.include_hidden" => self.organize.include_hidden = parse_bool(key, value)?,
            "organize.exclude" => self.organize.exclude = parse_string_list(value)?,
            "organize.rules_file" => {
                let value = value.trim();
                self.organize.rules_file = if value.is_empty() {
                    default_rules_file()
                } else {
                    value.to_string()
                };
            }
            "watch.debounce_ms" => {
                self.watch.debounce_ms =
                    value.trim().parse().map_err(|_| SortError::ConfigParse {
                        path: PathBuf::from(CONFIG_FILE),
                        message: format!("{} expects milliseconds, got '{}'", key, value),
                    })?;
            }
            _ => {
                return Err(SortError::ConfigKeyNotFound {
                    key: key.to_string(),
                })
            }
        }
        Ok(())
    }

    /// List all config keys with their current values
    pub fn list(&self) -> Vec<(String, String)> {
        [
            "organize.recursive",
            "organize.include_hidden",
            "organize.exclude",
            "organize.rules_file",
            "watch.debounce_ms",
        ]
        .iter()
        .filter_map(|key| self.get(key).map(|v| (key.to_string(), v)))
        .collect()
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(SortError::ConfigParse {
            path: PathBuf::from(CONFIG_FILE),
            message: format!("{} expects true or false, got '{}'", key, value),
        }),
    }
}

/// Parse a comma-separated or JSON-like list string
fn parse_string_list(value: &str) -> Result<Vec<String>> {
    let trimmed = value.trim();

    // Try JSON array format first: ["a", "b"]
    let inner = if trimmed.starts_with('[') && trimmed.ends_with(']') {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    };

    let items: Vec<String> = inner
        .split(',')
        .map(|s| s.trim().trim_matches('"').trim_matches('\'').to_string())
        .filter(|s| !s.is_empty())
        .collect();

    Ok(items)
}
