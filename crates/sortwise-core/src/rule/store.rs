//! Rule persistence (`rules.toml`).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::Rule;
use crate::error::{Result, SortError};

pub const RULES_FILE: &str = "rules.toml";

/// Sample rules written by `init`
const DEFAULT_RULES_TEMPLATE: &str = r#"# sortwise rules
#
# Rules are evaluated by ascending priority. The first matching rule wins
# unless its last action is `continue`, in which case the next matching rule
# is applied as well.
#
# match_type: "all" (AND) | "any" (OR) | "none" (NOR)
# attributes: name, extension, full_name, kind, size, date_created,
#             date_modified, date_accessed
# actions:    move_to_folder, copy_to_folder, move_to_category,
#             sort_into_subfolder, rename, delete, ignore, continue

[[rules]]
id = "skip-partial-downloads"
name = "Skip partial downloads"
priority = 0
match_type = "any"
conditions = [
    { attribute = "extension", operator = "is", value = "crdownload" },
    { attribute = "extension", operator = "is", value = "part" },
]
actions = [{ type = "ignore" }]

[[rules]]
id = "invoices"
name = "Invoices by year"
priority = 10
conditions = [
    { attribute = "extension", operator = "is", value = "pdf" },
    { attribute = "name", operator = "contains", value = "invoice" },
]
actions = [{ type = "sort_into_subfolder", value = "Invoices/{Year}" }]

[[rules]]
id = "by-category"
name = "Everything else by category"
priority = 100
match_type = "none"
conditions = [{ attribute = "kind", operator = "is", value = "File" }]
actions = [{ type = "move_to_category", value = "" }]
"#;

/// The rule list, as stored in `rules.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Load rules from a file. A missing file yields an empty set.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let set: RuleSet = toml::from_str(&content).map_err(|e| SortError::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        Ok(set)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Write the sample rules template unless a rules file already exists.
    pub fn init(path: &Path) -> Result<PathBuf> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        if !path.exists() {
            fs::write(path, DEFAULT_RULES_TEMPLATE)?;
        }
        Ok(path.to_path_buf())
    }

    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == id)
    }

    /// One rule as a `[[rules]]` table, ready to paste back into the file.
    pub fn rule_toml(&self, id: &str) -> Result<String> {
        let rule = self.get(id).ok_or_else(|| SortError::RuleNotFound { id: id.to_string() })?;
        Ok(toml::to_string_pretty(&RuleSet::new(vec![rule.clone()]))?)
    }

    /// Problems a user should fix. Invalid rules are still loaded but the
    /// matcher never selects them.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        for (idx, rule) in self.rules.iter().enumerate() {
            if let Err(e) = rule.validate() {
                warnings.push(format!("rule #{}: {}", idx + 1, e));
            }
            if let Some(pos) = rule.actions.iter().position(|a| a.is_terminal()) {
                if pos + 1 < rule.actions.len() {
                    warnings.push(format!(
                        "rule '{}': actions after '{}' are never executed",
                        rule.name,
                        rule.actions[pos].kind()
                    ));
                }
            }
            if rule.actions.iter().any(|a| a.is_noop()) {
                warnings.push(format!("rule '{}': action with an empty value", rule.name));
            }
        }

        let mut ids: Vec<&str> = self.rules.iter().map(|r| r.id.as_str()).collect();
        ids.sort_unstable();
        for pair in ids.windows(2) {
            if pair[0] == pair[1] {
                warnings.push(format!("duplicate rule id '{}'", pair[0]));
            }
        }

        warnings
    }
}
