//! Rule model for file organization.
//!
//! A rule is a prioritized condition group plus an ordered list of actions.
//! Rules are loaded from `rules.toml` and only ever read by the engine.

mod condition;
mod matcher;
mod store;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SortError};
use crate::file::FileInfo;

pub use condition::{parse_date, parse_size, DateValue};
pub use matcher::{first_match, match_chain, RuleMatcher};
pub use store::{RuleSet, RULES_FILE};

// ============================================================================
// Conditions
// ============================================================================

/// How the members of a condition group are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// Every member must hold (AND).
    #[default]
    All,
    /// At least one member must hold (OR).
    Any,
    /// No member may hold (NOR).
    None,
}

/// File attribute a condition inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Name,
    Extension,
    FullName,
    Kind,
    Size,
    DateCreated,
    DateModified,
    DateAccessed,
    Contents,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Is,
    IsNot,
    Contains,
    DoesNotContain,
    StartsWith,
    EndsWith,
    MatchesPattern,
    IsGreaterThan,
    IsLessThan,
    IsInTheLast,
    IsBefore,
    IsAfter,
    IsBlank,
    IsNotBlank,
}

/// A single predicate over one file attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub attribute: Attribute,
    pub operator: Operator,
    #[serde(default)]
    pub value: String,
    /// Time unit for `is_in_the_last` (days, weeks, months, years).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_value: Option<String>,
}

impl Condition {
    pub fn new(attribute: Attribute, operator: Operator, value: impl Into<String>) -> Self {
        Self {
            attribute,
            operator,
            value: value.into(),
            secondary_value: None,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.secondary_value = Some(unit.into());
        self
    }
}

/// A recursively nested group of conditions with its own match type.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConditionGroup {
    #[serde(default)]
    pub match_type: MatchType,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default, rename = "nested_groups")]
    pub groups: Vec<ConditionGroup>,
}

impl ConditionGroup {
    pub fn new(match_type: MatchType) -> Self {
        Self {
            match_type,
            ..Default::default()
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn with_group(mut self, group: ConditionGroup) -> Self {
        self.groups.push(group);
        self
    }

    pub fn evaluate(&self, file: &FileInfo, now: DateTime<Local>) -> bool {
        condition::evaluate_group(self.match_type, &self.conditions, &self.groups, file, now)
    }
}

// ============================================================================
// Actions
// ============================================================================

/// An action a rule performs, in list order.
///
/// `Delete` and `Ignore` are terminal. `Continue` lets matching proceed to the
/// next rule by priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RuleAction {
    MoveToFolder(String),
    CopyToFolder(String),
    MoveToCategory(String),
    SortIntoSubfolder(String),
    Rename(String),
    Delete,
    Ignore,
    Continue,
}

/// Fieldless mirror of [`RuleAction`] used in results and undo records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    MoveToFolder,
    CopyToFolder,
    MoveToCategory,
    SortIntoSubfolder,
    Rename,
    Delete,
    Ignore,
    Continue,
}

impl RuleAction {
    pub fn kind(&self) -> ActionType {
        match self {
            Self::MoveToFolder(_) => ActionType::MoveToFolder,
            Self::CopyToFolder(_) => ActionType::CopyToFolder,
            Self::MoveToCategory(_) => ActionType::MoveToCategory,
            Self::SortIntoSubfolder(_) => ActionType::SortIntoSubfolder,
            Self::Rename(_) => ActionType::Rename,
            Self::Delete => ActionType::Delete,
            Self::Ignore => ActionType::Ignore,
            Self::Continue => ActionType::Continue,
        }
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            Self::MoveToFolder(v)
            | Self::CopyToFolder(v)
            | Self::MoveToCategory(v)
            | Self::SortIntoSubfolder(v)
            | Self::Rename(v) => Some(v),
            Self::Delete | Self::Ignore | Self::Continue => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delete | Self::Ignore)
    }

    /// An action that can have no effect: a path or pattern action with a
    /// blank value. `MoveToCategory` with a blank value falls back to the
    /// file's own category and is therefore meaningful.
    pub fn is_noop(&self) -> bool {
        match self {
            Self::MoveToFolder(v)
            | Self::CopyToFolder(v)
            | Self::SortIntoSubfolder(v)
            | Self::Rename(v) => v.trim().is_empty(),
            Self::MoveToCategory(_) | Self::Delete | Self::Ignore | Self::Continue => false,
        }
    }
}

impl ActionType {
    /// Actions that relocate the file itself (as opposed to copies).
    pub fn is_relocation(self) -> bool {
        matches!(
            self,
            Self::MoveToFolder | Self::MoveToCategory | Self::SortIntoSubfolder | Self::Rename
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::MoveToFolder => "move",
            Self::CopyToFolder => "copy",
            Self::MoveToCategory => "move-to-category",
            Self::SortIntoSubfolder => "sort",
            Self::Rename => "rename",
            Self::Delete => "delete",
            Self::Ignore => "ignore",
            Self::Continue => "continue",
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Rule Entity
// ============================================================================

/// A named, prioritized condition group plus an ordered action list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default = "new_rule_id")]
    pub id: String,
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Lower values are evaluated first.
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub match_type: MatchType,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub nested_groups: Vec<ConditionGroup>,
    #[serde(default)]
    pub actions: Vec<RuleAction>,
}

fn new_rule_id() -> String {
    format!("rule-{}", uuid::Uuid::new_v4().simple())
}

fn default_enabled() -> bool {
    true
}

impl Rule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_rule_id(),
            name: name.into(),
            enabled: true,
            priority: 0,
            match_type: MatchType::All,
            conditions: Vec::new(),
            nested_groups: Vec::new(),
            actions: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_match_type(mut self, match_type: MatchType) -> Self {
        self.match_type = match_type;
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn with_action(mut self, action: RuleAction) -> Self {
        self.actions.push(action);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Structural validation.
    ///
    /// The engine never matches a rule that fails this check.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(SortError::InvalidRule {
                name: self.id.clone(),
                reason: "rule has no name".to_string(),
            });
        }
        if self.conditions.is_empty() && self.nested_groups.is_empty() && self.actions.is_empty()
        {
            return Err(SortError::InvalidRule {
                name: self.name.clone(),
                reason: "rule has neither conditions nor actions".to_string(),
            });
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Evaluate the rule's root condition group.
    pub fn matches(&self, file: &FileInfo, now: DateTime<Local>) -> bool {
        self.is_valid()
            && condition::evaluate_group(
                self.match_type,
                &self.conditions,
                &self.nested_groups,
                file,
                now,
            )
    }

    /// Whether matching should proceed to the next rule after this one.
    ///
    /// True when the last meaningful action (trailing no-ops skipped) is
    /// `Continue`.
    pub fn continues(&self) -> bool {
        self.actions
            .iter()
            .rev()
            .find(|a| !a.is_noop())
            .is_some_and(|a| matches!(a, RuleAction::Continue))
    }
}
