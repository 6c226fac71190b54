//! Rule selection by priority, with `Continue` chaining.

use chrono::{DateTime, Local};

use super::Rule;
use crate::file::FileInfo;

/// Enabled, valid rules in evaluation order.
///
/// Ordering is by ascending priority; ties keep their original list position.
pub struct RuleMatcher<'a> {
    ordered: Vec<&'a Rule>,
}

impl<'a> RuleMatcher<'a> {
    pub fn new(rules: &'a [Rule]) -> Self {
        let mut ordered: Vec<&Rule> = rules
            .iter()
            .filter(|r| r.enabled && r.is_valid())
            .collect();
        // sort_by_key is stable
        ordered.sort_by_key(|r| r.priority);
        Self { ordered }
    }

    /// Rules in the order they are evaluated.
    pub fn rules(&self) -> &[&'a Rule] {
        &self.ordered
    }

    pub fn first_match(&self, file: &FileInfo, now: DateTime<Local>) -> Option<&'a Rule> {
        self.ordered.iter().copied().find(|r| r.matches(file, now))
    }

    /// Matching rules for `file`, following `Continue` chains.
    ///
    /// After a match, scanning stops unless that rule continues, in which case
    /// it resumes with the rule right after it. No rule appears twice.
    pub fn match_chain(&self, file: &FileInfo, now: DateTime<Local>) -> Vec<&'a Rule> {
        let mut chain = Vec::new();
        let mut start = 0;

        while let Some(offset) = self.ordered[start..]
            .iter()
            .position(|r| r.matches(file, now))
        {
            let idx = start + offset;
            let rule = self.ordered[idx];
            chain.push(rule);

            if !rule.continues() {
                break;
            }
            tracing::debug!(rule = %rule.name, file = %file.full_name, "rule continues to next match");
            start = idx + 1;
        }

        chain
    }
}

/// First enabled rule (by priority) whose conditions hold for `file`.
pub fn first_match<'a>(file: &FileInfo, rules: &'a [Rule], now: DateTime<Local>) -> Option<&'a Rule> {
    RuleMatcher::new(rules).first_match(file, now)
}

/// All rules applying to `file`, in priority order, following `Continue`.
pub fn match_chain<'a>(file: &FileInfo, rules: &'a [Rule], now: DateTime<Local>) -> Vec<&'a Rule> {
    RuleMatcher::new(rules).match_chain(file, now)
}
