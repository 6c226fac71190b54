//! Condition evaluation.
//!
//! Every function here is a pure predicate over a [`FileInfo`] snapshot and a
//! caller-supplied `now`, so evaluation is deterministic and can run from any
//! thread.

use chrono::{DateTime, Duration, Local, Months, NaiveDate, NaiveDateTime, TimeZone};
use glob::{MatchOptions, Pattern};

use super::{Attribute, Condition, ConditionGroup, MatchType, Operator};
use crate::file::FileInfo;

const KB: f64 = 1024.0;

/// Combine a group's members under its match type.
///
/// An empty group is vacuously true for `All` and `None`, false for `Any`.
pub(crate) fn evaluate_group(
    match_type: MatchType,
    conditions: &[Condition],
    groups: &[ConditionGroup],
    file: &FileInfo,
    now: DateTime<Local>,
) -> bool {
    let mut results = conditions
        .iter()
        .map(|c| c.evaluate(file, now))
        .chain(groups.iter().map(|g| g.evaluate(file, now)));

    match match_type {
        MatchType::All => results.all(|r| r),
        MatchType::Any => results.any(|r| r),
        MatchType::None => !results.any(|r| r),
    }
}

impl Condition {
    pub fn evaluate(&self, file: &FileInfo, now: DateTime<Local>) -> bool {
        match self.attribute {
            Attribute::Name => evaluate_text(self.operator, &file.name, &self.value),
            Attribute::Extension => evaluate_text(
                self.operator,
                &file.extension,
                self.value.trim().trim_start_matches('.'),
            ),
            Attribute::FullName => evaluate_text(self.operator, &file.full_name, &self.value),
            Attribute::Kind => evaluate_text(self.operator, &file.kind, &self.value),
            Attribute::Size => evaluate_size(self.operator, file.size, &self.value),
            Attribute::DateCreated => self.evaluate_date(file.created, now),
            Attribute::DateModified => self.evaluate_date(file.modified, now),
            Attribute::DateAccessed => self.evaluate_date(file.accessed, now),
            Attribute::Contents => {
                tracing::debug!(file = %file.path.display(), "contents conditions are not evaluated");
                false
            }
        }
    }

    fn evaluate_date(&self, actual: Option<DateTime<Local>>, now: DateTime<Local>) -> bool {
        match self.operator {
            Operator::IsBlank => return actual.is_none(),
            Operator::IsNotBlank => return actual.is_some(),
            _ => {}
        }
        let Some(actual) = actual else {
            return false;
        };

        match self.operator {
            Operator::IsInTheLast => {
                let unit = self.secondary_value.as_deref().unwrap_or("days");
                match window_start(&self.value, unit, now) {
                    Some(start) => start <= actual && actual <= now,
                    None => false,
                }
            }
            Operator::Is
            | Operator::IsNot
            | Operator::IsBefore
            | Operator::IsAfter
            | Operator::IsGreaterThan
            | Operator::IsLessThan => match parse_date(&self.value) {
                Some(expected) => compare_date(self.operator, actual, expected),
                None => false,
            },
            _ => false,
        }
    }
}

fn evaluate_text(op: Operator, actual: &str, expected: &str) -> bool {
    let a = actual.to_lowercase();
    let e = expected.to_lowercase();

    match op {
        Operator::Is => a == e,
        Operator::IsNot => a != e,
        Operator::Contains => a.contains(&e),
        Operator::DoesNotContain => !a.contains(&e),
        Operator::StartsWith => a.starts_with(&e),
        Operator::EndsWith => a.ends_with(&e),
        Operator::MatchesPattern => glob_matches(expected, actual),
        Operator::IsBlank => actual.trim().is_empty(),
        Operator::IsNotBlank => !actual.trim().is_empty(),
        Operator::IsGreaterThan
        | Operator::IsLessThan
        | Operator::IsInTheLast
        | Operator::IsBefore
        | Operator::IsAfter => false,
    }
}

fn evaluate_size(op: Operator, actual: u64, expected: &str) -> bool {
    match op {
        Operator::IsBlank => return actual == 0,
        Operator::IsNotBlank => return actual > 0,
        _ => {}
    }
    let Some(expected) = parse_size(expected) else {
        return false;
    };

    match op {
        Operator::Is => actual == expected,
        Operator::IsNot => actual != expected,
        Operator::IsGreaterThan => actual > expected,
        Operator::IsLessThan => actual < expected,
        _ => false,
    }
}

/// Full-value glob match with `*` and `?`, case-insensitive.
///
/// Brackets are literal characters, not character classes.
fn glob_matches(pattern: &str, value: &str) -> bool {
    let mut escaped = String::with_capacity(pattern.len());
    let mut prev_star = false;
    for c in pattern.chars() {
        match c {
            '[' => escaped.push_str("[[]"),
            ']' => escaped.push_str("[]]"),
            // `**` has path semantics in glob; collapse runs to a single star
            '*' if prev_star => continue,
            c => escaped.push(c),
        }
        prev_star = c == '*';
    }

    let options = MatchOptions {
        case_sensitive: false,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };
    Pattern::new(&escaped)
        .map(|p| p.matches_with(value, options))
        .unwrap_or(false)
}

/// Parse `10`, `10 B`, `1.5 MB`, `2gb` into bytes (1024-based units).
pub fn parse_size(value: &str) -> Option<u64> {
    let v = value.trim();
    let split = v
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(v.len());
    let (number, unit) = v.split_at(split);
    let number: f64 = number.parse().ok()?;
    if !number.is_finite() || number < 0.0 {
        return None;
    }

    let multiplier = match unit.trim().to_ascii_uppercase().as_str() {
        "" | "B" => 1.0,
        "KB" | "K" => KB,
        "MB" | "M" => KB * KB,
        "GB" | "G" => KB * KB * KB,
        _ => return None,
    };
    Some((number * multiplier).round() as u64)
}

/// A parsed date operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateValue {
    /// Date-only values compare by calendar day.
    Day(NaiveDate),
    Instant(DateTime<Local>),
}

/// Parse an ISO-like date or date-time in local time.
pub fn parse_date(value: &str) -> Option<DateValue> {
    let v = value.trim();
    if let Ok(day) = NaiveDate::parse_from_str(v, "%Y-%m-%d") {
        return Some(DateValue::Day(day));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(v) {
        return Some(DateValue::Instant(dt.with_timezone(&Local)));
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(v, fmt) {
            return Local
                .from_local_datetime(&naive)
                .earliest()
                .map(DateValue::Instant);
        }
    }
    None
}

fn compare_date(op: Operator, actual: DateTime<Local>, expected: DateValue) -> bool {
    match expected {
        DateValue::Day(day) => {
            let actual = actual.date_naive();
            match op {
                Operator::Is => actual == day,
                Operator::IsNot => actual != day,
                Operator::IsBefore | Operator::IsLessThan => actual < day,
                Operator::IsAfter | Operator::IsGreaterThan => actual > day,
                _ => false,
            }
        }
        DateValue::Instant(instant) => match op {
            Operator::Is => actual.timestamp() == instant.timestamp(),
            Operator::IsNot => actual.timestamp() != instant.timestamp(),
            Operator::IsBefore | Operator::IsLessThan => actual < instant,
            Operator::IsAfter | Operator::IsGreaterThan => actual > instant,
            _ => false,
        },
    }
}

/// `now - amount * unit`, or `None` for an unparseable amount or unit.
fn window_start(amount: &str, unit: &str, now: DateTime<Local>) -> Option<DateTime<Local>> {
    let amount: u32 = amount.trim().parse().ok()?;
    let unit = unit.trim().to_ascii_lowercase();
    match unit.trim_end_matches('s') {
        "hour" => now.checked_sub_signed(Duration::hours(i64::from(amount))),
        "day" => now.checked_sub_signed(Duration::days(i64::from(amount))),
        "week" => now.checked_sub_signed(Duration::weeks(i64::from(amount))),
        "month" => now.checked_sub_months(Months::new(amount)),
        "year" => now.checked_sub_months(Months::new(amount.checked_mul(12)?)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 6, 20, 12, 0, 0).unwrap()
    }

    fn file() -> FileInfo {
        FileInfo::new("/in/Invoice_2024.pdf")
            .with_size(2 * 1024 * 1024)
            .with_modified(Local.with_ymd_and_hms(2024, 6, 15, 9, 30, 0).unwrap())
    }

    fn check(attribute: Attribute, operator: Operator, value: &str) -> bool {
        Condition::new(attribute, operator, value).evaluate(&file(), now())
    }

    #[test]
    fn test_text_operators_are_case_insensitive() {
        assert!(check(Attribute::Name, Operator::Contains, "INVOICE"));
        assert!(check(Attribute::Name, Operator::StartsWith, "invoice_"));
        assert!(check(Attribute::Name, Operator::EndsWith, "2024"));
        assert!(check(Attribute::Extension, Operator::Is, "PDF"));
        assert!(check(Attribute::Extension, Operator::Is, ".pdf"));
        assert!(check(Attribute::FullName, Operator::IsNot, "other.pdf"));
        assert!(check(Attribute::Name, Operator::DoesNotContain, "receipt"));
        assert!(check(Attribute::Kind, Operator::Is, "pdf document"));
    }

    #[test]
    fn test_matches_pattern_is_anchored() {
        assert!(check(Attribute::FullName, Operator::MatchesPattern, "invoice_*.pdf"));
        assert!(check(Attribute::FullName, Operator::MatchesPattern, "INVOICE_20??.*"));
        assert!(!check(Attribute::FullName, Operator::MatchesPattern, "voice"));
        assert!(!check(Attribute::FullName, Operator::MatchesPattern, "invoice_*.doc"));
        assert!(check(Attribute::FullName, Operator::MatchesPattern, "**.pdf"));
    }

    #[test]
    fn test_matches_pattern_brackets_are_literal() {
        let info = FileInfo::new("/in/photo[1].jpg");
        let cond = Condition::new(Attribute::FullName, Operator::MatchesPattern, "photo[1].*");
        assert!(cond.evaluate(&info, now()));
        let cond = Condition::new(Attribute::FullName, Operator::MatchesPattern, "photo[0-9].*");
        assert!(!cond.evaluate(&info, now()));
    }

    #[test]
    fn test_blank_ignores_operand() {
        assert!(check(Attribute::Name, Operator::IsNotBlank, "whatever"));
        assert!(!check(Attribute::Name, Operator::IsBlank, ""));
        assert!(check(Attribute::DateCreated, Operator::IsBlank, "ignored"));
        assert!(check(Attribute::DateModified, Operator::IsNotBlank, ""));

        let info = FileInfo::new("/in/README");
        let cond = Condition::new(Attribute::Extension, Operator::IsBlank, "x");
        assert!(cond.evaluate(&info, now()));
    }

    #[test]
    fn test_parse_size_units() {
        assert_eq!(parse_size("512"), Some(512));
        assert_eq!(parse_size("10 b"), Some(10));
        assert_eq!(parse_size("1KB"), Some(1024));
        assert_eq!(parse_size("1.5 mb"), Some(1572864));
        assert_eq!(parse_size("2 GB"), Some(2 * 1024 * 1024 * 1024));
        assert_eq!(parse_size("lots"), None);
        assert_eq!(parse_size("5 TB"), None);
    }

    #[test]
    fn test_size_comparisons() {
        assert!(check(Attribute::Size, Operator::IsGreaterThan, "1 MB"));
        assert!(check(Attribute::Size, Operator::IsLessThan, "3mb"));
        assert!(check(Attribute::Size, Operator::Is, "2 MB"));
        assert!(!check(Attribute::Size, Operator::IsGreaterThan, "garbage"));
        assert!(!check(Attribute::Size, Operator::Contains, "2"));
    }

    #[test]
    fn test_date_day_comparisons() {
        assert!(check(Attribute::DateModified, Operator::Is, "2024-06-15"));
        assert!(check(Attribute::DateModified, Operator::IsAfter, "2024-06-14"));
        assert!(!check(Attribute::DateModified, Operator::IsAfter, "2024-06-15"));
        assert!(check(Attribute::DateModified, Operator::IsBefore, "2024-06-16"));
        assert!(check(Attribute::DateModified, Operator::IsLessThan, "2024-07-01"));
        assert!(!check(Attribute::DateModified, Operator::IsBefore, "not a date"));
    }

    #[test]
    fn test_date_instant_comparisons() {
        assert!(check(Attribute::DateModified, Operator::IsAfter, "2024-06-15T09:00:00"));
        assert!(check(Attribute::DateModified, Operator::IsBefore, "2024-06-15 10:00"));
        assert!(check(Attribute::DateModified, Operator::Is, "2024-06-15T09:30:00"));
    }

    #[test]
    fn test_is_in_the_last() {
        let c = Condition::new(Attribute::DateModified, Operator::IsInTheLast, "7");
        assert!(c.evaluate(&file(), now()));

        let c = Condition::new(Attribute::DateModified, Operator::IsInTheLast, "3").with_unit("days");
        assert!(!c.evaluate(&file(), now()));

        let c = Condition::new(Attribute::DateModified, Operator::IsInTheLast, "1").with_unit("Weeks");
        assert!(c.evaluate(&file(), now()));

        let c = Condition::new(Attribute::DateModified, Operator::IsInTheLast, "1").with_unit("month");
        assert!(c.evaluate(&file(), now()));

        let c = Condition::new(Attribute::DateModified, Operator::IsInTheLast, "1").with_unit("fortnight");
        assert!(!c.evaluate(&file(), now()));
    }

    #[test]
    fn test_future_date_is_not_in_the_last() {
        let info = FileInfo::new("/in/a.txt")
            .with_modified(Local.with_ymd_and_hms(2024, 6, 21, 0, 0, 0).unwrap());
        let c = Condition::new(Attribute::DateModified, Operator::IsInTheLast, "30");
        assert!(!c.evaluate(&info, now()));
    }

    #[test]
    fn test_contents_never_matches() {
        assert!(!check(Attribute::Contents, Operator::Contains, "total"));
        assert!(!check(Attribute::Contents, Operator::IsBlank, ""));
    }

    #[test]
    fn test_group_match_types() {
        let yes = Condition::new(Attribute::Extension, Operator::Is, "pdf");
        let no = Condition::new(Attribute::Extension, Operator::Is, "doc");
        let f = file();

        let all = ConditionGroup::new(MatchType::All)
            .with_condition(yes.clone())
            .with_condition(no.clone());
        assert!(!all.evaluate(&f, now()));

        let any = ConditionGroup::new(MatchType::Any)
            .with_condition(yes.clone())
            .with_condition(no.clone());
        assert!(any.evaluate(&f, now()));

        let none = ConditionGroup::new(MatchType::None).with_condition(no.clone());
        assert!(none.evaluate(&f, now()));

        let nested = ConditionGroup::new(MatchType::All)
            .with_condition(yes)
            .with_group(ConditionGroup::new(MatchType::None).with_condition(no));
        assert!(nested.evaluate(&f, now()));
    }

    #[test]
    fn test_empty_group_policy() {
        let f = file();
        assert!(ConditionGroup::new(MatchType::All).evaluate(&f, now()));
        assert!(!ConditionGroup::new(MatchType::Any).evaluate(&f, now()));
        assert!(ConditionGroup::new(MatchType::None).evaluate(&f, now()));
    }
}
