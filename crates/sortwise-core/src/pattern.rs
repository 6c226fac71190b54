//! Destination pattern expansion.
//!
//! Patterns such as `Invoices/{Year}` or `{Name} - {date:MMM yyyy}.{ext}` are
//! expanded against a file's metadata. Token names are case-insensitive;
//! unknown tokens are left verbatim so a literal name survives expansion
//! unchanged.

use chrono::{DateTime, Datelike, Local};

use crate::file::FileInfo;

const UNCATEGORIZED: &str = "Uncategorized";

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Expand every `{token}` in `pattern`.
pub fn expand(pattern: &str, file: &FileInfo, now: DateTime<Local>) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut rest = pattern;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find(['{', '}']) {
            Some(close) if after.as_bytes()[close] == b'}' => {
                let token = &after[..close];
                match resolve_token(token, file, now) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push('{');
                        out.push_str(token);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            // `{` without a matching `}` before the next `{`: keep it literal
            Some(next) => {
                out.push('{');
                out.push_str(&after[..next]);
                rest = &after[next..];
            }
            None => {
                out.push('{');
                rest = after;
                break;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Expand a file-name pattern.
///
/// For a file without an extension the dot in front of `{ext}` goes away
/// with it, so `{Name}.{ext}` gives `Makefile`, not `Makefile.`.
pub fn expand_file_name(pattern: &str, file: &FileInfo, now: DateTime<Local>) -> String {
    if !file.extension.is_empty() {
        return expand(pattern, file, now);
    }

    let lower = pattern.to_ascii_lowercase();
    let mut cleaned = String::with_capacity(pattern.len());
    let mut idx = 0;
    while idx < pattern.len() {
        let rest = &lower[idx..];
        if rest.starts_with(".{ext}") || rest.starts_with(".{extension}") {
            // Skip the dot; the token itself expands to nothing
            idx += 1;
            continue;
        }
        let c = pattern[idx..].chars().next().unwrap_or_default();
        cleaned.push(c);
        idx += c.len_utf8();
    }
    expand(&cleaned, file, now)
}

/// Turn `/` into the platform separator so `{Year}/{Month}` nests folders.
pub fn normalize_separators(path: &str) -> String {
    if std::path::MAIN_SEPARATOR == '/' {
        path.to_string()
    } else {
        path.replace('/', std::path::MAIN_SEPARATOR_STR)
    }
}

fn resolve_token(token: &str, file: &FileInfo, now: DateTime<Local>) -> Option<String> {
    let modified = file.modified.or(file.created).unwrap_or(now);
    let created = file.created.or(file.modified).unwrap_or(now);

    if let Some((kind, format)) = token.split_once(':') {
        let date = match kind.trim().to_ascii_lowercase().as_str() {
            "date" => modified,
            "created" => created,
            "today" => now,
            _ => return None,
        };
        return Some(format_date(date, format));
    }

    let value = match token.trim().to_ascii_lowercase().as_str() {
        "name" => file.name.clone(),
        "extension" | "ext" => file.extension.clone(),
        "category" => file
            .category
            .clone()
            .unwrap_or_else(|| UNCATEGORIZED.to_string()),
        "kind" => file.kind.clone(),
        "date" => format_date(modified, "yyyy-MM-dd"),
        "year" => format_date(modified, "yyyy"),
        "month" => format_date(modified, "MM"),
        "day" => format_date(modified, "dd"),
        "createdyear" => format_date(created, "yyyy"),
        "createdmonth" => format_date(created, "MM"),
        "createdday" => format_date(created, "dd"),
        "today" => format_date(now, "yyyy-MM-dd"),
        _ => return None,
    };
    Some(value)
}

/// Render `date` using the `yyyy yy MM MMM MMMM dd ddd dddd` mini-language.
///
/// Any other character is copied literally.
pub fn format_date(date: DateTime<Local>, format: &str) -> String {
    let mut out = String::with_capacity(format.len() + 8);
    let mut rest = format;

    while let Some(c) = rest.chars().next() {
        let run = rest.chars().take_while(|&x| x == c).count();
        let consumed = match (c, run) {
            ('y', n) if n >= 4 => {
                out.push_str(&format!("{:04}", date.year()));
                4
            }
            ('y', 2 | 3) => {
                out.push_str(&format!("{:02}", date.year().rem_euclid(100)));
                2
            }
            ('M', n) if n >= 4 => {
                out.push_str(MONTHS[date.month0() as usize]);
                4
            }
            ('M', 3) => {
                out.push_str(&MONTHS[date.month0() as usize][..3]);
                3
            }
            ('M', 2) => {
                out.push_str(&format!("{:02}", date.month()));
                2
            }
            ('d', n) if n >= 4 => {
                out.push_str(WEEKDAYS[date.weekday().num_days_from_monday() as usize]);
                4
            }
            ('d', 3) => {
                out.push_str(&WEEKDAYS[date.weekday().num_days_from_monday() as usize][..3]);
                3
            }
            ('d', 2) => {
                out.push_str(&format!("{:02}", date.day()));
                2
            }
            (c, _) => {
                out.push(c);
                c.len_utf8()
            }
        };
        rest = &rest[consumed..];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 1, 9, 8, 0, 0).unwrap()
    }

    fn file() -> FileInfo {
        FileInfo::new("/in/report.pdf")
            .with_category("documents")
            .with_modified(Local.with_ymd_and_hms(2024, 6, 15, 10, 0, 0).unwrap())
            .with_created(Local.with_ymd_and_hms(2023, 2, 3, 10, 0, 0).unwrap())
    }

    #[test]
    fn test_basic_tokens() {
        assert_eq!(expand("{Name}.{ext}", &file(), now()), "report.pdf");
        assert_eq!(expand("{NAME}-{Extension}", &file(), now()), "report-pdf");
        assert_eq!(expand("{Category}/{Kind}", &file(), now()), "documents/PDF Document");
    }

    #[test]
    fn test_date_tokens() {
        assert_eq!(expand("{Year}/{Month}/{Day}", &file(), now()), "2024/06/15");
        assert_eq!(expand("{Date}", &file(), now()), "2024-06-15");
        assert_eq!(
            expand("{CreatedYear}-{CreatedMonth}-{createdday}", &file(), now()),
            "2023-02-03"
        );
        assert_eq!(expand("{Today}", &file(), now()), "2025-01-09");
    }

    #[test]
    fn test_custom_formats() {
        assert_eq!(expand("{date:MMMM yyyy}", &file(), now()), "June 2024");
        assert_eq!(expand("{date:MMM-yy}", &file(), now()), "Jun-24");
        assert_eq!(expand("{created:dd.MM.yyyy}", &file(), now()), "03.02.2023");
        assert_eq!(expand("{today:dddd}", &file(), now()), "Thursday");
        assert_eq!(expand("{today:ddd dd}", &file(), now()), "Thu 09");
        assert_eq!(expand("{DATE:yyyy}", &file(), now()), "2024");
    }

    #[test]
    fn test_unknown_and_unbalanced_tokens_are_verbatim() {
        assert_eq!(expand("{Nope}-{Name}", &file(), now()), "{Nope}-report");
        assert_eq!(expand("a{b", &file(), now()), "a{b");
        assert_eq!(expand("a{b{Name}", &file(), now()), "a{breport");
        assert_eq!(expand("}{", &file(), now()), "}{");
        assert_eq!(expand("{weird:yyyy}", &file(), now()), "{weird:yyyy}");
    }

    #[test]
    fn test_expansion_is_idempotent_on_literals() {
        let once = expand("{Name}.{ext}", &file(), now());
        let twice = expand(&once, &file(), now());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_file_name_drops_dot_before_empty_extension() {
        let make = FileInfo::new("/in/Makefile");
        assert_eq!(expand_file_name("{Name}.{ext}", &make, now()), "Makefile");
        assert_eq!(expand_file_name("{Name}.{EXTENSION}-x", &make, now()), "Makefile-x");
        assert_eq!(expand_file_name("v1.{Name}", &make, now()), "v1.Makefile");

        let rc = FileInfo::new("/in/.bashrc");
        assert_eq!(expand_file_name("{Name}.{ext}", &rc, now()), ".bashrc");

        assert_eq!(expand_file_name("{Name}.{ext}", &file(), now()), "report.pdf");
    }

    #[test]
    fn test_missing_category_and_dates_fall_back() {
        let bare = FileInfo::new("/in/x.bin");
        assert_eq!(expand("{Category}", &bare, now()), "Uncategorized");
        assert_eq!(expand("{Year}", &bare, now()), "2025");
    }

    #[test]
    fn test_normalize_separators() {
        let expected = ["Invoices", "2024"].join(std::path::MAIN_SEPARATOR_STR);
        assert_eq!(normalize_separators("Invoices/2024"), expected);
    }
}
