//! Date validation for free-form user input
//!
//! Accepts `today`, `yesterday`, `day/month/year` and `day-month-year`
//! (four-digit year). Anything else is rejected with `None`.

use chrono::{Local, NaiveDate};

/// Accepted numeric formats, tried in order
const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%d-%m-%Y"];

/// Canonical label format for dates shown to users
const LABEL_FORMAT: &str = "%Y-%m-%d";

/// Parse date text relative to the local calendar date
pub fn validate(text: &str) -> Option<NaiveDate> {
    validate_relative(text, Local::now().date_naive())
}

/// Parse date text relative to the given `today`
pub fn validate_relative(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let text = text.trim().to_lowercase();

    match text.as_str() {
        "today" => return Some(today),
        "yesterday" => return today.pred_opt(),
        _ => {}
    }

    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if !has_four_digit_year(&compact) {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&compact, fmt).ok())
}

/// Format a date the way it is shown to users
pub fn label(date: NaiveDate) -> String {
    date.format(LABEL_FORMAT).to_string()
}

/// chrono's `%Y` takes any digit count, so the width is checked up front
fn has_four_digit_year(text: &str) -> bool {
    match text.rsplit(['/', '-']).next() {
        Some(year) => year.len() == 4 && year.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_relative_words() {
        let today = day(2024, 3, 1);
        assert_eq!(validate_relative("today", today), Some(today));
        assert_eq!(validate_relative("  ToDay ", today), Some(today));
        assert_eq!(validate_relative("yesterday", today), Some(day(2024, 2, 29)));
        assert_eq!(validate_relative("YESTERDAY", today), Some(day(2024, 2, 29)));
    }

    #[test]
    fn test_numeric_formats() {
        let today = day(2024, 1, 1);
        assert_eq!(validate_relative("5/3/2024", today), Some(day(2024, 3, 5)));
        assert_eq!(validate_relative("05-03-2024", today), Some(day(2024, 3, 5)));
        assert_eq!(validate_relative("31/12/2023", today), Some(day(2023, 12, 31)));
    }

    #[test]
    fn test_internal_whitespace_is_ignored() {
        let today = day(2024, 1, 1);
        assert_eq!(validate_relative("5 / 3 / 2024", today), Some(day(2024, 3, 5)));
        assert_eq!(validate_relative("\t05 -03- 2024\n", today), Some(day(2024, 3, 5)));
    }

    #[test]
    fn test_rejects_garbage() {
        let today = day(2024, 1, 1);
        assert_eq!(validate_relative("not-a-date", today), None);
        assert_eq!(validate_relative("", today), None);
        assert_eq!(validate_relative("   ", today), None);
        assert_eq!(validate_relative("32/13/2024", today), None);
        assert_eq!(validate_relative("30/02/2024", today), None);
        assert_eq!(validate_relative("2024-03-05", today), None);
        assert_eq!(validate_relative("5/3/24", today), None);
        assert_eq!(validate_relative("5.3.2024", today), None);
    }

    #[test]
    fn test_mixed_separators_rejected() {
        let today = day(2024, 1, 1);
        assert_eq!(validate_relative("5/3-2024", today), None);
    }

    #[test]
    fn test_label() {
        assert_eq!(label(day(2024, 1, 8)), "2024-01-08");
    }

    #[test]
    fn test_validate_uses_local_today() {
        // Bracket the call so a midnight rollover cannot fail the test
        let before = Local::now().date_naive();
        let parsed = validate("today");
        let after = Local::now().date_naive();
        assert!(parsed == Some(before) || parsed == Some(after), "got {:?}", parsed);
    }
}
