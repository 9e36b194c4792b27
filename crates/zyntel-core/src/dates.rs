//! Best-effort date parsing for the seed files.
//!
//! The exports mix several day/month orderings. Each parser walks a fixed
//! list of patterns and gives up quietly: an unrecognised value never aborts
//! an import, the caller decides whether to skip the row or store `NULL`.

use chrono::{NaiveDate, NaiveDateTime};

/// Tried in order; the first match wins, so `03/04/2024` is 3 April.
pub const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%Y-%m-%d", "%d-%m-%Y", "%m/%d/%Y"];

pub const DATETIME_FORMATS: &[&str] = &["%d/%m/%Y %H:%M", "%d-%m-%Y %H:%M", "%Y-%m-%d %H:%M:%S"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateParse<T> {
    Parsed(T),
    /// Holds the trimmed input that matched none of the patterns.
    Unparsable(String),
}

impl<T> DateParse<T> {
    pub fn ok(self) -> Option<T> {
        match self {
            DateParse::Parsed(value) => Some(value),
            DateParse::Unparsable(_) => None,
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, DateParse::Parsed(_))
    }
}

pub fn parse_date(value: &str) -> DateParse<NaiveDate> {
    let trimmed = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .map(DateParse::Parsed)
        .unwrap_or_else(|| DateParse::Unparsable(trimmed.to_string()))
}

pub fn parse_datetime(value: &str) -> DateParse<NaiveDateTime> {
    let trimmed = value.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .map(DateParse::Parsed)
        .unwrap_or_else(|| DateParse::Unparsable(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jan_15() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    #[test]
    fn every_date_pattern_yields_the_same_day() {
        for input in ["15/01/2024", "2024-01-15", "15-01-2024", "01/15/2024"] {
            assert_eq!(parse_date(input), DateParse::Parsed(jan_15()), "input {input}");
        }
    }

    #[test]
    fn day_first_wins_when_ambiguous() {
        assert_eq!(
            parse_date("03/04/2024").ok(),
            NaiveDate::from_ymd_opt(2024, 4, 3)
        );
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        assert_eq!(parse_date("  2024-01-15 \t").ok(), Some(jan_15()));
    }

    #[test]
    fn unknown_patterns_are_unparsable_not_errors() {
        for input in ["", "yesterday", "2024/01/15", "15.01.2024", "2024-01-15 08:00:00"] {
            assert_eq!(
                parse_date(input),
                DateParse::Unparsable(input.trim().to_string()),
                "input {input}"
            );
        }
    }

    #[test]
    fn datetime_patterns_are_recognised() {
        let expected = jan_15().and_hms_opt(9, 30, 0).unwrap();
        assert_eq!(parse_datetime("15/01/2024 09:30").ok(), Some(expected));
        assert_eq!(parse_datetime("15-01-2024 09:30").ok(), Some(expected));
        assert_eq!(parse_datetime("2024-01-15 09:30:00").ok(), Some(expected));
    }

    #[test]
    fn date_only_is_not_a_datetime() {
        assert!(!parse_datetime("2024-01-15").is_parsed());
    }
}
