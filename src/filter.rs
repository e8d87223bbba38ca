use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

use crate::error::AppError;

pub const PAGE_SIZE: i64 = 200;
pub const MIN_YEAR: i32 = 1980;
pub const MAX_YEAR: i32 = 2100;

fn month_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{4}-(0[1-9]|1[0-2])$").expect("valid month regex"))
}

/// Parses a `YYYY-MM` path segment into the first day of that month.
pub fn parse_month(value: &str) -> Result<NaiveDate, AppError> {
    let invalid = || AppError::validation("Invalid month format, expected YYYY-MM");
    if !month_pattern().is_match(value) {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(&format!("{value}-01"), "%Y-%m-%d").map_err(|_| invalid())
}

pub fn parse_year(value: &str) -> Result<i32, AppError> {
    match value.trim().parse::<i32>() {
        Ok(year) if (MIN_YEAR..=MAX_YEAR).contains(&year) => Ok(year),
        _ => Err(AppError::validation("Invalid year parameter")),
    }
}

/// Negative or unparseable offsets fall back to the first page.
pub fn parse_offset(value: &str) -> i64 {
    match value.trim().parse::<i64>() {
        Ok(offset) if offset >= 0 => offset,
        _ => 0,
    }
}

/// Resolves the dashboard's flagged/unflagged checkbox pair into the
/// tri-state `is_flagged` filter. Both or neither checked means no filter.
pub fn checked_filter(flagged: bool, unflagged: bool) -> Option<bool> {
    match (flagged, unflagged) {
        (true, false) => Some(true),
        (false, true) => Some(false),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum FlagStatus {
    Flagged,
    Unflagged,
    #[default]
    Either,
}

impl FlagStatus {
    pub fn from_param(value: &str) -> Self {
        match value.trim() {
            "true" => Self::Flagged,
            "false" => Self::Unflagged,
            _ => Self::Either,
        }
    }

    pub fn from_checkboxes(flagged: bool, unflagged: bool) -> Self {
        Self::from_filter(checked_filter(flagged, unflagged))
    }

    pub fn from_filter(filter: Option<bool>) -> Self {
        match filter {
            Some(true) => Self::Flagged,
            Some(false) => Self::Unflagged,
            None => Self::Either,
        }
    }

    pub fn filter_value(self) -> Option<bool> {
        match self {
            Self::Flagged => Some(true),
            Self::Unflagged => Some(false),
            Self::Either => None,
        }
    }
}

/// Filters shared by the monthly and yearly report endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFilter {
    pub offset: i64,
    pub flag_status: FlagStatus,
    pub cities: Vec<String>,
}

impl ReportFilter {
    /// Reads `offset`, `flagStatus` (or the `flagged`/`unflagged` pair) and
    /// `cities` from a raw query string. `cities` may repeat, use the
    /// `cities[]` form, or carry a comma separated list.
    pub fn from_query(raw: Option<&str>) -> Self {
        let mut filter = Self::default();
        let mut flag_status = None;
        let mut flagged = None;
        let mut unflagged = None;

        for (key, value) in url::form_urlencoded::parse(raw.unwrap_or_default().as_bytes()) {
            match key.as_ref() {
                "offset" => filter.offset = parse_offset(&value),
                "flagStatus" => flag_status = Some(FlagStatus::from_param(&value)),
                "flagged" => flagged = Some(is_checked(&value)),
                "unflagged" => unflagged = Some(is_checked(&value)),
                "cities" | "cities[]" => filter.cities.extend(split_cities(&value)),
                _ => {}
            }
        }

        filter.flag_status = match flag_status {
            Some(status) => status,
            None if flagged.is_some() || unflagged.is_some() => FlagStatus::from_checkboxes(
                flagged.unwrap_or(false),
                unflagged.unwrap_or(false),
            ),
            None => FlagStatus::Either,
        };
        filter
    }

    pub fn cities_param(&self) -> Option<String> {
        if self.cities.is_empty() {
            None
        } else {
            Some(self.cities.join(","))
        }
    }
}

fn is_checked(value: &str) -> bool {
    matches!(value.trim(), "true" | "1" | "on")
}

pub fn split_cities(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(',')
        .map(str::trim)
        .filter(|city| !city.is_empty())
        .map(str::to_string)
}

/// Label used in export file names, e.g. `2024-03`.
pub fn month_label(month: NaiveDate) -> String {
    format!("{:04}-{:02}", month.year(), month.month())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_filter_covers_all_checkbox_pairs() {
        assert_eq!(checked_filter(true, false), Some(true));
        assert_eq!(checked_filter(false, true), Some(false));
        assert_eq!(checked_filter(true, true), None);
        assert_eq!(checked_filter(false, false), None);
    }

    #[test]
    fn month_parsing_appends_first_day() {
        let month = parse_month("2024-01").unwrap();
        assert_eq!(month.to_string(), "2024-01-01");
        assert_eq!(parse_month("1999-12").unwrap().to_string(), "1999-12-01");
    }

    #[test]
    fn malformed_months_are_rejected() {
        for value in ["2024-13", "2024-00", "2024-1", "24-01", "2024-01-01", "", "abcd-01"] {
            let err = parse_month(value).unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "{value} accepted");
        }
    }

    #[test]
    fn years_outside_range_are_rejected() {
        assert_eq!(parse_year("2024").unwrap(), 2024);
        assert_eq!(parse_year("1980").unwrap(), 1980);
        assert_eq!(parse_year("2100").unwrap(), 2100);
        for value in ["1979", "2101", "abc", "", "20.5"] {
            let err = parse_year(value).unwrap_err();
            assert_eq!(err.to_string(), "Invalid year parameter");
        }
    }

    #[test]
    fn offset_coerces_bad_input_to_zero() {
        assert_eq!(parse_offset("0"), 0);
        assert_eq!(parse_offset("400"), 400);
        assert_eq!(parse_offset("-5"), 0);
        assert_eq!(parse_offset("ten"), 0);
        assert_eq!(parse_offset(""), 0);
    }

    #[test]
    fn flag_status_param_is_tri_state() {
        assert_eq!(FlagStatus::from_param("true").filter_value(), Some(true));
        assert_eq!(FlagStatus::from_param("false").filter_value(), Some(false));
        assert_eq!(FlagStatus::from_param("maybe").filter_value(), None);
    }

    #[test]
    fn query_string_collects_filters() {
        let filter = ReportFilter::from_query(Some(
            "offset=200&flagStatus=true&cities=Springfield&cities=Shelbyville",
        ));
        assert_eq!(filter.offset, 200);
        assert_eq!(filter.flag_status, FlagStatus::Flagged);
        assert_eq!(filter.cities, vec!["Springfield", "Shelbyville"]);
        assert_eq!(
            filter.cities_param().as_deref(),
            Some("Springfield,Shelbyville")
        );
    }

    #[test]
    fn query_string_accepts_comma_and_bracket_city_forms() {
        let filter =
            ReportFilter::from_query(Some(
                "cities[]=Ogdenville&cities=North%20Haverbrook,%20Capital%20City,",
            ));
        assert_eq!(
            filter.cities,
            vec!["Ogdenville", "North Haverbrook", "Capital City"]
        );
    }

    #[test]
    fn checkbox_pair_applies_without_flag_status() {
        let filter = ReportFilter::from_query(Some("flagged=false&unflagged=true"));
        assert_eq!(filter.flag_status, FlagStatus::Unflagged);

        let filter = ReportFilter::from_query(Some("flagged=true&unflagged=true"));
        assert_eq!(filter.flag_status, FlagStatus::Either);
    }

    #[test]
    fn empty_query_means_first_page_without_filters() {
        let filter = ReportFilter::from_query(None);
        assert_eq!(filter, ReportFilter::default());
        assert_eq!(filter.cities_param(), None);
    }
}
