// SPDX-License-Identifier: MIT

//! Shared helpers for the plain `YYYY-MM-DD` dates used throughout the API.

use crate::error::AppError;
use chrono::{Days, NaiveDate};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a `YYYY-MM-DD` date string.
pub fn parse_date(s: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map_err(|_| AppError::BadRequest(format!("Invalid date '{s}': expected YYYY-MM-DD")))
}

/// Compute the exclusive end date for an all-day calendar event.
///
/// Google Calendar treats the end date of an all-day event as exclusive,
/// while record end dates are inclusive. The event end is therefore
/// (end_date or start_date) + 1 day, so a single-day record produces a
/// one-day event and an explicit end date is included in the event span.
pub fn exclusive_event_end(start_date: &str, end_date: Option<&str>) -> Result<String, AppError> {
    let last_day = parse_date(end_date.unwrap_or(start_date))?;
    let exclusive = last_day
        .checked_add_days(Days::new(1))
        .ok_or_else(|| AppError::BadRequest(format!("Date '{last_day}' out of range")))?;
    Ok(exclusive.format(DATE_FORMAT).to_string())
}

/// Inclusive day count of a record's date range.
///
/// Both endpoints count, so start == end is 1 day; a record with no end
/// date also counts as 1 day.
pub fn inclusive_day_count(start_date: &str, end_date: Option<&str>) -> Result<i64, AppError> {
    let start = parse_date(start_date)?;
    let end = end_date.map(parse_date).transpose()?.unwrap_or(start);
    Ok((end - start).num_days().abs() + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_count_no_end_date() {
        assert_eq!(inclusive_day_count("2024-01-01", None).unwrap(), 1);
    }

    #[test]
    fn test_day_count_same_day() {
        assert_eq!(
            inclusive_day_count("2024-01-01", Some("2024-01-01")).unwrap(),
            1
        );
    }

    #[test]
    fn test_day_count_multi_day() {
        assert_eq!(
            inclusive_day_count("2024-01-01", Some("2024-01-03")).unwrap(),
            3
        );
    }

    #[test]
    fn test_event_end_is_exclusive() {
        assert_eq!(
            exclusive_event_end("2024-01-01", None).unwrap(),
            "2024-01-02"
        );
        assert_eq!(
            exclusive_event_end("2024-01-01", Some("2024-01-03")).unwrap(),
            "2024-01-04"
        );
    }

    #[test]
    fn test_event_end_rolls_over_month() {
        assert_eq!(
            exclusive_event_end("2024-01-31", None).unwrap(),
            "2024-02-01"
        );
    }

    #[test]
    fn test_rejects_malformed_date() {
        assert!(parse_date("01/02/2024").is_err());
        assert!(inclusive_day_count("2024-1-1", None).is_err());
    }
}
