//! Calendar date rules
//!
//! Queries use `YYYY-MM-DD`; daily report files and time series entries use
//! `MM-DD-YYYY`.

use chrono::{NaiveDate, Utc};

use crate::query::QueryError;

/// Format accepted in query parameters
pub const QUERY_DATE_FORMAT: &str = "%Y-%m-%d";

/// Format of report file stems and time series entries
pub const REPORT_DATE_FORMAT: &str = "%m-%d-%Y";

/// Nothing was reported before this day
pub fn earliest_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or(NaiveDate::MIN)
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Fixed-width check so `2020-1-5` style input is rejected like any other
/// malformed date.
fn has_shape(raw: &str, dash_positions: [usize; 2]) -> bool {
    raw.len() == 10
        && raw.char_indices().all(|(i, c)| {
            if dash_positions.contains(&i) {
                c == '-'
            } else {
                c.is_ascii_digit()
            }
        })
}

/// Parse and range-check a query date against `[2020-01-01, today]`
pub fn parse_query_date(raw: &str) -> Result<NaiveDate, QueryError> {
    parse_query_date_at(raw, today())
}

/// [`parse_query_date`] with an explicit "today"
pub fn parse_query_date_at(raw: &str, today: NaiveDate) -> Result<NaiveDate, QueryError> {
    if !has_shape(raw, [4, 7]) {
        return Err(QueryError::InvalidDate(raw.to_string()));
    }
    let date = NaiveDate::parse_from_str(raw, QUERY_DATE_FORMAT)
        .map_err(|_| QueryError::InvalidDate(raw.to_string()))?;
    if date < earliest_date() || date > today {
        return Err(QueryError::InvalidDate(raw.to_string()));
    }
    Ok(date)
}

/// Date encoded in a report file stem such as `01-22-2020`
pub fn parse_report_stem(stem: &str) -> Option<NaiveDate> {
    if !has_shape(stem, [2, 5]) {
        return None;
    }
    NaiveDate::parse_from_str(stem, REPORT_DATE_FORMAT).ok()
}

pub fn format_report_date(date: NaiveDate) -> String {
    date.format(REPORT_DATE_FORMAT).to_string()
}
