//! Raw report row adaptation
//!
//! Daily reports come in two layouts. Current files carry a `FIPS` column,
//! report down to county level (`Admin2`) and include an `Active` count.
//! Legacy files use `Province/State` / `Country/Region` headers and stop at
//! the state level. Both are reduced to one [`NormalizedRow`] shape here.

use std::collections::HashMap;
use thiserror::Error;

use crate::locale;
use crate::metrics::Metrics;
use crate::store::LocationPath;

/// One CSV record keyed by header name
pub type RawRow = HashMap<String, String>;

/// Column whose presence marks the current layout
const GENERATION_MARKER: &str = "FIPS";

/// Territories reported as a province of their sovereign country that are
/// tracked as countries of their own.
const PROMOTED_TERRITORIES: &[&str] = &["Hong Kong", "Macau"];

mod columns {
    pub const CURRENT_COUNTRY: &str = "Country_Region";
    pub const CURRENT_STATE: &str = "Province_State";
    pub const CURRENT_ADMIN: &str = "Admin2";
    pub const LEGACY_COUNTRY: &str = "Country/Region";
    pub const LEGACY_STATE: &str = "Province/State";
    pub const CONFIRMED: &str = "Confirmed";
    pub const DEATHS: &str = "Deaths";
    pub const RECOVERED: &str = "Recovered";
    pub const ACTIVE: &str = "Active";
}

/// Row adaptation errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The layout's country column is absent; the file is unreadable
    #[error("Missing required column: {0}")]
    MissingColumn(&'static str),

    /// Country column present but empty for this row
    #[error("Blank value in required column: {0}")]
    BlankCountry(&'static str),
}

impl SchemaError {
    /// Whether the error condemns the whole file rather than one row
    pub fn is_structural(&self) -> bool {
        matches!(self, SchemaError::MissingColumn(_))
    }
}

/// Report layout generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generation {
    /// `FIPS` / `Admin2` / `Province_State` / `Country_Region` layout
    Current,
    /// `Province/State` / `Country/Region` layout
    Legacy,
}

impl Generation {
    pub fn detect(row: &RawRow) -> Self {
        if column(row, GENERATION_MARKER).is_some() {
            Generation::Current
        } else {
            Generation::Legacy
        }
    }
}

/// A report row reduced to its placement and counts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRow {
    pub country: String,
    pub subregion: Option<String>,
    pub locality: Option<String>,
    pub confirmed: i64,
    pub deaths: i64,
    pub recovered: i64,
    /// Only the current layout reports this
    pub active: Option<i64>,
}

impl NormalizedRow {
    /// Tree path for this row. A locality without a subregion sits directly
    /// under the country.
    pub fn path(&self) -> LocationPath {
        let mut path = LocationPath::country(self.country.clone());
        if let Some(subregion) = &self.subregion {
            path.push(subregion.clone());
        }
        if let Some(locality) = &self.locality {
            path.push(locality.clone());
        }
        path
    }

    pub fn metrics(&self) -> Metrics {
        Metrics::new(
            self.confirmed,
            self.deaths,
            self.recovered,
            self.active.unwrap_or(0),
        )
    }
}

/// Convert one raw row to its normalized form.
///
/// Count fields never fail: anything without a leading integer is zero.
pub fn adapt(row: &RawRow) -> Result<NormalizedRow, SchemaError> {
    match Generation::detect(row) {
        Generation::Current => adapt_current(row),
        Generation::Legacy => adapt_legacy(row),
    }
}

fn adapt_current(row: &RawRow) -> Result<NormalizedRow, SchemaError> {
    let raw_country = column(row, columns::CURRENT_COUNTRY)
        .ok_or(SchemaError::MissingColumn(columns::CURRENT_COUNTRY))?;
    let mut country = locale::canonical_country(raw_country).to_string();

    let mut subregion = None;
    if let Some(state) = non_empty(column(row, columns::CURRENT_STATE)) {
        if PROMOTED_TERRITORIES.contains(&state) {
            country = locale::canonical_country(state).to_string();
        } else {
            subregion = Some(locale::normalize(state).to_string());
        }
    }

    if country.is_empty() {
        return Err(SchemaError::BlankCountry(columns::CURRENT_COUNTRY));
    }

    Ok(NormalizedRow {
        country,
        subregion,
        locality: non_empty(column(row, columns::CURRENT_ADMIN))
            .map(|admin| locale::normalize(admin).to_string()),
        confirmed: count(row, columns::CONFIRMED),
        deaths: count(row, columns::DEATHS),
        recovered: count(row, columns::RECOVERED),
        active: Some(count(row, columns::ACTIVE)),
    })
}

fn adapt_legacy(row: &RawRow) -> Result<NormalizedRow, SchemaError> {
    let raw_country = column(row, columns::LEGACY_COUNTRY)
        .ok_or(SchemaError::MissingColumn(columns::LEGACY_COUNTRY))?;
    let country = locale::canonical_country(raw_country).to_string();
    if country.is_empty() {
        return Err(SchemaError::BlankCountry(columns::LEGACY_COUNTRY));
    }

    Ok(NormalizedRow {
        country,
        subregion: non_empty(column(row, columns::LEGACY_STATE))
            .map(|state| locale::normalize(state).to_string()),
        locality: None,
        confirmed: count(row, columns::CONFIRMED),
        deaths: count(row, columns::DEATHS),
        recovered: count(row, columns::RECOVERED),
        active: None,
    })
}

/// Look up a column, tolerating a UTF-8 BOM or stray whitespace in the header
fn column<'a>(row: &'a RawRow, name: &str) -> Option<&'a str> {
    if let Some(value) = row.get(name) {
        return Some(value.as_str());
    }
    row.iter()
        .find(|(key, _)| key.trim_start_matches('\u{feff}').trim() == name)
        .map(|(_, value)| value.as_str())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn count(row: &RawRow, name: &str) -> i64 {
    column(row, name).map(parse_count).unwrap_or(0)
}

/// Integer-prefix parse: optional sign followed by leading digits.
///
/// `"12"` → 12, `"12.7"` → 12, `" 7 "` → 7, `""` / `"N/A"` → 0.
pub fn parse_count(raw: &str) -> i64 {
    let trimmed = raw.trim();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());

    match digits[..end].parse::<i64>() {
        Ok(n) if negative => -n,
        Ok(n) => n,
        Err(_) => 0,
    }
}
