//! Location name canonicalization
//!
//! Different report generations and the live page spell some places
//! differently. Every name goes through here before it becomes a tree key so
//! the variants land on one node.

/// Alternate spellings and their canonical key
const LOCALE_OVERRIDES: &[(&str, &str)] = &[
    ("USA", "US"),
    ("UK", "United Kingdom"),
    ("UAE", "United Arab Emirates"),
    ("S. Korea", "Korea, South"),
    ("Ivory Coast", "Cote d'Ivoire"),
    ("Congo (Kinshasa)", "DRC"),
    ("Congo (Brazzaville)", "Republic of Congo"),
    ("Congo", "Republic of Congo"),
    ("West Bank and Gaza", "Palestine"),
    ("Taiwan*", "Taiwan"),
];

/// Historical country labels used by early reports
const HISTORICAL_COUNTRY_LABELS: &[(&str, &str)] = &[("Mainland China", "China")];

fn lookup<'a>(table: &[(&'static str, &'static str)], name: &'a str) -> &'a str {
    table
        .iter()
        .find(|(from, _)| *from == name)
        .map(|(_, to)| *to)
        .unwrap_or(name)
}

/// Canonical key for a location name; unknown names come back trimmed but
/// otherwise unchanged.
pub fn normalize(raw: &str) -> &str {
    lookup(LOCALE_OVERRIDES, raw.trim())
}

/// Rewrite a historical country label to its modern equivalent
pub fn modernize_country(name: &str) -> &str {
    lookup(HISTORICAL_COUNTRY_LABELS, name.trim())
}

/// Both rewrites, as applied to every country name before placement
pub fn canonical_country(raw: &str) -> &str {
    modernize_country(normalize(raw))
}
