//! End-to-end ingestion tests for the hierarchical store
//!
//! Tests cover:
//! - Leaf and internal node totals after aggregation
//! - Idempotent recalculation
//! - NotFound lookups for unknown countries and subregions
//! - Time series ordering and gap skipping
//! - Path equivalence across both report layouts
//! - Live updates never creating nodes

use chrono::NaiveDate;
use covid_common::live::LiveError;
use covid_common::schema::adapt;
use covid_common::store::LookupError;
use covid_common::{DayTree, LiveCountry, LiveUpdate, LocationPath, Metrics, RawRow, Store};

fn raw(pairs: &[(&str, &str)]) -> RawRow {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Legacy-layout rows for a late-January day
fn legacy_day(us_confirmed: &str) -> Vec<RawRow> {
    vec![
        raw(&[
            ("Province/State", "Hubei"),
            ("Country/Region", "Mainland China"),
            ("Last Update", "1/22/2020 17:00"),
            ("Confirmed", "100"),
            ("Deaths", "5"),
            ("Recovered", "10"),
        ]),
        raw(&[
            ("Province/State", "Washington"),
            ("Country/Region", "US"),
            ("Last Update", "1/22/2020 17:00"),
            ("Confirmed", us_confirmed),
            ("Deaths", ""),
            ("Recovered", ""),
        ]),
    ]
}

/// Current-layout rows, county level for the US
fn current_day() -> Vec<RawRow> {
    let county = |admin: &str, state: &str, confirmed: &str, active: &str| {
        raw(&[
            ("FIPS", "00000"),
            ("Admin2", admin),
            ("Province_State", state),
            ("Country_Region", "US"),
            ("Confirmed", confirmed),
            ("Deaths", "1"),
            ("Recovered", "0"),
            ("Active", active),
        ])
    };
    vec![
        county("King", "Washington", "50", "49"),
        county("Pierce", "Washington", "20", "19"),
        county("Franklin", "Ohio", "7", "6"),
        raw(&[
            ("FIPS", ""),
            ("Admin2", ""),
            ("Province_State", "Hong Kong"),
            ("Country_Region", "China"),
            ("Confirmed", "30"),
            ("Deaths", "0"),
            ("Recovered", "3"),
            ("Active", "27"),
        ]),
        raw(&[
            ("FIPS", ""),
            ("Admin2", ""),
            ("Province_State", ""),
            ("Country_Region", "Taiwan*"),
            ("Confirmed", "not a number"),
            ("Deaths", "0"),
            ("Recovered", "0"),
            ("Active", ""),
        ]),
    ]
}

// =============================================================================
// Worked example
// =============================================================================

#[test]
fn test_mainland_china_hubei_example() {
    let store = Store::new();
    store.ingest_date(date(2020, 1, 22), &legacy_day("1")).unwrap();

    let hubei = store
        .lookup(&LocationPath::subregion("China", "Hubei"), None)
        .unwrap();
    assert_eq!(hubei.own_data(), Some(Metrics::new(100, 5, 10, 0)));

    let china = store.lookup(&LocationPath::country("China"), None).unwrap();
    assert_eq!(china.totals().confirmed, 100);
    assert_eq!(china.own_data(), None);
}

// =============================================================================
// Aggregation properties
// =============================================================================

#[test]
fn test_leaf_totals_equal_own_data_or_zero() {
    let store = Store::new();
    store.ingest_date(date(2020, 4, 1), &current_day()).unwrap();

    let king = store
        .lookup(&LocationPath::locality("US", "Washington", "King"), None)
        .unwrap();
    assert_eq!(Some(king.totals()), king.own_data());

    let taiwan = store.lookup(&LocationPath::country("Taiwan"), None).unwrap();
    assert_eq!(taiwan.totals(), Metrics::ZERO);
    assert_eq!(taiwan.child_count(), 0);
}

#[test]
fn test_internal_totals_sum_children() {
    let store = Store::new();
    store.ingest_date(date(2020, 4, 1), &current_day()).unwrap();

    let washington = store
        .lookup(&LocationPath::subregion("US", "Washington"), None)
        .unwrap();
    assert_eq!(washington.own_data(), None);
    assert_eq!(washington.totals(), Metrics::new(70, 2, 0, 68));

    let world = store.lookup(&LocationPath::world(), None).unwrap();
    let from_children: Metrics = world.children().map(|(_, child)| child.totals()).sum();
    assert_eq!(world.totals(), from_children);
    assert!(world.child("Hong Kong").is_some());
}

#[test]
fn test_internal_totals_include_own_data() {
    let store = Store::new();
    let mut rows = legacy_day("3");
    rows.push(raw(&[
        ("Province/State", ""),
        ("Country/Region", "US"),
        ("Confirmed", "10"),
        ("Deaths", "1"),
        ("Recovered", "2"),
    ]));
    store.ingest_date(date(2020, 1, 22), &rows).unwrap();

    let us = store.lookup(&LocationPath::country("US"), None).unwrap();
    assert_eq!(us.own_data(), Some(Metrics::new(10, 1, 2, 0)));
    assert_eq!(us.totals(), Metrics::new(13, 1, 2, 0));
}

#[test]
fn test_recalculate_twice_is_stable() {
    let mut tree = DayTree::new();
    for row in current_day() {
        tree.insert(&adapt(&row).unwrap());
    }
    tree.recalculate();
    let first = tree.node(tree.root()).totals();
    tree.recalculate();
    assert_eq!(tree.node(tree.root()).totals(), first);
}

// =============================================================================
// Lookups
// =============================================================================

#[test]
fn test_unknown_paths_are_not_found() {
    let store = Store::new();
    store.ingest_date(date(2020, 1, 22), &legacy_day("1")).unwrap();

    assert!(matches!(
        store.lookup(&LocationPath::country("Narnia"), None),
        Err(LookupError::PathNotFound { .. })
    ));
    assert!(matches!(
        store.lookup(&LocationPath::subregion("US", "Narnia"), None),
        Err(LookupError::PathNotFound { .. })
    ));
    assert!(matches!(
        store.lookup(&LocationPath::subregion("Narnia", "Anywhere"), None),
        Err(LookupError::PathNotFound { .. })
    ));
}

#[test]
fn test_time_series_us_skips_gaps() {
    let store = Store::new();
    store.ingest_date(date(2020, 1, 24), &legacy_day("2")).unwrap();
    store.ingest_date(date(2020, 1, 22), &legacy_day("1")).unwrap();
    // 01-23 has China only
    store
        .ingest_date(date(2020, 1, 23), &legacy_day("1")[..1])
        .unwrap();

    let series = store.time_series(
        &LocationPath::country("US"),
        date(2020, 1, 22),
        Some(date(2020, 1, 25)),
    );
    let entries: Vec<(NaiveDate, i64)> = series
        .iter()
        .map(|(d, node)| (d, node.totals().confirmed))
        .collect();
    assert_eq!(entries, vec![(date(2020, 1, 22), 1), (date(2020, 1, 24), 2)]);
    assert_eq!(series.dates(), vec![date(2020, 1, 22), date(2020, 1, 24)]);
}

// =============================================================================
// Layout equivalence
// =============================================================================

#[test]
fn test_both_layouts_land_on_same_path() {
    let legacy = adapt(&raw(&[
        ("Province/State", "Hubei"),
        ("Country/Region", "Mainland China"),
        ("Confirmed", "1"),
    ]))
    .unwrap();
    let current = adapt(&raw(&[
        ("FIPS", ""),
        ("Admin2", ""),
        ("Province_State", "Hubei"),
        ("Country_Region", "China"),
        ("Confirmed", "1"),
    ]))
    .unwrap();
    assert_eq!(legacy.path(), current.path());

    let store = Store::new();
    store.ingest_date(date(2020, 1, 22), &legacy_day("1")).unwrap();
    store
        .ingest_date(
            date(2020, 3, 23),
            &[raw(&[
                ("FIPS", ""),
                ("Admin2", ""),
                ("Province_State", "Hubei"),
                ("Country_Region", "China"),
                ("Confirmed", "67800"),
            ])],
        )
        .unwrap();

    let series = store.time_series(
        &LocationPath::subregion("China", "Hubei"),
        date(2020, 1, 1),
        None,
    );
    assert_eq!(series.iter().count(), 2);
}

// =============================================================================
// Live updates
// =============================================================================

#[test]
fn test_live_update_targets_newest_date_only() {
    let store = Store::new();
    store.ingest_date(date(2020, 1, 23), &legacy_day("2")).unwrap();
    store.ingest_date(date(2020, 1, 22), &legacy_day("1")).unwrap();

    let report = store
        .apply_live_update(&LiveUpdate {
            global: Metrics::new(500, 20, 30, 450),
            per_country: vec![
                LiveCountry {
                    confirmed: Some(7),
                    ..LiveCountry::new("USA")
                },
                LiveCountry {
                    confirmed: Some(1),
                    ..LiveCountry::new("Narnia")
                },
            ],
        })
        .unwrap();

    assert_eq!(report.date, date(2020, 1, 23));
    assert_eq!((report.applied, report.skipped), (1, 1));

    let world = store.lookup(&LocationPath::world(), None).unwrap();
    assert_eq!(world.totals(), Metrics::new(500, 20, 30, 450));
    assert!(world.child("Narnia").is_none());

    let us = store.lookup(&LocationPath::country("US"), None).unwrap();
    assert_eq!(us.totals().confirmed, 7);
    let washington = us.child("Washington").unwrap();
    assert_eq!(washington.totals().confirmed, 2);

    let older = store
        .lookup(&LocationPath::world(), Some(date(2020, 1, 22)))
        .unwrap();
    assert_eq!(older.totals().confirmed, 101);
}

#[test]
fn test_live_update_on_empty_store() {
    let store = Store::new();
    assert_eq!(
        store.apply_live_update(&LiveUpdate::default()).unwrap_err(),
        LiveError::NoData
    );
}

// =============================================================================
// Numeric extremes
// =============================================================================

#[test]
fn test_counts_summing_past_i64_max_saturate() {
    let store = Store::new();
    let rows = vec![
        raw(&[
            ("Province/State", ""),
            ("Country/Region", "Italy"),
            ("Confirmed", "9223372036854775807"),
            ("Deaths", "0"),
            ("Recovered", "0"),
        ]),
        raw(&[
            ("Province/State", ""),
            ("Country/Region", "Spain"),
            ("Confirmed", "1"),
            ("Deaths", "0"),
            ("Recovered", "0"),
        ]),
    ];

    let stats = store.ingest_date(date(2020, 3, 1), &rows).unwrap();

    assert_eq!(stats.rows, 2);
    let world = store.lookup(&LocationPath::world(), None).unwrap();
    assert_eq!(world.totals().confirmed, i64::MAX);
    let spain = store.lookup(&LocationPath::country("Spain"), None).unwrap();
    assert_eq!(spain.totals().confirmed, 1);
}
