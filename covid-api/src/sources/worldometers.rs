//! Live counters scraped from the worldometers coronavirus page
//!
//! The page carries three headline counters (confirmed, deaths, recovered)
//! and a per-country table. Continent rows in the table are skipped.
//!
//! Table columns used: 1 name, 2 confirmed, 4 deaths, 6 recovered, 8 active.

use async_trait::async_trait;
use covid_common::schema::parse_count;
use covid_common::{Error, LiveCountry, LiveUpdate, Metrics, Result};
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::debug;

use super::LiveSource;

const USER_AGENT: &str = concat!("covid-api/", env!("CARGO_PKG_VERSION"));

const NAME_CELL: usize = 1;
const CONFIRMED_CELL: usize = 2;
const DEATHS_CELL: usize = 4;
const RECOVERED_CELL: usize = 6;
const ACTIVE_CELL: usize = 8;

/// HTTP client for the live page
pub struct Worldometers {
    http_client: reqwest::Client,
    url: String,
}

impl Worldometers {
    /// Client whose requests give up after `timeout`
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl LiveSource for Worldometers {
    fn name(&self) -> &str {
        "worldometers"
    }

    async fn fetch(&self) -> Result<LiveUpdate> {
        debug!(url = %self.url, "Fetching live counters");

        let response = self
            .http_client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Network(format!(
                "{} returned HTTP {}",
                self.url,
                status.as_u16()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        parse_page(&body)
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::Scrape(format!("bad selector {css}: {e:?}")))
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

fn count(text: &str) -> i64 {
    parse_count(&text.replace(',', ""))
}

/// Parse the live page into a flat update
pub fn parse_page(html: &str) -> Result<LiveUpdate> {
    let document = Html::parse_document(html);

    let counter_sel = selector(".maincounter-number")?;
    let span_sel = selector("span")?;
    let counters: Vec<i64> = document
        .select(&counter_sel)
        .take(3)
        .map(|counter| {
            let text = match counter.select(&span_sel).next() {
                Some(span) => cell_text(span),
                None => cell_text(counter),
            };
            count(&text)
        })
        .collect();

    let &[confirmed, deaths, recovered] = counters.as_slice() else {
        return Err(Error::Scrape(format!(
            "expected 3 headline counters, found {}",
            counters.len()
        )));
    };
    let active = confirmed.saturating_sub(deaths).saturating_sub(recovered);
    let global = Metrics::new(confirmed, deaths, recovered, active);

    let row_sel = selector("table#main_table_countries_today > tbody > tr:not(.row_continent)")?;
    let link_sel = selector("a")?;

    let mut per_country = Vec::new();
    for row in document.select(&row_sel) {
        let cells: Vec<ElementRef<'_>> = row
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|el| el.value().name() == "td")
            .collect();

        let Some(name_cell) = cells.get(NAME_CELL) else {
            continue;
        };
        let name = match name_cell.select(&link_sel).next() {
            Some(link) => cell_text(link),
            None => cell_text(*name_cell),
        };
        if name.is_empty() {
            continue;
        }

        let field = |index: usize| cells.get(index).map(|cell| count(&cell_text(*cell)));
        per_country.push(LiveCountry {
            confirmed: field(CONFIRMED_CELL),
            deaths: field(DEATHS_CELL),
            recovered: field(RECOVERED_CELL),
            active: field(ACTIVE_CELL),
            ..LiveCountry::new(name)
        });
    }

    debug!(countries = per_country.len(), "Parsed live page");
    Ok(LiveUpdate {
        global,
        per_country,
    })
}
