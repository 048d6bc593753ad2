//! CSV exports of market data

use super::MarketSnapshot;
use crate::error::Result;
use crate::types::ClobMarket;
use chrono::NaiveDate;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const ALL_MARKET_DATA_FILE: &str = "all_market_data.csv";

pub const ALL_MARKET_DATA_HEADER: [&str; 6] = [
    "Event",
    "Market End",
    "CONDITION_ID",
    "Token_ID",
    "Outcome",
    "Price",
];

#[derive(Debug, Serialize)]
struct EventLinkRow<'a> {
    event_slug: &'a str,
    link: String,
}

/// Columns in `ALL_MARKET_DATA_HEADER` order
#[derive(Debug, Serialize)]
struct MarketTokenRow<'a> {
    event: &'a str,
    market_end: &'a str,
    condition_id: &'a str,
    token_id: &'a str,
    outcome: &'a str,
    price: String,
}

/// `{date}.csv` with one `event_slug,link` row per market. `markets` must
/// not be empty.
pub fn write_event_links(dir: &Path, date: NaiveDate, markets: &[&ClobMarket]) -> Result<PathBuf> {
    let path = dir.join(format!("{}.csv", date.format("%Y-%m-%d")));
    let mut writer = csv::Writer::from_path(&path)?;
    for market in markets {
        writer.serialize(EventLinkRow {
            event_slug: &market.market_slug,
            link: market.event_link(),
        })?;
    }
    writer.flush()?;

    info!("Wrote {} event links to {}", markets.len(), path.display());
    Ok(path)
}

/// `polymarket_{slug}.csv` with the snapshot as its single row
pub fn write_snapshot(dir: &Path, snapshot: &MarketSnapshot) -> Result<PathBuf> {
    let path = dir.join(format!("polymarket_{}.csv", snapshot.slug));
    let mut writer = csv::Writer::from_path(&path)?;
    writer.serialize(snapshot)?;
    writer.flush()?;

    info!("Wrote market snapshot to {}", path.display());
    Ok(path)
}

/// `all_market_data.csv` with one row per outcome token. The header is
/// written even when no market carries tokens.
pub fn write_all_market_data(dir: &Path, markets: &[ClobMarket]) -> Result<PathBuf> {
    let path = dir.join(ALL_MARKET_DATA_FILE);
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(&path)?;
    writer.write_record(ALL_MARKET_DATA_HEADER)?;
    let mut rows = 0usize;

    for market in markets {
        let end = market.end_date_iso.as_deref().unwrap_or_default();
        for token in &market.tokens {
            writer.serialize(MarketTokenRow {
                event: &market.market_slug,
                market_end: end,
                condition_id: &market.condition_id,
                token_id: &token.token_id,
                outcome: &token.outcome,
                price: token.price.normalize().to_string(),
            })?;
            rows += 1;
        }
    }
    writer.flush()?;

    if rows == 0 {
        warn!("No tokens in {} markets, {} has only a header", markets.len(), path.display());
    } else {
        info!("Wrote {} token rows to {}", rows, path.display());
    }
    Ok(path)
}
