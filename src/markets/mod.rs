//! Market discovery
//!
//! Market filters, resolving an event link to its market, and the snapshot
//! shown for a link.

pub mod export;

use crate::client::TradingApi;
use crate::error::{BotError, Result};
use crate::types::ClobMarket;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

const EVENT_URL_MARKER: &str = "polymarket.com/event/";
const NOT_AVAILABLE: &str = "N/A";

/// Markets ending between `today` and `cutoff`, both inclusive
pub fn filter_by_end_date(
    markets: &[ClobMarket],
    cutoff: NaiveDate,
    today: NaiveDate,
) -> Vec<&ClobMarket> {
    markets
        .iter()
        .filter(|m| {
            m.end_date()
                .map(|d| today <= d && d <= cutoff)
                .unwrap_or(false)
        })
        .collect()
}

/// Markets whose slug contains `keyword`, ignoring case
pub fn filter_by_keyword<'a>(markets: &'a [ClobMarket], keyword: &str) -> Vec<&'a ClobMarket> {
    let needle = keyword.trim().to_lowercase();
    markets
        .iter()
        .filter(|m| m.market_slug.to_lowercase().contains(&needle))
        .collect()
}

/// Slug of a `https://polymarket.com/event/<slug>` link
pub fn slug_from_event_url(url: &str) -> Result<String> {
    let url = url.trim();
    if !url.contains(EVENT_URL_MARKER) {
        return Err(BotError::InvalidInput(format!(
            "Not a Polymarket event link: {}",
            url
        )));
    }

    let after = url
        .split_once("/event/")
        .map(|(_, rest)| rest)
        .unwrap_or_default();
    let slug = after
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim_end_matches('/');

    if slug.is_empty() {
        return Err(BotError::InvalidInput(format!("No slug in link: {}", url)));
    }
    Ok(slug.to_string())
}

/// Condition id of the market answering to `slug`.
///
/// Pages through the listings and stops at the first match.
pub async fn find_condition_id(api: &dyn TradingApi, slug: &str) -> Result<String> {
    let mut cursor = String::new();

    loop {
        let page = api.get_markets(&cursor).await?;
        if let Some(market) = page.data.iter().find(|m| m.matches_slug(slug)) {
            debug!(slug, condition_id = %market.condition_id, "Resolved slug");
            return Ok(market.condition_id.clone());
        }
        if page.is_last() {
            break;
        }
        cursor = page.next_cursor;
    }

    Err(BotError::MarketNotFound(slug.to_string()))
}

/// One-row summary of a market, as shown and exported for a link
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketSnapshot {
    pub condition_id: String,
    pub slug: String,
    pub question: String,
    pub category: String,
    pub end_date: String,
    pub yes_price: String,
    pub no_price: String,
    pub min_size: String,
    pub max_spread: String,
    pub daily_reward: String,
    pub active: bool,
    pub closed: bool,
    pub accepting_orders: bool,
}

impl MarketSnapshot {
    /// `market` is the full market record; `live` is its entry in the
    /// sampling listing, which carries prices, rewards and trading status
    pub fn build(slug: &str, market: &ClobMarket, live: Option<&ClobMarket>) -> Self {
        let price = |outcome: &str| live.and_then(|l| l.outcome_price(outcome));
        let rewards = live.and_then(|l| l.rewards.as_ref());
        let daily_reward = rewards
            .and_then(|r| r.rates.as_ref())
            .and_then(|rates| rates.first())
            .map(|rate| rate.rewards_daily_rate);

        Self {
            condition_id: market.condition_id.clone(),
            slug: slug.to_string(),
            question: or_na(Some(market.question.clone())),
            category: or_na(market.category.clone()),
            end_date: or_na(market.end_date().map(|d| d.to_string())),
            yes_price: decimal_or_na(price("Yes")),
            no_price: decimal_or_na(price("No")),
            min_size: decimal_or_na(rewards.and_then(|r| r.min_size)),
            max_spread: decimal_or_na(rewards.and_then(|r| r.max_spread)),
            daily_reward: decimal_or_na(daily_reward),
            active: live.map(|l| l.active).unwrap_or(false),
            closed: live.map(|l| l.closed).unwrap_or(false),
            accepting_orders: live.map(|l| l.accepting_orders).unwrap_or(false),
        }
    }

    /// Label/value pairs in display order
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Condition ID", self.condition_id.clone()),
            ("Slug", self.slug.clone()),
            ("Question", self.question.clone()),
            ("Category", self.category.clone()),
            ("End Date", self.end_date.clone()),
            ("Yes Price", self.yes_price.clone()),
            ("No Price", self.no_price.clone()),
            ("Min Size", self.min_size.clone()),
            ("Max Spread", self.max_spread.clone()),
            ("Daily Reward", self.daily_reward.clone()),
            ("Active", self.active.to_string()),
            ("Closed", self.closed.to_string()),
            ("Accepting Orders", self.accepting_orders.to_string()),
        ]
    }
}

fn or_na(value: Option<String>) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn decimal_or_na(value: Option<Decimal>) -> String {
    value
        .map(|d| d.normalize().to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Resolve an event link to its market and build the snapshot
pub async fn fetch_info_from_url(api: &dyn TradingApi, url: &str) -> Result<MarketSnapshot> {
    let slug = slug_from_event_url(url)?;
    let condition_id = find_condition_id(api, &slug).await?;
    let market = api.get_market(&condition_id).await?;

    let sampling = api.get_sampling_simplified_markets().await?;
    let live = sampling
        .data
        .iter()
        .find(|m| m.condition_id == condition_id);

    Ok(MarketSnapshot::build(&slug, &market, live))
}
