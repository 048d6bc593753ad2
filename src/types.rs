//! Core types shared by the menus, the scheduler and the CLOB client

use crate::error::{BotError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Cursor value the CLOB returns on the last page
pub const END_CURSOR: &str = "LTE=";

/// Seconds added on top of the requested GTD lifetime.
/// The exchange rejects GTD orders that expire within the next minute.
pub const GTD_EXPIRATION_BUFFER_SECS: u64 = 60;

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

/// Time-in-force of an order
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    /// Fill-Or-Kill, used for market orders
    FOK,
    /// Good-Till-Cancelled limit order
    GTC,
    /// Good-Till-Date limit order
    GTD,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::FOK => "FOK",
            OrderType::GTC => "GTC",
            OrderType::GTD => "GTD",
        }
    }

    /// Menu label
    pub fn label(&self) -> &'static str {
        match self {
            OrderType::FOK => "FOK (Market Order)",
            OrderType::GTC => "GTC (Limit Order)",
            OrderType::GTD => "GTD (Limit Order with Expiration)",
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderType {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FOK" => Ok(OrderType::FOK),
            "GTC" => Ok(OrderType::GTC),
            "GTD" => Ok(OrderType::GTD),
            other => Err(BotError::InvalidInput(format!("Unknown order type '{}'", other))),
        }
    }
}

/// Unix expiration for a GTD order placed at `now`
pub fn gtd_expiration(now: DateTime<Utc>, expire_seconds: u64, buffer_secs: u64) -> Result<i64> {
    let too_far = || {
        BotError::InvalidInput(format!(
            "Expiration {}s (+{}s buffer) is out of range",
            expire_seconds, buffer_secs
        ))
    };
    let lifetime = expire_seconds.checked_add(buffer_secs).ok_or_else(too_far)?;
    let lifetime = i64::try_from(lifetime).map_err(|_| too_far())?;
    now.timestamp().checked_add(lifetime).ok_or_else(too_far)
}

/// A buy order as the operator describes it, before signing
#[derive(Debug, Clone, PartialEq)]
pub enum OrderRequest {
    /// FOK market buy spending `amount` USD
    Market { token_id: String, amount: Decimal },
    /// GTC limit buy
    Limit {
        token_id: String,
        price: Decimal,
        size: Decimal,
    },
    /// GTD limit buy expiring at `expiration` (unix seconds)
    LimitUntil {
        token_id: String,
        price: Decimal,
        size: Decimal,
        expiration: i64,
    },
}

impl OrderRequest {
    pub fn token_id(&self) -> &str {
        match self {
            OrderRequest::Market { token_id, .. }
            | OrderRequest::Limit { token_id, .. }
            | OrderRequest::LimitUntil { token_id, .. } => token_id,
        }
    }

    pub fn order_type(&self) -> OrderType {
        match self {
            OrderRequest::Market { .. } => OrderType::FOK,
            OrderRequest::Limit { .. } => OrderType::GTC,
            OrderRequest::LimitUntil { .. } => OrderType::GTD,
        }
    }

    /// Every request placed by the desk is a buy
    pub fn side(&self) -> Side {
        Side::Buy
    }

    /// Reject requests the exchange would refuse anyway
    pub fn validate(&self) -> Result<()> {
        if self.token_id().trim().is_empty() {
            return Err(BotError::InvalidInput("Token ID must not be empty".into()));
        }
        match self {
            OrderRequest::Market { amount, .. } => {
                if *amount <= Decimal::ZERO {
                    return Err(BotError::InvalidInput(format!(
                        "Amount must be positive, got {}",
                        amount
                    )));
                }
            }
            OrderRequest::Limit { price, size, .. }
            | OrderRequest::LimitUntil { price, size, .. } => {
                if *price <= Decimal::ZERO || *price >= Decimal::ONE {
                    return Err(BotError::InvalidInput(format!(
                        "Price must be between 0 and 1, got {}",
                        price
                    )));
                }
                if *size <= Decimal::ZERO {
                    return Err(BotError::InvalidInput(format!(
                        "Size must be positive, got {}",
                        size
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Response of `POST /order`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostOrderResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(rename = "errorMsg", default)]
    pub error_msg: String,
    #[serde(rename = "orderID", default)]
    pub order_id: String,
    #[serde(rename = "transactionsHashes", default)]
    pub transactions_hashes: Option<Vec<String>>,
    #[serde(default)]
    pub status: String,
}

impl PostOrderResponse {
    pub fn transactions(&self) -> String {
        self.transactions_hashes
            .as_ref()
            .map(|h| h.join(", "))
            .unwrap_or_default()
    }
}

/// Outcome token of a CLOB market
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClobToken {
    pub token_id: String,
    pub outcome: String,
    pub price: Decimal,
    pub winner: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardRate {
    pub asset_address: String,
    pub rewards_daily_rate: Decimal,
}

/// Liquidity reward parameters of a market
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Rewards {
    pub rates: Option<Vec<RewardRate>>,
    pub min_size: Option<Decimal>,
    pub max_spread: Option<Decimal>,
}

/// Market as returned by the CLOB market endpoints
///
/// The simplified endpoints return a subset of these fields; everything
/// missing falls back to its default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClobMarket {
    pub condition_id: String,
    pub question_id: String,
    pub question: String,
    pub description: String,
    pub market_slug: String,
    pub event_slug: Option<String>,
    pub category: Option<String>,
    pub end_date_iso: Option<String>,
    pub tokens: Vec<ClobToken>,
    pub rewards: Option<Rewards>,
    pub active: bool,
    pub closed: bool,
    pub archived: bool,
    pub accepting_orders: bool,
    pub neg_risk: bool,
}

impl ClobMarket {
    /// Price of the outcome named `outcome` (exact match, e.g. "Yes")
    pub fn outcome_price(&self, outcome: &str) -> Option<Decimal> {
        self.tokens
            .iter()
            .find(|t| t.outcome == outcome)
            .map(|t| t.price)
    }

    /// Calendar date of `end_date_iso`
    pub fn end_date(&self) -> Option<NaiveDate> {
        let iso = self.end_date_iso.as_deref()?;
        NaiveDate::parse_from_str(iso.get(..10)?, "%Y-%m-%d").ok()
    }

    /// Whether the market answers to this URL slug
    pub fn matches_slug(&self, slug: &str) -> bool {
        self.market_slug == slug || self.event_slug.as_deref() == Some(slug)
    }

    pub fn event_link(&self) -> String {
        format!("https://polymarket.com/event/{}", self.market_slug)
    }
}

/// One page of a cursor-paginated CLOB listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketsPage {
    pub data: Vec<ClobMarket>,
    pub next_cursor: String,
    pub limit: u32,
    pub count: u32,
}

impl MarketsPage {
    pub fn is_last(&self) -> bool {
        self.next_cursor.is_empty() || self.next_cursor == END_CURSOR
    }
}

/// Single price level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: Decimal,
    pub size: Decimal,
}

impl BookLevel {
    /// Quote-currency value resting at this level, capped at `Decimal::MAX`
    pub fn liquidity(&self) -> Decimal {
        self.price.saturating_mul(self.size)
    }
}

/// Response of `GET /book`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderBookSummary {
    pub market: String,
    pub asset_id: String,
    /// Milliseconds since the epoch, as a string
    pub timestamp: String,
    pub hash: String,
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
}

/// Resting order of the authenticated account
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenOrder {
    pub id: String,
    pub status: String,
    pub market: String,
    pub asset_id: String,
    pub side: String,
    pub original_size: String,
    pub size_matched: String,
    pub price: String,
    pub outcome: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenOrdersPage {
    pub data: Vec<OpenOrder>,
    pub next_cursor: String,
}

/// Response of `DELETE /order`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CancelResponse {
    pub canceled: Vec<String>,
    pub not_canceled: HashMap<String, String>,
}

impl CancelResponse {
    /// Human readable outcome for `order_id`
    pub fn status_for(&self, order_id: &str) -> String {
        if self.canceled.iter().any(|id| id == order_id) {
            "canceled".to_string()
        } else if let Some(reason) = self.not_canceled.get(order_id) {
            format!("not canceled ({})", reason)
        } else {
            "Unknown".to_string()
        }
    }
}
