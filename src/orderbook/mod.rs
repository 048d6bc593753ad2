//! Order book analysis
//!
//! Sorts a CLOB book snapshot, derives best prices, spread and resting
//! liquidity, and provides the number formatting used by the book screen.

use crate::types::{BookLevel, OrderBookSummary};
use chrono::{DateTime, Local};
use rust_decimal::Decimal;

/// Levels shown per side
pub const DISPLAY_DEPTH: usize = 10;

/// Sorted view of one token's book
#[derive(Debug, Clone)]
pub struct BookAnalysis {
    pub asset_id: String,
    pub market: String,
    /// Local time of the snapshot, if the timestamp parsed
    pub timestamp: Option<String>,
    pub hash: String,
    /// Best (highest) bid first
    pub bids: Vec<BookLevel>,
    /// Best (lowest) ask first
    pub asks: Vec<BookLevel>,
    /// Zero when there are no bids
    pub best_bid: Decimal,
    /// Zero when there are no asks
    pub best_ask: Decimal,
    /// Zero unless both sides are quoted
    pub spread: Decimal,
    pub total_bid_liquidity: Decimal,
    pub total_ask_liquidity: Decimal,
}

impl BookAnalysis {
    pub fn from_summary(book: &OrderBookSummary) -> Self {
        let mut bids = book.bids.clone();
        bids.sort_by(|a, b| b.price.cmp(&a.price));
        let mut asks = book.asks.clone();
        asks.sort_by(|a, b| a.price.cmp(&b.price));

        let best_bid = bids.first().map(|l| l.price).unwrap_or(Decimal::ZERO);
        let best_ask = asks.first().map(|l| l.price).unwrap_or(Decimal::ZERO);
        let spread = if best_bid.is_zero() || best_ask.is_zero() {
            Decimal::ZERO
        } else {
            best_ask - best_bid
        };

        let total_bid_liquidity = total_liquidity(&bids);
        let total_ask_liquidity = total_liquidity(&asks);

        Self {
            asset_id: book.asset_id.clone(),
            market: book.market.clone(),
            timestamp: format_timestamp_ms(&book.timestamp),
            hash: book.hash.clone(),
            bids,
            asks,
            best_bid,
            best_ask,
            spread,
            total_bid_liquidity,
            total_ask_liquidity,
        }
    }

    pub fn top_bids(&self) -> &[BookLevel] {
        &self.bids[..self.bids.len().min(DISPLAY_DEPTH)]
    }

    pub fn top_asks(&self) -> &[BookLevel] {
        &self.asks[..self.asks.len().min(DISPLAY_DEPTH)]
    }

    pub fn short_hash(&self) -> String {
        abbreviate_hash(&self.hash)
    }
}

fn total_liquidity(levels: &[BookLevel]) -> Decimal {
    levels
        .iter()
        .map(BookLevel::liquidity)
        .fold(Decimal::ZERO, Decimal::saturating_add)
}

/// Millisecond epoch string to `YYYY-MM-DD HH:MM:SS` in local time
pub fn format_timestamp_ms(ts: &str) -> Option<String> {
    let millis: i64 = ts.trim().parse().ok()?;
    let utc = DateTime::from_timestamp_millis(millis)?;
    Some(
        utc.with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
    )
}

/// `first12...last12`
pub fn abbreviate_hash(hash: &str) -> String {
    let chars: Vec<char> = hash.chars().collect();
    if chars.len() <= 24 {
        return hash.to_string();
    }
    let head: String = chars[..12].iter().collect();
    let tail: String = chars[chars.len() - 12..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Thousands separators and two decimals; non-numeric input comes back unchanged
pub fn format_number(value: &str) -> String {
    match value.trim().parse::<Decimal>() {
        Ok(d) => format_decimal(d),
        Err(_) => value.to_string(),
    }
}

pub fn format_decimal(value: Decimal) -> String {
    let fixed = format!("{:.2}", value.round_dp(2));
    let (sign, unsigned) = match fixed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", fixed.as_str()),
    };
    let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    format!("{}{}.{}", sign, grouped, frac_part)
}
