//! Order placement
//!
//! Single orders, the "buy under maximum price" sweep, and cancel-all.
//! Batch execution from CSV lives in [`batch`].

pub mod batch;

use crate::client::TradingApi;
use crate::error::{BotError, Result};
use crate::types::{gtd_expiration, BookLevel, OrderRequest, OrderType, PostOrderResponse};
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{info, warn};

/// Decimals kept on sizes derived from a USD budget
const SWEEP_SIZE_DECIMALS: u32 = 2;

/// Post one order and return the exchange's answer
pub async fn execute(api: &dyn TradingApi, request: &OrderRequest) -> Result<PostOrderResponse> {
    request.validate()?;
    let response = api.post_order(request).await?;

    if response.success {
        info!(
            token_id = request.token_id(),
            order_type = %request.order_type(),
            order_id = %response.order_id,
            "Order placed"
        );
    } else {
        warn!(
            token_id = request.token_id(),
            order_type = %request.order_type(),
            error = %response.error_msg,
            "Order rejected"
        );
    }
    Ok(response)
}

/// Build an order request from operator text input.
///
/// Only the fields the order type needs are parsed: `amount` for FOK,
/// `price` and `size` for GTC, plus `expire_seconds` for GTD.
#[allow(clippy::too_many_arguments)]
pub fn build_request(
    token_id: &str,
    order_type: OrderType,
    amount: &str,
    price: &str,
    size: &str,
    expire_seconds: &str,
    now: DateTime<Utc>,
    expiration_buffer_secs: u64,
) -> Result<OrderRequest> {
    let token_id = token_id.trim().to_string();
    let request = match order_type {
        OrderType::FOK => OrderRequest::Market {
            token_id,
            amount: parse_decimal("amount", amount)?,
        },
        OrderType::GTC => OrderRequest::Limit {
            token_id,
            price: parse_decimal("price", price)?,
            size: parse_decimal("size", size)?,
        },
        OrderType::GTD => {
            let seconds: u64 = expire_seconds.trim().parse().map_err(|_| {
                BotError::InvalidInput(format!("Invalid expire_seconds '{}'", expire_seconds))
            })?;
            OrderRequest::LimitUntil {
                token_id,
                price: parse_decimal("price", price)?,
                size: parse_decimal("size", size)?,
                expiration: gtd_expiration(now, seconds, expiration_buffer_secs)?,
            }
        }
    };
    request.validate()?;
    Ok(request)
}

pub fn parse_decimal(field: &str, value: &str) -> Result<Decimal> {
    value
        .trim()
        .parse::<Decimal>()
        .map_err(|_| BotError::InvalidInput(format!("Invalid {} '{}'", field, value)))
}

/// How much a sweep may buy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Budget {
    /// Number of outcome tokens
    Tokens(Decimal),
    /// USD to spend
    Usd(Decimal),
}

impl Budget {
    fn amount(&self) -> Decimal {
        match self {
            Budget::Tokens(n) | Budget::Usd(n) => *n,
        }
    }

    /// What `fills` leave of the budget, in the budget's own unit
    pub fn unfilled(&self, fills: &[Fill]) -> Decimal {
        let used: Decimal = match self {
            Budget::Tokens(_) => fills.iter().map(|f| f.size).sum(),
            Budget::Usd(_) => fills.iter().map(Fill::cost).sum(),
        };
        (self.amount() - used).max(Decimal::ZERO)
    }
}

/// One limit order of a sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fill {
    pub price: Decimal,
    pub size: Decimal,
}

impl Fill {
    pub fn cost(&self) -> Decimal {
        self.price * self.size
    }
}

/// Fills that take asks at or under `max_price`, cheapest first, until the
/// budget is used up
pub fn plan_sweep(asks: &[BookLevel], max_price: Decimal, budget: Budget) -> Vec<Fill> {
    let mut levels: Vec<&BookLevel> = asks.iter().collect();
    levels.sort_by(|a, b| a.price.cmp(&b.price));

    let mut remaining = budget.amount();
    let mut fills = Vec::new();

    for level in levels {
        if remaining <= Decimal::ZERO || level.price > max_price {
            break;
        }
        if level.size <= Decimal::ZERO || level.price <= Decimal::ZERO {
            continue;
        }

        let size = match budget {
            Budget::Tokens(_) => remaining.min(level.size),
            Budget::Usd(_) => (remaining / level.price)
                .round_dp_with_strategy(SWEEP_SIZE_DECIMALS, RoundingStrategy::ToZero)
                .min(level.size),
        };
        if size <= Decimal::ZERO {
            break;
        }

        remaining -= match budget {
            Budget::Tokens(_) => size,
            Budget::Usd(_) => size * level.price,
        };
        fills.push(Fill {
            price: level.price,
            size,
        });
    }

    fills
}

/// Result of posting one sweep fill
#[derive(Debug, Clone)]
pub struct FillOutcome {
    pub fill: Fill,
    /// The exchange's answer, or the error text when the post failed
    pub result: std::result::Result<PostOrderResponse, String>,
}

impl FillOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(&self.result, Ok(r) if r.success)
    }
}

/// Fetch the book and post every planned fill as a GTC limit buy.
///
/// A failing fill is reported and the sweep carries on with the next level.
pub async fn execute_sweep(
    api: &dyn TradingApi,
    token_id: &str,
    max_price: Decimal,
    budget: Budget,
) -> Result<Vec<FillOutcome>> {
    if max_price <= Decimal::ZERO || max_price > Decimal::ONE {
        return Err(BotError::InvalidInput(format!(
            "Max price must be between 0 and 1, got {}",
            max_price
        )));
    }
    if budget.amount() <= Decimal::ZERO {
        return Err(BotError::InvalidInput(format!(
            "Budget must be positive, got {}",
            budget.amount()
        )));
    }

    let book = api.get_order_book(token_id).await?;
    let fills = plan_sweep(&book.asks, max_price, budget);
    info!(token_id, %max_price, ?budget, fills = fills.len(), "Sweeping asks");

    let mut outcomes = Vec::with_capacity(fills.len());
    for fill in fills {
        let request = OrderRequest::Limit {
            token_id: token_id.to_string(),
            price: fill.price,
            size: fill.size,
        };
        let result = execute(api, &request).await.map_err(|e| {
            warn!(token_id, price = %fill.price, size = %fill.size, "Sweep fill failed: {}", e);
            e.to_string()
        });
        outcomes.push(FillOutcome { fill, result });
    }

    Ok(outcomes)
}

/// Outcome of cancelling one open order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelOutcome {
    pub order_id: String,
    pub status: String,
}

/// Cancel every open order of the account, one request per order
pub async fn cancel_all(api: &dyn TradingApi) -> Result<Vec<CancelOutcome>> {
    let open = api.get_open_orders().await?;
    info!("Cancelling {} open orders", open.len());

    let mut outcomes = Vec::with_capacity(open.len());
    for order in open {
        let status = match api.cancel_order(&order.id).await {
            Ok(response) => response.status_for(&order.id),
            Err(e) => {
                warn!(order_id = %order.id, "Cancel failed: {}", e);
                format!("error: {}", e)
            }
        };
        outcomes.push(CancelOutcome {
            order_id: order.id,
            status,
        });
    }

    Ok(outcomes)
}

#[cfg(test)]
mod tests;
