//! Batch execution of `orders_to_run.csv`
//!
//! The file is read once, rows run in file order, and a failing row is
//! reported without stopping the batch. The file is never rewritten.

use super::{build_request, execute, execute_sweep, parse_decimal, Budget, FillOutcome};
use crate::client::TradingApi;
use crate::error::{BotError, Result};
use crate::types::{OrderRequest, OrderType, PostOrderResponse};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

/// Header of `orders_to_run.csv`
pub const BATCH_HEADER: [&str; 6] = [
    "token_id",
    "order_type",
    "amount",
    "price",
    "size",
    "expire_seconds",
];

/// One row of the batch file. Missing columns read as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchOrderRow {
    pub token_id: String,
    pub order_type: String,
    pub amount: String,
    pub price: String,
    pub size: String,
    pub expire_seconds: String,
}

/// What a batch row asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    Order(OrderType),
    /// Spend `amount` USD on asks at or under `price`
    FokMax,
}

impl FromStr for BatchKind {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case("FOK_MAX") {
            return Ok(BatchKind::FokMax);
        }
        s.parse().map(BatchKind::Order)
    }
}

/// A batch row ready to run
#[derive(Debug, Clone, PartialEq)]
pub enum BatchAction {
    Single(OrderRequest),
    Sweep {
        token_id: String,
        max_price: Decimal,
        budget: Budget,
    },
}

impl BatchOrderRow {
    pub fn action(&self, expiration_buffer_secs: u64) -> Result<BatchAction> {
        match self.order_type.parse::<BatchKind>()? {
            BatchKind::Order(order_type) => build_request(
                &self.token_id,
                order_type,
                &self.amount,
                &self.price,
                &self.size,
                &self.expire_seconds,
                Utc::now(),
                expiration_buffer_secs,
            )
            .map(BatchAction::Single),
            BatchKind::FokMax => {
                let token_id = self.token_id.trim();
                if token_id.is_empty() {
                    return Err(BotError::InvalidInput("Token ID must not be empty".into()));
                }
                Ok(BatchAction::Sweep {
                    token_id: token_id.to_string(),
                    max_price: parse_decimal("price", &self.price)?,
                    budget: Budget::Usd(parse_decimal("amount", &self.amount)?),
                })
            }
        }
    }
}

/// How a row ended
#[derive(Debug, Clone)]
pub enum RowStatus {
    Placed(PostOrderResponse),
    Swept(Vec<FillOutcome>),
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct RowOutcome {
    /// 1-based data row number
    pub row: usize,
    pub token_id: String,
    pub order_type: String,
    pub status: RowStatus,
}

impl RowOutcome {
    pub fn succeeded(&self) -> bool {
        match &self.status {
            RowStatus::Placed(response) => response.success,
            RowStatus::Swept(fills) => fills.iter().any(FillOutcome::succeeded),
            RowStatus::Failed(_) => false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub rows: Vec<RowOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.rows.iter().filter(|r| r.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.rows.len() - self.succeeded()
    }
}

/// Read every row of the batch file
pub fn read_rows(path: &Path) -> Result<Vec<Result<BatchOrderRow>>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    Ok(reader
        .deserialize::<BatchOrderRow>()
        .map(|row| row.map_err(BotError::from))
        .collect())
}

/// Run the batch file top to bottom
pub async fn run_batch(
    api: &dyn TradingApi,
    path: &Path,
    expiration_buffer_secs: u64,
) -> Result<BatchReport> {
    if !path.exists() {
        return Err(BotError::InvalidInput(format!(
            "Batch file not found: {}",
            path.display()
        )));
    }

    let rows = read_rows(path)?;
    info!("Running {} batch orders from {}", rows.len(), path.display());

    let mut report = BatchReport::default();
    for (idx, row) in rows.into_iter().enumerate() {
        let row_number = idx + 1;
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                warn!(row = row_number, "Unreadable batch row: {}", e);
                report.rows.push(RowOutcome {
                    row: row_number,
                    token_id: String::new(),
                    order_type: String::new(),
                    status: RowStatus::Failed(e.to_string()),
                });
                continue;
            }
        };

        let status = match run_row(api, &row, expiration_buffer_secs).await {
            Ok(status) => status,
            Err(e) => {
                warn!(row = row_number, token_id = %row.token_id, "Batch row failed: {}", e);
                RowStatus::Failed(e.to_string())
            }
        };
        report.rows.push(RowOutcome {
            row: row_number,
            token_id: row.token_id,
            order_type: row.order_type,
            status,
        });
    }

    info!(
        "Batch finished: {} succeeded, {} failed",
        report.succeeded(),
        report.failed()
    );
    Ok(report)
}

async fn run_row(
    api: &dyn TradingApi,
    row: &BatchOrderRow,
    expiration_buffer_secs: u64,
) -> Result<RowStatus> {
    match row.action(expiration_buffer_secs)? {
        BatchAction::Single(request) => execute(api, &request).await.map(RowStatus::Placed),
        BatchAction::Sweep {
            token_id,
            max_price,
            budget,
        } => execute_sweep(api, &token_id, max_price, budget)
            .await
            .map(RowStatus::Swept),
    }
}
