//! Polymarket CLOB client
//!
//! Everything above this module talks to the exchange through [`TradingApi`].

pub mod auth;
pub mod clob;
pub mod order_builder;

pub use auth::{ApiCredentials, PolySigner};
pub use clob::ClobClient;

use crate::error::Result;
use crate::types::{
    CancelResponse, ClobMarket, MarketsPage, OpenOrder, OrderBookSummary, OrderRequest,
    PostOrderResponse,
};
use async_trait::async_trait;

/// Operations the order desk needs from the exchange
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TradingApi: Send + Sync {
    /// Whether the API answers at all
    async fn health_check(&self) -> Result<bool>;

    /// One page of all markets, starting at `next_cursor` ("" for the first page)
    async fn get_markets(&self, next_cursor: &str) -> Result<MarketsPage>;

    /// Markets currently eligible for liquidity rewards
    async fn get_sampling_markets(&self) -> Result<MarketsPage>;

    async fn get_sampling_simplified_markets(&self) -> Result<MarketsPage>;

    async fn get_market(&self, condition_id: &str) -> Result<ClobMarket>;

    async fn get_order_book(&self, token_id: &str) -> Result<OrderBookSummary>;

    /// Sign and submit a buy order
    async fn post_order(&self, request: &OrderRequest) -> Result<PostOrderResponse>;

    async fn get_open_orders(&self) -> Result<Vec<OpenOrder>>;

    async fn cancel_order(&self, order_id: &str) -> Result<CancelResponse>;
}
