//! Polymarket CLOB order desk
//!
//! An interactive terminal menu for browsing Polymarket markets, inspecting
//! order books and placing buy orders, with CSV-driven batch and scheduled
//! execution.
//!
//! ## Architecture
//!
//! ```text
//! Menu → Handler (markets / orderbook / orders / scheduler) → TradingApi (ClobClient)
//!                                   ↓
//!                        Terminal output / CSV files
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod markets;
pub mod menu;
pub mod orderbook;
pub mod orders;
pub mod scheduler;
pub mod types;

#[cfg(test)]
mod config_tests;
