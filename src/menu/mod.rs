//! Interactive menus
//!
//! Every action is a handler returning `Result<()>`. The dispatcher prints a
//! failing handler's error, waits for Enter and shows the menu again.

pub mod info;
pub mod terminal;
pub mod trade;

use crate::client::TradingApi;
use crate::config::Config;
use crate::error::Result;
use crate::types::PostOrderResponse;
use std::future::Future;
use tracing::{info, warn};

/// What every handler gets to work with
pub struct MenuContext<'a> {
    pub api: &'a dyn TradingApi,
    pub config: &'a Config,
}

const MAIN_OPTIONS: [&str; 4] = ["Run CSV Orders", "Retrieve Info", "Place Orders", "Exit"];

/// Main menu loop, returns when the operator picks Exit
pub async fn run(ctx: &MenuContext<'_>) -> Result<()> {
    info!("Menu started");
    loop {
        terminal::header("Main Menu")?;
        terminal::menu(&MAIN_OPTIONS)?;

        match terminal::prompt("Select an option: ")?.as_str() {
            "1" => section(MAIN_OPTIONS[0], trade::run_csv_orders(ctx)).await?,
            "2" => info::run(ctx).await?,
            "3" => trade::run(ctx).await?,
            "4" => {
                terminal::success("Goodbye!")?;
                return Ok(());
            }
            _ => invalid_option()?,
        }
    }
}

/// Show `title`, await the handler, print its error if it failed, then pause
pub(crate) async fn section<F>(title: &str, action: F) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    terminal::header(title)?;
    if let Err(e) = action.await {
        warn!("Menu action failed: {}", e);
        terminal::error(&format!("Error: {}", e))?;
    }
    terminal::pause()
}

pub(crate) fn invalid_option() -> Result<()> {
    terminal::error("Invalid option")?;
    terminal::pause()
}

pub(crate) fn print_order_response(response: &PostOrderResponse) -> Result<()> {
    if response.success {
        terminal::success("Order placed successfully")?;
    } else {
        terminal::error("Order was not accepted")?;
    }
    println!("  Order ID:     {}", response.order_id);
    println!("  Status:       {}", response.status);
    if !response.error_msg.is_empty() {
        println!("  Error:        {}", response.error_msg);
    }
    let transactions = response.transactions();
    if !transactions.is_empty() {
        println!("  Transactions: {}", transactions);
    }
    Ok(())
}
