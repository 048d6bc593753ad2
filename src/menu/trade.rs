//! Place Orders menu

use super::{invalid_option, print_order_response, section, terminal, MenuContext};
use crate::error::{BotError, Result};
use crate::orders::{self, batch, build_request, parse_decimal, Budget};
use crate::scheduler::{parse_schedule_time, ScheduledTask, TaskRunner, TaskStore};
use crate::types::OrderType;
use chrono::{Local, Utc};
use rust_decimal::Decimal;
use std::time::Duration;

const ORDER_OPTIONS: [&str; 7] = [
    "Create buy order",
    "Buy under maximum price",
    "Schedule order",
    "Execute scheduled orders",
    "Run CSV orders",
    "Cancel all orders",
    "Back",
];

const ORDER_TYPES: [OrderType; 3] = [OrderType::FOK, OrderType::GTC, OrderType::GTD];

pub async fn run(ctx: &MenuContext<'_>) -> Result<()> {
    loop {
        terminal::header("Place Orders")?;
        terminal::menu(&ORDER_OPTIONS)?;

        match terminal::prompt("Select an option: ")?.as_str() {
            "1" => section(ORDER_OPTIONS[0], create_buy_order(ctx)).await?,
            "2" => section(ORDER_OPTIONS[1], buy_under_max_price(ctx)).await?,
            "3" => section(ORDER_OPTIONS[2], schedule_order(ctx)).await?,
            "4" => section(ORDER_OPTIONS[3], execute_scheduled_orders(ctx)).await?,
            "5" => section(ORDER_OPTIONS[4], run_csv_orders(ctx)).await?,
            "6" => section(ORDER_OPTIONS[5], cancel_all_orders(ctx)).await?,
            "7" => return Ok(()),
            _ => invalid_option()?,
        }
    }
}

/// Raw answers to the order prompts, empty where the type does not ask
#[derive(Debug, Default)]
struct OrderInput {
    amount: String,
    price: String,
    size: String,
    expire_seconds: String,
}

fn prompt_order_type() -> Result<OrderType> {
    let labels: Vec<&str> = ORDER_TYPES.iter().map(OrderType::label).collect();
    terminal::menu(&labels)?;
    let choice = terminal::prompt("Order type: ")?;
    choice
        .parse::<usize>()
        .ok()
        .and_then(|i| i.checked_sub(1))
        .and_then(|i| ORDER_TYPES.get(i).copied())
        .ok_or_else(|| BotError::InvalidInput(format!("Unknown order type '{}'", choice)))
}

fn prompt_order_input(order_type: OrderType) -> Result<OrderInput> {
    let mut input = OrderInput::default();
    match order_type {
        OrderType::FOK => {
            input.amount = terminal::prompt("Amount to spend (USD): ")?;
        }
        OrderType::GTC | OrderType::GTD => {
            input.price = terminal::prompt("Price (0-1): ")?;
            input.size = terminal::prompt("Size (shares): ")?;
            if order_type == OrderType::GTD {
                input.expire_seconds = terminal::prompt("Expire after (seconds): ")?;
            }
        }
    }
    Ok(input)
}

async fn create_buy_order(ctx: &MenuContext<'_>) -> Result<()> {
    let token_id = terminal::prompt("Token ID: ")?;
    let order_type = prompt_order_type()?;
    let input = prompt_order_input(order_type)?;

    let request = build_request(
        &token_id,
        order_type,
        &input.amount,
        &input.price,
        &input.size,
        &input.expire_seconds,
        Utc::now(),
        ctx.config.runner.gtd_expiration_buffer_secs,
    )?;
    let response = orders::execute(ctx.api, &request).await?;
    print_order_response(&response)
}

async fn buy_under_max_price(ctx: &MenuContext<'_>) -> Result<()> {
    let token_id = terminal::prompt("Token ID: ")?;
    let max_price = parse_decimal("max price", &terminal::prompt("Maximum price (0-1): ")?)?;
    terminal::menu(&["Number of tokens", "USD amount"])?;
    let budget = match terminal::prompt("Budget in: ")?.as_str() {
        "1" => Budget::Tokens(parse_decimal("tokens", &terminal::prompt("Tokens to buy: ")?)?),
        "2" => Budget::Usd(parse_decimal("amount", &terminal::prompt("USD to spend: ")?)?),
        other => {
            return Err(BotError::InvalidInput(format!("Unknown budget '{}'", other)));
        }
    };

    let outcomes = orders::execute_sweep(ctx.api, &token_id, max_price, budget).await?;
    if outcomes.is_empty() {
        terminal::warning(&format!("No asks at or under {}", max_price))?;
        return Ok(());
    }

    for outcome in &outcomes {
        let fill = outcome.fill;
        match &outcome.result {
            Ok(response) if response.success => terminal::success(&format!(
                "Bought {} @ {} -> order {}",
                fill.size, fill.price, response.order_id
            ))?,
            Ok(response) => terminal::error(&format!(
                "Rejected {} @ {}: {}",
                fill.size, fill.price, response.error_msg
            ))?,
            Err(e) => terminal::error(&format!("Failed {} @ {}: {}", fill.size, fill.price, e))?,
        }
    }

    let placed: usize = outcomes.iter().filter(|o| o.succeeded()).count();
    println!("\n{} of {} orders placed", placed, outcomes.len());

    let fills: Vec<_> = outcomes.iter().map(|o| o.fill).collect();
    let unfilled = budget.unfilled(&fills);
    if unfilled > Decimal::ZERO {
        let unit = match budget {
            Budget::Tokens(_) => "tokens",
            Budget::Usd(_) => "USD",
        };
        terminal::warning(&format!(
            "Unfilled: {} {} (not enough asks under {})",
            unfilled, unit, max_price
        ))?;
    }
    Ok(())
}

async fn schedule_order(ctx: &MenuContext<'_>) -> Result<()> {
    let when = parse_schedule_time(&terminal::prompt("Execute at (YYYY-MM-DD HH:MM): ")?)?;
    let token_id = terminal::prompt("Token ID: ")?;
    let order_type = prompt_order_type()?;
    let input = prompt_order_input(order_type)?;

    build_request(
        &token_id,
        order_type,
        &input.amount,
        &input.price,
        &input.size,
        &input.expire_seconds,
        Utc::now(),
        ctx.config.runner.gtd_expiration_buffer_secs,
    )?;

    let task = ScheduledTask {
        scheduled_datetime: when,
        token_id,
        order_type,
        amount: input.amount,
        price: input.price,
        size: input.size,
        expire_seconds: input.expire_seconds,
    };
    let store = TaskStore::new(ctx.config.files.scheduled_tasks_path());
    store.append(&task)?;

    if task.is_due(Local::now().naive_local()) {
        terminal::warning(&format!(
            "Scheduled in the past, will run on the next cycle: {}",
            task.summary()
        ))
    } else {
        terminal::success(&format!("Scheduled: {}", task.summary()))
    }
}

pub async fn execute_scheduled_orders(ctx: &MenuContext<'_>) -> Result<()> {
    let store = TaskStore::new(ctx.config.files.scheduled_tasks_path());
    let runner = TaskRunner::new(
        ctx.api,
        store,
        Duration::from_secs(ctx.config.runner.poll_interval_secs),
        ctx.config.runner.gtd_expiration_buffer_secs,
    );
    runner.run().await
}

pub async fn run_csv_orders(ctx: &MenuContext<'_>) -> Result<()> {
    let path = ctx.config.files.orders_to_run_path();
    let report = batch::run_batch(ctx.api, &path, ctx.config.runner.gtd_expiration_buffer_secs).await?;

    for row in &report.rows {
        let label = format!("Row {} [{} {}]", row.row, row.order_type, row.token_id);
        match &row.status {
            batch::RowStatus::Placed(response) if response.success => {
                terminal::success(&format!("{} -> order {}", label, response.order_id))?
            }
            batch::RowStatus::Placed(response) => {
                terminal::error(&format!("{} rejected: {}", label, response.error_msg))?
            }
            batch::RowStatus::Swept(fills) => {
                let placed = fills.iter().filter(|f| f.succeeded()).count();
                let line = format!("{} -> {} of {} sweep orders placed", label, placed, fills.len());
                if placed > 0 {
                    terminal::success(&line)?
                } else {
                    terminal::warning(&line)?
                }
            }
            batch::RowStatus::Failed(e) => terminal::error(&format!("{} failed: {}", label, e))?,
        }
    }

    println!(
        "\nBatch done: {} succeeded, {} failed",
        report.succeeded(),
        report.failed()
    );
    Ok(())
}

async fn cancel_all_orders(ctx: &MenuContext<'_>) -> Result<()> {
    let outcomes = orders::cancel_all(ctx.api).await?;
    if outcomes.is_empty() {
        terminal::warning("No open orders")?;
        return Ok(());
    }
    for outcome in &outcomes {
        println!("  {}: {}", outcome.order_id, outcome.status);
    }
    terminal::success(&format!("Processed {} open orders", outcomes.len()))
}
