//! Retrieve Info menu

use super::{invalid_option, section, terminal, MenuContext};
use crate::error::{BotError, Result};
use crate::markets::{self, export};
use crate::orderbook::{format_decimal, format_number, BookAnalysis};
use crate::types::BookLevel;
use chrono::{Local, NaiveDate};
use crossterm::style::Color;

const INFO_OPTIONS: [&str; 7] = [
    "Filter markets by end date or keyword",
    "Get market info from a link",
    "Get market by condition ID",
    "Show raw sampling markets",
    "Export all market data",
    "Analyze order book",
    "Back",
];

pub async fn run(ctx: &MenuContext<'_>) -> Result<()> {
    loop {
        terminal::header("Retrieve Info")?;
        terminal::menu(&INFO_OPTIONS)?;

        match terminal::prompt("Select an option: ")?.as_str() {
            "1" => section(INFO_OPTIONS[0], filter_markets(ctx)).await?,
            "2" => section(INFO_OPTIONS[1], info_from_link(ctx)).await?,
            "3" => section(INFO_OPTIONS[2], market_by_condition_id(ctx)).await?,
            "4" => section(INFO_OPTIONS[3], raw_sampling_markets(ctx)).await?,
            "5" => section(INFO_OPTIONS[4], export_all_market_data(ctx)).await?,
            "6" => section(INFO_OPTIONS[5], analyze_order_book(ctx)).await?,
            "7" => return Ok(()),
            _ => invalid_option()?,
        }
    }
}

async fn filter_markets(ctx: &MenuContext<'_>) -> Result<()> {
    terminal::menu(&["By end date", "By keyword"])?;
    let mode = terminal::prompt("Filter mode: ")?;
    if mode != "1" && mode != "2" {
        return Err(BotError::InvalidInput(format!("Unknown filter mode '{}'", mode)));
    }

    let all = ctx.api.get_sampling_markets().await?.data;

    if mode == "1" {
        let raw = terminal::prompt("Show markets ending on or before (YYYY-MM-DD): ")?;
        let cutoff = NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| {
            BotError::InvalidInput(format!("Invalid date '{}', expected YYYY-MM-DD", raw))
        })?;
        let today = Local::now().date_naive();
        let hits = markets::filter_by_end_date(&all, cutoff, today);
        if hits.is_empty() {
            terminal::warning("No markets found with that end date.")?;
            return Ok(());
        }

        for market in &hits {
            println!(
                "  {} | {} | {}",
                market.end_date_iso.as_deref().unwrap_or("N/A"),
                market.market_slug,
                market.event_link()
            );
        }
        let path = export::write_event_links(&ctx.config.files.export_dir(), cutoff, &hits)?;
        terminal::success(&format!(
            "{} markets end between {} and {}. Saved to {}",
            hits.len(),
            today,
            cutoff,
            path.display()
        ))?;
    } else {
        let keyword = terminal::prompt("Keyword: ")?;
        let hits = markets::filter_by_keyword(&all, &keyword);
        if hits.is_empty() {
            terminal::warning("No markets found with that keyword.")?;
            return Ok(());
        }
        for market in &hits {
            println!("  {}", market.question);
            println!("    slug: {}  condition_id: {}", market.market_slug, market.condition_id);
        }
        terminal::success(&format!("{} markets match '{}'", hits.len(), keyword))?;
    }
    Ok(())
}

async fn info_from_link(ctx: &MenuContext<'_>) -> Result<()> {
    let url = terminal::prompt("Polymarket event link: ")?;
    let snapshot = markets::fetch_info_from_url(ctx.api, &url).await?;

    for (label, value) in snapshot.fields() {
        let value = match label {
            "Min Size" | "Max Spread" | "Daily Reward" => format_number(&value),
            _ => value,
        };
        println!("  {:<18}{}", format!("{}:", label), value);
    }
    let path = export::write_snapshot(&ctx.config.files.export_dir(), &snapshot)?;
    terminal::success(&format!("Saved to {}", path.display()))
}

async fn market_by_condition_id(ctx: &MenuContext<'_>) -> Result<()> {
    let condition_id = terminal::prompt("Condition ID: ")?;
    let market = ctx.api.get_market(&condition_id).await?;

    println!("  Question:         {}", market.question);
    println!("  Slug:             {}", market.market_slug);
    println!(
        "  End date:         {}",
        market.end_date_iso.as_deref().unwrap_or("N/A")
    );
    println!("  Active:           {}", market.active);
    println!("  Closed:           {}", market.closed);
    println!("  Accepting orders: {}", market.accepting_orders);
    println!("  Neg risk:         {}", market.neg_risk);
    println!("  Tokens:");
    for token in &market.tokens {
        println!(
            "    {:<6} {}  price {}",
            token.outcome, token.token_id, token.price
        );
    }
    Ok(())
}

async fn raw_sampling_markets(ctx: &MenuContext<'_>) -> Result<()> {
    let page = ctx.api.get_sampling_markets().await?;
    println!("{}", serde_json::to_string_pretty(&page.data)?);
    terminal::success(&format!("{} sampling markets", page.data.len()))
}

async fn export_all_market_data(ctx: &MenuContext<'_>) -> Result<()> {
    let all = ctx.api.get_sampling_markets().await?.data;
    if all.is_empty() {
        return Err(BotError::Api("No market data received from API".into()));
    }
    let path = export::write_all_market_data(&ctx.config.files.export_dir(), &all)?;
    terminal::success(&format!(
        "Exported {} markets to {}",
        all.len(),
        path.display()
    ))
}

async fn analyze_order_book(ctx: &MenuContext<'_>) -> Result<()> {
    let token_id = terminal::prompt("Token ID: ")?;
    let book = ctx.api.get_order_book(&token_id).await?;
    let analysis = BookAnalysis::from_summary(&book);

    println!("  Market:    {}", analysis.market);
    println!("  Asset ID:  {}", analysis.asset_id);
    println!(
        "  Timestamp: {}",
        analysis.timestamp.as_deref().unwrap_or("N/A")
    );
    println!("  Hash:      {}", analysis.short_hash());
    println!();
    println!("  Best bid:  {}", analysis.best_bid);
    println!("  Best ask:  {}", analysis.best_ask);
    println!("  Spread:    {}", analysis.spread);
    println!();

    print_side("BIDS", analysis.top_bids(), Color::Green)?;
    print_side("ASKS", analysis.top_asks(), Color::Red)?;

    println!(
        "  Total bid liquidity: ${}",
        format_decimal(analysis.total_bid_liquidity)
    );
    println!(
        "  Total ask liquidity: ${}",
        format_decimal(analysis.total_ask_liquidity)
    );
    Ok(())
}

fn print_side(title: &str, levels: &[BookLevel], color: Color) -> Result<()> {
    terminal::line(&format!("  {} (top {})", title, levels.len()), color)?;
    println!("  {:>10} {:>14} {:>16}", "Price", "Size", "Liquidity");
    for level in levels {
        println!(
            "  {:>10} {:>14} {:>16}",
            level.price,
            format_decimal(level.size),
            format!("${}", format_decimal(level.liquidity()))
        );
    }
    println!();
    Ok(())
}
