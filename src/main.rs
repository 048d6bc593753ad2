//! Polymarket CLOB order desk
//!
//! Interactive menu for browsing markets and placing buy orders.

use clap::{Parser, Subcommand};
use polybot::{
    client::{ClobClient, TradingApi},
    config::Config,
    menu::{self, MenuContext},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "polybot")]
#[command(about = "Interactive order desk for Polymarket prediction markets")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive menu (default)
    Menu,
    /// Check API connectivity and credentials
    Check,
    /// Run scheduled tasks until the task file is empty
    RunTasks,
    /// Execute the batch order file once
    RunOrders,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config)?;
    config.validate()?;

    let client = ClobClient::new(&config.polymarket)?;
    client.initialize().await?;

    let ctx = MenuContext {
        api: &client,
        config: &config,
    };

    match cli.command.unwrap_or(Commands::Menu) {
        Commands::Menu => menu::run(&ctx).await?,
        Commands::Check => check(&client).await?,
        Commands::RunTasks => menu::trade::execute_scheduled_orders(&ctx).await?,
        Commands::RunOrders => menu::trade::run_csv_orders(&ctx).await?,
    }
    Ok(())
}

async fn check(api: &dyn TradingApi) -> anyhow::Result<()> {
    tracing::info!("Checking CLOB connectivity");

    if !api.health_check().await? {
        anyhow::bail!("CLOB API is not responding");
    }
    println!("✅ CLOB API is up");

    let sampling = api.get_sampling_markets().await?;
    println!("✅ Fetched {} sampling markets", sampling.data.len());

    let open = api.get_open_orders().await?;
    println!("✅ Authenticated, {} open orders", open.len());
    Ok(())
}
