use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use chartool::commands;
use chartool::config::AppConfig;
use chartool::context::AppContext;
use chartool::models::Granularity;

#[derive(Parser)]
#[command(name = "chartool")]
#[command(about = "Terminal dashboard engine: history, quotes and scripted backtests")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch recent bars for a symbol and print them as JSON
    History {
        symbol: String,
        #[arg(long, value_enum, default_value_t = Granularity::H1)]
        granularity: Granularity,
        #[arg(long, default_value_t = 1000)]
        count: usize,
    },
    /// Run a strategy script over history and print the backtest report
    Backtest {
        symbol: String,
        /// Path to the strategy script defining generate_signals(bars)
        #[arg(short, long)]
        script: PathBuf,
        #[arg(long, value_enum, default_value_t = Granularity::H1)]
        granularity: Granularity,
        #[arg(long, default_value_t = 1000)]
        count: usize,
        /// Run against an exported snapshot instead of the gateway
        #[arg(long)]
        data_file: Option<PathBuf>,
    },
    /// Print the latest quote for a symbol
    Tick { symbol: String },
    /// Print the terminal account summary
    Account,
    /// Fetch history and save it as a snapshot file
    ExportHistory {
        symbol: String,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, value_enum, default_value_t = Granularity::H1)]
        granularity: Granularity,
        #[arg(long, default_value_t = 1000)]
        count: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;
    let app = AppContext::initialize(config);

    let report = match cli.command {
        Commands::History {
            symbol,
            granularity,
            count,
        } => commands::history::run(&app, &symbol, granularity, count).await?,
        Commands::Backtest {
            symbol,
            script,
            granularity,
            count,
            data_file,
        } => {
            commands::backtest::run(
                &app,
                &symbol,
                granularity,
                count,
                &script,
                data_file.as_deref(),
            )
            .await?
        }
        Commands::Tick { symbol } => commands::tick::run(&app, &symbol).await?,
        Commands::Account => commands::account::run(&app).await?,
        Commands::ExportHistory {
            symbol,
            output,
            granularity,
            count,
        } => commands::export_history::run(&app, &symbol, granularity, count, &output).await?,
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
