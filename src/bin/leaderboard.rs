use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Parser;
use tracing::info;

use prediction_leaderboard::api::TradeFilter;
use prediction_leaderboard::client::ApiClient;
use prediction_leaderboard::config::{AppConfig, CONFIG_PATH};
use prediction_leaderboard::pipeline::{CancelToken, build_leaderboard};
use prediction_leaderboard::reporter;
use prediction_leaderboard::types::Timeframe;

#[derive(Parser)]
#[command(name = "leaderboard", about = "Prediction-market leaderboard pipeline")]
struct Args {
    /// Leaderboard timeframe
    #[arg(long, value_enum, default_value = "all-time")]
    timeframe: Timeframe,

    /// Maximum number of entries (defaults to the configured size)
    #[arg(long)]
    limit: Option<usize>,

    /// Restrict all-time aggregation to a single market id
    #[arg(long)]
    market: Option<u64>,

    /// Only aggregate trades created at or after this RFC 3339 instant
    #[arg(long)]
    after: Option<DateTime<Utc>>,

    /// Only aggregate trades created before this RFC 3339 instant
    #[arg(long)]
    before: Option<DateTime<Utc>>,

    /// Emit pretty-printed JSON instead of a table
    #[arg(long, conflicts_with = "json_lines")]
    json: bool,

    /// Emit one JSON line per entry
    #[arg(long)]
    json_lines: bool,

    /// Config file path
    #[arg(long, default_value = CONFIG_PATH)]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Some(limit) = args.limit {
        if limit == 0 {
            anyhow::bail!("--limit must be positive");
        }
    }

    let mut config = AppConfig::load_or_default(Path::new(&args.config))?;
    if config.api.auth_token.is_none() {
        if let Ok(token) = std::env::var("LEADERBOARD_API_TOKEN") {
            config.api.auth_token = Some(token);
        }
    }
    if let Some(limit) = args.limit {
        config.settings.leaderboard_size = limit;
    }

    info!(
        "Building {} leaderboard from {} (top {})",
        args.timeframe.label(),
        config.api.base_url,
        config.settings.leaderboard_size,
    );

    let client = ApiClient::new(&config.api)?;
    let filter = TradeFilter {
        market_id: args.market,
        created_after: args.after,
        created_before: args.before,
    };
    let cancel = CancelToken::new();

    let board = build_leaderboard(
        &client,
        &config.settings,
        args.timeframe,
        &filter,
        &cancel,
    )
    .await;

    if !board.complete {
        info!("Result is best-effort: pagination was truncated before exhaustion");
    }

    if args.json {
        reporter::report_json(&board);
    } else if args.json_lines {
        reporter::report_json_lines(&board);
    } else {
        reporter::report_table(&board);
    }

    Ok(())
}
