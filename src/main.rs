use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use indexbot::analysis::MarketAnalyzer;
use indexbot::api::{Credentials, UpstoxClient};
use indexbot::cache::VolatilityCache;
use indexbot::config::Settings;
use indexbot::db::{MemorySignalStore, PostgresSignalStore, SignalStore};
use indexbot::server::{self, AppState};
use indexbot::session::{Countdown, SessionClock};
use indexbot::strategy::StrategyOverrides;
use std::io::Write;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "indexbot",
    about = "Index market analysis and trade decision engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Run one analysis and print the report as JSON
    Analyze {
        /// NIFTY, BANKNIFTY or FINNIFTY
        #[arg(long, default_value = "NIFTY")]
        symbol: String,

        /// Single-timeframe RSI/EMA analysis instead of multi-timeframe confluence
        #[arg(long, default_value_t = false)]
        simple: bool,

        /// Keep a countdown to the next session event running until Ctrl+C
        #[arg(long, default_value_t = false)]
        watch: bool,
    },
    /// Print the current exchange session window
    Session,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let cli = Cli::parse();
    let settings = Settings::load()
        .map_err(|e| anyhow!(e))
        .context("Failed to load configuration")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(settings).await,
        Command::Analyze {
            symbol,
            simple,
            watch,
        } => analyze(settings, &symbol, simple, watch).await,
        Command::Session => {
            let clock = SessionClock::new(&settings.session)
                .map_err(|e| anyhow!(e))
                .context("Invalid session calendar")?;
            println!("{}", serde_json::to_string_pretty(&clock.now())?);
            Ok(())
        }
    }
}

fn setup_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("indexbot=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn serve(settings: Settings) -> anyhow::Result<()> {
    tracing::info!("🚀 indexbot starting");

    let analyzer = build_analyzer(&settings).await?;
    if settings.upstox.access_token.is_none() {
        tracing::warn!("No default Upstox token configured, requests must bring their own");
    }

    let state = AppState {
        analyzer: Arc::new(analyzer),
        default_token: settings.upstox.access_token.clone(),
    };

    server::serve(&settings.server.bind, state)
        .await
        .map_err(|e| anyhow!(e))
        .with_context(|| format!("HTTP server on {} failed", settings.server.bind))
}

async fn analyze(settings: Settings, symbol: &str, simple: bool, watch: bool) -> anyhow::Result<()> {
    let analyzer = build_analyzer(&settings).await?;
    let credentials = Credentials::resolve(None, settings.upstox.access_token.as_deref())
        .context("Set UPSTOX_ACCESS_TOKEN to run an analysis")?;

    let report = if simple {
        analyzer.quick_analyze(symbol, &credentials).await
    } else {
        analyzer
            .analyze(symbol, &StrategyOverrides::default(), &credentials)
            .await
    }
    .with_context(|| format!("Analysis of {} failed", symbol))?;

    println!("{}", serde_json::to_string_pretty(&report)?);

    if watch {
        watch_session(&analyzer).await?;
    }

    Ok(())
}

async fn watch_session(analyzer: &MarketAnalyzer) -> anyhow::Result<()> {
    let countdown = Countdown::start(&analyzer.session());
    let mut updates = countdown.subscribe();

    loop {
        eprint!("\r{:<40}", updates.borrow_and_update().clone());
        std::io::stderr().flush()?;

        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                countdown.cancel();
                break;
            }
        }
    }

    eprintln!();
    Ok(())
}

async fn build_analyzer(settings: &Settings) -> anyhow::Result<MarketAnalyzer> {
    let provider = UpstoxClient::new(&settings.upstox)
        .map_err(|e| anyhow!(e))
        .context("Failed to build Upstox client")?;
    let clock = SessionClock::new(&settings.session)
        .map_err(|e| anyhow!(e))
        .context("Invalid session calendar")?;

    let mut analyzer = MarketAnalyzer::new(Arc::new(provider), connect_signal_store(settings).await)
        .with_strategy(settings.strategy.clone())
        .with_clock(clock)
        .with_config(settings.analysis.clone());

    if let Some(cache) = connect_to_redis(settings).await {
        analyzer = analyzer.with_cache(cache);
    }

    Ok(analyzer)
}

async fn connect_signal_store(settings: &Settings) -> Arc<dyn SignalStore> {
    let Some(database_url) = settings.database.url.as_deref() else {
        tracing::info!("No DATABASE_URL set, keeping signals in memory");
        return Arc::new(MemorySignalStore::new());
    };

    match PostgresSignalStore::new(database_url, settings.database.max_connections).await {
        Ok(store) => {
            tracing::info!("Postgres signal store enabled");
            Arc::new(store)
        }
        Err(e) => {
            tracing::warn!(
                "Failed to connect to Postgres ({}), keeping signals in memory",
                e
            );
            Arc::new(MemorySignalStore::new())
        }
    }
}

async fn connect_to_redis(settings: &Settings) -> Option<VolatilityCache> {
    let redis_url = settings.redis.url.as_deref()?;

    match VolatilityCache::new(redis_url, settings.redis.volatility_ttl_secs).await {
        Ok(cache) => Some(cache),
        Err(e) => {
            tracing::warn!(
                "Failed to connect to Redis ({}), continuing without volatility cache",
                e
            );
            None
        }
    }
}
