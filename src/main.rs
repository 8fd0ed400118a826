//! USSD BMI calculator service entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ussd_bmi::api::{create_router, AppState};
use ussd_bmi::config::Config;
use ussd_bmi::menu::{EngineSettings, MenuEngine};
use ussd_bmi::metrics;
use ussd_bmi::session::InMemorySessionStore;
use ussd_bmi::storage::postgres::PgUssdRepository;
use ussd_bmi::utils::shutdown_signal;

/// USSD BMI calculator menu service.
#[derive(Parser, Debug)]
#[command(name = "ussd-bmi")]
#[command(about = "Session-oriented USSD menu serving a BMI calculator")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,

    /// HTTP server port (overrides PORT).
    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the service (default).
    Run {
        /// HTTP server port (overrides PORT).
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check configuration validity.
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("ussd_bmi=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    // Initialize metrics
    metrics::init_metrics();

    match args.command {
        Some(Command::CheckConfig) => cmd_check_config().await,
        Some(Command::Run { port }) => cmd_run(port).await,
        None => cmd_run(args.port).await,
    }
}

/// Check configuration validity.
async fn cmd_check_config() -> anyhow::Result<()> {
    let config = Config::load()?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;

    println!("Configuration OK");
    println!("  Port: {}", config.port);
    println!("  Session TTL: {} min", config.session_ttl_minutes);
    println!("  Sweep interval: {} s", config.sweep_interval_seconds);
    println!("  History limit: {}", config.history_limit);
    println!(
        "  Input parsing: {}",
        if config.legacy_input_parsing {
            "legacy full-sequence"
        } else {
            "last segment"
        }
    );

    Ok(())
}

/// Run the service until Ctrl-C or the shutdown endpoint fires.
async fn cmd_run(port_override: Option<u16>) -> anyhow::Result<()> {
    let config = Config::load()?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
    let port = port_override.unwrap_or(config.port);

    // Persistence
    let repo = PgUssdRepository::connect(&config.database_url, config.max_db_connections).await?;
    repo.init_schema().await?;
    let pool = repo.pool().clone();

    // Engine over the in-memory store
    let engine = Arc::new(MenuEngine::new(
        Arc::new(InMemorySessionStore::new()),
        Arc::new(repo),
        EngineSettings::from(&config),
    ));

    // Periodic expiry sweep; the only concurrent mutator of the store
    // besides the request path.
    let sweeper = engine.clone();
    let sweep_interval = config.sweep_interval();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        ticker.tick().await; // first tick fires immediately, skip it
        loop {
            ticker.tick().await;
            sweeper.sweep_expired().await;
        }
    });

    // HTTP server
    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    let app = create_router(AppState::new(engine, shutdown_tx));
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_rx))
        .await?;

    // Drained; release the pool before exiting.
    pool.close().await;
    info!("persistence pool closed, bye");

    Ok(())
}
