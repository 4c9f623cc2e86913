use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use slotwatch::config::Config;
use slotwatch::crawler::{CalendarTarget, HttpSessionFactory};
use slotwatch::identity::{load_or_direct, IdentityPool};
use slotwatch::models::ResultSnapshot;
use slotwatch::notifications::TerminalAlerter;
use slotwatch::parser::BookableSlotParser;
use slotwatch::server::{AppState, BroadcastServer, SubscriberHub};
use slotwatch::utils::format_secs;
use slotwatch::watcher::{PollCycle, Watcher};

#[derive(Parser)]
#[command(
    name = "slotwatch",
    version,
    about = "Watch the Berlin booking service for free appointments",
    long_about = None
)]
struct Cli {
    /// Service page URL, e.g. https://service.berlin.de/dienstleistung/120686/
    service_url: Option<String>,

    /// Port of the WebSocket server
    #[arg(short, long)]
    port: Option<u16>,

    /// Do not ring the terminal bell
    #[arg(short, long)]
    quiet: bool,

    /// Identity file with one `proxy;email;id` per line
    #[arg(long)]
    proxies: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long)]
    log_format: Option<String>,
}

impl Cli {
    /// Load the base configuration and apply command-line overrides
    fn resolve_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::from_env()?,
        };

        if let Some(url) = &self.service_url {
            config.target.service_page_url = url.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if self.quiet {
            config.poll.quiet = true;
        }
        if let Some(path) = &self.proxies {
            config.identities.file = Some(path.clone());
        }
        if let Some(format) = &self.log_format {
            config.logging.format = format.clone();
        }
        if self.verbose {
            config.logging.level = String::from("debug");
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;

    // Initialize tracing/logging
    setup_tracing(&config.logging.format, &config.logging.level)?;

    let timezone = config.timezone()?;
    let target = CalendarTarget::from_service_page(
        &config.target.service_page_url,
        &config.target.booking_base_url,
        timezone,
    )
    .context("Invalid service page URL")?;

    let identities = load_or_direct(config.identities.file.as_deref());
    let pool = Arc::new(IdentityPool::new(identities, config.cooldown()));

    let cycle = PollCycle::new(
        target,
        Arc::new(HttpSessionFactory::new(config.request_timeout())),
        Arc::new(BookableSlotParser::new(timezone)),
        Arc::new(TerminalAlerter),
    )
    .with_request_timeout(config.request_timeout())
    .quiet(config.poll.quiet);

    let hub = Arc::new(SubscriberHub::new(ResultSnapshot::initial(chrono::Utc::now()))?);
    let watcher = Watcher::new(Arc::clone(&pool), cycle, Arc::clone(&hub), config.base_interval());

    let server = BroadcastServer::new(
        config.bind_address()?,
        AppState {
            hub,
            identities: pool.size(),
            poll_interval: watcher.interval(),
        },
    );
    let listener = server.bind().await?;

    tracing::info!(
        port = config.server.port,
        identities = pool.size(),
        cooldown = %format_secs(pool.cooldown()),
        interval = %format_secs(watcher.interval()),
        "slotwatch starting"
    );

    tokio::select! {
        result = server.serve(listener) => {
            result.context("Subscriber server stopped")?;
        }
        () = watcher.run() => {}
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for shutdown signal")?;
            tracing::info!("Shutting down");
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, level: &str) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::new(format!(
        "slotwatch={level},tower_http=warn,axum=warn,info"
    ));

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .context("Failed to install JSON log subscriber")?;
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()
                .context("Failed to install log subscriber")?;
        }
    }

    Ok(())
}
