//! linksyncd - the linksync bridge daemon.
//!
//! Runs the sync engine over the in-memory platforms and takes admin
//! commands on stdin.

use linksync::bridge::{Bridge, BridgeParams};
use linksync::command::{Console, ConsoleCommand};
use linksync::config::{Config, ValidationError, validate};
use linksync::db::Database;
use linksync::identity::{IdentityResolver, LinkProvider, ResolverParams};
use linksync::platform::{MemoryChat, MemoryGame, MemoryLinks};
use linksync::{http, metrics};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    if let Err(errors) = validate(&config) {
        let (fatal, blocked): (Vec<ValidationError>, Vec<ValidationError>) =
            errors.into_iter().partition(ValidationError::is_fatal);
        for e in &blocked {
            warn!(error = %e, "Sync set will not activate");
        }
        if !fatal.is_empty() {
            for e in &fatal {
                error!(error = %e, "Invalid configuration");
            }
            anyhow::bail!("refusing to start with {} configuration error(s)", fatal.len());
        }
    }

    info!(bridge = %config.bridge.name, "Starting linksyncd");

    // Initialize database
    let db = Database::new(&config.database.path).await?;

    let links = Arc::new(MemoryLinks::new());
    let resolver = Arc::new(IdentityResolver::new(ResolverParams {
        store: Arc::new(db),
        provider: Some(links as Arc<dyn LinkProvider>),
        cache_ttl: config.identity.cache_ttl(),
        link_cooldown: config.identity.link_cooldown(),
    }));

    let bridge = Bridge::new(BridgeParams {
        config: &config,
        resolver,
        chat: Arc::new(MemoryChat::new()),
        game: Arc::new(MemoryGame::new()),
    });

    // Convention: metrics_port = 0 (or unset) disables the HTTP endpoint.
    match config.bridge.metrics_port() {
        Some(port) => {
            metrics::init();
            tokio::spawn(async move {
                http::run_http_server(port).await;
            });
            info!(port, "Prometheus HTTP server started");
        }
        None => info!("Metrics disabled"),
    }

    bridge.start();

    let console = Console::new(Arc::clone(&bridge), &config_path);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        info!("stdin closed, console disabled");
                        let _ = tokio::signal::ctrl_c().await;
                        break;
                    }
                    Err(e) => {
                        error!(error = %e, "Failed to read console input");
                        break;
                    }
                };
                let command = match ConsoleCommand::parse(&line) {
                    Ok(Some(command)) => command,
                    Ok(None) => continue,
                    Err(e) => {
                        println!("error: {e}");
                        continue;
                    }
                };
                let stop = command == ConsoleCommand::Stop;
                match console.execute(command).await {
                    Ok(output) => output.iter().for_each(|line| println!("{line}")),
                    Err(e) => {
                        warn!(error = %e, code = e.error_code(), "Console command failed");
                        println!("error: {e}");
                    }
                }
                if stop {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received");
                break;
            }
        }
    }

    bridge.shutdown();
    Ok(())
}
