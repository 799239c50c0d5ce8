//! Arcade Queue Watcher - Main Entry Point
//!
//! Watches one category's queue for the signed-in user: polls, projects
//! start times, reaps finished turns and prints the resulting view.
//! Typing a category name on stdin switches queues, `r` refreshes, `q` quits.

mod config;
mod screen;
mod telemetry;

use anyhow::{Context, Result};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use arcade_queue_core::application::{
    shutdown_channel, PollContext, PollerHandle, PositionWatcher, QueueFetcher, QueuePipeline,
    QueuePoller, Reaper, TrustedTimeProvider,
};
use arcade_queue_core::domain::Category;
use arcade_queue_core::port::id_provider::UuidProvider;
use arcade_queue_core::port::time_provider::SystemTimeProvider;
use arcade_queue_core::port::AuthService;
use arcade_queue_infra_sqlite::{create_pool, database_url, run_migrations, SqliteQueueStore};
use arcade_queue_infra_system::{LocalSessionAuth, WorldTimeAuthority};

use crate::config::WatcherConfig;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);
const CHANGE_LOG_RETENTION: Duration = Duration::from_secs(24 * 3600);

/// Keep the returned guard alive until exit so buffered logs are flushed
fn init_logging() -> Result<(
    tracing_appender::non_blocking::WorkerGuard,
    telemetry::TelemetryStatus,
)> {
    let log_format = std::env::var("ARCADE_QUEUE_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("arcade_queue=info"))
        .context("Failed to create env filter")?;

    // stdout is the queue display; logs go to stderr or a daily file
    let (writer, guard) = match std::env::var("ARCADE_QUEUE_LOG_DIR") {
        Ok(dir) => tracing_appender::non_blocking(tracing_appender::rolling::daily(
            dir,
            "arcade-queue-watcher.log",
        )),
        Err(_) => tracing_appender::non_blocking(std::io::stderr()),
    };

    // The OTLP layer has to be part of the one global subscriber
    let telemetry::Telemetry { layer: otel, status } = telemetry::Telemetry::from_env();

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(otel)
                .with(env_filter)
                .with(fmt::layer().json().with_writer(writer))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(otel)
                .with(env_filter)
                .with(fmt::layer().pretty().with_writer(writer))
                .init();
        }
    }

    Ok((guard, status))
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Logging
    let (_log_guard, telemetry_status) = init_logging()?;
    info!("Arcade Queue Watcher v{} starting...", VERSION);
    telemetry_status.log();

    // 2. Configuration
    let cfg = WatcherConfig::load()?;
    let category = cfg.category()?;
    info!(db_path = %cfg.db_path, category = %category, "Configuration loaded");

    // 3. Database
    let pool = create_pool(&database_url(&cfg.db_path))
        .await
        .map_err(|e| anyhow::anyhow!("DB pool creation failed: {}", e))?;
    run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;

    // 4. Dependencies (DI wiring)
    let time_provider = Arc::new(SystemTimeProvider);
    let id_provider = Arc::new(UuidProvider);
    let store = Arc::new(SqliteQueueStore::new(
        pool.clone(),
        time_provider.clone(),
        id_provider.clone(),
    ));
    match store.prune_change_log(CHANGE_LOG_RETENTION).await {
        Ok(pruned) if pruned > 0 => info!(pruned, "Pruned change log"),
        Ok(_) => {}
        Err(e) => warn!(error = %e, "Change log pruning failed"),
    }

    let authority = Arc::new(
        WorldTimeAuthority::new(cfg.time_authority_url.clone(), cfg.time_authority_timeout())
            .map_err(|e| anyhow::anyhow!("Time authority setup failed: {}", e))?,
    );
    let clock = Arc::new(
        TrustedTimeProvider::new(authority, time_provider.clone())
            .with_timeout(cfg.time_authority_timeout()),
    );
    let auth = Arc::new(LocalSessionAuth::new(cfg.session_path.clone(), id_provider));
    let user = auth
        .current_user()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read session: {}", e))?;
    match &user {
        Some(u) => info!(nickname = %u.nickname, "Watching as signed-in user"),
        None => info!("No user signed in; showing the queue only"),
    }

    let pipeline = QueuePipeline::new(
        clock,
        QueueFetcher::new(store.clone()).with_timeout(cfg.fetch_timeout()),
        Reaper::new(store.clone()).with_delete_timeout(cfg.fetch_timeout()),
    );
    let (poller, handle, mut events) =
        QueuePoller::new(pipeline, PollContext::new(category, user.clone()));
    let poller = poller.with_interval(cfg.poll_interval());

    // 5. Background tasks
    let (shutdown_tx, shutdown_rx) = shutdown_channel();

    let relay_handle = store
        .start_change_relay(cfg.change_relay_interval(), shutdown_rx.clone())
        .await
        .map_err(|e| anyhow::anyhow!("Change relay start failed: {}", e))?;

    let poller_handle = tokio::spawn(async move {
        if let Err(e) = poller.run(shutdown_rx).await {
            error!(error = ?e, "Queue poller failed");
        }
    });

    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            print!("{}", screen::render_event(&event));
        }
    });

    let positions = PositionWatcher::new(
        Arc::new(QueueFetcher::new(store.clone()).with_timeout(cfg.fetch_timeout())),
        store.clone(),
    );
    let mut subscription = user.as_ref().map(|u| {
        positions.subscribe(category, u.nickname.clone(), print_position)
    });

    info!("Watcher ready. Type a category name to switch, 'r' to refresh, 'q' to quit");

    // 6. Run until Ctrl+C or 'q'
    let mut current = category;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                info!("Shutdown signal received. Exiting gracefully...");
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    // stdin closed; keep watching until Ctrl+C
                    tokio::signal::ctrl_c().await?;
                    break;
                };
                match handle_input(line.trim(), current, &handle).await {
                    Ok(Input::Quit) => break,
                    Ok(Input::Switched(new_category)) => {
                        current = new_category;
                        if let Some(u) = &user {
                            subscription = Some(positions.subscribe(
                                new_category,
                                u.nickname.clone(),
                                print_position,
                            ));
                        }
                    }
                    Ok(Input::Handled) => {}
                    Err(e) => println!("{e}"),
                }
            }
        }
    }

    // 7. Graceful shutdown
    shutdown_tx.shutdown();
    drop(subscription);
    let _ = tokio::time::timeout(SHUTDOWN_GRACE, poller_handle).await;
    let _ = tokio::time::timeout(SHUTDOWN_GRACE, relay_handle).await;
    printer.abort();

    if cfg.sign_out_on_exit {
        if let Err(e) = auth.sign_out().await {
            warn!(error = %e, "Sign-out failed");
        }
    }

    info!("Shutdown complete.");
    Ok(())
}

enum Input {
    Quit,
    Switched(Category),
    Handled,
}

/// What a line typed on stdin asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Nothing,
    Quit,
    Refresh,
    Select(Category),
}

/// Selecting the category already being watched is a no-op
fn parse_input(line: &str, current: Category) -> Result<Command> {
    match line {
        "" => Ok(Command::Nothing),
        "q" | "quit" => Ok(Command::Quit),
        "r" | "refresh" => Ok(Command::Refresh),
        name => {
            let category = Category::from_str(name)
                .with_context(|| format!("Unknown input '{name}'; expected one of PCs, Consoles, Simuladores, VRs, r, q"))?;
            if category == current {
                Ok(Command::Nothing)
            } else {
                Ok(Command::Select(category))
            }
        }
    }
}

async fn handle_input(line: &str, current: Category, handle: &PollerHandle) -> Result<Input> {
    match parse_input(line, current)? {
        Command::Nothing => Ok(Input::Handled),
        Command::Quit => Ok(Input::Quit),
        Command::Refresh => {
            handle.refresh().await?;
            Ok(Input::Handled)
        }
        Command::Select(category) => {
            handle.select_category(category).await?;
            Ok(Input::Switched(category))
        }
    }
}

fn print_position(position: Option<usize>) {
    match position {
        Some(p) => println!("Your position: {p}"),
        None => println!("You are not in this line"),
    }
}
