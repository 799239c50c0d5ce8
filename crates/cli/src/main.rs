//! Arcade Queue CLI - join, leave and inspect category queues

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tabled::{Table, Tabled};

use arcade_queue_core::application::constants::{
    DEFAULT_FETCH_TIMEOUT, DEFAULT_TIME_AUTHORITY_TIMEOUT, DEFAULT_TIME_AUTHORITY_URL,
};
use arcade_queue_core::application::{
    format_start, format_wait, plan_cycle, JoinRequest, PollContext, QueueFetcher, QueueService,
    QueueView, TrustedTimeProvider,
};
use arcade_queue_core::domain::Category;
use arcade_queue_core::port::id_provider::UuidProvider;
use arcade_queue_core::port::time_provider::SystemTimeProvider;
use arcade_queue_core::port::{AuthService, QueueStore};
use arcade_queue_infra_sqlite::{create_pool, database_url, run_migrations, SqliteQueueStore};
use arcade_queue_infra_system::{LocalSessionAuth, WorldTimeAuthority};

const DEFAULT_DB_PATH: &str = "~/.arcade-queue/queue.db";
const DEFAULT_SESSION_PATH: &str = "~/.arcade-queue/session.json";

#[derive(Parser)]
#[command(name = "arcade-queue")]
#[command(about = "Arcade queue CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Queue database path
    #[arg(long, env = "ARCADE_QUEUE_DB_PATH", default_value = DEFAULT_DB_PATH)]
    db_path: String,

    /// Session file of the signed-in user
    #[arg(long, env = "ARCADE_QUEUE_SESSION_PATH", default_value = DEFAULT_SESSION_PATH)]
    session_path: String,

    /// Time authority endpoint
    #[arg(long, env = "ARCADE_QUEUE_TIME_AUTHORITY_URL", default_value = DEFAULT_TIME_AUTHORITY_URL)]
    time_authority_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with a nickname
    Login {
        nickname: String,
    },

    /// Sign out
    Logout,

    /// Join a category's queue
    Join {
        /// PCs, Consoles, Simuladores or VRs
        category: String,

        /// Playing time as HH:MM
        #[arg(short, long)]
        wait_time: String,
    },

    /// Leave a category's queue
    Leave {
        category: String,
    },

    /// Show a queue with projected start times
    List {
        category: String,

        /// Print the view as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show every category with its queue length
    Categories,
}

#[derive(Tabled)]
struct EntryRow {
    #[tabled(rename = "#")]
    position: usize,
    player: String,
    start: String,
    time: String,
}

#[derive(Debug, Tabled)]
struct CategoryRow {
    category: String,
    #[tabled(rename = "in line")]
    in_line: usize,
}

struct App {
    store: Arc<SqliteQueueStore>,
    auth: Arc<LocalSessionAuth>,
    time_authority_url: String,
}

impl App {
    async fn open(cli: &Cli) -> Result<Self> {
        let db_path = shellexpand::tilde(&cli.db_path).into_owned();
        let session_path = shellexpand::tilde(&cli.session_path).into_owned();

        let pool = create_pool(&database_url(&db_path))
            .await
            .map_err(|e| anyhow::anyhow!("Failed to open {}: {}", db_path, e))?;
        run_migrations(&pool)
            .await
            .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;

        let id_provider = Arc::new(UuidProvider);
        Ok(Self {
            store: Arc::new(SqliteQueueStore::new(
                pool,
                Arc::new(SystemTimeProvider),
                id_provider.clone(),
            )),
            auth: Arc::new(LocalSessionAuth::new(session_path, id_provider)),
            time_authority_url: cli.time_authority_url.clone(),
        })
    }

    fn service(&self) -> QueueService {
        QueueService::new(self.store.clone(), self.auth.clone())
    }

    /// Read-only projection of a queue as of trusted now
    async fn view(&self, category: Category) -> Result<QueueView> {
        let authority = WorldTimeAuthority::new(
            self.time_authority_url.clone(),
            DEFAULT_TIME_AUTHORITY_TIMEOUT,
        )?;
        let clock = TrustedTimeProvider::new(Arc::new(authority), Arc::new(SystemTimeProvider));
        let now = clock.now().await;
        if !now.is_trusted() {
            eprintln!("{}", "Time authority unreachable, using local clock".yellow());
        }

        let entries = QueueFetcher::new(self.store.clone()).fetch(category).await?;
        let user = self.auth.current_user().await?;
        let ctx = PollContext::new(category, user);
        let plan = plan_cycle(entries, &ctx, now.millis);
        Ok(QueueView::derive(plan.outcome.retained, ctx.nickname(), now.millis))
    }
}

fn parse_category(name: &str) -> Result<Category> {
    Category::from_str(name).with_context(|| {
        format!(
            "Unknown category '{}' (expected one of {})",
            name,
            Category::ALL.map(|c| c.as_str()).join(", ")
        )
    })
}

fn entry_rows(view: &QueueView) -> Vec<EntryRow> {
    view.entries
        .iter()
        .enumerate()
        .map(|(i, projected)| EntryRow {
            position: i + 1,
            player: projected.entry.display_name.clone(),
            start: format_start(Some(projected.projected_start)),
            time: projected.entry.wait_allotment.to_string(),
        })
        .collect()
}

/// Line length per category, each query bounded by `timeout`
async fn category_rows(store: &dyn QueueStore, timeout: Duration) -> Result<Vec<CategoryRow>> {
    let mut rows = Vec::new();
    for category in Category::ALL {
        let docs = tokio::time::timeout(timeout, store.query_by_category(category))
            .await
            .with_context(|| format!("{category} query timed out after {timeout:?}"))??;
        rows.push(CategoryRow {
            category: category.to_string(),
            in_line: docs.len(),
        });
    }
    Ok(rows)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let app = App::open(&cli).await?;

    match cli.command {
        Commands::Login { nickname } => {
            let user = app.auth.login(&nickname).await?;
            println!("{}", format!("✓ Signed in as {}", user.nickname).green().bold());
        }

        Commands::Logout => {
            app.auth.sign_out().await?;
            println!("{}", "✓ Signed out".green().bold());
        }

        Commands::Join {
            category,
            wait_time,
        } => {
            let doc = app
                .service()
                .join(JoinRequest {
                    category,
                    wait_time,
                })
                .await?;
            println!(
                "{}",
                format!("✓ Joined {} for {}", doc.category, doc.wait_time)
                    .green()
                    .bold()
            );
        }

        Commands::Leave { category } => {
            let category = parse_category(&category)?;
            app.service().leave(category).await?;
            println!("{}", format!("✓ Left the {} line", category).green().bold());
        }

        Commands::List { category, json } => {
            let category = parse_category(&category)?;
            let view = app.view(category).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
                return Ok(());
            }

            println!("{}", format!("{} queue", category).cyan().bold());
            if view.is_empty() {
                println!("{}", "Nobody in line".yellow());
                return Ok(());
            }
            println!("{}", Table::new(entry_rows(&view)));

            match view.position {
                Some(_) if view.is_users_turn => {
                    println!("{}", "It's your turn!".green().bold());
                }
                Some(position) => {
                    println!("  {} {}", "Position:".bold(), position);
                    println!("  {} {}", "People ahead:".bold(), view.people_ahead);
                    println!(
                        "  {} {}",
                        "Estimated wait:".bold(),
                        format_wait(view.total_wait_minutes)
                    );
                }
                None => {}
            }
        }

        Commands::Categories => {
            let rows = category_rows(app.store.as_ref(), DEFAULT_FETCH_TIMEOUT).await?;
            println!("{}", Table::new(rows));
        }
    }

    Ok(())
}
