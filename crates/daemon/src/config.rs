// Watcher configuration: defaults overridden by ARCADE_QUEUE_* variables

use arcade_queue_core::application::constants::{
    DEFAULT_FETCH_TIMEOUT, DEFAULT_POLL_INTERVAL, DEFAULT_TIME_AUTHORITY_TIMEOUT,
    DEFAULT_TIME_AUTHORITY_URL,
};
use arcade_queue_core::domain::Category;
use anyhow::{Context, Result};
use config::{Config, Environment};
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_PREFIX: &str = "ARCADE_QUEUE";
const DEFAULT_DB_PATH: &str = "~/.arcade-queue/queue.db";
const DEFAULT_SESSION_PATH: &str = "~/.arcade-queue/session.json";
const DEFAULT_CHANGE_RELAY_MS: u64 = 500;

#[derive(Debug, Clone, Deserialize)]
pub struct WatcherConfig {
    pub db_path: String,
    pub category: String,
    pub session_path: String,
    pub poll_interval_secs: u64,
    pub fetch_timeout_secs: u64,
    pub time_authority_url: String,
    pub time_authority_timeout_secs: u64,
    /// How often the store's change log is tailed for position updates
    pub change_relay_ms: u64,
    /// Sign the local session out when the watcher exits
    pub sign_out_on_exit: bool,
}

impl WatcherConfig {
    /// Load from the process environment
    pub fn load() -> Result<Self> {
        Self::from_env(Environment::with_prefix(ENV_PREFIX))
    }

    pub fn from_env(env: Environment) -> Result<Self> {
        let settings = Config::builder()
            .set_default("db_path", DEFAULT_DB_PATH)?
            .set_default("category", Category::default().as_str())?
            .set_default("session_path", DEFAULT_SESSION_PATH)?
            .set_default("poll_interval_secs", DEFAULT_POLL_INTERVAL.as_secs())?
            .set_default("fetch_timeout_secs", DEFAULT_FETCH_TIMEOUT.as_secs())?
            .set_default("time_authority_url", DEFAULT_TIME_AUTHORITY_URL)?
            .set_default(
                "time_authority_timeout_secs",
                DEFAULT_TIME_AUTHORITY_TIMEOUT.as_secs(),
            )?
            .set_default("change_relay_ms", DEFAULT_CHANGE_RELAY_MS)?
            .set_default("sign_out_on_exit", false)?
            .add_source(env.try_parsing(true))
            .build()
            .context("failed to read configuration")?;

        let mut cfg: WatcherConfig = settings
            .try_deserialize()
            .context("invalid configuration")?;
        cfg.db_path = shellexpand::tilde(&cfg.db_path).into_owned();
        cfg.session_path = shellexpand::tilde(&cfg.session_path).into_owned();

        if cfg.poll_interval_secs == 0 {
            anyhow::bail!("poll_interval_secs must be greater than zero");
        }
        Ok(cfg)
    }

    pub fn category(&self) -> Result<Category> {
        Category::from_str(&self.category).context("invalid ARCADE_QUEUE_CATEGORY")
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn time_authority_timeout(&self) -> Duration {
        Duration::from_secs(self.time_authority_timeout_secs)
    }

    pub fn change_relay_interval(&self) -> Duration {
        Duration::from_millis(self.change_relay_ms)
    }
}
