// Queue Poller - periodic pipeline driver
//
// Exactly one poller per client. Two triggers run the pipeline: the timer
// tick and a command (category change, user change, manual refresh). Every
// pass runs to completion before the next trigger is read, so passes never
// overlap.

mod shutdown;

pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use crate::application::constants::{
    COMMAND_CHANNEL_CAPACITY, DEFAULT_POLL_INTERVAL, EVENT_CHANNEL_CAPACITY,
};
use crate::application::pipeline::{CycleReport, PollContext, QueuePipeline};
use crate::application::trusted_time::TimeSource;
use crate::application::view::QueueView;
use crate::domain::{Category, ProjectedEntry};
use crate::error::{AppError, Result};
use crate::port::UserIdentity;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Control messages accepted by a running poller
#[derive(Debug, Clone)]
pub enum PollerCommand {
    SelectCategory(Category),
    SetUser(Option<UserIdentity>),
    Refresh,
}

/// What the poller publishes after each pass
#[derive(Debug, Clone)]
pub enum QueueEvent {
    /// Fresh view from a successful pass
    Updated {
        category: Category,
        view: QueueView,
        time_source: TimeSource,
        removed: usize,
    },
    /// The acting user's turn just arrived (edge-triggered)
    TurnArrived {
        category: Category,
        entry: ProjectedEntry,
    },
    /// Pass failed; carries the last good view for display with a freshness marker
    Stale {
        category: Category,
        last_view: Option<QueueView>,
        error: String,
    },
}

/// Cloneable handle for sending commands to a running poller
#[derive(Clone)]
pub struct PollerHandle {
    commands: mpsc::Sender<PollerCommand>,
}

impl PollerHandle {
    pub async fn select_category(&self, category: Category) -> Result<()> {
        self.send(PollerCommand::SelectCategory(category)).await
    }

    pub async fn set_user(&self, user: Option<UserIdentity>) -> Result<()> {
        self.send(PollerCommand::SetUser(user)).await
    }

    pub async fn refresh(&self) -> Result<()> {
        self.send(PollerCommand::Refresh).await
    }

    async fn send(&self, command: PollerCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| AppError::InvalidState("poller is not running".to_string()))
    }
}

enum Trigger {
    Tick,
    Command(PollerCommand),
    Shutdown,
}

/// Poller drives the pipeline for one client
pub struct QueuePoller {
    pipeline: QueuePipeline,
    ctx: PollContext,
    poll_interval: Duration,
    commands: mpsc::Receiver<PollerCommand>,
    events: mpsc::Sender<QueueEvent>,
}

impl QueuePoller {
    /// Create a poller plus its command handle and event stream
    pub fn new(
        pipeline: QueuePipeline,
        ctx: PollContext,
    ) -> (Self, PollerHandle, mpsc::Receiver<QueueEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let poller = Self {
            pipeline,
            ctx,
            poll_interval: DEFAULT_POLL_INTERVAL,
            commands: cmd_rx,
            events: event_tx,
        };
        (poller, PollerHandle { commands: cmd_tx }, event_rx)
    }

    pub fn with_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Run the polling loop until shutdown
    pub async fn run(mut self, mut shutdown: ShutdownToken) -> Result<()> {
        info!(
            category = %self.ctx.category(),
            interval_ms = self.poll_interval.as_millis() as u64,
            "Queue poller started"
        );

        let mut tick = interval(self.poll_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if shutdown.is_shutdown() {
                break;
            }

            let trigger = tokio::select! {
                _ = tick.tick() => Trigger::Tick,
                Some(command) = self.commands.recv() => Trigger::Command(command),
                _ = shutdown.wait() => Trigger::Shutdown,
            };

            match trigger {
                Trigger::Tick => {}
                Trigger::Command(command) => {
                    if !self.apply(command) {
                        continue;
                    }
                    // Event-driven pass; next timer pass a full interval later
                    tick.reset();
                }
                Trigger::Shutdown => break,
            }

            let outcome = tokio::select! {
                outcome = self.pipeline.run_cycle(&mut self.ctx) => Some(outcome),
                _ = shutdown.wait() => None,
            };

            match outcome {
                Some(outcome) => self.publish(outcome).await,
                None => {
                    info!("Queue poller interrupted during pass");
                    break;
                }
            }
        }

        info!(category = %self.ctx.category(), "Queue poller stopped");
        Ok(())
    }

    /// Apply a command; returns true when a pass should run now
    fn apply(&mut self, command: PollerCommand) -> bool {
        match command {
            PollerCommand::SelectCategory(category) => {
                let changed = self.ctx.select_category(category);
                if changed {
                    info!(category = %category, "Category changed");
                }
                changed
            }
            PollerCommand::SetUser(user) => {
                debug!(user = ?user.as_ref().map(|u| &u.nickname), "Acting user changed");
                self.ctx.set_user(user);
                true
            }
            PollerCommand::Refresh => true,
        }
    }

    async fn publish(&self, outcome: Result<CycleReport>) {
        let category = self.ctx.category();
        match outcome {
            Ok(report) => {
                if report.delete_failures > 0 {
                    debug!(failures = report.delete_failures, "Some reap deletes failed");
                }
                let own_entry = report.view.own_entry().cloned();
                self.emit(QueueEvent::Updated {
                    category,
                    view: report.view,
                    time_source: report.time_source,
                    removed: report.removed.len(),
                })
                .await;

                if report.turn_arrived {
                    if let Some(entry) = own_entry {
                        self.emit(QueueEvent::TurnArrived { category, entry }).await;
                    }
                }
            }
            Err(e) => {
                if e.is_user_visible() {
                    warn!(category = %category, error = %e, "Queue pass failed, keeping last view");
                } else {
                    error!(category = %category, error = %e, "Queue pass failed");
                }
                self.emit(QueueEvent::Stale {
                    category,
                    last_view: self.ctx.last_view().cloned(),
                    error: e.to_string(),
                })
                .await;
            }
        }
    }

    async fn emit(&self, event: QueueEvent) {
        if self.events.send(event).await.is_err() {
            debug!("Queue event receiver dropped");
        }
    }
}
