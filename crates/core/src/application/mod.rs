// Application Layer - Use Cases and Business Logic

pub mod constants;
pub mod enrollment;
pub mod fetcher;
pub mod format;
pub mod pipeline;
pub mod poller;
pub mod position;
pub mod projection;
pub mod reaper;
pub mod trusted_time;
pub mod view;

// Re-exports
pub use enrollment::{JoinRequest, QueueService};
pub use fetcher::QueueFetcher;
pub use format::{format_start, format_wait};
pub use pipeline::{plan_cycle, CyclePlan, CycleReport, PollContext, QueuePipeline};
pub use poller::{
    shutdown_channel, PollerCommand, PollerHandle, QueueEvent, QueuePoller, ShutdownSender,
    ShutdownToken,
};
pub use position::{PositionSubscription, PositionWatcher};
pub use projection::project;
pub use reaper::{ReapOutcome, ReapReport, Reaper};
pub use trusted_time::{TimeSource, TrustedInstant, TrustedTimeProvider};
pub use view::QueueView;
