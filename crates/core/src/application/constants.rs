// Engine constants (no magic values)
use std::time::Duration;

/// Polling interval between pipeline passes (10s)
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Bound on a single store query (5s); expiry is a fetch failure
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Bound on a single time authority call (3s); expiry falls back to the local clock
pub const DEFAULT_TIME_AUTHORITY_TIMEOUT: Duration = Duration::from_secs(3);

/// Time authority endpoint (fixed venue timezone)
pub const DEFAULT_TIME_AUTHORITY_URL: &str =
    "http://worldtimeapi.org/api/timezone/America/Sao_Paulo";

/// Venue timezone offset used for display (America/Sao_Paulo, UTC-3)
pub const VENUE_UTC_OFFSET_SECS: i32 = -3 * 3600;

/// Capacity of the poller's command channel
pub const COMMAND_CHANNEL_CAPACITY: usize = 16;

/// Capacity of the poller's event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Capacity of store change feeds
pub const CHANGE_FEED_CAPACITY: usize = 256;
