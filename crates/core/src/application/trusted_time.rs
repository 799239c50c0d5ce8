// Trusted-Time Provider
//
// Prefers the external time authority so a user cannot move up the queue by
// changing the device clock. Falls back to the local clock on any failure;
// that cycle loses the anti-cheat property but stays available.

use crate::application::constants::DEFAULT_TIME_AUTHORITY_TIMEOUT;
use crate::domain::EpochMillis;
use crate::error::AppError;
use crate::port::{TimeAuthority, TimeProvider};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Where a time reading came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSource {
    Authority,
    LocalFallback,
}

/// A clock reading with its provenance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrustedInstant {
    pub millis: EpochMillis,
    pub source: TimeSource,
}

impl TrustedInstant {
    pub fn is_trusted(&self) -> bool {
        self.source == TimeSource::Authority
    }
}

pub struct TrustedTimeProvider {
    authority: Arc<dyn TimeAuthority>,
    fallback: Arc<dyn TimeProvider>,
    timeout: Duration,
}

impl TrustedTimeProvider {
    pub fn new(authority: Arc<dyn TimeAuthority>, fallback: Arc<dyn TimeProvider>) -> Self {
        Self {
            authority,
            fallback,
            timeout: DEFAULT_TIME_AUTHORITY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Current time. Never fails: degrades to the local clock instead.
    pub async fn now(&self) -> TrustedInstant {
        let outcome = match tokio::time::timeout(self.timeout, self.authority.fetch_time()).await {
            Ok(result) => result,
            Err(_) => Err(AppError::TimeSourceUnavailable(format!(
                "time authority timed out after {:?}",
                self.timeout
            ))),
        };

        match outcome {
            Ok(millis) => {
                debug!(millis, "Trusted time from authority");
                TrustedInstant {
                    millis,
                    source: TimeSource::Authority,
                }
            }
            Err(e) => {
                let millis = self.fallback.now_millis();
                warn!(error = %e, millis, "Time authority unavailable, falling back to local clock");
                TrustedInstant {
                    millis,
                    source: TimeSource::LocalFallback,
                }
            }
        }
    }
}
