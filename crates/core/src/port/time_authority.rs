// Trusted Time Authority Port
//
// A clock the local device cannot tamper with (e.g. an HTTP time API).

use crate::error::Result;
use async_trait::async_trait;

/// External network time authority
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TimeAuthority: Send + Sync {
    /// Current UTC time in epoch milliseconds
    ///
    /// Any transport error, non-2xx response or malformed payload is an error
    /// for this call only.
    async fn fetch_time(&self) -> Result<i64>;
}
