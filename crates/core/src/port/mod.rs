// Port Layer - Interfaces for external dependencies

pub mod auth;
pub mod id_provider; // For deterministic testing
pub mod queue_store;
pub mod time_authority;
pub mod time_provider;

// Re-exports
pub use auth::{AuthService, UserIdentity};
pub use id_provider::IdProvider;
pub use queue_store::{ChangeKind, QueueChange, QueueChangeFeed, QueueStore};
pub use time_authority::TimeAuthority;
pub use time_provider::TimeProvider;
