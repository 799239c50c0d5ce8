// Domain Layer - Pure business logic and entities

pub mod allotment;
pub mod category;
pub mod entry;
pub mod error;

// Re-exports
pub use allotment::{WaitAllotment, MAX_WAIT_MINUTES, MILLIS_PER_MINUTE};
pub use category::Category;
pub use entry::{EntryId, EpochMillis, NewQueueDocument, ProjectedEntry, QueueDocument, QueueEntry};
pub use error::DomainError;
