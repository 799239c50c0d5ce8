// Queue Entry Domain Model

use crate::domain::{Category, WaitAllotment};
use serde::{Deserialize, Serialize};

/// Entry ID (assigned by the shared store)
pub type EntryId = String;

/// Epoch milliseconds
pub type EpochMillis = i64;

/// Raw queue document as persisted in the shared store
///
/// Field names follow the store's document layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueDocument {
    pub id: EntryId,
    pub category: String,
    /// `"HH:MM"`
    pub wait_time: String,
    /// Stamped by the store on creation (epoch ms)
    pub created_at: EpochMillis,
    pub login_nickname: String,
}

/// Document fields supplied by the enrollment flow (store fills id and created_at)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewQueueDocument {
    pub category: Category,
    pub wait_time: WaitAllotment,
    pub login_nickname: String,
}

/// One user's position in one category's queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub entry_id: EntryId,
    pub category: Category,
    pub display_name: String,
    pub wait_allotment: WaitAllotment,
    pub enqueued_at: EpochMillis,
}

impl QueueEntry {
    pub fn new(
        entry_id: impl Into<String>,
        category: Category,
        display_name: impl Into<String>,
        wait_allotment: WaitAllotment,
        enqueued_at: EpochMillis,
    ) -> Self {
        Self {
            entry_id: entry_id.into(),
            category,
            display_name: display_name.into(),
            wait_allotment,
            enqueued_at,
        }
    }

    /// Whether this entry belongs to the given login nickname
    pub fn is_owned_by(&self, nickname: &str) -> bool {
        self.display_name == nickname
    }
}

/// Entry annotated with its derived start time (never persisted)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectedEntry {
    pub entry: QueueEntry,
    pub projected_start: EpochMillis,
}

impl ProjectedEntry {
    /// When this entry's turn is over
    pub fn projected_end(&self) -> EpochMillis {
        self.projected_start
            .saturating_add(self.entry.wait_allotment.effective_millis())
    }

    pub fn entry_id(&self) -> &str {
        &self.entry.entry_id
    }
}
