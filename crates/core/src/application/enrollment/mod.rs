// Enrollment Service - joining and leaving a category's queue

pub mod join;
mod join_test;

pub use join::JoinRequest;

use crate::domain::{Category, EntryId, QueueDocument};
use crate::error::{AppError, Result};
use crate::port::{AuthService, QueueStore, UserIdentity};
use std::sync::Arc;
use tracing::info;

pub struct QueueService {
    store: Arc<dyn QueueStore>,
    auth: Arc<dyn AuthService>,
}

impl QueueService {
    pub fn new(store: Arc<dyn QueueStore>, auth: Arc<dyn AuthService>) -> Self {
        Self { store, auth }
    }

    /// Join a queue as the signed-in user
    pub async fn join(&self, req: JoinRequest) -> Result<QueueDocument> {
        let user = self.require_user().await?;
        let doc = join::execute(self.store.as_ref(), &user, req).await?;
        info!(
            entry_id = %doc.id,
            category = %doc.category,
            nickname = %doc.login_nickname,
            wait_time = %doc.wait_time,
            "Joined queue"
        );
        Ok(doc)
    }

    /// Leave a queue explicitly (the non-reaper way an entry disappears)
    pub async fn leave(&self, category: Category) -> Result<EntryId> {
        let user = self.require_user().await?;
        let docs = self.store.query_by_category(category).await?;
        let doc = docs
            .into_iter()
            .find(|d| d.login_nickname == user.nickname)
            .ok_or_else(|| {
                AppError::NotFound(format!("{} is not queued for {}", user.nickname, category))
            })?;

        if !self.store.delete(&doc.id).await? {
            // Reaped or removed concurrently; the outcome is the same
            info!(entry_id = %doc.id, "Entry was already gone");
        }
        info!(entry_id = %doc.id, category = %category, nickname = %user.nickname, "Left queue");
        Ok(doc.id)
    }

    async fn require_user(&self) -> Result<UserIdentity> {
        self.auth
            .current_user()
            .await?
            .ok_or_else(|| AppError::InvalidState("no user is signed in".to_string()))
    }
}
