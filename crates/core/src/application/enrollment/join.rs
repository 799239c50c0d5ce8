// Join Use Case

use crate::domain::{Category, NewQueueDocument, QueueDocument, WaitAllotment};
use crate::error::{AppError, Result};
use crate::port::{QueueStore, UserIdentity};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Join request as submitted by the enrollment form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRequest {
    pub category: String,
    /// `"HH:MM"`
    pub wait_time: String,
}

/// Validate a join request
pub fn validate_request(req: &JoinRequest) -> Result<(Category, WaitAllotment)> {
    let category = Category::from_str(&req.category)?;
    let wait_time = WaitAllotment::parse(&req.wait_time)?;

    if wait_time.minutes() <= 0 {
        return Err(AppError::Validation(format!(
            "wait time must be positive, got {}",
            req.wait_time
        )));
    }

    Ok((category, wait_time))
}

/// Execute join use case
///
/// One entry per nickname per category. The duplicate check and the insert
/// are not atomic; the store offers no transactions.
pub async fn execute(
    store: &dyn QueueStore,
    user: &UserIdentity,
    req: JoinRequest,
) -> Result<QueueDocument> {
    let (category, wait_time) = validate_request(&req)?;

    let existing = store.query_by_category(category).await?;
    if existing.iter().any(|d| d.login_nickname == user.nickname) {
        return Err(AppError::Conflict(format!(
            "{} is already queued for {}",
            user.nickname, category
        )));
    }

    store
        .insert(NewQueueDocument {
            category,
            wait_time,
            login_nickname: user.nickname.clone(),
        })
        .await
}
