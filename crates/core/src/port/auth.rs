// Authentication Service Port
//
// Consumed only to resolve which queue entry belongs to the acting user.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Stable identifier from the authentication service
    pub user_id: String,
    /// Login nickname (the owner field carried by queue documents)
    pub nickname: String,
}

impl UserIdentity {
    pub fn new(user_id: impl Into<String>, nickname: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            nickname: nickname.into(),
        }
    }
}

#[async_trait]
pub trait AuthService: Send + Sync {
    /// Currently signed-in user, if any
    async fn current_user(&self) -> Result<Option<UserIdentity>>;

    async fn sign_out(&self) -> Result<()>;
}

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// In-memory session
    pub struct StaticAuth {
        user: Mutex<Option<UserIdentity>>,
    }

    impl StaticAuth {
        pub fn signed_in(user: UserIdentity) -> Self {
            Self {
                user: Mutex::new(Some(user)),
            }
        }

        pub fn anonymous() -> Self {
            Self {
                user: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl AuthService for StaticAuth {
        async fn current_user(&self) -> Result<Option<UserIdentity>> {
            Ok(self.user.lock().unwrap().clone())
        }

        async fn sign_out(&self) -> Result<()> {
            *self.user.lock().unwrap() = None;
            Ok(())
        }
    }
}
