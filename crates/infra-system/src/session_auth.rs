// Local session file as the authentication service
//
// The session file holds the signed-in identity as JSON. No file means
// nobody is signed in.

use arcade_queue_core::error::{AppError, Result};
use arcade_queue_core::port::{AuthService, IdProvider, UserIdentity};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionFile {
    user_id: String,
    login_nickname: String,
}

pub struct LocalSessionAuth {
    path: PathBuf,
    id_provider: Arc<dyn IdProvider>,
}

impl LocalSessionAuth {
    pub fn new(path: impl Into<PathBuf>, id_provider: Arc<dyn IdProvider>) -> Self {
        Self {
            path: path.into(),
            id_provider,
        }
    }

    /// Sign in as `nickname`, replacing any existing session
    pub async fn login(&self, nickname: &str) -> Result<UserIdentity> {
        let nickname = nickname.trim();
        if nickname.is_empty() {
            return Err(AppError::Validation("nickname cannot be empty".to_string()));
        }

        let session = SessionFile {
            user_id: self.id_provider.generate_id(),
            login_nickname: nickname.to_string(),
        };
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, serde_json::to_vec_pretty(&session)?).await?;

        info!(nickname, path = %self.path.display(), "Signed in");
        Ok(UserIdentity::new(session.user_id, session.login_nickname))
    }
}

#[async_trait]
impl AuthService for LocalSessionAuth {
    async fn current_user(&self) -> Result<Option<UserIdentity>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let session: SessionFile = serde_json::from_slice(&bytes)?;
        Ok(Some(UserIdentity::new(session.user_id, session.login_nickname)))
    }

    async fn sign_out(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                info!(path = %self.path.display(), "Signed out");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
