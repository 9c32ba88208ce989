//! Persistence of the Matrix login between restarts.

use std::path::{Path, PathBuf};

use log::{debug, trace, warn};
use matrix_sdk::authentication::matrix::MatrixSession;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access the login file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize the login: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("no login to update")]
    NoLogin,
}

/// Content of the login file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedLogin {
    user_session: MatrixSession,
    /// Where the next sync resumes
    #[serde(skip_serializing_if = "Option::is_none")]
    sync_token: Option<String>,
}

/// Login file and SQLite store location of the bot account.
#[derive(Clone)]
pub struct LoginStore {
    /// Login found when the store was opened
    login: Option<PersistedLogin>,
    login_path: PathBuf,
    sqlite_path: PathBuf,
}

impl LoginStore {
    /// Opens the store in `dir_path`, creating the directory if needed.
    ///
    /// A missing or unreadable login file means the bot has to log in again.
    pub async fn open(dir_path: &str) -> Result<Self, StoreError> {
        fs::create_dir_all(dir_path).await?;

        let dir = Path::new(dir_path);
        let login_path = dir.join("login");
        let sqlite_path = dir.join("sqlite");

        let login = LoginStore::read(&login_path).await;
        debug!(
            "opened login store at {} (login found: {})",
            dir_path,
            login.is_some()
        );

        Ok(LoginStore {
            login,
            login_path,
            sqlite_path,
        })
    }

    async fn read(login_path: &Path) -> Option<PersistedLogin> {
        let data = fs::read_to_string(login_path).await.ok()?;
        match serde_json::from_str(&data) {
            Ok(login) => Some(login),
            Err(e) => {
                warn!(
                    "ignoring unreadable login file {}: {}",
                    login_path.display(),
                    e
                );
                None
            }
        }
    }

    pub fn sqlite_path(&self) -> &Path {
        &self.sqlite_path
    }

    pub fn user_session(&self) -> Option<&MatrixSession> {
        self.login.as_ref().map(|login| &login.user_session)
    }

    pub fn sync_token(&self) -> Option<&str> {
        self.login
            .as_ref()
            .and_then(|login| login.sync_token.as_deref())
    }

    /// Writes a fresh login, dropping any previous sync token.
    pub async fn save_user_session(&self, user_session: &MatrixSession) -> Result<(), StoreError> {
        trace!("saving user session");
        self.write(&PersistedLogin {
            user_session: user_session.clone(),
            sync_token: None,
        })
        .await
    }

    /// Updates the sync token of the login on disk.
    pub async fn save_sync_token(&self, sync_token: &str) -> Result<(), StoreError> {
        trace!("saving sync token {}", sync_token);
        let mut login = LoginStore::read(&self.login_path)
            .await
            .ok_or(StoreError::NoLogin)?;
        login.sync_token = Some(sync_token.to_owned());
        self.write(&login).await
    }

    async fn write(&self, login: &PersistedLogin) -> Result<(), StoreError> {
        let data = serde_json::to_string(login)?;
        fs::write(&self.login_path, data).await?;
        Ok(())
    }
}
