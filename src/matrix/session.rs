//! Matrix session persistence.
//!
//! The authenticated session and the latest sync token are kept in a JSON
//! file next to the SDK's SQLite store, so a restarted bot resumes where it
//! left off instead of logging in and re-syncing from scratch.

use std::io::ErrorKind;
use std::path::PathBuf;

use log::{debug, trace};
use matrix_sdk::authentication::matrix;
use serde::{Deserialize, Serialize};
use tokio::fs;

/// On-disk session data.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedSession {
    /// The authenticated Matrix user session
    user_session: matrix::MatrixSession,

    /// Latest sync token, absent until the first sync completes.
    #[serde(skip_serializing_if = "Option::is_none")]
    sync_token: Option<String>,
}

/// Loads and stores the bot's session state under one directory.
///
/// The directory contains two entries: `session`, the JSON file managed
/// here, and `sqlite`, the SDK's state store.
#[derive(Clone)]
pub struct MatrixSession {
    /// Session loaded at startup, if one was persisted
    session: Option<PersistedSession>,
    /// Path of the SDK's SQLite store
    sqlite_path: String,
    /// Path of the session JSON file
    session_path: String,
}

impl MatrixSession {
    /// Opens the session directory and loads a persisted session if present.
    pub async fn new(dir_path: &str) -> Result<MatrixSession, anyhow::Error> {
        debug!("opening session directory {dir_path}");
        fs::create_dir_all(dir_path).await?;

        let sqlite_path = join(dir_path, "sqlite");
        let session_path = join(dir_path, "session");

        let session = read_session(&session_path).await?;
        debug!("persisted session found: {}", session.is_some());

        Ok(MatrixSession {
            session,
            sqlite_path,
            session_path,
        })
    }

    /// Whether a persisted session was loaded at startup.
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Path of the SDK's SQLite store.
    pub fn sqlite_path(&self) -> &str {
        &self.sqlite_path
    }

    /// The persisted user session, if any.
    pub fn user_session(&self) -> Option<&matrix::MatrixSession> {
        self.session.as_ref().map(|session| &session.user_session)
    }

    /// The persisted sync token, if any.
    pub fn sync_token(&self) -> Option<String> {
        self.session.as_ref().and_then(|session| session.sync_token.clone())
    }

    /// Writes a fresh user session to disk, without a sync token.
    pub async fn persist_user_session(
        &self,
        user_session: &matrix::MatrixSession,
    ) -> Result<(), anyhow::Error> {
        trace!("persisting user session");

        let session = PersistedSession {
            user_session: user_session.clone(),
            sync_token: None,
        };
        fs::write(&self.session_path, serde_json::to_string(&session)?).await?;

        Ok(())
    }

    /// Updates the persisted sync token, keeping the user session intact.
    pub async fn persist_sync_token(&self, sync_token: String) -> Result<(), anyhow::Error> {
        trace!("persisting sync token {sync_token}");

        let serialized = fs::read_to_string(&self.session_path).await?;
        let mut session: PersistedSession = serde_json::from_str(&serialized)?;
        session.sync_token = Some(sync_token);
        fs::write(&self.session_path, serde_json::to_string(&session)?).await?;

        Ok(())
    }
}

fn join(dir_path: &str, entry: &str) -> String {
    let path: PathBuf = [dir_path, entry].iter().collect();
    path.to_str().unwrap_or(dir_path).to_owned()
}

/// Reads the persisted session, treating a missing file as "no session".
async fn read_session(
    session_path: &str,
) -> Result<Option<PersistedSession>, anyhow::Error> {
    let serialized = match fs::read_to_string(session_path).await {
        Ok(serialized) => serialized,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    Ok(Some(serde_json::from_str(&serialized)?))
}
