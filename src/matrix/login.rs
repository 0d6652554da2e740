//! Matrix client creation: login or session restore.
//!
//! On first run the bot logs in with its password and persists the resulting
//! session; on later runs it restores that session and skips the login round
//! trip entirely.

use log::{debug, info};
use matrix_sdk::{Client, ruma::OwnedUserId};

use crate::matrix::{UserCredentials, session::MatrixSession};

/// Creates an authenticated Matrix client.
///
/// Restores the persisted session when one exists, otherwise performs a
/// fresh password login and persists the new session for next time.
pub async fn setup_client(
    credentials: &UserCredentials,
    session: &MatrixSession,
) -> Result<Client, anyhow::Error> {
    info!("setting up matrix client for {}", credentials.user_id);

    if session.has_session() {
        restore(credentials, session).await
    } else {
        login(credentials, session).await
    }
}

/// Logs in with the account password and persists the session.
async fn login(
    credentials: &UserCredentials,
    session: &MatrixSession,
) -> Result<Client, anyhow::Error> {
    let user_id: OwnedUserId = credentials.user_id.clone().try_into()?;
    let client = build_client(&user_id, session).await?;

    client
        .matrix_auth()
        .login_username(user_id, &credentials.password)
        .initial_device_display_name("maki bot")
        .send()
        .await?;
    debug!("logged in");

    let Some(user_session) = client.matrix_auth().session() else {
        return Err(anyhow::anyhow!("no session available after login"));
    };
    session.persist_user_session(&user_session).await?;

    info!("matrix login complete, session persisted");
    Ok(client)
}

/// Restores the persisted session.
async fn restore(
    credentials: &UserCredentials,
    session: &MatrixSession,
) -> Result<Client, anyhow::Error> {
    info!("restoring matrix session from disk");

    let user_id: OwnedUserId = credentials.user_id.clone().try_into()?;
    let client = build_client(&user_id, session).await?;

    let Some(user_session) = session.user_session() else {
        return Err(anyhow::anyhow!("persisted session file has no user session"));
    };
    client.restore_session(user_session.clone()).await?;

    info!("matrix session restored");
    Ok(client)
}

async fn build_client(
    user_id: &OwnedUserId,
    session: &MatrixSession,
) -> Result<Client, anyhow::Error> {
    let client = Client::builder()
        .server_name(user_id.server_name())
        .sqlite_store(session.sqlite_path(), None)
        .build()
        .await?;
    debug!("matrix client built");

    Ok(client)
}
