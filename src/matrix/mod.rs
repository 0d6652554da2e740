//! Matrix protocol integration.
//!
//! This module is the bot's connection shell: everything that talks to the
//! homeserver lives here, behind [`MatrixClient`]. The command core never
//! touches Matrix types; it consumes plain `(body, room, sender, event)`
//! strings from the sync callback and hands plain outgoing messages back.
//!
//! - **Login**: password login on first run, session restore afterwards
//! - **Sync**: real-time event delivery with sync-token persistence and
//!   auto-join on invites
//! - **Sending**: markdown messages and threaded replies

mod client;
mod login;
mod session;
mod sync;

pub use crate::matrix::client::MatrixClient;

/// Credentials of the bot's Matrix account
#[derive(Debug, Clone)]
pub struct UserCredentials {
    /// Fully qualified user ID, e.g. `@maki:example.org`
    pub user_id: String,
    /// Account password, used only when no session is persisted
    pub password: String,
}
