//! Matrix synchronization and event delivery.
//!
//! [`MatrixSync`] runs the client's sync loop: it catches up on events that
//! arrived while the bot was offline (invites in particular), auto-joins
//! rooms on invitation, and forwards every text message in a joined room to
//! the caller's message callback. The sync token is persisted after each
//! sync so a restart resumes instead of replaying history.

use std::sync::Arc;

use anyhow::Result;
use log::{error, info, warn};
use matrix_sdk::{
    Client, LoopCtrl, Room, RoomState,
    config::SyncSettings,
    ruma::{
        api::client::filter::FilterDefinition,
        events::room::{
            member::StrippedRoomMemberEvent,
            message::{MessageType, OriginalSyncRoomMessageEvent},
        },
    },
};
use tokio::time::{Duration, sleep};

use crate::matrix::session::MatrixSession;

/// Drives the sync loop and fans events out to the bot.
pub struct MatrixSync {
    client: Client,
    session: MatrixSession,
}

impl MatrixSync {
    /// Creates the sync driver; nothing runs until [`MatrixSync::sync`].
    pub fn new(client: &Client, session: &MatrixSession) -> Self {
        MatrixSync {
            client: client.to_owned(),
            session: session.to_owned(),
        }
    }

    /// Runs the sync loop until the process terminates.
    ///
    /// `on_message` is invoked for every text message in a joined room with
    /// `(body, room_id, sender_id, event_id)`. It must return quickly: slow
    /// work belongs on the dispatcher's worker pool, not in the callback.
    pub async fn sync<F>(&self, on_message: F) -> Result<()>
    where
        F: Fn(String, String, String, String) + Send + Sync + 'static + Clone,
    {
        info!("start syncing");

        // Join rooms we get invited to
        self.client.add_event_handler(auto_join);

        let filter = FilterDefinition::with_lazy_loading();
        let mut sync_settings = SyncSettings::default().filter(filter.into());
        if let Some(sync_token) = self.session.sync_token() {
            sync_settings = sync_settings.token(sync_token);
        }

        // One initial sync before attaching the message handler: it drains
        // the backlog (and pending invites) without treating old messages as
        // fresh commands
        let initial = loop {
            match self.client.sync_once(sync_settings.clone()).await {
                Ok(response) => break response,
                Err(e) => {
                    error!("initial sync failed: {e}");
                    sleep(Duration::from_secs(2)).await;
                }
            }
        };
        if let Err(e) = self.session.persist_sync_token(initial.next_batch.clone()).await {
            error!("failed to persist sync token: {e:?}");
        }
        sync_settings = sync_settings.token(initial.next_batch);

        let on_message = Arc::new(on_message);
        self.client.add_event_handler({
            let on_message = Arc::clone(&on_message);
            move |event: OriginalSyncRoomMessageEvent, room: Room| {
                let on_message = Arc::clone(&on_message);
                async move {
                    deliver_message(event, room, &on_message);
                }
            }
        });

        self.client
            .sync_with_result_callback(sync_settings, |sync_result| async move {
                let response = sync_result?;

                // Persist the token each time so a restart resumes here
                if let Err(e) = self.session.persist_sync_token(response.next_batch).await {
                    error!("failed to persist sync token: {e:?}");
                }

                Ok(LoopCtrl::Continue)
            })
            .await?;

        Ok(())
    }
}

/// Joins a room when the bot is invited.
///
/// Joining can race the homeserver delivering the invite, so failed joins
/// retry with backoff. See
/// <https://github.com/matrix-org/synapse/issues/4345>.
async fn auto_join(room_member: StrippedRoomMemberEvent, client: Client, room: Room) {
    let Some(user_id) = client.user_id() else {
        warn!("could not get own user id from client");
        return;
    };

    // Invites for other users are none of our business
    if room_member.state_key != user_id {
        return;
    }

    tokio::spawn(async move {
        info!("auto joining room {}", room.room_id());
        let mut delay = 2;

        while let Err(e) = room.join().await {
            error!(
                "failed to join room {} ({e:?}), retrying in {delay}s",
                room.room_id()
            );

            sleep(Duration::from_secs(delay)).await;
            delay *= 2;

            if delay > 3600 {
                error!("giving up joining room {}", room.room_id());
                return;
            }
        }
        info!("joined room {}", room.room_id());
    });
}

/// Forwards a text message in a joined room to the bot's callback.
fn deliver_message<F>(event: OriginalSyncRoomMessageEvent, room: Room, on_message: &Arc<F>)
where
    F: Fn(String, String, String, String) + Send + Sync + 'static,
{
    if room.state() != RoomState::Joined {
        return;
    }

    // Images, files and the like are not commands
    let MessageType::Text(text_content) = event.content.msgtype else {
        return;
    };

    on_message(
        text_content.body,
        room.room_id().to_string(),
        event.sender.to_string(),
        event.event_id.to_string(),
    );
}
