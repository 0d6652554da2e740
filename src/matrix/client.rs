//! High-level Matrix client for the bot.
//!
//! Wraps the SDK client with the three operations the bot needs: run the
//! sync loop, send a message into a room, and send a threaded reply. All
//! sends go through this type, and only the outbound drain task calls it,
//! which keeps a single writer on the connection.

use log::{error, info};
use matrix_sdk::{
    Client,
    ruma::{
        EventId, RoomId, UserId,
        events::room::message::{
            AddMentions, ForwardThread, ReplyMetadata, RoomMessageEventContent,
        },
    },
};

use crate::matrix::{
    UserCredentials, login::setup_client, session::MatrixSession, sync::MatrixSync,
};

/// The bot's connection to the homeserver.
pub struct MatrixClient {
    matrix_sync: MatrixSync,
    client: Client,
}

impl MatrixClient {
    /// Creates and authenticates the client.
    ///
    /// Loads or creates the session under `session_path`, logs in or
    /// restores, and sets the bot's display name.
    ///
    /// # Errors
    ///
    /// Returns an error when the session directory is unusable or
    /// authentication fails; both abort bot startup.
    pub async fn new(
        credentials: &UserCredentials,
        session_path: &str,
    ) -> Result<Self, anyhow::Error> {
        let session = MatrixSession::new(session_path).await?;
        let client = setup_client(credentials, &session).await?;

        client.account().set_display_name(Some("Maki")).await?;

        let matrix_sync = MatrixSync::new(&client, &session);

        Ok(MatrixClient {
            matrix_sync,
            client,
        })
    }

    /// The bot's own user ID.
    pub fn user_id(&self) -> Option<String> {
        self.client.user_id().map(|user_id| user_id.to_string())
    }

    /// Runs the sync loop, forwarding each text message to `on_message` as
    /// `(body, room_id, sender_id, event_id)`.
    pub async fn sync<F>(&self, on_message: F) -> Result<(), anyhow::Error>
    where
        F: Fn(String, String, String, String) + Send + Sync + 'static + Clone,
    {
        match self.matrix_sync.sync(on_message).await {
            Ok(_) => info!("matrix sync ended"),
            Err(e) => error!("matrix sync ended with error: {e:?}"),
        }

        Ok(())
    }

    /// Sends a markdown message into a room.
    pub async fn send_message(&self, room_id: &str, body: &str) {
        let content = RoomMessageEventContent::text_markdown(body);
        self.send(room_id, content).await;
    }

    /// Sends a markdown reply to a specific message.
    pub async fn send_reply(&self, room_id: &str, sender_id: &str, event_id: &str, body: &str) {
        let (Ok(sender), Ok(event)) = (UserId::parse(sender_id), EventId::parse(event_id)) else {
            error!("invalid reply target {sender_id} / {event_id}");
            return;
        };

        let content = RoomMessageEventContent::text_markdown(body).make_reply_to(
            ReplyMetadata::new(&event, &sender, None),
            ForwardThread::No,
            AddMentions::No,
        );

        self.send(room_id, content).await;
    }

    async fn send(&self, room_id: &str, content: RoomMessageEventContent) {
        let Ok(room_id) = RoomId::parse(room_id) else {
            error!("invalid room id {room_id}");
            return;
        };

        if let Some(room) = self.client.get_room(&room_id)
            && let Err(e) = room.send(content).await
        {
            error!("failed to send message: {e:?}");
        }
    }
}
