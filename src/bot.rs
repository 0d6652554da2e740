//! Bot wiring: connection, router, registry and dispatcher.
//!
//! The [`Bot`] assembles the pieces and runs them: the Matrix client feeds
//! inbound messages to the [`Router`], routed invocations go to the
//! [`Dispatcher`], and everything any handler wants to send comes back over
//! one outbound channel that a single drain task writes to the connection.
//!
//! # Runtime shape
//!
//! ```text
//!        sync loop (event loop)          outbound drain task
//!   message ──→ route ──→ dispatch        recv ──→ send to room
//!                     │                      ▲
//!                     ▼                      │
//!            blocking worker pool ───────────┘
//!               (command handlers)
//! ```
//!
//! The sync loop never waits on a handler, and nothing but the drain task
//! talks to the connection's send side.

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use tokio::sync::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::{
    Args,
    commands::{
        CommandRegistry, Dispatcher, EnabledStore, IncomingMessage, OutgoingMessage, RouteError,
        Router, catalog,
    },
    config::Config,
    matrix::{MatrixClient, UserCredentials},
    utils::get_path,
};

/// The assembled bot.
///
/// Created with [`Bot::new`], which authenticates against the homeserver and
/// bootstraps the command registry; [`Bot::start`] then runs until the
/// process terminates.
pub struct Bot {
    /// Connection to the homeserver
    matrix_client: Arc<MatrixClient>,
    /// Recognizes command invocations in message text
    router: Arc<Router>,
    /// Runs invocations off the event loop
    dispatcher: Dispatcher,
    /// Receiving half of the outbound channel, drained in [`Bot::start`]
    outbound_rx: UnboundedReceiver<OutgoingMessage>,
    /// The bot's own user ID, used to ignore its own messages
    user_id: String,
}

impl Bot {
    /// Creates the bot: connects to Matrix, bootstraps the registry from the
    /// enabled-command file and wires the dispatcher.
    ///
    /// # Errors
    ///
    /// Fails when Matrix authentication fails or the enabled-command file
    /// exists but cannot be read; both abort startup.
    pub async fn new(config: Config, args: Args) -> Result<Self, anyhow::Error> {
        let matrix_client = Arc::new(
            MatrixClient::new(
                &UserCredentials {
                    user_id: config.matrix.user_id.clone(),
                    password: config.matrix.password.clone(),
                },
                &get_path(&args.data, "session"),
            )
            .await?,
        );

        let user_id = matrix_client
            .user_id()
            .unwrap_or_else(|| config.matrix.user_id.clone());

        let mut registry = CommandRegistry::new(catalog::builtin());
        let store = EnabledStore::new(get_path(&args.data, "commands.json"));
        registry.bootstrap(&store).await?;
        let registry = Arc::new(Mutex::new(registry));

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::new(
            Arc::clone(&registry),
            outbound_tx,
            config.bot.worker_threads,
            Duration::from_secs(config.bot.handler_timeout_secs),
            config.bot.reply_on_unknown,
        );

        let router = Arc::new(Router::new(config.bot.prefix, &user_id));

        Ok(Bot {
            matrix_client,
            router,
            dispatcher,
            outbound_rx,
            user_id,
        })
    }

    /// Runs the bot until the process terminates.
    ///
    /// Starts the outbound drain task, then enters the Matrix sync loop.
    /// Inbound messages are routed and dispatched without blocking the loop.
    pub async fn start(self) -> Result<(), anyhow::Error> {
        let Bot {
            matrix_client,
            router,
            dispatcher,
            mut outbound_rx,
            user_id,
        } = self;

        // Single writer to the connection: every reply and direct send from
        // any worker funnels through here
        let sender_client = Arc::clone(&matrix_client);
        tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                match &message.reply_to {
                    Some(reply_to) => {
                        sender_client
                            .send_reply(
                                &message.room_id,
                                &reply_to.sender_id,
                                &reply_to.event_id,
                                &message.body,
                            )
                            .await;
                    }
                    None => {
                        sender_client
                            .send_message(&message.room_id, &message.body)
                            .await;
                    }
                }
            }
        });

        info!("ready");

        let on_message = move |body: String, room_id: String, sender_id: String, event_id: String| {
            // Never react to our own messages
            if sender_id == user_id {
                return;
            }

            match router.route(&body) {
                Ok(invocation) => {
                    info!("{sender_id}: {body}");
                    let message = IncomingMessage {
                        body,
                        room_id,
                        sender_id,
                        event_id,
                    };
                    dispatcher.dispatch(invocation, message);
                }
                // Not addressed to the bot at all
                Err(RouteError::NotACommand) => {}
                Err(RouteError::EmptyInvocation) => {
                    warn!("invalid command from {sender_id}: {body:?}");
                }
            }
        };

        matrix_client.sync(on_message).await
    }
}
