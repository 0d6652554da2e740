//! Command routing, registration and dispatch.
//!
//! This module is the core of the bot: it turns raw chat messages into typed
//! command invocations and runs them without blocking the connection.
//!
//! # Architecture
//!
//! ```text
//! Inbound message
//!      │
//!      ▼
//! ┌──────────┐  prefix / mention strip,     ┌────────────────┐
//! │  Router  │  whitespace tokenization  →  │   Invocation   │
//! └──────────┘                              └────────────────┘
//!      │
//!      ▼
//! ┌────────────┐  name lookup   ┌───────────────────┐
//! │ Dispatcher │ ─────────────→ │  CommandRegistry  │
//! └────────────┘                └───────────────────┘
//!      │  argument parse (ArgSpec), then
//!      │  handler run on the blocking worker pool
//!      ▼
//! ┌────────────────┐  non-empty return value
//! │ CommandModule  │ ───────────────────────→ outbound channel
//! └────────────────┘
//! ```
//!
//! # The command contract
//!
//! A command module implements [`CommandModule`]: an argument-spec builder
//! and an execution handler. The registry only binds modules whose spec
//! passes structural validation; everything else is rejected at load time
//! with a per-name failure.
//!
//! Handlers run on a bounded blocking worker pool, so they are free to do
//! blocking work. A handler can reply in two ways, not mutually exclusive:
//! return `Some(text)` to have the dispatcher reply into the originating
//! room, or push messages into [`CommandContext::outbound`] directly.
//!
//! # Module organization
//!
//! - [`router`] - prefix/mention recognition and tokenization
//! - [`registry`] - name → descriptor map with load/unload/reload
//! - [`arguments`] - declarative argument specs and token conversion
//! - [`dispatcher`] - off-loop execution and reply forwarding
//! - [`enabled`] - persistence of the enabled-command set
//! - [`catalog`] - the built-in module constructors
//! - [`modules`] - the built-in commands themselves

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::sync::mpsc::UnboundedSender;

pub mod arguments;
pub mod catalog;
pub mod dispatcher;
pub mod enabled;
pub mod modules;
pub mod registry;
pub mod router;

pub use crate::commands::arguments::{ArgSpec, ParsedArgs};
pub use crate::commands::dispatcher::Dispatcher;
pub use crate::commands::enabled::EnabledStore;
pub use crate::commands::registry::CommandRegistry;
pub use crate::commands::router::{RouteError, Router};

/// A parsed command invocation: the command name and its raw argument
/// tokens, exactly as split from one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// The command name (token 0 after prefix stripping)
    pub name: String,
    /// The remaining raw tokens
    pub arguments: Vec<String>,
}

/// One inbound chat message as the core sees it.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// The raw message text
    pub body: String,
    /// Room the message was sent in
    pub room_id: String,
    /// User who sent the message
    pub sender_id: String,
    /// Event identifier of the message
    pub event_id: String,
}

/// A request to send text into a room, handed to the connection's single
/// writer over the outbound channel.
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    /// Room to send into
    pub room_id: String,
    /// Message text
    pub body: String,
    /// When set, the message is sent as a reply to this event
    pub reply_to: Option<ReplyTo>,
}

/// Reply target of an [`OutgoingMessage`].
#[derive(Debug, Clone)]
pub struct ReplyTo {
    /// Sender of the message being replied to
    pub sender_id: String,
    /// Event being replied to
    pub event_id: String,
}

/// Bot context passed into every handler invocation.
///
/// Handlers run on worker threads, away from the event loop, so everything
/// here is safe to use from blocking code: the registry behind its mutation
/// lock (control commands use `blocking_lock`), and the outbound channel as
/// a fire-and-forget hand-off back to the connection writer.
pub struct CommandContext {
    /// The shared command registry
    pub registry: Arc<Mutex<CommandRegistry>>,
    /// Channel into the connection's single writer
    pub outbound: UnboundedSender<OutgoingMessage>,
}

/// The capability contract every command module satisfies.
///
/// Two methods, both required: [`CommandModule::arg_spec`] describes the
/// positional arguments, [`CommandModule::run`] executes the command. A
/// module whose spec fails validation never enters the registry.
pub trait CommandModule: Send + Sync {
    /// Builds the argument spec for this command.
    ///
    /// Called once at load time; the registry validates and keeps the result.
    fn arg_spec(&self) -> ArgSpec;

    /// Executes the command.
    ///
    /// Runs on a blocking worker thread. Returning `Ok(Some(text))` sends
    /// `text` as a reply into the originating room; `Ok(None)` sends nothing.
    /// Errors are logged at the dispatch boundary and never crash the bot.
    fn run(
        &self,
        context: &CommandContext,
        message: &IncomingMessage,
        args: &ParsedArgs,
    ) -> Result<Option<String>, anyhow::Error>;
}
