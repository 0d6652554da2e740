//! Command dispatch off the event loop.
//!
//! The [`Dispatcher`] takes a routed invocation, looks the command up in the
//! registry, parses its arguments with the registered spec and runs the
//! handler on a bounded blocking worker pool. The event loop never waits for
//! a handler: each dispatch is a fire-and-forget task, and replies travel
//! back over the outbound channel that the connection's single writer drains.
//!
//! Handlers may block (file I/O, outbound HTTP, sleeps). A per-invocation
//! timeout bounds how long the dispatcher waits for a result; the handler
//! itself is not interrupted and keeps its pool slot until it returns.

use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use tokio::sync::{Mutex, Semaphore};
use tokio::sync::mpsc::UnboundedSender;

use crate::commands::registry::CommandRegistry;
use crate::commands::{
    CommandContext, IncomingMessage, Invocation, OutgoingMessage, ReplyTo,
};

/// Parses arguments and runs command handlers without blocking the caller.
///
/// Cheap to clone; all state is shared behind `Arc`.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<Mutex<CommandRegistry>>,
    context: Arc<CommandContext>,
    outbound: UnboundedSender<OutgoingMessage>,
    workers: Arc<Semaphore>,
    handler_timeout: Duration,
    reply_on_unknown: bool,
}

impl Dispatcher {
    /// Creates a dispatcher over a registry and an outbound channel.
    ///
    /// # Arguments
    ///
    /// * `registry` - The shared command registry
    /// * `outbound` - Channel drained by the connection's single writer
    /// * `worker_threads` - Size of the blocking worker pool
    /// * `handler_timeout` - How long to wait for one handler invocation
    /// * `reply_on_unknown` - Whether an unrecognized command name gets a
    ///   reply instead of only a log line
    pub fn new(
        registry: Arc<Mutex<CommandRegistry>>,
        outbound: UnboundedSender<OutgoingMessage>,
        worker_threads: usize,
        handler_timeout: Duration,
        reply_on_unknown: bool,
    ) -> Self {
        let context = Arc::new(CommandContext {
            registry: Arc::clone(&registry),
            outbound: outbound.clone(),
        });

        Dispatcher {
            registry,
            context,
            outbound,
            workers: Arc::new(Semaphore::new(worker_threads)),
            handler_timeout,
            reply_on_unknown,
        }
    }

    /// Dispatches one invocation and returns immediately.
    ///
    /// The lookup, argument parse and handler run all happen in a spawned
    /// task, so the caller can process the next inbound message right away.
    pub fn dispatch(&self, invocation: Invocation, message: IncomingMessage) {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            dispatcher.execute(invocation, message).await;
        });
    }

    /// Runs one invocation to completion: lookup, parse, off-loop execution,
    /// optional reply.
    async fn execute(&self, invocation: Invocation, message: IncomingMessage) {
        let descriptor = self.registry.lock().await.get(&invocation.name);
        let Some(descriptor) = descriptor else {
            info!(
                "command not found: {} (in {:?})",
                invocation.name, message.body
            );
            if self.reply_on_unknown {
                self.reply(&message, format!("Unknown command: `{}`", invocation.name));
            }
            return;
        };

        let args = match descriptor.spec.parse(&invocation.arguments) {
            Ok(args) => args,
            Err(e) => {
                info!("invalid arguments for `{}`: {e}", invocation.name);
                self.reply(&message, e.to_string());
                return;
            }
        };

        let permit = match Arc::clone(&self.workers).acquire_owned().await {
            Ok(permit) => permit,
            // The semaphore is never closed while the bot runs
            Err(_) => return,
        };

        let handler = Arc::clone(&descriptor.handler);
        let context = Arc::clone(&self.context);
        let handler_message = message.clone();
        let join = tokio::task::spawn_blocking(move || {
            // The permit rides with the handler: a slot frees only when the
            // handler actually returns, even after a dispatch timeout
            let _permit = permit;
            handler.run(&context, &handler_message, &args)
        });

        match tokio::time::timeout(self.handler_timeout, join).await {
            Err(_) => {
                warn!(
                    "command `{}` timed out after {:?}",
                    invocation.name, self.handler_timeout
                );
            }
            Ok(Err(join_error)) => {
                error!("command `{}` panicked: {join_error}", invocation.name);
            }
            Ok(Ok(Err(e))) => {
                error!("command `{}` failed: {e:#}", invocation.name);
            }
            Ok(Ok(Ok(Some(response)))) if !response.is_empty() => {
                self.reply(&message, response);
            }
            // No return value: the handler already sent whatever it wanted
            Ok(Ok(Ok(_))) => {}
        }
    }

    /// Enqueues a reply into the originating room.
    fn reply(&self, message: &IncomingMessage, body: String) {
        let outgoing = OutgoingMessage {
            room_id: message.room_id.clone(),
            body,
            reply_to: Some(ReplyTo {
                sender_id: message.sender_id.clone(),
                event_id: message.event_id.clone(),
            }),
        };

        if self.outbound.send(outgoing).is_err() {
            warn!("outbound channel closed, dropping reply");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::CommandModule;
    use crate::commands::arguments::{ArgKind, ArgSpec, ParsedArgs};
    use crate::commands::registry::ModuleCtor;
    use std::collections::HashMap;
    use std::time::Instant;
    use tokio::sync::mpsc;
    use tokio::sync::mpsc::UnboundedReceiver;

    struct Ping;

    impl CommandModule for Ping {
        fn arg_spec(&self) -> ArgSpec {
            ArgSpec::builder().variadic("rest", 0).build()
        }

        fn run(
            &self,
            _context: &CommandContext,
            _message: &IncomingMessage,
            _args: &ParsedArgs,
        ) -> Result<Option<String>, anyhow::Error> {
            Ok(Some("pong".to_string()))
        }
    }

    struct Silent;

    impl CommandModule for Silent {
        fn arg_spec(&self) -> ArgSpec {
            ArgSpec::builder().variadic("rest", 0).build()
        }

        fn run(
            &self,
            _context: &CommandContext,
            _message: &IncomingMessage,
            _args: &ParsedArgs,
        ) -> Result<Option<String>, anyhow::Error> {
            Ok(None)
        }
    }

    struct Sleeper;

    impl CommandModule for Sleeper {
        fn arg_spec(&self) -> ArgSpec {
            ArgSpec::builder().variadic("rest", 0).build()
        }

        fn run(
            &self,
            _context: &CommandContext,
            _message: &IncomingMessage,
            _args: &ParsedArgs,
        ) -> Result<Option<String>, anyhow::Error> {
            std::thread::sleep(Duration::from_millis(300));
            Ok(Some("slept".to_string()))
        }
    }

    struct Delayed;

    impl CommandModule for Delayed {
        fn arg_spec(&self) -> ArgSpec {
            ArgSpec::builder().required("delay", ArgKind::Integer).build()
        }

        fn run(
            &self,
            _context: &CommandContext,
            _message: &IncomingMessage,
            args: &ParsedArgs,
        ) -> Result<Option<String>, anyhow::Error> {
            let delay = args.integer("delay").unwrap_or(0) as u64;
            std::thread::sleep(Duration::from_millis(delay));
            Ok(Some("done".to_string()))
        }
    }

    struct Panicky;

    impl CommandModule for Panicky {
        fn arg_spec(&self) -> ArgSpec {
            ArgSpec::builder().variadic("rest", 0).build()
        }

        fn run(
            &self,
            _context: &CommandContext,
            _message: &IncomingMessage,
            _args: &ParsedArgs,
        ) -> Result<Option<String>, anyhow::Error> {
            panic!("handler exploded");
        }
    }

    struct DirectSend;

    impl CommandModule for DirectSend {
        fn arg_spec(&self) -> ArgSpec {
            ArgSpec::builder().variadic("rest", 0).build()
        }

        fn run(
            &self,
            context: &CommandContext,
            message: &IncomingMessage,
            _args: &ParsedArgs,
        ) -> Result<Option<String>, anyhow::Error> {
            // Sends on its own instead of returning a value
            context
                .outbound
                .send(OutgoingMessage {
                    room_id: message.room_id.clone(),
                    body: "direct".to_string(),
                    reply_to: None,
                })
                .ok();
            Ok(None)
        }
    }

    fn ping() -> Arc<dyn CommandModule> {
        Arc::new(Ping)
    }

    fn silent() -> Arc<dyn CommandModule> {
        Arc::new(Silent)
    }

    fn sleeper() -> Arc<dyn CommandModule> {
        Arc::new(Sleeper)
    }

    fn delayed() -> Arc<dyn CommandModule> {
        Arc::new(Delayed)
    }

    fn panicky() -> Arc<dyn CommandModule> {
        Arc::new(Panicky)
    }

    fn direct_send() -> Arc<dyn CommandModule> {
        Arc::new(DirectSend)
    }

    fn create_dispatcher(
        handler_timeout: Duration,
        reply_on_unknown: bool,
    ) -> (Dispatcher, UnboundedReceiver<OutgoingMessage>) {
        let mut catalog: HashMap<String, ModuleCtor> = HashMap::new();
        catalog.insert("ping".to_string(), ping);
        catalog.insert("silent".to_string(), silent);
        catalog.insert("sleep".to_string(), sleeper);
        catalog.insert("delayed".to_string(), delayed);
        catalog.insert("panicky".to_string(), panicky);
        catalog.insert("direct".to_string(), direct_send);

        let mut registry = CommandRegistry::new(catalog);
        registry.load(&["ping", "silent", "sleep", "delayed", "panicky", "direct"]);

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::new(
            Arc::new(Mutex::new(registry)),
            outbound_tx,
            4,
            handler_timeout,
            reply_on_unknown,
        );

        (dispatcher, outbound_rx)
    }

    fn create_message() -> IncomingMessage {
        IncomingMessage {
            body: "!ping".to_string(),
            room_id: "!room:example.org".to_string(),
            sender_id: "@alice:example.org".to_string(),
            event_id: "$event1:example.org".to_string(),
        }
    }

    fn invocation(name: &str, arguments: &[&str]) -> Invocation {
        Invocation {
            name: name.to_string(),
            arguments: arguments.iter().map(|a| a.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_returned_string_becomes_exactly_one_reply() {
        let (dispatcher, mut rx) = create_dispatcher(Duration::from_secs(5), false);
        dispatcher.execute(invocation("ping", &[]), create_message()).await;

        let reply = rx.recv().await.unwrap();
        assert_eq!(reply.body, "pong");
        assert_eq!(reply.room_id, "!room:example.org");
        let reply_to = reply.reply_to.unwrap();
        assert_eq!(reply_to.sender_id, "@alice:example.org");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_none_result_sends_no_reply() {
        let (dispatcher, mut rx) = create_dispatcher(Duration::from_secs(5), false);
        dispatcher.execute(invocation("silent", &[]), create_message()).await;

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unknown_command_is_silent_by_default() {
        let (dispatcher, mut rx) = create_dispatcher(Duration::from_secs(5), false);
        dispatcher.execute(invocation("nope", &[]), create_message()).await;

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unknown_command_replies_when_enabled() {
        let (dispatcher, mut rx) = create_dispatcher(Duration::from_secs(5), true);
        dispatcher.execute(invocation("nope", &[]), create_message()).await;

        let reply = rx.recv().await.unwrap();
        assert_eq!(reply.body, "Unknown command: `nope`");
    }

    #[tokio::test]
    async fn test_argument_error_is_reported_to_the_user() {
        let (dispatcher, mut rx) = create_dispatcher(Duration::from_secs(5), false);
        dispatcher
            .execute(invocation("delayed", &["soon"]), create_message())
            .await;

        let reply = rx.recv().await.unwrap();
        assert_eq!(
            reply.body,
            "Invalid value `soon` for `delay`: expected an integer."
        );
    }

    #[tokio::test]
    async fn test_handler_panic_is_contained() {
        let (dispatcher, mut rx) = create_dispatcher(Duration::from_secs(5), false);
        dispatcher.execute(invocation("panicky", &[]), create_message()).await;
        assert!(rx.try_recv().is_err());

        // The dispatcher keeps working afterwards
        dispatcher.execute(invocation("ping", &[]), create_message()).await;
        assert_eq!(rx.recv().await.unwrap().body, "pong");
    }

    #[tokio::test]
    async fn test_handler_timeout_drops_the_reply() {
        let (dispatcher, mut rx) = create_dispatcher(Duration::from_millis(50), false);
        dispatcher
            .execute(invocation("delayed", &["400"]), create_message())
            .await;

        // The handler finishes eventually but its result is discarded
        let waited =
            tokio::time::timeout(Duration::from_millis(600), rx.recv()).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn test_direct_send_from_handler() {
        let (dispatcher, mut rx) = create_dispatcher(Duration::from_secs(5), false);
        dispatcher.execute(invocation("direct", &[]), create_message()).await;

        let sent = rx.recv().await.unwrap();
        assert_eq!(sent.body, "direct");
        assert!(sent.reply_to.is_none());
        // No automatic reply on top of the direct send
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_long_handlers_do_not_block_each_other_or_the_loop() {
        let (dispatcher, mut rx) = create_dispatcher(Duration::from_secs(5), false);
        let start = Instant::now();

        // Two slow handlers first, then a fast one
        dispatcher.dispatch(invocation("sleep", &[]), create_message());
        dispatcher.dispatch(invocation("sleep", &[]), create_message());
        dispatcher.dispatch(invocation("ping", &[]), create_message());

        // The fast command completes while both sleepers are still running
        let first = rx.recv().await.unwrap();
        assert_eq!(first.body, "pong");
        assert!(start.elapsed() < Duration::from_millis(250));

        // Both sleepers complete, overlapping rather than serializing
        assert_eq!(rx.recv().await.unwrap().body, "slept");
        assert_eq!(rx.recv().await.unwrap().body, "slept");
        assert!(start.elapsed() < Duration::from_millis(550));
    }
}
