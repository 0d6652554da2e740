//! Random cat picture command.
//!
//! `!cat` fetches one random cat image URL from an HTTP API and replies with
//! it; `!cat 3` fetches three, concurrently. The HTTP call sits behind the
//! [`ImageSource`] trait so the command logic is testable without a network.

use std::sync::Arc;

use log::warn;
use mockall::automock;
use serde::Deserialize;

use crate::commands::arguments::{ArgKind, ArgSpec, ArgValue, ParsedArgs};
use crate::commands::{CommandContext, CommandModule, IncomingMessage};

/// Endpoint returning `{"file": "<image url>"}` per request.
const CAT_API_URL: &str = "https://aws.random.cat/meow";

/// Most cats allowed per invocation.
const MAX_CATS: i64 = 5;

/// Line used in place of an image that could not be fetched.
const FETCH_FAILED: &str = "Unable to fetch cat!";

/// Source of random image URLs.
///
/// Implementations may block; the command only runs on worker threads.
#[automock]
pub trait ImageSource: Send + Sync {
    /// Fetches one random image URL.
    fn fetch(&self) -> Result<String, anyhow::Error>;
}

#[derive(Deserialize)]
struct CatResponse {
    file: String,
}

/// [`ImageSource`] backed by the random-cat HTTP API.
pub struct RandomCatApi {
    url: String,
}

impl RandomCatApi {
    /// Creates a source for the given endpoint URL.
    pub fn new(url: String) -> Self {
        RandomCatApi { url }
    }
}

impl ImageSource for RandomCatApi {
    fn fetch(&self) -> Result<String, anyhow::Error> {
        let response: CatResponse = reqwest::blocking::get(&self.url)?
            .error_for_status()?
            .json()?;
        Ok(response.file)
    }
}

/// The `cat` command.
pub struct Cat {
    source: Arc<dyn ImageSource>,
}

impl Cat {
    /// Creates the command against the real cat API.
    pub fn new() -> Self {
        Cat::with_source(Arc::new(RandomCatApi::new(CAT_API_URL.to_owned())))
    }

    /// Creates the command against a custom image source.
    pub fn with_source(source: Arc<dyn ImageSource>) -> Self {
        Cat { source }
    }
}

impl CommandModule for Cat {
    fn arg_spec(&self) -> ArgSpec {
        ArgSpec::builder()
            .optional("amount", ArgKind::Integer, ArgValue::Integer(1))
            .allowed((1..=MAX_CATS).map(ArgValue::Integer).collect())
            .build()
    }

    fn run(
        &self,
        _context: &CommandContext,
        _message: &IncomingMessage,
        args: &ParsedArgs,
    ) -> Result<Option<String>, anyhow::Error> {
        let amount = args.integer("amount").unwrap_or(1).max(1) as usize;

        // Fetch concurrently when more than one cat was asked for
        let fetched: Vec<Result<String, anyhow::Error>> = if amount > 1 {
            std::thread::scope(|scope| {
                let handles: Vec<_> = (0..amount)
                    .map(|_| scope.spawn(|| self.source.fetch()))
                    .collect();
                handles
                    .into_iter()
                    .map(|handle| {
                        handle
                            .join()
                            .unwrap_or_else(|_| Err(anyhow::anyhow!("fetch thread panicked")))
                    })
                    .collect()
            })
        } else {
            vec![self.source.fetch()]
        };

        let lines: Vec<String> = fetched
            .into_iter()
            .map(|result| match result {
                Ok(url) => url,
                Err(e) => {
                    warn!("failed to fetch cat: {e:#}");
                    FETCH_FAILED.to_owned()
                }
            })
            .collect();

        Ok(Some(lines.join("\n")))
    }
}
