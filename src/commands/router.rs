//! Inbound message routing.
//!
//! The [`Router`] inspects the raw text of an incoming message and decides
//! whether it is a command invocation. Two forms are recognized: a
//! single-character prefix (`!cat 3`) or a mention of the bot as the first
//! token (`@maki:example.org cat 3`). Everything else is not a command and is
//! ignored without an error.
//!
//! Tokenization is naive whitespace splitting: consecutive whitespace
//! collapses and there is no quoting or escaping.

use crate::commands::Invocation;

/// Errors raised while routing a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// The message matches neither invocation form; it is not a command at
    /// all and must be ignored silently.
    NotACommand,
    /// The message matched an invocation form but contained no tokens after
    /// prefix stripping (e.g. `"!   "`).
    EmptyInvocation,
}

/// Recognizes command invocations in raw message text.
///
/// The router holds the bot's two address forms: the prefix character and the
/// bot's canonicalized mention. Both are fixed at startup.
pub struct Router {
    prefix: char,
    mention: String,
}

impl Router {
    /// Creates a router for the given prefix character and bot mention.
    ///
    /// The mention is canonicalized once here so that every later comparison
    /// works on the same form.
    pub fn new(prefix: char, mention: &str) -> Self {
        Router {
            prefix,
            mention: canonicalize_mention(mention).to_owned(),
        }
    }

    /// Extracts a command invocation from raw message text.
    ///
    /// Returns the command name and its raw argument tokens. Token 0 after
    /// prefix stripping is the name; the rest are passed untouched to the
    /// argument-spec layer.
    ///
    /// # Errors
    ///
    /// * [`RouteError::NotACommand`] - the text matches neither the prefix
    ///   form nor the mention form
    /// * [`RouteError::EmptyInvocation`] - a prefix matched but no tokens
    ///   followed it
    pub fn route(&self, body: &str) -> Result<Invocation, RouteError> {
        let rest = match body.strip_prefix(self.prefix) {
            Some(stripped) => stripped,
            None => self.strip_mention(body).ok_or(RouteError::NotACommand)?,
        };

        let mut tokens = rest.split_whitespace();
        let Some(name) = tokens.next() else {
            return Err(RouteError::EmptyInvocation);
        };

        Ok(Invocation {
            name: name.to_owned(),
            arguments: tokens.map(str::to_owned).collect(),
        })
    }

    /// Returns the text after the bot mention when the first token addresses
    /// the bot, `None` otherwise.
    fn strip_mention<'a>(&self, body: &'a str) -> Option<&'a str> {
        let trimmed = body.trim_start();
        let mut parts = trimmed.splitn(2, char::is_whitespace);
        let first = parts.next()?;

        // A trailing colon after the mention is common ("@maki: hi") and
        // carries no meaning.
        if canonicalize_mention(first.trim_end_matches(':')) == self.mention {
            Some(parts.next().unwrap_or(""))
        } else {
            None
        }
    }
}

/// Reduces the platform's mention renderings to one canonical form.
///
/// The same entity can be rendered as `<@id>` or with an extra sentinel byte
/// as `<@!id>`; both reduce to the bare `id`. A token without the wrapper is
/// returned unchanged.
fn canonicalize_mention(token: &str) -> &str {
    match token.strip_prefix("<@").and_then(|inner| inner.strip_suffix('>')) {
        Some(inner) => inner.strip_prefix('!').unwrap_or(inner),
        None => token,
    }
}
