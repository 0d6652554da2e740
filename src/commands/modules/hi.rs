//! Greeting command.
//!
//! `!hi` greets the sender; `!hi Alice Bob` greets the listed users. The
//! grammar of the greeting changes with the number of names, matching how a
//! person would write it.

use crate::commands::arguments::{ArgSpec, ParsedArgs};
use crate::commands::{CommandContext, CommandModule, IncomingMessage};

/// The `hi` command.
pub struct Hi;

impl CommandModule for Hi {
    fn arg_spec(&self) -> ArgSpec {
        ArgSpec::builder().variadic("users", 0).build()
    }

    fn run(
        &self,
        _context: &CommandContext,
        message: &IncomingMessage,
        args: &ParsedArgs,
    ) -> Result<Option<String>, anyhow::Error> {
        let users = args.list("users").unwrap_or_default();

        // The greeting reads differently depending on how many names were
        // given:
        //   (none)        -> "Hello, {sender}!"
        //   a             -> "Hello, a!"
        //   a b           -> "Hello a and b!"
        //   a b c ...     -> "Hello a, b, and c!"
        let greeted = match users {
            [] => format!(", {}", localpart(&message.sender_id)),
            [one] => format!(", {one}"),
            [first, second] => format!(" {first} and {second}"),
            [init @ .., last] => format!(" {}, and {}", init.join(", "), last),
        };

        Ok(Some(format!("Hello{greeted}!")))
    }
}

/// Extracts the human-readable part of a user identifier:
/// `@alice:example.org` becomes `alice`.
fn localpart(user_id: &str) -> &str {
    let bare = user_id.strip_prefix('@').unwrap_or(user_id);
    bare.split(':').next().unwrap_or(bare)
}
