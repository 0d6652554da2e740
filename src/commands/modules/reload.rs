//! Registry reload command.
//!
//! `!reload <name>...` rebuilds the named commands in place. A command whose
//! rebuild fails keeps its previous binding and stays usable.

use crate::commands::arguments::{ArgSpec, ParsedArgs};
use crate::commands::modules::format_outcome;
use crate::commands::{CommandContext, CommandModule, IncomingMessage};

/// The `reload` control command.
pub struct Reload;

impl CommandModule for Reload {
    fn arg_spec(&self) -> ArgSpec {
        ArgSpec::builder().variadic("commands", 1).build()
    }

    fn run(
        &self,
        context: &CommandContext,
        _message: &IncomingMessage,
        args: &ParsedArgs,
    ) -> Result<Option<String>, anyhow::Error> {
        let names = args.list("commands").unwrap_or_default();
        let failures = context.registry.blocking_lock().reload(names);
        Ok(Some(format_outcome("Reloaded", "reload", names, &failures)))
    }
}
