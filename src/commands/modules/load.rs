//! Registry load command.
//!
//! `!load <name>...` brings the named commands into the registry, replying
//! with a per-name summary. One failing name never stops the others.

use crate::commands::arguments::{ArgSpec, ParsedArgs};
use crate::commands::modules::format_outcome;
use crate::commands::{CommandContext, CommandModule, IncomingMessage};

/// The `load` control command.
pub struct Load;

impl CommandModule for Load {
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
        let failures = context.registry.blocking_lock().load(names);
        Ok(Some(format_outcome("Loaded", "load", names, &failures)))
    }
}
