//! Registry unload command.
//!
//! `!unload <name>...` removes the named commands' bindings. The modules
//! stay in the catalog, so `!load` can bring them back later.

use crate::commands::arguments::{ArgSpec, ParsedArgs};
use crate::commands::modules::format_outcome;
use crate::commands::{CommandContext, CommandModule, IncomingMessage};

/// The `unload` control command.
pub struct Unload;

impl CommandModule for Unload {
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
        let failures = context.registry.blocking_lock().unload(names);
        Ok(Some(format_outcome("Unloaded", "unload", names, &failures)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::modules::testutil::{create_context, create_message, tokens};

    #[test]
    fn test_unload_removes_loaded_command() {
        let (context, _rx) = create_context();
        context.registry.blocking_lock().load(&["hi"]);

        let spec = Unload.arg_spec();
        let args = spec.parse(&tokens(&["hi"])).unwrap();
        let response = Unload
            .run(&context, &create_message(), &args)
            .unwrap()
            .unwrap();

        assert_eq!(response, "Unloaded: hi");
        assert!(context.registry.blocking_lock().get("hi").is_none());
    }

    #[test]
    fn test_unload_reports_names_that_were_not_loaded() {
        let (context, _rx) = create_context();

        let spec = Unload.arg_spec();
        let args = spec.parse(&tokens(&["hi"])).unwrap();
        let response = Unload
            .run(&context, &create_message(), &args)
            .unwrap()
            .unwrap();

        assert_eq!(response, "Failed to unload `hi`: no such command");
    }
}
