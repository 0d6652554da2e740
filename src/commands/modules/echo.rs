//! Private echo command.
//!
//! `_echo` repeats its arguments back and says nothing when given none. Its
//! name carries the private marker, so it is skipped by discovery and only
//! available after an explicit `!load _echo`.

use crate::commands::arguments::{ArgSpec, ParsedArgs};
use crate::commands::{CommandContext, CommandModule, IncomingMessage};

/// The `_echo` command.
pub struct Echo;

impl CommandModule for Echo {
    fn arg_spec(&self) -> ArgSpec {
        ArgSpec::builder().variadic("words", 0).build()
    }

    fn run(
        &self,
        _context: &CommandContext,
        _message: &IncomingMessage,
        args: &ParsedArgs,
    ) -> Result<Option<String>, anyhow::Error> {
        let words = args.list("words").unwrap_or_default();
        if words.is_empty() {
            return Ok(None);
        }
        Ok(Some(words.join(" ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::modules::testutil::{create_context, create_message, tokens};

    #[test]
    fn test_echo_repeats_arguments() {
        let (context, _rx) = create_context();
        let spec = Echo.arg_spec();
        let args = spec.parse(&tokens(&["one", "two"])).unwrap();
        let response = Echo.run(&context, &create_message(), &args).unwrap();
        assert_eq!(response, Some("one two".to_string()));
    }

    #[test]
    fn test_echo_without_arguments_stays_silent() {
        let (context, _rx) = create_context();
        let spec = Echo.arg_spec();
        let args = spec.parse(&[]).unwrap();
        let response = Echo.run(&context, &create_message(), &args).unwrap();
        assert_eq!(response, None);
    }
}
