//! Built-in command modules.
//!
//! Each submodule is one command implementing the
//! [`CommandModule`](crate::commands::CommandModule) contract. Commands are
//! wired into the bot through the [`catalog`](crate::commands::catalog), not
//! referenced directly from anywhere else.
//!
//! - [`hi`] - greet one or more users
//! - [`cat`] - fetch random cat pictures
//! - [`load`], [`unload`], [`reload`] - administer the registry at runtime
//! - [`echo`] - private diagnostic command, excluded from discovery

use std::collections::HashMap;

use crate::commands::registry::LoadFailure;

pub mod cat;
pub mod echo;
pub mod hi;
pub mod load;
pub mod reload;
pub mod unload;

/// Renders the outcome of a registry batch operation as a reply.
///
/// One line for the successful names, one line per failure, failures sorted
/// by name so replies are stable.
pub(crate) fn format_outcome(
    past: &str,
    verb: &str,
    requested: &[String],
    failures: &HashMap<String, LoadFailure>,
) -> String {
    let succeeded: Vec<&str> = requested
        .iter()
        .filter(|name| !failures.contains_key(*name))
        .map(String::as_str)
        .collect();

    let mut lines = Vec::new();
    if !succeeded.is_empty() {
        lines.push(format!("{past}: {}", succeeded.join(", ")));
    }

    let mut failed: Vec<(&String, &LoadFailure)> = failures.iter().collect();
    failed.sort_by_key(|(name, _)| name.as_str());
    for (name, failure) in failed {
        lines.push(format!("Failed to {verb} `{name}`: {failure}"));
    }

    lines.join("\n")
}
