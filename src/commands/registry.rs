//! Command registry with live load, unload and reload.
//!
//! The registry owns the mapping from command name to [`CommandDescriptor`].
//! Commands come from a catalog of constructors keyed by name; loading a name
//! runs its constructor, builds the argument spec and validates it, and only
//! then binds the descriptor. Batch operations never abort on a failing name:
//! each failure is recorded per name and the rest of the batch proceeds.
//!
//! On startup the registry bootstraps from a persisted enabled-set file. When
//! the file is missing, every public catalog entry is discovered, loaded and
//! written back as the new enabled set.

use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use log::{error, info, warn};

use crate::commands::CommandModule;
use crate::commands::arguments::ArgSpec;
use crate::commands::enabled::EnabledStore;

/// Commands that administer the registry itself. Their absence after
/// bootstrap is worth a warning: without them the registry can no longer be
/// changed at runtime.
pub const CONTROL_COMMANDS: [&str; 3] = ["load", "unload", "reload"];

/// Catalog names starting with this marker are skipped by discovery but can
/// still be loaded by explicit name.
pub const PRIVATE_PREFIX: char = '_';

/// Constructor producing a fresh command module instance.
pub type ModuleCtor = fn() -> Arc<dyn CommandModule>;

/// One registered command: its validated argument spec and its handler.
///
/// Descriptors are owned by the registry; the dispatcher takes a clone for
/// the duration of one invocation and never holds onto it.
#[derive(Clone)]
pub struct CommandDescriptor {
    /// Validated argument spec, built once at load time
    pub spec: ArgSpec,
    /// The execution handler
    pub handler: Arc<dyn CommandModule>,
}

/// Why a single name in a batch operation failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadFailure {
    /// No module with this name exists (in the catalog for load/reload, in
    /// the registry for unload)
    NotFound,
    /// The module exists but its argument spec failed structural validation
    InvalidContract(String),
    /// Construction failed for another reason
    Failed(String),
}

impl fmt::Display for LoadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadFailure::NotFound => write!(f, "no such command"),
            LoadFailure::InvalidContract(reason) => {
                write!(f, "invalid command contract ({reason})")
            }
            LoadFailure::Failed(reason) => write!(f, "{reason}"),
        }
    }
}

/// Mapping from command name to descriptor, with batch mutation operations.
///
/// The registry is the only shared mutable state of the bot. Callers wrap it
/// in a `tokio::sync::Mutex` so that concurrent load/unload/reload requests
/// for the same name serialize instead of racing.
pub struct CommandRegistry {
    catalog: HashMap<String, ModuleCtor>,
    commands: HashMap<String, CommandDescriptor>,
}

impl CommandRegistry {
    /// Creates an empty registry over the given constructor catalog.
    pub fn new(catalog: HashMap<String, ModuleCtor>) -> Self {
        CommandRegistry {
            catalog,
            commands: HashMap::new(),
        }
    }

    /// Loads each named command from the catalog.
    ///
    /// A name already bound is overwritten. A failing name is recorded in the
    /// returned map and never aborts the rest of the batch.
    pub fn load<S: AsRef<str>>(&mut self, names: &[S]) -> HashMap<String, LoadFailure> {
        let mut failures = HashMap::new();

        for name in names {
            let name = name.as_ref();
            match self.build_descriptor(name) {
                Ok(descriptor) => {
                    self.commands.insert(name.to_owned(), descriptor);
                }
                Err(failure) => {
                    failures.insert(name.to_owned(), failure);
                }
            }
        }

        failures
    }

    /// Removes each named command's binding.
    ///
    /// The constructor stays in the catalog, so the name can be loaded again
    /// later. An absent name is recorded as [`LoadFailure::NotFound`].
    pub fn unload<S: AsRef<str>>(&mut self, names: &[S]) -> HashMap<String, LoadFailure> {
        let mut failures = HashMap::new();

        for name in names {
            let name = name.as_ref();
            if self.commands.remove(name).is_none() {
                failures.insert(name.to_owned(), LoadFailure::NotFound);
            }
        }

        failures
    }

    /// Re-runs each named command's constructor and rebinds the descriptor.
    ///
    /// When a re-load fails the previous descriptor stays bound, so a command
    /// keeps working with its old definition rather than disappearing.
    pub fn reload<S: AsRef<str>>(&mut self, names: &[S]) -> HashMap<String, LoadFailure> {
        let mut failures = HashMap::new();

        for name in names {
            let name = name.as_ref();
            if !self.commands.contains_key(name) {
                failures.insert(name.to_owned(), LoadFailure::NotFound);
                continue;
            }
            match self.build_descriptor(name) {
                Ok(descriptor) => {
                    self.commands.insert(name.to_owned(), descriptor);
                }
                Err(failure) => {
                    failures.insert(name.to_owned(), failure);
                }
            }
        }

        failures
    }

    /// Returns a clone of the descriptor bound under `name`.
    pub fn get(&self, name: &str) -> Option<CommandDescriptor> {
        self.commands.get(name).cloned()
    }

    /// Returns the currently bound command names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.commands.keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns the catalog names eligible for discovery, sorted.
    ///
    /// Private-marked names are excluded.
    pub fn discover(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .catalog
            .keys()
            .filter(|name| !name.starts_with(PRIVATE_PREFIX))
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Loads the startup command set.
    ///
    /// When the enabled-set file exists, the names it maps to `true` are
    /// loaded. When it is absent, every discoverable catalog entry is loaded
    /// and the resulting set is written back as the new file. An unreadable
    /// or unparsable file is a startup error.
    ///
    /// Load failures are logged per name and do not fail the bootstrap; a
    /// missing control command is surfaced as a warning.
    pub async fn bootstrap(&mut self, store: &EnabledStore) -> Result<(), anyhow::Error> {
        let names = match store.load().await? {
            Some(enabled) => {
                let mut names: Vec<String> = enabled
                    .into_iter()
                    .filter(|(_, on)| *on)
                    .map(|(name, _)| name)
                    .collect();
                names.sort();
                names
            }
            None => {
                let discovered = self.discover();
                let enabled: HashMap<String, bool> = discovered
                    .iter()
                    .map(|name| (name.clone(), true))
                    .collect();
                store.persist(&enabled).await?;
                info!("discovered commands: {}", discovered.join(", "));
                discovered
            }
        };

        for (name, failure) in self.load(&names) {
            match failure {
                LoadFailure::NotFound => error!("cannot find command `{name}`"),
                LoadFailure::InvalidContract(reason) => {
                    error!("command `{name}` does not satisfy the command contract: {reason}")
                }
                LoadFailure::Failed(reason) => {
                    error!("failed to load command `{name}`: {reason}")
                }
            }
        }

        for control in CONTROL_COMMANDS {
            if self.get(control).is_none() {
                warn!("control command `{control}` not loaded");
            }
        }

        info!("loaded commands: {}", self.names().join(", "));

        Ok(())
    }

    /// Runs the constructor for `name` and validates the produced spec.
    fn build_descriptor(&self, name: &str) -> Result<CommandDescriptor, LoadFailure> {
        let Some(ctor) = self.catalog.get(name) else {
            return Err(LoadFailure::NotFound);
        };

        let built = catch_unwind(AssertUnwindSafe(|| {
            let handler = ctor();
            let spec = handler.arg_spec();
            (handler, spec)
        }));

        let (handler, spec) = match built {
            Ok(parts) => parts,
            Err(_) => {
                return Err(LoadFailure::Failed(
                    "command constructor panicked".to_owned(),
                ));
            }
        };

        if let Err(spec_error) = spec.validate() {
            return Err(LoadFailure::InvalidContract(spec_error.to_string()));
        }

        Ok(CommandDescriptor { spec, handler })
    }
}
