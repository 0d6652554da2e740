//! The built-in command catalog.
//!
//! The catalog maps command names to module constructors. Binding happens
//! here, at registration time, rather than by scanning the filesystem: adding
//! a command means adding its constructor to [`builtin`]. Names starting with
//! the private marker are excluded from discovery but stay force-loadable.

use std::collections::HashMap;
use std::sync::Arc;

use crate::commands::CommandModule;
use crate::commands::modules::{cat::Cat, echo::Echo, hi::Hi, load::Load, reload::Reload, unload::Unload};
use crate::commands::registry::ModuleCtor;

fn hi() -> Arc<dyn CommandModule> {
    Arc::new(Hi)
}

fn cat() -> Arc<dyn CommandModule> {
    Arc::new(Cat::new())
}

fn load() -> Arc<dyn CommandModule> {
    Arc::new(Load)
}

fn unload() -> Arc<dyn CommandModule> {
    Arc::new(Unload)
}

fn reload() -> Arc<dyn CommandModule> {
    Arc::new(Reload)
}

fn echo() -> Arc<dyn CommandModule> {
    Arc::new(Echo)
}

/// Returns the catalog of all built-in commands.
pub fn builtin() -> HashMap<String, ModuleCtor> {
    let mut catalog: HashMap<String, ModuleCtor> = HashMap::new();
    catalog.insert("hi".to_owned(), hi);
    catalog.insert("cat".to_owned(), cat);
    catalog.insert("load".to_owned(), load);
    catalog.insert("unload".to_owned(), unload);
    catalog.insert("reload".to_owned(), reload);
    catalog.insert("_echo".to_owned(), echo);
    catalog
}
