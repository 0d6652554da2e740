//! Persistence of the enabled-command set.
//!
//! The set of commands to load at startup lives in a flat JSON file mapping
//! command name to an enabled flag. The file is read once at startup and
//! written back only when it did not exist and the registry discovered the
//! catalog on its own.

use std::collections::HashMap;
use std::io::ErrorKind;

use log::{info, warn};
use tokio::fs;

/// Reads and writes the enabled-command file.
///
/// A missing file is a normal first-run condition and reports as `None`; an
/// unreadable or unparsable file is an error, because silently ignoring it
/// would load commands the operator disabled on purpose.
#[derive(Clone)]
pub struct EnabledStore {
    /// Path to the JSON file
    path: String,
}

impl EnabledStore {
    /// Creates a store for the given file path.
    pub fn new(path: String) -> Self {
        EnabledStore { path }
    }

    /// Loads the enabled set from disk.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(map))` - the file exists and parsed
    /// * `Ok(None)` - the file does not exist (first run)
    /// * `Err(_)` - the file exists but could not be read or parsed
    pub async fn load(&self) -> Result<Option<HashMap<String, bool>>, anyhow::Error> {
        let serialized = match fs::read_to_string(&self.path).await {
            Ok(serialized) => serialized,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("no enabled-command file at {}, will discover", self.path);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let enabled: HashMap<String, bool> = serde_json::from_str(&serialized)?;
        info!("loaded enabled-command file {}", self.path);

        Ok(Some(enabled))
    }

    /// Writes the enabled set to disk.
    pub async fn persist(&self, enabled: &HashMap<String, bool>) -> Result<(), anyhow::Error> {
        let serialized = serde_json::to_string_pretty(enabled)?;
        fs::write(&self.path, serialized).await?;

        info!("persisted enabled-command file {}", self.path);
        Ok(())
    }
}
