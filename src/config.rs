//! Configuration file structures and loading.
//!
//! The bot reads a YAML configuration file with two sections: the Matrix
//! account and the bot's dispatch tuning. Every value can be overridden with
//! an environment variable using the `MAKI_` prefix and `__` as the section
//! separator.
//!
//! # Configuration file format
//!
//! ```yaml
//! matrix:
//!   user_id: "@maki:example.org"
//!   password: "secret-password"
//!
//! bot:
//!   prefix: "!"
//!   worker_threads: 4
//!   handler_timeout_secs: 30
//!   reply_on_unknown: false
//! ```
//!
//! # Environment variable overrides
//!
//! ```bash
//! export MAKI_MATRIX__PASSWORD="secret-from-env"
//! export MAKI_BOT__WORKER_THREADS=8
//! ```

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::Deserialize;

/// Root configuration of the bot.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Matrix account configuration
    pub matrix: Matrix,
    /// Dispatch tuning, all optional
    #[serde(default)]
    pub bot: BotOptions,
}

impl Config {
    /// Loads the configuration from a YAML file with `MAKI_` environment
    /// variable overrides applied on top.
    pub fn load(path: &str) -> Result<Config, figment::Error> {
        Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("MAKI_").split("__"))
            .extract()
    }
}

/// Matrix account configuration.
#[derive(Debug, Deserialize)]
pub struct Matrix {
    /// Fully qualified Matrix user ID of the bot account, e.g.
    /// `@maki:example.org`. The homeserver is derived from it.
    pub user_id: String,

    /// Account password.
    ///
    /// Used for the initial login; later runs restore the persisted session
    /// without re-authenticating.
    pub password: String,
}

/// Dispatch tuning.
///
/// Every field has a default, so the whole section can be omitted.
#[derive(Debug, Deserialize)]
pub struct BotOptions {
    /// Command prefix character.
    #[serde(default = "default_prefix")]
    pub prefix: char,

    /// Size of the blocking worker pool that runs command handlers.
    ///
    /// One heavy command can occupy a slot for a long time; size the pool
    /// for the expected concurrency.
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,

    /// Seconds to wait for one handler invocation before giving up on its
    /// result.
    #[serde(default = "default_handler_timeout_secs")]
    pub handler_timeout_secs: u64,

    /// Whether an unrecognized command name gets a reply. When off, unknown
    /// commands are only logged.
    #[serde(default)]
    pub reply_on_unknown: bool,
}

impl Default for BotOptions {
    fn default() -> Self {
        BotOptions {
            prefix: default_prefix(),
            worker_threads: default_worker_threads(),
            handler_timeout_secs: default_handler_timeout_secs(),
            reply_on_unknown: false,
        }
    }
}

fn default_prefix() -> char {
    '!'
}

fn default_worker_threads() -> usize {
    4
}

fn default_handler_timeout_secs() -> u64 {
    30
}
