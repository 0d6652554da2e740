//! Maki - a Matrix chat bot with a hot-reloadable command registry.
//!
//! Maki joins Matrix rooms it is invited to and executes commands addressed
//! to it, either with a prefix character (`!cat 3`) or by mentioning the bot
//! (`@maki:example.org cat 3`). Commands are self-contained modules behind a
//! small capability contract; they can be loaded, unloaded and reloaded at
//! runtime without restarting the process.
//!
//! # Built-in commands
//!
//! - `!hi [user...]` - greet the sender or the listed users
//! - `!cat [amount]` - fetch 1-5 random cat pictures
//! - `!load <name>...` - load commands into the registry
//! - `!unload <name>...` - remove commands from the registry
//! - `!reload <name>...` - rebuild loaded commands in place
//!
//! # Configuration
//!
//! Create a `config.yaml`:
//!
//! ```yaml
//! matrix:
//!   user_id: "@maki:example.org"
//!   password: "your-password"
//!
//! bot:
//!   prefix: "!"
//!   worker_threads: 4
//!   handler_timeout_secs: 30
//!   reply_on_unknown: false
//! ```
//!
//! Any value can be overridden from the environment with the `MAKI_` prefix
//! and `__` as the section separator, e.g. `MAKI_MATRIX__PASSWORD`.
//!
//! # Usage
//!
//! ```bash
//! maki --config config.yaml --data ./maki-data
//! ```
//!
//! The data directory holds the Matrix session (authentication tokens and
//! the SDK state store) and the enabled-command file `commands.json`. The
//! enabled-command file is created on first run with every discoverable
//! command enabled; edit it to keep a command from loading at startup.
//!
//! # Architecture
//!
//! - [`bot`] - wiring of connection, router, registry and dispatcher
//! - [`commands`] - the command core: routing, registry, arguments, dispatch
//! - [`config`] - YAML configuration with environment overrides
//! - [`matrix`] - the connection shell around the Matrix SDK
//! - [`utils`] - small path helpers
//!
//! # Environment variables
//!
//! - `RUST_LOG` - log level, `info` by default

use clap::Parser;
use env_logger::Env;
use log::{error, info};

use crate::{bot::Bot, config::Config};

mod bot;
mod commands;
mod config;
mod matrix;
mod utils;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the YAML configuration file.
    #[arg(short, long)]
    config: String,

    /// Path to the directory for persistent data (Matrix session and the
    /// enabled-command file).
    #[arg(short, long)]
    data: String,
}

#[tokio::main]
async fn main() {
    // Put logger at info level by default
    let env = Env::default().filter_or("RUST_LOG", "info");
    env_logger::init_from_env(env);

    info!("starting maki {}...", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    let config: Config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("failed to load config file: {e}");
            return;
        }
    };

    let bot = match Bot::new(config, args).await {
        Ok(bot) => bot,
        Err(e) => {
            error!("failed to initialize bot: {e:#}");
            return;
        }
    };

    if let Err(e) = bot.start().await {
        error!("bot terminated with error: {e:#}");
    }
}
