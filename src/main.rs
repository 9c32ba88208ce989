//! Howl - A Matrix bot hosting social deduction games.
//!
//! Each Matrix room can hold one game session at a time. Players sign up with
//! chat commands, the game itself is run by an external rules engine, and the
//! bot announces the result once the engine reports the game as finished.
//!
//! # Configuration
//!
//! Create a `config.yaml` file with your settings (see [`config`] for every
//! key):
//!
//! ```yaml
//! rules_engine:
//!   url: "http://localhost:8080"
//!
//! matrix:
//!   user_id: "@howl:example.org"
//!   password: "your-password"
//!   passphrase: "your-store-passphrase"
//! ```
//!
//! Any value can be overridden with a `HOWL_` prefixed environment variable:
//!
//! ```bash
//! export HOWL_MATRIX__PASSWORD="your-password"
//! export HOWL_BOT__PREFIX="!w "
//! ```
//!
//! # Usage
//!
//! ```bash
//! howl --config config.yaml --data ./howl-data
//! ```
//!
//! # Bot Commands
//!
//! - `w.help [command]` - List the commands or show the usage of one
//! - `w.signup` - Sign up, opening a session if the room has none
//! - `w.unsignup` - Leave the session
//! - `w.start` - Start the game with the signed up players
//! - `w.cancel` - Cancel the session
//! - `w.signups` - Show the session and its players
//! - `w.guildstats [guild id]` - Show the statistics of a guild
//!
//! # Architecture
//!
//! - [`bot`] - Wiring of the Matrix client, dispatcher and background tasks
//! - [`chat`] - Boundary between the bot and the chat platform
//! - [`commands`] - Command parsing, dispatch and handlers
//! - [`config`] - YAML configuration with environment variable overrides
//! - [`game`] - Rules engine client and watcher of running games
//! - [`matrix`] - Matrix implementation of the chat transport
//! - [`sessions`] - Session state machine, per-room registry and idle sweeper
//! - [`stats`] - Persisted statistics of completed games
//! - [`utils`] - Path and text helpers
//!
//! # Environment Variables
//!
//! - `RUST_LOG` - Controls logging level (default: `info`)

use clap::Parser;
use env_logger::Env;
use log::{error, info};

use crate::{bot::Bot, config::Config};

mod bot;
mod chat;
mod commands;
mod config;
mod game;
mod matrix;
mod sessions;
mod stats;
mod utils;

/// Command-line arguments for the Howl bot.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the YAML configuration file.
    #[arg(short, long)]
    config: String,

    /// Path to the directory for storing persistent data.
    ///
    /// This directory will contain:
    /// - `matrix/` - Matrix login and SDK store (authentication tokens, keys)
    /// - `stats` - JSON file with the statistics of completed games
    ///
    /// Game sessions themselves live in memory and do not survive a restart.
    #[arg(short, long)]
    data: String,
}

#[tokio::main]
async fn main() {
    // Put logger at info level by default
    let env = Env::default().filter_or("RUST_LOG", "info");
    env_logger::init_from_env(env);

    info!("Starting howl {}...", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    let config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load config file: {}", e);
            return;
        }
    };

    let bot = match Bot::new(config, &args.data).await {
        Ok(bot) => bot,
        Err(e) => {
            error!("Failed to initialize bot: {:?}", e);
            return;
        }
    };
    bot.start().await;
}
