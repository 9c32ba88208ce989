//! Rules-engine boundary.
//!
//! The host never decides who wins: it hands the signed-up players to a
//! [`RulesEngine`] when a session starts and learns about the end of the game
//! through [`GameWatcher`], which feeds outcomes back to the dispatcher.
//!
//! # Modules
//!
//! - `requester` - HTTP client for a remote rules engine
//! - `watcher` - periodic poll turning finished games into session terminations

mod requester;
mod watcher;

use async_trait::async_trait;
use mockall::automock;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub use crate::game::requester::HttpRulesEngine;
pub use crate::game::watcher::GameWatcher;

/// Opaque reference to a game running inside the rules engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameHandle(pub String);

impl fmt::Display for GameHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of a finished game as reported by the rules engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOutcome {
    /// Winning faction, e.g. `village` or `wolves`
    pub faction: String,
    /// Players credited with the win
    pub winners: Vec<String>,
}

/// Failure to assemble a game from the signed-up players.
#[derive(Debug, Error)]
pub enum SetupError {
    /// The engine refused the player list
    #[error("the rules engine rejected the game: {0}")]
    Rejected(String),
    /// The engine did not answer within the configured bound
    #[error("the rules engine did not answer in time")]
    Timeout,
    /// The engine could not be reached
    #[error("the rules engine is unreachable: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Failure while asking the engine about a running game.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("rules engine request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The engine did not answer within the poll bound
    #[error("the rules engine did not answer in time")]
    Timeout,
}

/// External rules engine.
#[automock]
#[async_trait]
pub trait RulesEngine: Send + Sync {
    /// Assembles roles and the initial game state for `players`.
    async fn start_game(
        &self,
        channel_id: &str,
        players: &[String],
    ) -> Result<GameHandle, SetupError>;

    /// Returns the outcome once the game is over, `None` while it runs.
    async fn game_outcome(&self, handle: &GameHandle) -> Result<Option<GameOutcome>, EngineError>;
}
