//! Historical statistics of completed games.
//!
//! Statistics are best-effort: a failed write is logged by the caller and
//! never undoes the termination of the session it describes.

mod store;

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use mockall::automock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::GameOutcome;

pub use crate::stats::store::JsonStatsStore;

/// Aggregated statistics of one guild.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildStats {
    /// Number of games that reached their end
    pub games_played: u64,
    /// Every player who took part in a completed game
    pub players_seen: BTreeSet<String>,
    /// Wins per faction
    pub wins_by_faction: BTreeMap<String, u64>,
    /// Completed games per channel
    pub games_by_channel: BTreeMap<String, u64>,
}

impl GuildStats {
    /// Accounts one completed game played in `channel_id` by `players`.
    pub fn record(&mut self, channel_id: &str, players: &[String], outcome: &GameOutcome) {
        self.games_played += 1;
        *self
            .wins_by_faction
            .entry(outcome.faction.clone())
            .or_default() += 1;
        *self
            .games_by_channel
            .entry(channel_id.to_owned())
            .or_default() += 1;
        self.players_seen.extend(players.iter().cloned());
        self.players_seen.extend(outcome.winners.iter().cloned());
    }
}

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("failed to serialize statistics: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write statistics: {0}")]
    Io(#[from] std::io::Error),
}

/// Storage of completed games.
#[automock]
#[async_trait]
pub trait StatsStore: Send + Sync {
    async fn record_completed_game(
        &self,
        channel_id: &str,
        guild_id: &str,
        players: &[String],
        outcome: &GameOutcome,
    ) -> Result<(), StatsError>;

    /// Statistics of `guild_id`, empty if nothing was recorded yet.
    async fn guild_stats(&self, guild_id: &str) -> GuildStats;
}
