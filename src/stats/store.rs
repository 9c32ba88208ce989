//! JSON file backed statistics store.
//!
//! This module provides the [`JsonStatsStore`] keeping every guild's
//! [`GuildStats`] in memory and rewriting the whole file after each recorded
//! game.

use std::collections::HashMap;

use async_trait::async_trait;
use log::{error, info, warn};
use tokio::{fs, sync::Mutex};

use crate::{
    game::GameOutcome,
    stats::{GuildStats, StatsError, StatsStore},
};

/// Statistics persisted as a single JSON document.
///
/// A missing or corrupted file never prevents the bot from starting: the
/// store starts empty and the next recorded game overwrites the file.
///
/// # Examples
///
/// ```no_run
/// let store = JsonStatsStore::load("data/stats".to_string()).await;
/// store.record_completed_game("!room:example.org", "example.org", &players, &outcome).await?;
/// ```
pub struct JsonStatsStore {
    /// Path to the JSON file
    path: String,
    /// Guild id -> statistics; locked across the file write to keep writes ordered
    guilds: Mutex<HashMap<String, GuildStats>>,
}

impl JsonStatsStore {
    /// Creates the store from the content of `path`.
    pub async fn load(path: String) -> Self {
        let guilds = Self::read(&path).await;
        JsonStatsStore {
            path,
            guilds: Mutex::new(guilds),
        }
    }

    async fn read(path: &str) -> HashMap<String, GuildStats> {
        let Ok(serialized) = fs::read_to_string(path).await else {
            warn!("no persisted statistics found, starting with empty statistics");
            return HashMap::new();
        };

        let Ok(guilds) = serde_json::from_str::<HashMap<String, GuildStats>>(&serialized) else {
            error!("failed to deserialize persisted statistics, starting with empty statistics");
            return HashMap::new();
        };

        info!("loaded statistics of {} guilds", guilds.len());
        guilds
    }
}

#[async_trait]
impl StatsStore for JsonStatsStore {
    async fn record_completed_game(
        &self,
        channel_id: &str,
        guild_id: &str,
        players: &[String],
        outcome: &GameOutcome,
    ) -> Result<(), StatsError> {
        let mut guilds = self.guilds.lock().await;
        guilds
            .entry(guild_id.to_owned())
            .or_default()
            .record(channel_id, players, outcome);

        let serialized = serde_json::to_string(&*guilds)?;
        fs::write(&self.path, serialized).await?;

        info!(
            "recorded game won by {} in channel {} of guild {}",
            outcome.faction, channel_id, guild_id
        );
        Ok(())
    }

    async fn guild_stats(&self, guild_id: &str) -> GuildStats {
        self.guilds
            .lock()
            .await
            .get(guild_id)
            .cloned()
            .unwrap_or_default()
    }
}
