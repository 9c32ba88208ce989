//! HTTP client for a remote rules engine.
//!
//! This module provides the [`HttpRulesEngine`] which creates games and polls
//! their phase over a small JSON API.

use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::game::{EngineError, GameHandle, GameOutcome, RulesEngine, SetupError};

/// Phase reported by the engine once a game is over.
const END_PHASE: &str = "end";

/// Body of `POST /api/games`.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CreateGameRequest<'a> {
    channel_id: &'a str,
    players: &'a [String],
}

/// Answer of `POST /api/games`.
#[derive(Deserialize, Debug)]
struct CreateGameResponse {
    id: String,
}

/// Answer of `GET /api/game?id={id}`.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GameStatusResponse {
    id: String,
    phase: String,
    #[serde(default)]
    faction: Option<String>,
    #[serde(default)]
    winners: Vec<String>,
}

/// Rules engine reached over HTTP.
///
/// # Examples
///
/// ```no_run
/// let engine = HttpRulesEngine::new("http://localhost:8080");
/// let handle = engine.start_game("!room:example.org", &players).await?;
/// ```
pub struct HttpRulesEngine {
    /// Base url of the engine, without trailing slash
    url: String,
    /// HTTP client
    client: Client,
}

impl HttpRulesEngine {
    pub fn new(url: &str) -> Self {
        HttpRulesEngine {
            url: url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }
}

#[async_trait]
impl RulesEngine for HttpRulesEngine {
    /// Request `POST /api/games` with the channel and its players.
    ///
    /// ```text
    /// { "channelId": "!room:example.org", "players": ["@a:example.org", "@b:example.org"] }
    /// ```
    ///
    /// The engine answers `{ "id": "game-id" }` or a non-success status when
    /// it cannot build a game from these players.
    async fn start_game(
        &self,
        channel_id: &str,
        players: &[String],
    ) -> Result<GameHandle, SetupError> {
        let url = format!("{}/api/games", &self.url);
        info!("request new game for channel {}", channel_id);
        debug!("request {} with players {:?}", &url, players);

        let response = self
            .client
            .post(&url)
            .json(&CreateGameRequest {
                channel_id,
                players,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let reason = response.text().await.unwrap_or_default();
            return Err(SetupError::Rejected(format!("{} {}", status, reason)));
        }

        let created: CreateGameResponse = response.json().await?;
        debug!("response from {} -> {:?}", &url, &created);

        Ok(GameHandle(created.id))
    }

    /// Request `GET /api/game?id={id}`.
    ///
    /// ```text
    /// { "id": "game-id", "phase": "end", "faction": "village", "winners": ["@a:example.org"] }
    /// ```
    async fn game_outcome(&self, handle: &GameHandle) -> Result<Option<GameOutcome>, EngineError> {
        let url = format!("{}/api/game", &self.url);
        debug!("request {}?id={}", &url, handle);

        let status: GameStatusResponse = self
            .client
            .get(&url)
            .query(&[("id", &handle.0)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!("response from {}?id={} -> {:?}", &url, handle, &status);

        if status.phase != END_PHASE {
            return Ok(None);
        }

        info!("game {} is over", status.id);
        Ok(Some(GameOutcome {
            faction: status.faction.unwrap_or_else(|| "nobody".to_owned()),
            winners: status.winners,
        }))
    }
}
