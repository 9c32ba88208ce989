//! Detection of finished games.
//!
//! This module provides the [`GameWatcher`] that periodically asks the rules
//! engine about every running game and turns finished ones into session
//! terminations through the dispatcher.

use std::{sync::Arc, time::Duration};

use futures::future::join_all;
use log::{debug, error, info};
use tokio::time;

use crate::{
    chat::{ChatTransport, Reply, deliver},
    commands::Dispatcher,
    game::{EngineError, GameHandle},
    sessions::SessionState,
};

/// Polls the rules engine for the outcome of running games.
pub struct GameWatcher {
    dispatcher: Arc<Dispatcher>,
    /// Bound on each `game_outcome` request
    poll_timeout: Duration,
}

impl GameWatcher {
    pub fn new(dispatcher: Arc<Dispatcher>, poll_timeout: Duration) -> Self {
        GameWatcher {
            dispatcher,
            poll_timeout,
        }
    }

    /// Polls every running game once and returns the end-of-game
    /// announcements.
    pub async fn poll(&self) -> Vec<Reply> {
        let handles: Vec<GameHandle> = self
            .dispatcher
            .sessions()
            .list_all()
            .into_iter()
            .filter(|session| session.state() == SessionState::Running)
            .filter_map(|session| session.game_handle().cloned())
            .collect();

        if handles.is_empty() {
            return Vec::new();
        }
        debug!("polling {} running games", handles.len());

        // A game the engine does not answer for is retried at the next poll
        let rules_engine = self.dispatcher.rules_engine();
        let poll_timeout = self.poll_timeout;
        let outcomes = join_all(handles.iter().map(|handle| async move {
            time::timeout(poll_timeout, rules_engine.game_outcome(handle))
                .await
                .unwrap_or(Err(EngineError::Timeout))
        }))
        .await;

        let mut replies = Vec::new();
        for (handle, outcome) in handles.iter().zip(outcomes) {
            match outcome {
                Ok(Some(outcome)) => {
                    if let Some(reply) = self.dispatcher.on_game_ended(handle, outcome).await {
                        replies.push(reply);
                    }
                }
                Ok(None) => debug!("game {} is still running", handle),
                Err(e) => error!("error while polling game {}: {}", handle, e),
            }
        }

        replies
    }

    /// Starts the polling loop in the background.
    ///
    /// # Arguments
    ///
    /// * `interval` - Time between two polls
    /// * `transport` - Receives the end-of-game announcements
    pub fn start(self, interval: Duration, transport: Arc<dyn ChatTransport>) {
        tokio::spawn(async move {
            info!(
                "polling running games every {} seconds",
                interval.as_secs()
            );
            let mut interval = time::interval(interval);

            loop {
                interval.tick().await;
                let replies = self.poll().await;
                deliver(transport.as_ref(), replies).await;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        commands::{CommandSettings, test_support::settings},
        game::{GameOutcome, MockRulesEngine, RulesEngine, SetupError},
        sessions::{PlayerLimits, SessionRegistry},
        stats::MockStatsStore,
    };
    use async_trait::async_trait;

    const POLL_TIMEOUT: Duration = Duration::from_secs(10);

    const GUILD: &str = "example.org";
    const LIMITS: PlayerLimits = PlayerLimits { min: 2, max: 10 };

    async fn run_game(sessions: &SessionRegistry, channel_id: &str, game_id: &str) {
        let (mut guard, _) = sessions.open(channel_id, GUILD, "@alice:example.org").await;
        let session = guard.session_mut().unwrap();
        session.signup("@alice:example.org", LIMITS).unwrap();
        session.signup("@bob:example.org", LIMITS).unwrap();
        session
            .begin_start("@alice:example.org", false, LIMITS)
            .unwrap();
        session
            .mark_running(GameHandle(game_id.to_owned()))
            .unwrap();
    }

    fn watcher(
        sessions: &Arc<SessionRegistry>,
        rules_engine: impl RulesEngine + 'static,
        stats: MockStatsStore,
    ) -> GameWatcher {
        let settings: CommandSettings = settings();
        GameWatcher::new(
            Arc::new(Dispatcher::new(
                settings,
                Arc::clone(sessions),
                Arc::new(rules_engine),
                Arc::new(stats),
            )),
            POLL_TIMEOUT,
        )
    }

    /// Engine that never answers for the game `stuck` and reports every
    /// other game as won by the wolves.
    struct StuckEngine;

    #[async_trait]
    impl RulesEngine for StuckEngine {
        async fn start_game(
            &self,
            _channel_id: &str,
            _players: &[String],
        ) -> Result<GameHandle, SetupError> {
            Err(SetupError::Rejected("not used".to_owned()))
        }

        async fn game_outcome(
            &self,
            handle: &GameHandle,
        ) -> Result<Option<GameOutcome>, EngineError> {
            if handle.0 == "stuck" {
                std::future::pending::<()>().await;
            }
            Ok(Some(outcome()))
        }
    }

    fn outcome() -> GameOutcome {
        GameOutcome {
            faction: "wolves".to_owned(),
            winners: vec!["@bob:example.org".to_owned()],
        }
    }

    #[tokio::test]
    async fn test_poll_without_running_games() {
        let sessions = Arc::new(SessionRegistry::new());
        sessions
            .create_if_absent("!room:example.org", GUILD, "@alice:example.org")
            .await;
        let mut rules_engine = MockRulesEngine::new();
        rules_engine.expect_game_outcome().never();

        let replies = watcher(&sessions, rules_engine, MockStatsStore::new())
            .poll()
            .await;

        assert!(replies.is_empty());
    }

    #[tokio::test]
    async fn test_poll_ends_finished_games_only() {
        let sessions = Arc::new(SessionRegistry::new());
        run_game(&sessions, "!one:example.org", "game1").await;
        run_game(&sessions, "!two:example.org", "game2").await;

        let mut rules_engine = MockRulesEngine::new();
        rules_engine
            .expect_game_outcome()
            .times(2)
            .returning(|handle| match handle.0.as_str() {
                "game1" => Ok(Some(outcome())),
                _ => Ok(None),
            });
        let mut stats = MockStatsStore::new();
        stats
            .expect_record_completed_game()
            .times(1)
            .withf(|channel_id, guild_id, players, recorded| {
                channel_id == "!one:example.org"
                    && guild_id == GUILD
                    && players
                        .iter()
                        .eq(["@alice:example.org", "@bob:example.org"])
                    && *recorded == outcome()
            })
            .returning(|_, _, _, _| Ok(()));

        let replies = watcher(&sessions, rules_engine, stats).poll().await;

        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].channel_id, "!one:example.org");
        assert!(sessions.get_or_none("!one:example.org").is_none());
        assert_eq!(
            sessions.get_or_none("!two:example.org").unwrap().state(),
            SessionState::Running
        );
    }

    #[tokio::test]
    async fn test_poll_error_keeps_game_running() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/game")
            .match_query(mockito::Matcher::Any)
            .with_status(500)
            .create_async()
            .await;
        let transport_error = reqwest::get(format!("{}/api/game", server.url()))
            .await
            .unwrap()
            .error_for_status()
            .unwrap_err();

        let sessions = Arc::new(SessionRegistry::new());
        run_game(&sessions, "!one:example.org", "game1").await;

        let mut rules_engine = MockRulesEngine::new();
        let mut error = Some(EngineError::Transport(transport_error));
        rules_engine
            .expect_game_outcome()
            .times(1)
            .returning(move |_| match error.take() {
                Some(e) => Err(e),
                None => Ok(None),
            });
        let mut stats = MockStatsStore::new();
        stats.expect_record_completed_game().never();

        let replies = watcher(&sessions, rules_engine, stats).poll().await;

        assert!(replies.is_empty());
        assert_eq!(
            sessions.get_or_none("!one:example.org").unwrap().state(),
            SessionState::Running
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unanswered_poll_does_not_block_other_games() {
        let sessions = Arc::new(SessionRegistry::new());
        run_game(&sessions, "!done:example.org", "done").await;
        run_game(&sessions, "!stuck:example.org", "stuck").await;
        let mut stats = MockStatsStore::new();
        stats
            .expect_record_completed_game()
            .times(1)
            .withf(|channel_id, _, _, _| channel_id == "!done:example.org")
            .returning(|_, _, _, _| Ok(()));
        let watcher = watcher(&sessions, StuckEngine, stats);

        let started = time::Instant::now();
        let replies = time::timeout(Duration::from_secs(24 * 60 * 60), watcher.poll())
            .await
            .unwrap();

        assert_eq!(started.elapsed(), POLL_TIMEOUT);
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].channel_id, "!done:example.org");
        assert!(sessions.get_or_none("!done:example.org").is_none());
        assert_eq!(
            sessions.get_or_none("!stuck:example.org").unwrap().state(),
            SessionState::Running
        );
    }
}
