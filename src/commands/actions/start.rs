//! Start command handler.
//!
//! Starting is atomic with the rules engine call: the channel stays locked
//! from `SIGNUP -> STARTING` until the game is `RUNNING` or the session is
//! terminated, so nothing can sign up or cancel in between. The call is
//! bounded by the configured start timeout and only ever blocks this channel.

use async_trait::async_trait;
use log::{debug, error, info, warn};
use tokio::time::timeout;

use crate::{
    commands::{
        Command, CommandContext, DispatchError, SessionAccess, SessionScope,
        markdown_response::format_game_started,
    },
    game::SetupError,
    sessions::SessionError,
};

pub struct Start;

#[async_trait]
impl Command for Start {
    fn name(&self) -> &'static str {
        "start"
    }

    fn usage(&self, prefix: &str) -> String {
        format!(
            "`{}start`: start the game with the signed up players",
            prefix
        )
    }

    fn access(&self) -> SessionAccess {
        SessionAccess::Existing
    }

    async fn execute(
        &self,
        ctx: &CommandContext<'_>,
        scope: SessionScope<'_>,
    ) -> Result<String, DispatchError> {
        debug!("handling start command: {:?}", ctx.invocation);

        let (guard, _) = scope.into_guard()?;
        let channel_id = &ctx.invocation.channel_id;

        let (session_id, players) = {
            let session = guard.session_mut()?;
            session.begin_start(
                &ctx.invocation.author_id,
                ctx.is_privileged(),
                ctx.settings.limits,
            )?;
            (session.id(), session.signed_up_players().to_vec())
        };
        // Readers see STARTING while the engine works
        guard.publish();
        info!(
            "starting session {} in channel {} with {} players",
            session_id,
            channel_id,
            players.len()
        );

        let started = timeout(
            ctx.settings.start_timeout,
            ctx.rules_engine.start_game(channel_id, &players),
        )
        .await
        .unwrap_or(Err(SetupError::Timeout));

        let session = guard.session_mut()?;
        match started {
            Ok(handle) => {
                session.mark_running(handle.clone())?;
                info!("session {} is running game {}", session_id, handle);
                Ok(format_game_started(&handle, &players))
            }
            Err(e) => {
                match e {
                    SetupError::Timeout => warn!("session {}: {}", session_id, e),
                    _ => error!("session {}: {}", session_id, e),
                }
                session.fail_start(&e.to_string())?;
                Err(SessionError::Setup(e.to_string()).into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        commands::test_support::*,
        game::{EngineError, GameHandle, GameOutcome, RulesEngine},
        sessions::{SessionState, Termination},
    };
    use std::time::Duration;

    /// Engine that never answers in time.
    struct StuckEngine;

    #[async_trait]
    impl RulesEngine for StuckEngine {
        async fn start_game(
            &self,
            _channel_id: &str,
            _players: &[String],
        ) -> Result<GameHandle, SetupError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(GameHandle("late".to_owned()))
        }

        async fn game_outcome(
            &self,
            _handle: &GameHandle,
        ) -> Result<Option<GameOutcome>, EngineError> {
            Ok(None)
        }
    }

    fn terminated(harness: &Harness) -> crate::sessions::Session {
        harness.sessions.list_all().pop().unwrap()
    }

    #[tokio::test]
    async fn test_start_runs_the_game() {
        let mut harness = Harness::new();
        harness
            .rules_engine
            .expect_start_game()
            .times(1)
            .withf(|channel_id, players| {
                channel_id == CHANNEL && players == [ALICE.to_owned(), BOB.to_owned()]
            })
            .returning(|_, _| Ok(GameHandle("game1".to_owned())));
        harness.open_session(ALICE, &[ALICE, BOB]).await;

        let reply = harness
            .run_exclusive(&Start, &invocation(BOB, "start", &[]))
            .await
            .unwrap();

        assert!(reply.contains("**game1**"));
        let session = harness.session().unwrap();
        assert_eq!(session.state(), SessionState::Running);
        assert_eq!(session.game_handle(), Some(&GameHandle("game1".to_owned())));
    }

    #[tokio::test]
    async fn test_start_below_minimum_leaves_signup() {
        let mut harness = Harness::new();
        harness.rules_engine.expect_start_game().never();
        harness.open_session(ALICE, &[ALICE]).await;

        let result = harness
            .run_exclusive(&Start, &invocation(ALICE, "start", &[]))
            .await;

        assert_eq!(
            result,
            Err(SessionError::NotEnoughPlayers { signed_up: 1, min: 2 }.into())
        );
        assert_eq!(harness.session().unwrap().state(), SessionState::Signup);
    }

    #[tokio::test]
    async fn test_start_by_outsider_is_unauthorized() {
        let mut harness = Harness::new();
        harness.rules_engine.expect_start_game().never();
        harness.open_session(ALICE, &[ALICE, BOB]).await;

        let result = harness
            .run_exclusive(&Start, &invocation(CAROL, "start", &[]))
            .await;

        assert_eq!(result, Err(SessionError::Unauthorized.into()));
    }

    #[tokio::test]
    async fn test_start_by_privileged_outsider() {
        let mut harness = Harness::new();
        harness
            .rules_engine
            .expect_start_game()
            .times(1)
            .returning(|_, _| Ok(GameHandle("game1".to_owned())));
        harness.open_session(ALICE, &[ALICE, BOB]).await;

        let result = harness
            .run_exclusive(&Start, &invocation(ADMIN, "start", &[]))
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_start_rejected_by_engine_terminates_session() {
        let mut harness = Harness::new();
        harness
            .rules_engine
            .expect_start_game()
            .times(1)
            .returning(|_, _| Err(SetupError::Rejected("422 no roles".to_owned())));
        harness.open_session(ALICE, &[ALICE, BOB]).await;

        let result = harness
            .run_exclusive(&Start, &invocation(ALICE, "start", &[]))
            .await;

        match result {
            Err(DispatchError::Session(SessionError::Setup(reason))) => {
                assert!(reason.contains("422 no roles"))
            }
            other => panic!("Expected Setup error, got {:?}", other),
        }
        assert!(harness.session().is_none());
        let session = terminated(&harness);
        assert_eq!(session.state(), SessionState::Terminated);
        assert!(matches!(
            session.termination(),
            Some(Termination::SetupFailed(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_timeout_terminates_session() {
        let harness = Harness::new();
        harness.open_session(ALICE, &[ALICE, BOB]).await;
        let invocation = invocation(ALICE, "start", &[]);
        let engine = StuckEngine;
        let mut ctx = harness.context(&invocation);
        ctx.rules_engine = &engine;

        let mut guard = harness.sessions.lock_existing(CHANNEL).await.unwrap();
        let result = Start
            .execute(
                &ctx,
                SessionScope::Exclusive {
                    guard: &mut guard,
                    created: false,
                },
            )
            .await;
        drop(guard);

        assert_eq!(
            result,
            Err(SessionError::Setup(SetupError::Timeout.to_string()).into())
        );
        assert_eq!(
            terminated(&harness).termination(),
            Some(&Termination::SetupFailed(SetupError::Timeout.to_string()))
        );
    }

    #[tokio::test]
    async fn test_second_start_on_starting_session_loses() {
        let mut harness = Harness::new();
        harness.rules_engine.expect_start_game().never();
        harness.open_session(ALICE, &[ALICE, BOB]).await;

        let invocation = invocation(BOB, "start", &[]);
        let ctx = harness.context(&invocation);
        let mut guard = harness.sessions.lock_existing(CHANNEL).await.unwrap();
        guard
            .session_mut()
            .unwrap()
            .begin_start(ALICE, false, harness.settings.limits)
            .unwrap();
        guard.publish();
        assert_eq!(harness.session().unwrap().state(), SessionState::Starting);

        let result = Start
            .execute(
                &ctx,
                SessionScope::Exclusive {
                    guard: &mut guard,
                    created: false,
                },
            )
            .await;

        assert_eq!(
            result,
            Err(SessionError::WrongState(SessionState::Starting).into())
        );
    }
}
