//! State machine of a single channel's game session.
//!
//! ```text
//! SIGNUP ──start──▶ STARTING ──engine ok──▶ RUNNING ──game ended──▶ TERMINATED
//!   │                  └──────engine failed───────────────────────▶ TERMINATED
//!   └──cancel / idle timeout──────────────────────────────────────▶ TERMINATED
//! ```
//!
//! A [`Session`] never synchronizes anything itself: the registry hands out
//! `&mut Session` only inside the channel's exclusivity scope.

use std::fmt;

use log::debug;
use tokio::time::{Duration, Instant};

use crate::{
    game::{GameHandle, GameOutcome},
    sessions::{PlayerLimits, SessionError},
};

/// Registry-assigned identity of a session, unique for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Players may sign up and leave
    Signup,
    /// The rules engine is assembling the game
    Starting,
    /// The game is played; lifecycle commands are rejected
    Running,
    /// Final, immutable and eligible for eviction
    Terminated,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            SessionState::Signup => "in signup",
            SessionState::Starting => "starting",
            SessionState::Running => "running",
            SessionState::Terminated => "terminated",
        };
        write!(f, "{}", name)
    }
}

/// Why a session reached `TERMINATED`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// Cancelled by its creator or a privileged user
    Cancelled { by: String },
    /// Reclaimed by the idle sweeper
    IdleTimeout,
    /// The rules engine could not set the game up
    SetupFailed(String),
    /// The game was played to the end
    GameEnded(GameOutcome),
}

/// One channel's game-setup/game-run state.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    channel_id: String,
    guild_id: String,
    creator_id: String,
    /// Signup order is kept for display; membership is unique
    signed_up_players: Vec<String>,
    state: SessionState,
    last_activity_at: Instant,
    game_handle: Option<GameHandle>,
    termination: Option<Termination>,
}

impl Session {
    /// Opens a session in `SIGNUP` with no players.
    pub fn new(id: SessionId, channel_id: &str, guild_id: &str, creator_id: &str) -> Self {
        Session {
            id,
            channel_id: channel_id.to_owned(),
            guild_id: guild_id.to_owned(),
            creator_id: creator_id.to_owned(),
            signed_up_players: Vec::new(),
            state: SessionState::Signup,
            last_activity_at: Instant::now(),
            game_handle: None,
            termination: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn guild_id(&self) -> &str {
        &self.guild_id
    }

    pub fn creator_id(&self) -> &str {
        &self.creator_id
    }

    pub fn signed_up_players(&self) -> &[String] {
        &self.signed_up_players
    }

    pub fn is_signed_up(&self, user_id: &str) -> bool {
        self.signed_up_players.iter().any(|p| p == user_id)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_live(&self) -> bool {
        self.state != SessionState::Terminated
    }

    pub fn game_handle(&self) -> Option<&GameHandle> {
        self.game_handle.as_ref()
    }

    pub fn termination(&self) -> Option<&Termination> {
        self.termination.as_ref()
    }

    /// Adds `user_id` to the players.
    pub fn signup(&mut self, user_id: &str, limits: PlayerLimits) -> Result<(), SessionError> {
        self.expect_state(SessionState::Signup)?;

        if self.is_signed_up(user_id) {
            return Err(SessionError::AlreadySignedUp);
        }
        if self.signed_up_players.len() >= limits.max {
            return Err(SessionError::SessionFull { max: limits.max });
        }

        self.signed_up_players.push(user_id.to_owned());
        self.touch();
        debug!("{} signed up in session {}", user_id, self.id);
        Ok(())
    }

    /// Removes `user_id` from the players.
    pub fn unsignup(&mut self, user_id: &str) -> Result<(), SessionError> {
        self.expect_state(SessionState::Signup)?;

        let Some(position) = self.signed_up_players.iter().position(|p| p == user_id) else {
            return Err(SessionError::NotSignedUp);
        };

        self.signed_up_players.remove(position);
        self.touch();
        debug!("{} left session {}", user_id, self.id);
        Ok(())
    }

    /// Terminates the session on behalf of its creator or a privileged user.
    pub fn cancel(&mut self, actor_id: &str, privileged: bool) -> Result<(), SessionError> {
        self.expect_state(SessionState::Signup)?;

        if actor_id != self.creator_id && !privileged {
            return Err(SessionError::Unauthorized);
        }

        self.terminate(Termination::Cancelled {
            by: actor_id.to_owned(),
        });
        Ok(())
    }

    /// Moves `SIGNUP -> STARTING` if the player policy is met.
    ///
    /// Only signed-up players and privileged users may start a game.
    pub fn begin_start(
        &mut self,
        actor_id: &str,
        privileged: bool,
        limits: PlayerLimits,
    ) -> Result<(), SessionError> {
        self.expect_state(SessionState::Signup)?;

        if !privileged && !self.is_signed_up(actor_id) {
            return Err(SessionError::Unauthorized);
        }

        let signed_up = self.signed_up_players.len();
        if signed_up < limits.min {
            return Err(SessionError::NotEnoughPlayers {
                signed_up,
                min: limits.min,
            });
        }
        if signed_up > limits.max {
            return Err(SessionError::SessionFull { max: limits.max });
        }

        self.state = SessionState::Starting;
        self.touch();
        Ok(())
    }

    /// Moves `STARTING -> RUNNING` once the engine has built the game.
    pub fn mark_running(&mut self, handle: GameHandle) -> Result<(), SessionError> {
        self.expect_state(SessionState::Starting)?;

        self.game_handle = Some(handle);
        self.state = SessionState::Running;
        self.touch();
        Ok(())
    }

    /// Moves `STARTING -> TERMINATED` after an engine failure.
    pub fn fail_start(&mut self, reason: &str) -> Result<(), SessionError> {
        self.expect_state(SessionState::Starting)?;

        self.terminate(Termination::SetupFailed(reason.to_owned()));
        Ok(())
    }

    /// Moves `RUNNING -> TERMINATED` when the engine reports the end of `handle`.
    pub fn finish(
        &mut self,
        handle: &GameHandle,
        outcome: GameOutcome,
    ) -> Result<(), SessionError> {
        self.expect_state(SessionState::Running)?;

        if self.game_handle.as_ref() != Some(handle) {
            return Err(SessionError::SessionGone);
        }

        self.terminate(Termination::GameEnded(outcome));
        Ok(())
    }

    /// Whether the session sat in `SIGNUP` without activity for at least `timeout`.
    pub fn is_idle(&self, now: Instant, timeout: Duration) -> bool {
        self.state == SessionState::Signup
            && now.saturating_duration_since(self.last_activity_at) >= timeout
    }

    /// Forcibly terminates an abandoned signup.
    pub fn expire(&mut self) -> Result<(), SessionError> {
        self.expect_state(SessionState::Signup)?;

        self.terminate(Termination::IdleTimeout);
        Ok(())
    }

    fn expect_state(&self, expected: SessionState) -> Result<(), SessionError> {
        match self.state {
            SessionState::Terminated => Err(SessionError::SessionGone),
            state if state != expected => Err(SessionError::WrongState(state)),
            _ => Ok(()),
        }
    }

    fn terminate(&mut self, termination: Termination) {
        debug!(
            "session {} in channel {} terminated: {:?}",
            self.id, self.channel_id, termination
        );
        self.state = SessionState::Terminated;
        self.termination = Some(termination);
        self.touch();
    }

    fn touch(&mut self) {
        self.last_activity_at = Instant::now();
    }
}
