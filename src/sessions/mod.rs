//! Per-channel game sessions.
//!
//! This module owns everything that lives between the first `signup` in a
//! channel and the eviction of its finished session:
//!
//! - [`Session`]: the state machine of one channel (`SIGNUP`, `STARTING`,
//!   `RUNNING`, `TERMINATED`)
//! - [`SessionRegistry`]: the process-wide map from channel to session, with
//!   one exclusivity scope per channel
//! - [`IdleSweeper`]: the background task reclaiming abandoned signups
//!
//! # Concurrency
//!
//! Commands for the same channel are serialized through that channel's
//! [`ChannelGuard`]; commands for different channels never wait on each
//! other. Readers use published snapshots and never wait on a guard.

mod registry;
mod session;
mod sweeper;

use thiserror::Error;

pub use crate::sessions::registry::{ChannelGuard, CreateOutcome, SessionRegistry};
pub use crate::sessions::session::{Session, SessionId, SessionState, Termination};
pub use crate::sessions::sweeper::IdleSweeper;

/// Minimum and maximum number of signed-up players a game accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerLimits {
    pub min: usize,
    pub max: usize,
}

/// Recoverable outcomes of session operations.
///
/// None of these are fatal: the dispatcher turns each into a chat reply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("user is already signed up")]
    AlreadySignedUp,
    #[error("user is not signed up")]
    NotSignedUp,
    #[error("session is full ({max} players)")]
    SessionFull { max: usize },
    #[error("not enough players ({signed_up}/{min})")]
    NotEnoughPlayers { signed_up: usize, min: usize },
    #[error("operation not allowed while the session is {0}")]
    WrongState(SessionState),
    #[error("the session is gone")]
    SessionGone,
    #[error("game setup failed: {0}")]
    Setup(String),
    #[error("user is not allowed to do that")]
    Unauthorized,
}
