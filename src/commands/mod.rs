//! Bot command parsing, routing and execution.
//!
//! # Overview
//!
//! Every inbound chat message goes through the [`Dispatcher`]:
//!
//! ```text
//! InboundMessage
//!      │
//!      ▼
//! ┌──────────────────┐
//! │ CommandInvocation│  ← parse: prefix, name, arguments (or ignore)
//! └──────────────────┘
//!      │
//!      ▼
//! ┌──────────────────┐
//! │ CommandRegistry  │  ← resolve by name (unknown: silent or hint)
//! └──────────────────┘
//!      │
//!      ▼
//! ┌──────────────────┐
//! │ Command::validate│  ← invalid arguments: reply with usage
//! └──────────────────┘
//!      │
//!      ▼
//! ┌──────────────────┐
//! │ SessionAccess    │  ← none, snapshot, or the channel's exclusivity scope
//! └──────────────────┘
//!      │
//!      ▼
//! ┌──────────────────┐
//! │ Command::execute │  → Reply for the chat transport
//! └──────────────────┘
//! ```
//!
//! # Available Commands
//!
//! | Command | Arguments | Session access |
//! |---------|-----------|----------------|
//! | `help` | `[command]` | none |
//! | `signup` | none | opened if absent, exclusive |
//! | `unsignup` | none | existing, exclusive |
//! | `start` | none | existing, exclusive |
//! | `cancel` | none | existing, exclusive |
//! | `signups` | none | snapshot |
//! | `guildstats` | `[guild id]` | none |
//!
//! # Error Handling
//!
//! Every failure is a [`DispatchError`] rendered as a chat reply; nothing
//! escapes the dispatcher.

use std::{collections::HashSet, time::Duration};

use async_trait::async_trait;
use thiserror::Error;

mod actions;
mod command;
mod dispatcher;
pub mod markdown_response;
mod registry;

pub use crate::commands::command::CommandInvocation;
pub use crate::commands::dispatcher::Dispatcher;
pub use crate::commands::registry::CommandRegistry;

use crate::{
    config::{Config, UnknownCommandPolicy},
    game::RulesEngine,
    sessions::{ChannelGuard, PlayerLimits, Session, SessionError, SessionRegistry},
    stats::StatsStore,
};

/// Settings shared by every command, fixed at startup.
#[derive(Debug, Clone)]
pub struct CommandSettings {
    pub prefix: String,
    pub unknown_command: UnknownCommandPolicy,
    pub privileged_users: HashSet<String>,
    pub limits: PlayerLimits,
    /// Bound of the rules engine call made by `start`
    pub start_timeout: Duration,
}

impl From<&Config> for CommandSettings {
    fn from(config: &Config) -> Self {
        CommandSettings {
            prefix: config.bot.prefix.clone(),
            unknown_command: config.bot.unknown_command,
            privileged_users: config.bot.privileged_users.iter().cloned().collect(),
            limits: config.session.limits(),
            start_timeout: config.session.start_timeout(),
        }
    }
}

/// Everything a command may read while executing.
pub struct CommandContext<'a> {
    pub invocation: &'a CommandInvocation,
    pub settings: &'a CommandSettings,
    pub sessions: &'a SessionRegistry,
    pub rules_engine: &'a dyn RulesEngine,
    pub stats: &'a dyn StatsStore,
    pub commands: &'a CommandRegistry,
}

impl CommandContext<'_> {
    /// Whether the author may act on sessions they did not create.
    pub fn is_privileged(&self) -> bool {
        self.settings
            .privileged_users
            .contains(&self.invocation.author_id)
    }
}

/// Session access a command needs, resolved by the dispatcher before
/// execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAccess {
    /// No session involved
    Detached,
    /// Read-only snapshot of the channel's session, if any
    Snapshot,
    /// Exclusive access to the channel's live session; fails without one
    Existing,
    /// Exclusive access, opening a session if the channel has none
    OpenOrCreate,
}

/// Session handed to a command, matching its [`SessionAccess`].
pub enum SessionScope<'a> {
    None,
    Snapshot(Option<Session>),
    Exclusive {
        guard: &'a mut ChannelGuard,
        /// The session was opened by this dispatch
        created: bool,
    },
}

impl<'a> SessionScope<'a> {
    /// The exclusive guard, or [`DispatchError::NoSession`] for any other
    /// scope.
    pub fn into_guard(self) -> Result<(&'a mut ChannelGuard, bool), DispatchError> {
        match self {
            SessionScope::Exclusive { guard, created } => Ok((guard, created)),
            _ => Err(DispatchError::NoSession),
        }
    }
}

/// Recoverable dispatch outcomes, each turned into a chat reply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("unknown command {0}")]
    UnknownCommand(String),
    #[error("invalid arguments for {0}")]
    InvalidArguments(&'static str),
    #[error("no session in this channel")]
    NoSession,
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// A chat command, registered once at startup.
#[async_trait]
pub trait Command: Send + Sync {
    /// Lowercase name typed after the prefix
    fn name(&self) -> &'static str;

    /// One-line usage, e.g. `` `w.signup`: sign up for the next game ``
    fn usage(&self, prefix: &str) -> String;

    /// Whether `args` are acceptable; no arguments by default.
    fn validate(&self, args: &[String]) -> bool {
        args.is_empty()
    }

    fn access(&self) -> SessionAccess {
        SessionAccess::Detached
    }

    /// Runs the command and returns the Markdown reply.
    async fn execute(
        &self,
        ctx: &CommandContext<'_>,
        scope: SessionScope<'_>,
    ) -> Result<String, DispatchError>;
}
