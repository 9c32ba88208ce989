//! Command dispatcher.
//!
//! This module provides the [`Dispatcher`], the single entry point for inbound
//! messages and for games reported as ended by the rules engine.
//!
//! # Flow
//!
//! ```text
//! InboundMessage → parse → resolve → validate → session access → execute → Reply
//! ```
//!
//! Parsing, resolution and validation run before any channel is locked; only
//! session inspection and transitions run inside the exclusivity scope. The
//! dispatcher performs no network I/O of its own: replies are returned to the
//! caller, which hands them to the chat transport.

use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::{
    chat::{InboundMessage, Reply},
    commands::{
        Command, CommandContext, CommandInvocation, CommandRegistry, CommandSettings,
        DispatchError, SessionAccess, SessionScope,
        markdown_response::{format_error, format_game_ended, format_usage},
    },
    config::UnknownCommandPolicy,
    game::{GameHandle, GameOutcome, RulesEngine},
    sessions::{ChannelGuard, SessionRegistry},
    stats::StatsStore,
};

/// Routes inbound messages to commands and their channel's session.
///
/// # Examples
///
/// ```no_run
/// let dispatcher = Dispatcher::new(settings, sessions, rules_engine, stats);
/// if let Some(reply) = dispatcher.dispatch(&message).await {
///     transport.send_message(&reply.channel_id, &reply.body).await;
/// }
/// ```
pub struct Dispatcher {
    commands: CommandRegistry,
    settings: CommandSettings,
    sessions: Arc<SessionRegistry>,
    rules_engine: Arc<dyn RulesEngine>,
    stats: Arc<dyn StatsStore>,
}

impl Dispatcher {
    pub fn new(
        settings: CommandSettings,
        sessions: Arc<SessionRegistry>,
        rules_engine: Arc<dyn RulesEngine>,
        stats: Arc<dyn StatsStore>,
    ) -> Self {
        Dispatcher {
            commands: CommandRegistry::with_default_commands(),
            settings,
            sessions,
            rules_engine,
            stats,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    pub fn rules_engine(&self) -> &Arc<dyn RulesEngine> {
        &self.rules_engine
    }

    /// Handles one inbound message.
    ///
    /// Returns the reply to post, or `None` when the message is not a
    /// command or is an unknown command under the silent policy.
    pub async fn dispatch(&self, message: &InboundMessage) -> Option<Reply> {
        let invocation = CommandInvocation::parse(&self.settings.prefix, message)?;
        let prefix = &self.settings.prefix;

        let Some(command) = self.commands.get(&invocation.name) else {
            debug!("unknown command {}", invocation.name);
            return match self.settings.unknown_command {
                UnknownCommandPolicy::Silent => None,
                UnknownCommandPolicy::Hint => Some(Reply::new(
                    &invocation.channel_id,
                    format_error(&DispatchError::UnknownCommand(invocation.name.clone()), prefix),
                )),
            };
        };

        let body = match self.run(command, &invocation).await {
            Ok(body) => body,
            Err(DispatchError::InvalidArguments(_)) => format_usage(&command.usage(prefix)),
            Err(e) => {
                debug!("{} in channel {}: {}", invocation.name, invocation.channel_id, e);
                format_error(&e, prefix)
            }
        };

        Some(Reply::new(&invocation.channel_id, body))
    }

    async fn run(
        &self,
        command: &dyn Command,
        invocation: &CommandInvocation,
    ) -> Result<String, DispatchError> {
        if !command.validate(&invocation.args) {
            return Err(DispatchError::InvalidArguments(command.name()));
        }

        let ctx = CommandContext {
            invocation,
            settings: &self.settings,
            sessions: &self.sessions,
            rules_engine: self.rules_engine.as_ref(),
            stats: self.stats.as_ref(),
            commands: &self.commands,
        };
        let channel_id = &invocation.channel_id;

        match command.access() {
            SessionAccess::Detached => command.execute(&ctx, SessionScope::None).await,
            SessionAccess::Snapshot => {
                let snapshot = self.sessions.get_or_none(channel_id);
                command
                    .execute(&ctx, SessionScope::Snapshot(snapshot))
                    .await
            }
            SessionAccess::Existing => {
                let guard = self
                    .sessions
                    .lock_existing(channel_id)
                    .await
                    .ok_or(DispatchError::NoSession)?;
                Self::run_exclusive(command, &ctx, guard, false).await
            }
            SessionAccess::OpenOrCreate => {
                let (guard, outcome) = self
                    .sessions
                    .open(channel_id, &invocation.guild_id, &invocation.author_id)
                    .await;
                Self::run_exclusive(command, &ctx, guard, outcome.is_created()).await
            }
        }
    }

    /// Executes `command` inside the channel's exclusivity scope and evicts
    /// the session if the command terminated it.
    async fn run_exclusive(
        command: &dyn Command,
        ctx: &CommandContext<'_>,
        mut guard: ChannelGuard,
        created: bool,
    ) -> Result<String, DispatchError> {
        let result = command
            .execute(
                ctx,
                SessionScope::Exclusive {
                    guard: &mut guard,
                    created,
                },
            )
            .await;

        if guard.session().is_some_and(|session| !session.is_live()) {
            guard.evict();
        }

        result
    }

    /// Terminates the session running `handle` after the rules engine
    /// reported its end.
    ///
    /// The session is evicted before statistics are recorded; a failed
    /// statistics write is logged and does not undo the termination.
    pub async fn on_game_ended(&self, handle: &GameHandle, outcome: GameOutcome) -> Option<Reply> {
        let Some(channel_id) = self.sessions.find_by_game(handle) else {
            warn!("game {} ended but no session runs it", handle);
            return None;
        };

        let (guild_id, players) = {
            let Some(mut guard) = self.sessions.lock_existing(&channel_id).await else {
                warn!("session of game {} is gone", handle);
                return None;
            };

            let finished = guard.session_mut().and_then(|session| {
                session.finish(handle, outcome.clone())?;
                Ok((
                    session.guild_id().to_owned(),
                    session.signed_up_players().to_vec(),
                ))
            });
            let (guild_id, players) = match finished {
                Ok(finished) => finished,
                Err(e) => {
                    warn!("cannot end game {} in channel {}: {}", handle, channel_id, e);
                    return None;
                }
            };

            guard.evict();
            (guild_id, players)
        };
        info!("game {} in channel {} won by {}", handle, channel_id, outcome.faction);

        if let Err(e) = self
            .stats
            .record_completed_game(&channel_id, &guild_id, &players, &outcome)
            .await
        {
            error!("failed to record game {}: {}", handle, e);
        }

        Some(Reply::new(&channel_id, format_game_ended(&outcome)))
    }
}
