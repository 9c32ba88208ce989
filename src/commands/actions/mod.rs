//! Command handlers.
//!
//! Each handler is a stateless [`Command`](crate::commands::Command)
//! registered once at startup. Handlers never talk to the chat transport:
//! they return the Markdown reply and the dispatcher sends it.
//!
//! # Available Handlers
//!
//! - [`Help`] - list commands or show the usage of one
//! - [`Signup`] - open signups if needed and sign the author up
//! - [`Unsignup`] - remove the author from the signups
//! - [`Start`] - hand the players to the rules engine
//! - [`Cancel`] - close signups (creator or privileged users)
//! - [`Signups`] - show the session of the channel
//! - [`GuildStats`] - show the statistics of a guild

mod cancel;
mod guild_stats;
mod help;
mod signup;
mod signups;
mod start;
mod unsignup;

pub use crate::commands::actions::{
    cancel::Cancel, guild_stats::GuildStats, help::Help, signup::Signup, signups::Signups,
    start::Start, unsignup::Unsignup,
};
