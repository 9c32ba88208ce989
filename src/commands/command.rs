//! Command grammar.
//!
//! A command is a chat message starting with the configured prefix, followed
//! by a command name and whitespace separated arguments:
//!
//! ```text
//! w.signup
//! w.guildstats example.org
//! ```
//!
//! There is no quoting or escaping.

use log::debug;

use crate::chat::InboundMessage;

/// A parsed command, consumed by exactly one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    /// Message text as received
    pub raw_text: String,
    pub channel_id: String,
    pub author_id: String,
    pub guild_id: String,
    /// Lowercased command name
    pub name: String,
    /// Arguments with their original case
    pub args: Vec<String>,
}

impl CommandInvocation {
    /// Parses `message` as a command.
    ///
    /// Returns `None` when the message does not start with `prefix` (case
    /// sensitive) or when nothing follows the prefix.
    ///
    /// # Examples
    ///
    /// ```
    /// let invocation = CommandInvocation::parse("w.", &message).unwrap();
    /// assert_eq!(invocation.name, "signup");
    /// ```
    pub fn parse(prefix: &str, message: &InboundMessage) -> Option<Self> {
        let remainder = message.body.strip_prefix(prefix)?;

        let mut tokens = remainder.split_whitespace();
        let name = tokens.next()?.to_lowercase();
        let args: Vec<String> = tokens.map(str::to_owned).collect();

        debug!("parsed command {} with arguments {:?}", name, args);

        Some(CommandInvocation {
            raw_text: message.body.clone(),
            channel_id: message.channel_id.clone(),
            author_id: message.author_id.clone(),
            guild_id: message.guild_id.clone(),
            name,
            args,
        })
    }
}
