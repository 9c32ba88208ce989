//! Chat transport boundary.
//!
//! The host only ever talks to the chat platform through this module: inbound
//! text arrives as an [`InboundMessage`], outbound text leaves as a [`Reply`]
//! handed to a [`ChatTransport`]. Delivery failures are the transport's
//! concern and never flow back into the session logic.

use async_trait::async_trait;
use mockall::automock;

/// A text message received in a channel the bot has joined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Raw message text
    pub body: String,
    /// Channel (room) the message was posted in
    pub channel_id: String,
    /// User who posted the message
    pub author_id: String,
    /// Guild (server) the channel belongs to
    pub guild_id: String,
}

/// Outbound text for a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Channel the text is sent to
    pub channel_id: String,
    /// Markdown body
    pub body: String,
}

impl Reply {
    pub fn new(channel_id: &str, body: impl Into<String>) -> Self {
        Reply {
            channel_id: channel_id.to_owned(),
            body: body.into(),
        }
    }
}

/// Sends text to the chat platform.
///
/// Fire-and-forget from the caller's point of view: implementations log
/// delivery failures themselves.
#[automock]
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Sends `text` to `channel_id`.
    async fn send_message(&self, channel_id: &str, text: &str);
}

/// Delivers a batch of replies in order.
pub async fn deliver(transport: &dyn ChatTransport, replies: Vec<Reply>) {
    for reply in replies {
        transport.send_message(&reply.channel_id, &reply.body).await;
    }
}
