//! Matrix implementation of the chat transport.
//!
//! The [`MatrixClient`] logs the bot in (or restores its previous login),
//! turns text messages of joined rooms into [`InboundMessage`]s and sends
//! replies back as Markdown.
//!
//! [`InboundMessage`]: crate::chat::InboundMessage
//!
//! # Storage
//!
//! The store directory holds:
//! - `login`: JSON file with the Matrix session and the last sync token
//! - `sqlite`: SQLite database of the Matrix SDK, encrypted with the passphrase

mod client;
mod login;
mod store;
mod sync;

pub use crate::matrix::client::MatrixClient;
