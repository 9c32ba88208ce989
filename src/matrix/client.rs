//! Matrix client wrapper.
//!
//! This module provides the [`MatrixClient`] used by the bot both as the
//! source of inbound messages and as its [`ChatTransport`].

use anyhow::Context;
use async_trait::async_trait;
use log::{error, info, warn};
use matrix_sdk::{
    Client,
    ruma::{RoomId, events::room::message::RoomMessageEventContent},
};

use crate::{
    chat::{ChatTransport, InboundMessage},
    config,
    matrix::{login, store::LoginStore, sync::MatrixSync},
};

/// Display name of the bot account
const DISPLAY_NAME: &str = "Howl";

pub struct MatrixClient {
    client: Client,
    store: LoginStore,
}

impl MatrixClient {
    /// Logs the bot in, restoring the login kept in `store_path` when there
    /// is one.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened or the login fails.
    pub async fn new(credentials: &config::Matrix, store_path: &str) -> anyhow::Result<Self> {
        let store = LoginStore::open(store_path)
            .await
            .context("failed to open the matrix login store")?;
        let client = login::connect(credentials, &store)
            .await
            .context("failed to set up the matrix client")?;

        if let Err(e) = client.account().set_display_name(Some(DISPLAY_NAME)).await {
            warn!("failed to set display name: {}", e);
        }

        Ok(MatrixClient { client, store })
    }

    /// Syncs with the homeserver until the connection is lost for good,
    /// calling `on_message` for every new text message.
    pub async fn sync<F>(&self, on_message: F)
    where
        F: Fn(InboundMessage) + Send + Sync + 'static,
    {
        let matrix_sync = MatrixSync::new(&self.client, &self.store);
        match matrix_sync.sync(on_message).await {
            Ok(_) => info!("matrix sync ended"),
            Err(e) => error!("matrix sync ended with error: {:?}", e),
        }
    }
}

#[async_trait]
impl ChatTransport for MatrixClient {
    /// Sends `text` as Markdown to the room `channel_id`.
    async fn send_message(&self, channel_id: &str, text: &str) {
        let room_id = match RoomId::parse(channel_id) {
            Ok(room_id) => room_id,
            Err(e) => {
                error!("cannot send to invalid room id {}: {}", channel_id, e);
                return;
            }
        };
        let Some(room) = self.client.get_room(&room_id) else {
            warn!("cannot send to unknown room {}", channel_id);
            return;
        };

        let content = RoomMessageEventContent::text_markdown(text);
        if let Err(e) = room.send(content).await {
            error!("failed to send message to {}: {:?}", channel_id, e);
        }
    }
}
