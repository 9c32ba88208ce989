//! Matrix synchronization and event handling.
//!
//! [`MatrixSync::sync`] first catches up on what happened while the bot was
//! offline (mostly invites), then hands every new text message of a joined
//! room to the caller, persisting the sync token after each response.

use std::sync::Arc;

use log::{error, info, warn};
use matrix_sdk::{
    Client, LoopCtrl, Room, RoomState,
    config::SyncSettings,
    ruma::{
        api::client::filter::FilterDefinition,
        events::room::{
            member::StrippedRoomMemberEvent,
            message::{MessageType, OriginalSyncRoomMessageEvent},
        },
    },
};
use tokio::time::{Duration, sleep};

use crate::{chat::InboundMessage, matrix::store::LoginStore};

/// Longest wait between two attempts of the initial sync or of a room join
const MAX_RETRY_DELAY: u64 = 3600;

pub struct MatrixSync {
    client: Client,
    store: LoginStore,
}

impl MatrixSync {
    pub fn new(client: &Client, store: &LoginStore) -> Self {
        MatrixSync {
            client: client.to_owned(),
            store: store.to_owned(),
        }
    }

    /// Syncs forever, calling `on_message` for every new text message.
    ///
    /// Messages sent while the bot was offline are skipped.
    pub async fn sync<F>(&self, on_message: F) -> anyhow::Result<()>
    where
        F: Fn(InboundMessage) + Send + Sync + 'static,
    {
        info!("start syncing");

        self.client.add_event_handler(auto_join_room);

        // Lazy-load room members, the bot only needs message senders
        let filter = FilterDefinition::with_lazy_loading();
        let mut sync_settings = SyncSettings::default().filter(filter.into());
        if let Some(sync_token) = self.store.sync_token() {
            sync_settings = sync_settings.token(sync_token);
        }

        let mut delay = 2;
        let response = loop {
            match self.client.sync_once(sync_settings.clone()).await {
                Ok(response) => break response,
                Err(e) => {
                    error!("initial sync failed ({e}), retrying in {delay}s");
                    sleep(Duration::from_secs(delay)).await;
                    delay = (delay * 2).min(MAX_RETRY_DELAY);
                }
            }
        };
        self.save_sync_token(&response.next_batch).await;

        // Registered after the initial sync so only new messages are seen
        let on_message = Arc::new(on_message);
        self.client.add_event_handler(
            move |event: OriginalSyncRoomMessageEvent, room: Room, client: Client| {
                let on_message = Arc::clone(&on_message);
                async move { on_room_message(event, room, client, on_message.as_ref()) }
            },
        );

        sync_settings = sync_settings.token(response.next_batch);
        self.client
            .sync_with_result_callback(sync_settings, |sync_result| async move {
                let response = sync_result?;
                self.save_sync_token(&response.next_batch).await;
                Ok(LoopCtrl::Continue)
            })
            .await?;

        Ok(())
    }

    async fn save_sync_token(&self, sync_token: &str) {
        if let Err(e) = self.store.save_sync_token(sync_token).await {
            error!("failed to save sync token: {}", e);
        }
    }
}

/// Joins the rooms the bot is invited to.
///
/// Synapse may send the invite before the room can be joined, hence the
/// retries (<https://github.com/matrix-org/synapse/issues/4345>).
async fn auto_join_room(room_member: StrippedRoomMemberEvent, client: Client, room: Room) {
    let Some(user_id) = client.user_id() else {
        warn!("could not get user id from client");
        return;
    };
    if room_member.state_key != user_id {
        return;
    }

    tokio::spawn(async move {
        info!("joining room {}", room.room_id());
        let mut delay = 2;

        while let Err(e) = room.join().await {
            if delay > MAX_RETRY_DELAY {
                error!("giving up joining room {} ({e})", room.room_id());
                return;
            }
            warn!(
                "failed to join room {} ({e}), retrying in {delay}s",
                room.room_id()
            );
            sleep(Duration::from_secs(delay)).await;
            delay *= 2;
        }
        info!("joined room {}", room.room_id());
    });
}

/// Hands text messages of joined rooms to `on_message`, except the bot's own.
fn on_room_message<F>(
    event: OriginalSyncRoomMessageEvent,
    room: Room,
    client: Client,
    on_message: &F,
) where
    F: Fn(InboundMessage),
{
    if room.state() != RoomState::Joined {
        return;
    }
    if client.user_id() == Some(&*event.sender) {
        return;
    }
    let MessageType::Text(text) = event.content.msgtype else {
        return;
    };

    on_message(inbound_message(
        text.body,
        room.room_id().as_str(),
        event.sender.as_str(),
    ));
}

fn inbound_message(body: String, room_id: &str, sender_id: &str) -> InboundMessage {
    InboundMessage {
        body,
        channel_id: room_id.to_owned(),
        author_id: sender_id.to_owned(),
        guild_id: guild_of(room_id).to_owned(),
    }
}

/// Matrix has no guilds: rooms are grouped by the server part of their ID.
fn guild_of(room_id: &str) -> &str {
    room_id
        .split_once(':')
        .map_or(room_id, |(_, server)| server)
}
