//! Reclamation of abandoned signups.
//!
//! This module provides the [`IdleSweeper`], a periodic task terminating
//! sessions that sat in `SIGNUP` without activity for longer than the idle
//! timeout, so an abandoned signup cannot occupy a channel forever.

use std::{sync::Arc, time::Duration};

use log::{debug, info, warn};
use tokio::time::{self, Instant};

use crate::{
    chat::{ChatTransport, Reply, deliver},
    commands::markdown_response::format_idle_expired,
    sessions::{Session, SessionRegistry},
};

/// Periodically expires idle signups and evicts terminated leftovers.
///
/// Candidates are picked from a snapshot, then re-checked inside the
/// channel's exclusivity scope, so a command racing with the sweep either
/// refreshes the session before the check or finds it terminated.
pub struct IdleSweeper {
    sessions: Arc<SessionRegistry>,
    idle_timeout: Duration,
    /// Announce reclaimed signups in their channel
    notify: bool,
}

impl IdleSweeper {
    pub fn new(sessions: Arc<SessionRegistry>, idle_timeout: Duration, notify: bool) -> Self {
        IdleSweeper {
            sessions,
            idle_timeout,
            notify,
        }
    }

    /// Runs one sweep and returns the announcements to post.
    pub async fn sweep(&self) -> Vec<Reply> {
        let now = Instant::now();
        let mut replies = Vec::new();

        for snapshot in self.sessions.list_all() {
            let channel_id = snapshot.channel_id();

            if !snapshot.is_live() {
                debug!("evicting terminated leftover in channel {}", channel_id);
                self.sessions.evict(channel_id).await;
                continue;
            }
            if !snapshot.is_idle(now, self.idle_timeout) {
                continue;
            }

            if self.expire(channel_id, now).await {
                warn!(
                    "reclaimed idle session {} in channel {}",
                    snapshot.id(),
                    channel_id
                );
                if self.notify {
                    replies.push(Reply::new(
                        channel_id,
                        format_idle_expired(self.idle_timeout),
                    ));
                }
            }
        }

        replies
    }

    /// Expires and evicts the session of `channel_id` if it is still idle.
    async fn expire(&self, channel_id: &str, now: Instant) -> bool {
        let Some(mut guard) = self.sessions.lock_existing(channel_id).await else {
            return false;
        };

        let expired = guard
            .session_mut()
            .ok()
            .filter(|session| session.is_idle(now, self.idle_timeout))
            .map(Session::expire)
            .is_some_and(|result| result.is_ok());

        if expired {
            guard.evict();
        }
        expired
    }

    /// Starts the sweep loop in the background.
    ///
    /// # Arguments
    ///
    /// * `interval` - Time between two sweeps
    /// * `transport` - Receives the idle announcements
    pub fn start(self, interval: Duration, transport: Arc<dyn ChatTransport>) {
        tokio::spawn(async move {
            info!(
                "sweeping idle signups every {} seconds (timeout {} seconds)",
                interval.as_secs(),
                self.idle_timeout.as_secs()
            );
            let mut interval = time::interval(interval);

            loop {
                interval.tick().await;
                let replies = self.sweep().await;
                deliver(transport.as_ref(), replies).await;
            }
        });
    }
}
