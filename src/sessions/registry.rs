//! Process-wide map from channel to its live session.
//!
//! This module provides the [`SessionRegistry`], the single source of truth
//! for sessions, and the [`ChannelGuard`] through which a channel's session is
//! mutated.
//!
//! # Exclusivity
//!
//! Each channel owns a slot holding an async mutex. Holding the slot's
//! [`ChannelGuard`] is the channel's exclusivity scope: every mutation of a
//! session happens while its guard is held, so two commands of the same
//! channel can never both observe and then mutate the same state. Slots are
//! created lazily and looked up through a sharded map whose entries are only
//! touched for the duration of a lookup, never across an `.await`, so
//! commands on different channels never wait on each other.
//!
//! # Snapshots
//!
//! When a guard is released (or explicitly published), a clone of the
//! session is stored next to the mutex. [`SessionRegistry::get_or_none`] and
//! [`SessionRegistry::list_all`] read these snapshots and never wait for a
//! guard, even when a guard is held across a slow rules-engine call.
//!
//! # Slot retirement
//!
//! A slot whose session is evicted, or which ends up empty, is marked retired
//! and removed from the map while its guard is still held. Tasks that were
//! queued on the retired slot notice the flag once they get the lock and
//! retry against the map, which guarantees at most one session per channel.

use std::sync::{
    Arc, PoisonError, RwLock,
    atomic::{AtomicU64, Ordering},
};

use dashmap::DashMap;
use log::{debug, info};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    game::GameHandle,
    sessions::{Session, SessionError, SessionId, SessionState},
};

type ChannelsMap = DashMap<String, Arc<ChannelSlot>>;

/// Mutex-protected part of a channel slot.
#[derive(Default)]
struct SlotState {
    session: Option<Session>,
    /// Set once the slot has left the map; holders of a stale `Arc` must retry
    retired: bool,
}

/// Per-channel storage: exclusivity scope plus published snapshot.
#[derive(Default)]
struct ChannelSlot {
    state: Arc<Mutex<SlotState>>,
    published: RwLock<Option<Session>>,
}

impl ChannelSlot {
    fn snapshot(&self) -> Option<Session> {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn publish(&self, session: Option<Session>) {
        *self
            .published
            .write()
            .unwrap_or_else(PoisonError::into_inner) = session;
    }
}

/// Result of [`SessionRegistry::create_if_absent`].
#[derive(Debug, Clone)]
pub enum CreateOutcome {
    /// A new session was opened in `SIGNUP`
    Created(Session),
    /// The channel already had a live session, returned untouched
    AlreadyActive(Session),
}

impl CreateOutcome {
    pub fn session(&self) -> &Session {
        match self {
            CreateOutcome::Created(session) | CreateOutcome::AlreadyActive(session) => session,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, CreateOutcome::Created(_))
    }
}

/// Exclusive access to one channel's session.
///
/// Dropping the guard publishes the session snapshot and releases the
/// channel. A guard over a channel without session retires its slot.
pub struct ChannelGuard {
    channel_id: String,
    slot: Arc<ChannelSlot>,
    state: OwnedMutexGuard<SlotState>,
    channels: Arc<ChannelsMap>,
}

impl ChannelGuard {
    /// The session held in this channel, live or terminated.
    pub fn session(&self) -> Option<&Session> {
        self.state.session.as_ref()
    }

    /// The live session of this channel.
    ///
    /// Fails with [`SessionError::SessionGone`] if there is none or if it is
    /// already terminated.
    pub fn session_mut(&mut self) -> Result<&mut Session, SessionError> {
        match self.state.session.as_mut() {
            Some(session) if session.is_live() => Ok(session),
            _ => Err(SessionError::SessionGone),
        }
    }

    /// Makes the current state visible to snapshot readers before the guard
    /// is released.
    pub fn publish(&self) {
        self.slot.publish(self.state.session.clone());
    }

    /// Removes a terminated session from the registry.
    ///
    /// Returns `false` and keeps the session if it is still live.
    pub fn evict(&mut self) -> bool {
        if self.state.session.as_ref().is_some_and(Session::is_live) {
            return false;
        }

        if let Some(session) = self.state.session.take() {
            info!(
                "evicted session {} from channel {}",
                session.id(),
                self.channel_id
            );
        }
        self.retire();
        true
    }

    fn retire(&mut self) {
        if self.state.retired {
            return;
        }
        self.state.retired = true;
        self.slot.publish(None);
        self.channels
            .remove_if(&self.channel_id, |_, current| Arc::ptr_eq(current, &self.slot));
    }
}

impl Drop for ChannelGuard {
    fn drop(&mut self) {
        if self.state.session.is_none() {
            self.retire();
        } else {
            self.publish();
        }
    }
}

/// Registry of every channel's session.
///
/// Constructed once at startup and shared behind an `Arc` by the dispatcher
/// and the background tasks.
///
/// # Examples
///
/// ```no_run
/// let registry = SessionRegistry::new();
/// let outcome = registry
///     .create_if_absent("!room:example.org", "example.org", "@alice:example.org")
///     .await;
/// assert!(outcome.is_created());
/// ```
#[derive(Default)]
pub struct SessionRegistry {
    channels: Arc<ChannelsMap>,
    next_id: AtomicU64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        SessionRegistry::default()
    }

    /// Returns the live session of `channel_id` without waiting on its guard.
    pub fn get_or_none(&self, channel_id: &str) -> Option<Session> {
        let slot = self.channels.get(channel_id).map(|slot| Arc::clone(&slot))?;
        slot.snapshot().filter(Session::is_live)
    }

    /// Opens a session for `channel_id` unless a live one exists.
    pub async fn create_if_absent(
        &self,
        channel_id: &str,
        guild_id: &str,
        creator_id: &str,
    ) -> CreateOutcome {
        let (_guard, outcome) = self.open(channel_id, guild_id, creator_id).await;
        outcome
    }

    /// Acquires the channel and makes sure it holds a live session.
    ///
    /// Returns the guard along with whether the session was created by this
    /// call. A terminated session still waiting for eviction is replaced.
    pub async fn open(
        &self,
        channel_id: &str,
        guild_id: &str,
        creator_id: &str,
    ) -> (ChannelGuard, CreateOutcome) {
        let mut guard = self.lock(channel_id).await;

        if let Some(session) = guard.session().filter(|s| s.is_live()) {
            let outcome = CreateOutcome::AlreadyActive(session.clone());
            return (guard, outcome);
        }

        let id = SessionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let session = Session::new(id, channel_id, guild_id, creator_id);
        guard.state.session = Some(session.clone());
        guard.publish();
        info!(
            "created session {} in channel {} for {}",
            id, channel_id, creator_id
        );

        (guard, CreateOutcome::Created(session))
    }

    /// Acquires the channel only if it holds a live session.
    pub async fn lock_existing(&self, channel_id: &str) -> Option<ChannelGuard> {
        loop {
            let slot = self.channels.get(channel_id).map(|slot| Arc::clone(&slot))?;
            let state = Arc::clone(&slot.state).lock_owned().await;
            if state.retired {
                continue;
            }

            let guard = self.guard(channel_id, slot, state);
            if guard.session().is_some_and(Session::is_live) {
                return Some(guard);
            }
            return None;
        }
    }

    /// Applies `f` to the live session of `channel_id` inside its
    /// exclusivity scope.
    pub async fn with_exclusive_access<T, F>(
        &self,
        channel_id: &str,
        f: F,
    ) -> Result<T, SessionError>
    where
        F: FnOnce(&mut Session) -> Result<T, SessionError>,
    {
        let mut guard = self
            .lock_existing(channel_id)
            .await
            .ok_or(SessionError::SessionGone)?;
        f(guard.session_mut()?)
    }

    /// Removes the terminated session of `channel_id`.
    ///
    /// Idempotent; a live session is left in place and `false` is returned.
    pub async fn evict(&self, channel_id: &str) -> bool {
        loop {
            let Some(slot) = self.channels.get(channel_id).map(|slot| Arc::clone(&slot)) else {
                return true;
            };
            let state = Arc::clone(&slot.state).lock_owned().await;
            if state.retired {
                continue;
            }
            return self.guard(channel_id, slot, state).evict();
        }
    }

    /// Snapshot of every session currently in the registry, including
    /// terminated ones not yet evicted.
    pub fn list_all(&self) -> Vec<Session> {
        let slots: Vec<Arc<ChannelSlot>> = self
            .channels
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        slots.iter().filter_map(|slot| slot.snapshot()).collect()
    }

    /// Channel whose running game is `handle`.
    pub fn find_by_game(&self, handle: &GameHandle) -> Option<String> {
        self.list_all()
            .into_iter()
            .find(|s| s.state() == SessionState::Running && s.game_handle() == Some(handle))
            .map(|s| s.channel_id().to_owned())
    }

    /// Acquires the channel, creating its slot if needed.
    async fn lock(&self, channel_id: &str) -> ChannelGuard {
        loop {
            let slot = Arc::clone(
                &*self
                    .channels
                    .entry(channel_id.to_owned())
                    .or_insert_with(|| Arc::new(ChannelSlot::default())),
            );
            let state = Arc::clone(&slot.state).lock_owned().await;
            if state.retired {
                debug!("slot of channel {} was retired, retrying", channel_id);
                continue;
            }
            return self.guard(channel_id, slot, state);
        }
    }

    fn guard(
        &self,
        channel_id: &str,
        slot: Arc<ChannelSlot>,
        state: OwnedMutexGuard<SlotState>,
    ) -> ChannelGuard {
        ChannelGuard {
            channel_id: channel_id.to_owned(),
            slot,
            state,
            channels: Arc::clone(&self.channels),
        }
    }
}
