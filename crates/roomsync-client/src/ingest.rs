//! Live ingest of pushed messages.
//!
//! One [`LiveIngest`] exists per active room context. It owns the push
//! subscription through its task; dropping it aborts the task, which drops
//! the subscription.
//!
//! Aborting is not synchronous: a task mid-poll on another worker can still
//! drain messages that were already queued. Each task therefore carries the
//! context generation it was started for, and room-less messages are only
//! routed to its room while that generation is current.

use tokio::task::JoinHandle;
use tracing::debug;

use roomsync_net::Subscription;
use roomsync_shared::{Message, RoomId};

use crate::events::{CacheUpdate, UpdateNotifier};
use crate::state::{lock, SharedState};

pub(crate) struct LiveIngest {
    room: RoomId,
    task: JoinHandle<()>,
}

impl LiveIngest {
    /// Spawn the ingest loop for `room` on the current tokio runtime.
    pub fn start(
        mut subscription: Subscription,
        state: SharedState,
        updates: UpdateNotifier,
        room: RoomId,
        generation: u64,
    ) -> Self {
        let context_room = room.clone();
        let task = tokio::spawn(async move {
            while let Some(message) = subscription.recv().await {
                ingest(&state, &updates, &context_room, generation, message);
            }
            debug!(room = %context_room, "Push stream closed");
        });

        debug!(room = %room, "Live ingest started");
        Self { room, task }
    }
}

impl Drop for LiveIngest {
    fn drop(&mut self) {
        self.task.abort();
        debug!(room = %self.room, "Live ingest stopped");
    }
}

/// Append one pushed message to its room.
///
/// The message's own `room` wins; `context_room` is only the fallback for
/// payloads that omit it, and only while `generation` is still current.
pub(crate) fn ingest(
    state: &SharedState,
    updates: &UpdateNotifier,
    context_room: &RoomId,
    generation: u64,
    message: Message,
) -> bool {
    let id = message.id.clone();

    let mut guard = lock(state);
    let room = match message.room.clone() {
        Some(room) => room,
        None if guard.generation == generation => context_room.clone(),
        None => {
            debug!(
                room = %context_room,
                id = %id,
                "Dropping room-less message from a stale context"
            );
            return false;
        }
    };
    let appended = guard.cache.append_live(&room, message);
    drop(guard);
    if appended {
        debug!(room = %room, id = %id, "New message");
        updates.emit(CacheUpdate::LiveAppended { room, id });
    }
    appended
}
