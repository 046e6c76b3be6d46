use serde::Serialize;
use tokio::sync::broadcast;

use roomsync_shared::{MessageId, RoomId};

/// Cache-changed notifications for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CacheUpdate {
    RoomEntered { room: RoomId },
    LiveAppended { room: RoomId, id: MessageId },
    InitialPage { room: RoomId, added: usize },
    OlderPage { room: RoomId, added: usize },
    BackfillFailed { room: RoomId, reason: String },
}

impl CacheUpdate {
    pub fn room(&self) -> &RoomId {
        match self {
            Self::RoomEntered { room }
            | Self::LiveAppended { room, .. }
            | Self::InitialPage { room, .. }
            | Self::OlderPage { room, .. }
            | Self::BackfillFailed { room, .. } => room,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct UpdateNotifier {
    tx: broadcast::Sender<CacheUpdate>,
}

impl UpdateNotifier {
    pub fn new(buffer: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheUpdate> {
        self.tx.subscribe()
    }

    /// Best-effort; nobody listening is not an error.
    pub fn emit(&self, update: CacheUpdate) {
        if self.tx.send(update).is_err() {
            tracing::trace!("No cache update subscribers");
        }
    }
}
