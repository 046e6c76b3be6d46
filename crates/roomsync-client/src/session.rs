//! Chat session: the room context exposed to the presentation layer.
//!
//! A [`ChatSession`] owns the room cache, the event channel handle and the
//! live ingest for the active room. It is cheap to clone; clones share all
//! state, so a UI can hand one to every view and spawn backfill calls.

use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tracing::{info, warn};

use roomsync_net::EventChannel;
use roomsync_shared::room::validate_name;
use roomsync_shared::{
    resolve_room, ChatParams, CreateMessageData, Message, RoomId, RoomSyncError, ScrollPosition,
    ValidationError,
};
use roomsync_store::CursorState;

use crate::backfill::{BackfillController, BackfillOutcome, SkipReason};
use crate::config::SyncConfig;
use crate::events::{CacheUpdate, UpdateNotifier};
use crate::ingest::LiveIngest;
use crate::prefetch;
use crate::state::{lock, RoomContext, SharedState, SyncState};

#[derive(Clone)]
pub struct ChatSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    current_user: String,
    channel: Arc<dyn EventChannel>,
    state: SharedState,
    updates: UpdateNotifier,
    backfill: BackfillController,
    /// Ingest of the active room; `None` outside a room.
    ingest: Mutex<Option<LiveIngest>>,
}

impl ChatSession {
    /// Create a session for the authenticated `current_user`.
    pub fn new(
        current_user: impl Into<String>,
        channel: Arc<dyn EventChannel>,
        config: SyncConfig,
    ) -> Result<Self, ValidationError> {
        let current_user = current_user.into();
        if current_user.trim().is_empty() {
            return Err(ValidationError::MissingIdentity);
        }
        validate_name(&current_user)?;

        let state: SharedState = Arc::new(Mutex::new(SyncState::new()));
        let updates = UpdateNotifier::new(config.update_buffer);
        let backfill = BackfillController::new(
            Arc::clone(&state),
            Arc::clone(&channel),
            updates.clone(),
            config.backfill_timeout,
        );

        Ok(Self {
            inner: Arc::new(SessionInner {
                current_user,
                channel,
                state,
                updates,
                backfill,
                ingest: Mutex::new(None),
            }),
        })
    }

    pub fn current_user(&self) -> &str {
        &self.inner.current_user
    }

    /// Enter the room named by raw route parameters.
    ///
    /// Invalid parameters fail here, before any room is resolved or
    /// subscribed.
    pub fn enter_room(&self, chat_type: &str, name: &str) -> Result<RoomContext, ValidationError> {
        let params = ChatParams::parse(chat_type, name)?;
        Ok(self.enter(&params))
    }

    /// Enter a room from already validated parameters.
    ///
    /// The previous room's subscription is released before the new
    /// context is established, then a fresh one is taken for the new room.
    /// Must be called within a tokio runtime.
    pub fn enter(&self, params: &ChatParams) -> RoomContext {
        let inner = &self.inner;
        let room = resolve_room(params.chat_type(), &inner.current_user, params.name());

        let mut ingest = lock(&inner.ingest);
        drop(ingest.take());

        let context = lock(&inner.state).enter(room, params.chat_type(), params.name());

        let subscription = inner.channel.subscribe_new_messages();
        *ingest = Some(LiveIngest::start(
            subscription,
            Arc::clone(&inner.state),
            inner.updates.clone(),
            context.room.clone(),
            context.generation,
        ));
        drop(ingest);

        info!(
            room = %context.room,
            chat_type = %context.chat_type,
            "Entered room"
        );
        inner.updates.emit(CacheUpdate::RoomEntered {
            room: context.room.clone(),
        });
        context
    }

    /// Tear down the active room context. Cached messages are kept.
    pub fn leave_room(&self) -> Option<RoomContext> {
        drop(lock(&self.inner.ingest).take());
        let left = lock(&self.inner.state).leave();
        if let Some(ref context) = left {
            info!(room = %context.room, "Left room");
        }
        left
    }

    /// The active room context, if any.
    pub fn context(&self) -> Option<RoomContext> {
        lock(&self.inner.state).context.clone()
    }

    /// Load the newest page for the active room unless it is already
    /// loaded or loading.
    pub async fn load_initial(&self) -> Result<BackfillOutcome, RoomSyncError> {
        self.inner.backfill.load_initial().await
    }

    /// Scroll handler: near the top of the loaded history, fetch the
    /// previous page.
    ///
    /// Cheap to call on every scroll tick; ticks that do not qualify return
    /// without touching the network.
    pub async fn handle_scroll_position_change(
        &self,
        position: ScrollPosition,
    ) -> Result<BackfillOutcome, RoomSyncError> {
        let cursor = {
            let state = lock(&self.inner.state);
            match state.context {
                Some(ref context) => state.cache.cursor_state(&context.room),
                None => return Ok(BackfillOutcome::Skipped(SkipReason::NoActiveRoom)),
            }
        };

        if let Some(reason) = prefetch::evaluate(position, &cursor) {
            return Ok(BackfillOutcome::Skipped(reason));
        }
        self.inner.backfill.load_older().await
    }

    /// Emit a user-authored message.
    ///
    /// The server broadcasts it back, so it reaches the cache through live
    /// ingest like any other message.
    pub async fn send_message(&self, message: CreateMessageData) -> Result<(), RoomSyncError> {
        message.validate()?;
        self.inner
            .channel
            .emit_new_message(message)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to send message");
                e.into()
            })
    }

    /// Send `content` to the active room.
    pub async fn send_text(&self, content: &str) -> Result<(), RoomSyncError> {
        let context = self.context().ok_or(RoomSyncError::NoActiveRoom)?;
        self.send_message(CreateMessageData {
            chat_type: context.chat_type,
            target: context.name,
            content: content.to_owned(),
        })
        .await
    }

    /// Snapshot of a room's messages, oldest first.
    pub fn get_messages(&self, room: &RoomId) -> Arc<Vec<Message>> {
        lock(&self.inner.state).cache.get(room)
    }

    pub fn cursor_state(&self, room: &RoomId) -> CursorState {
        lock(&self.inner.state).cache.cursor_state(room)
    }

    /// Whether a backfill request is outstanding for the active room.
    pub fn is_backfilling(&self) -> bool {
        let state = lock(&self.inner.state);
        state
            .context
            .as_ref()
            .is_some_and(|context| state.is_in_flight(&context.room))
    }

    /// Receive a notification whenever the cache changes.
    pub fn subscribe_updates(&self) -> broadcast::Receiver<CacheUpdate> {
        self.inner.updates.subscribe()
    }
}
