//! Cursor-based history backfill.
//!
//! Both entry points share one flow: check the
//! room's cursor state, claim the room's single in-flight slot, await the
//! page under a timeout, then apply it only if the room context has not
//! changed in the meantime.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use roomsync_net::EventChannel;
use roomsync_shared::{OldMessagesRequest, RoomId, RoomSyncError, TransportError};
use roomsync_store::CursorState;

use crate::events::{CacheUpdate, UpdateNotifier};
use crate::state::{lock, SharedState};

/// Result of a backfill attempt that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackfillOutcome {
    /// A page was merged into the room.
    Applied {
        room: RoomId,
        added: usize,
        cursor: CursorState,
    },
    /// No request was sent.
    Skipped(SkipReason),
    /// The response arrived after a room-context change and was dropped.
    Stale { room: RoomId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoActiveRoom,
    /// Initial page already applied.
    AlreadyFetched,
    /// Older pages need an initial page first.
    NotFetched,
    /// The server reported no more history.
    Exhausted,
    /// A request for this room is still outstanding.
    InFlight,
    /// Scroll position too far from the top.
    OutOfRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BackfillKind {
    Initial,
    Older,
}

/// Frees the room's in-flight slot on every exit path, including when the
/// request future is dropped mid-flight.
struct InFlightGuard {
    state: SharedState,
    room: RoomId,
    ticket: u64,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        lock(&self.state).release(&self.room, self.ticket);
    }
}

pub(crate) struct BackfillController {
    state: SharedState,
    channel: Arc<dyn EventChannel>,
    updates: UpdateNotifier,
    timeout: Duration,
}

impl BackfillController {
    pub fn new(
        state: SharedState,
        channel: Arc<dyn EventChannel>,
        updates: UpdateNotifier,
        timeout: Duration,
    ) -> Self {
        Self {
            state,
            channel,
            updates,
            timeout,
        }
    }

    /// Fetch the newest page of the active room, once.
    pub async fn load_initial(&self) -> Result<BackfillOutcome, RoomSyncError> {
        self.run(BackfillKind::Initial).await
    }

    /// Fetch the page preceding what the active room already holds.
    pub async fn load_older(&self) -> Result<BackfillOutcome, RoomSyncError> {
        self.run(BackfillKind::Older).await
    }

    async fn run(&self, kind: BackfillKind) -> Result<BackfillOutcome, RoomSyncError> {
        let (context, request, ticket) = {
            let mut state = lock(&self.state);
            let Some(context) = state.context.clone() else {
                return Ok(BackfillOutcome::Skipped(SkipReason::NoActiveRoom));
            };

            let cursor = match (kind, state.cache.cursor_state(&context.room)) {
                (BackfillKind::Initial, CursorState::NotFetched) => None,
                (BackfillKind::Initial, _) => {
                    return Ok(BackfillOutcome::Skipped(SkipReason::AlreadyFetched));
                }
                (BackfillKind::Older, CursorState::Cursor(token)) => Some(token),
                (BackfillKind::Older, CursorState::NotFetched) => {
                    return Ok(BackfillOutcome::Skipped(SkipReason::NotFetched));
                }
                (BackfillKind::Older, CursorState::Exhausted) => {
                    return Ok(BackfillOutcome::Skipped(SkipReason::Exhausted));
                }
            };

            let Some(ticket) = state.acquire(&context.room) else {
                debug!(room = %context.room, ?kind, "Backfill already in flight");
                return Ok(BackfillOutcome::Skipped(SkipReason::InFlight));
            };

            // The server resolves history by counterpart or channel name for
            // every page. Sending the room id here only works for channels.
            let request = OldMessagesRequest {
                cursor,
                chat_type: context.chat_type,
                target: context.name.clone(),
            };
            (context, request, ticket)
        };

        let _guard = InFlightGuard {
            state: Arc::clone(&self.state),
            room: context.room.clone(),
            ticket,
        };

        debug!(
            room = %context.room,
            ?kind,
            cursor = ?request.cursor,
            "Requesting history page"
        );

        let page =
            match tokio::time::timeout(self.timeout, self.channel.get_old_messages(request)).await
            {
                Ok(Ok(page)) => page,
                Ok(Err(e)) => return Err(self.fail(&context.room, e)),
                Err(_) => {
                    return Err(self.fail(&context.room, TransportError::Timeout(self.timeout)))
                }
            };

        let mut state = lock(&self.state);
        if state.generation != context.generation {
            debug!(room = %context.room, ?kind, "Discarding stale history page");
            return Ok(BackfillOutcome::Stale { room: context.room });
        }

        let room = context.room;
        let added = match kind {
            BackfillKind::Initial => {
                state
                    .cache
                    .set_initial_page(&room, page.data, page.next_cursor)
            }
            BackfillKind::Older => {
                state
                    .cache
                    .append_older_page(&room, page.data, page.next_cursor)
            }
        };
        let cursor = state.cache.cursor_state(&room);
        drop(state);

        self.updates.emit(match kind {
            BackfillKind::Initial => CacheUpdate::InitialPage {
                room: room.clone(),
                added,
            },
            BackfillKind::Older => CacheUpdate::OlderPage {
                room: room.clone(),
                added,
            },
        });

        Ok(BackfillOutcome::Applied {
            room,
            added,
            cursor,
        })
    }

    /// Cache stays untouched; the caller decides whether to retry.
    fn fail(&self, room: &RoomId, error: TransportError) -> RoomSyncError {
        warn!(room = %room, error = %error, "History request failed");
        self.updates.emit(CacheUpdate::BackfillFailed {
            room: room.clone(),
            reason: error.to_string(),
        });
        error.into()
    }
}
