//! Session state shared by the session handle, backfill futures and the
//! live ingest task.
//!
//! The [`SyncState`] struct is wrapped in `Arc<Mutex<>>`. The lock is
//! never held across an `.await`, so every mutation is a short critical
//! section and the cache is only ever written by one party at a time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use roomsync_shared::{ChatType, RoomId};
use roomsync_store::RoomCache;

/// The room the user currently has open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomContext {
    /// Resolved room id.
    pub room: RoomId,
    pub chat_type: ChatType,
    /// Counterpart username (dm) or channel name, as shown to the user.
    pub name: String,
    /// Bumped on every context change; responses carrying an older value
    /// are stale.
    #[serde(skip)]
    pub(crate) generation: u64,
}

pub(crate) type SharedState = Arc<Mutex<SyncState>>;

/// Central sync state.
pub(crate) struct SyncState {
    /// Messages and cursors of every room seen this session.
    pub cache: RoomCache,

    /// `None` until a room is entered.
    pub context: Option<RoomContext>,

    /// Room-context generation counter.
    pub generation: u64,

    /// Ticket of the backfill request outstanding per room.
    in_flight: HashMap<RoomId, u64>,

    next_ticket: u64,
}

impl SyncState {
    pub fn new() -> Self {
        Self {
            cache: RoomCache::new(),
            context: None,
            generation: 0,
            in_flight: HashMap::new(),
            next_ticket: 0,
        }
    }

    /// Switch to a new room context, invalidating outstanding requests.
    pub fn enter(&mut self, room: RoomId, chat_type: ChatType, name: &str) -> RoomContext {
        self.generation += 1;
        self.in_flight.clear();

        let context = RoomContext {
            room,
            chat_type,
            name: name.to_owned(),
            generation: self.generation,
        };
        self.context = Some(context.clone());
        context
    }

    pub fn leave(&mut self) -> Option<RoomContext> {
        self.generation += 1;
        self.in_flight.clear();
        self.context.take()
    }

    /// Claim the single backfill slot of `room`. `None` if it is taken.
    pub fn acquire(&mut self, room: &RoomId) -> Option<u64> {
        if self.in_flight.contains_key(room) {
            return None;
        }
        self.next_ticket += 1;
        self.in_flight.insert(room.clone(), self.next_ticket);
        Some(self.next_ticket)
    }

    /// Release the slot, unless it has since been handed to someone else.
    pub fn release(&mut self, room: &RoomId, ticket: u64) {
        if self.in_flight.get(room) == Some(&ticket) {
            self.in_flight.remove(room);
        }
    }

    pub fn is_in_flight(&self, room: &RoomId) -> bool {
        self.in_flight.contains_key(room)
    }
}

impl Default for SyncState {
    fn default() -> Self {
        Self::new()
    }
}

/// Lock a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enter_bumps_generation() {
        let mut state = SyncState::new();
        let first = state.enter(RoomId::from("alice-bob"), ChatType::Dm, "bob");
        let second = state.enter(RoomId::from("general"), ChatType::Channel, "general");

        assert!(second.generation > first.generation);
        assert_eq!(state.context.as_ref(), Some(&second));

        let left = state.leave();
        assert_eq!(left, Some(second));
        assert!(state.context.is_none());
    }

    #[test]
    fn test_single_slot_per_room() {
        let mut state = SyncState::new();
        let room = RoomId::from("general");
        let other = RoomId::from("random");

        let ticket = state.acquire(&room).expect("slot is free");
        assert!(state.acquire(&room).is_none());
        assert!(state.acquire(&other).is_some());

        state.release(&room, ticket);
        assert!(!state.is_in_flight(&room));
        assert!(state.acquire(&room).is_some());
    }

    #[test]
    fn test_context_change_frees_slots() {
        let mut state = SyncState::new();
        let room = RoomId::from("alice-bob");

        let stale = state.acquire(&room).unwrap();
        state.enter(RoomId::from("general"), ChatType::Channel, "general");
        assert!(!state.is_in_flight(&room));

        let fresh = state.acquire(&room).unwrap();
        // A late release of the stale ticket must not free the new request
        state.release(&room, stale);
        assert!(state.is_in_flight(&room));

        state.release(&room, fresh);
        assert!(!state.is_in_flight(&room));
    }
}
