//! Per-room message cache.
//!
//! Each room holds an oldest-first message sequence plus its backfill
//! cursor. Sequences are copy-on-write: every mutation builds a new vector
//! and swaps the entry's `Arc`, so a snapshot handed out by [`RoomCache::get`]
//! never changes under its reader.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use roomsync_shared::{Message, MessageId, RoomId};

use crate::cursor::CursorState;

#[derive(Debug, Default)]
struct RoomEntry {
    messages: Arc<Vec<Message>>,
    ids: HashSet<MessageId>,
    cursor: CursorState,
}

impl RoomEntry {
    /// Drop messages already cached or repeated within `incoming`.
    fn fresh(&mut self, incoming: Vec<Message>) -> Vec<Message> {
        incoming
            .into_iter()
            .filter(|m| self.ids.insert(m.id.clone()))
            .collect()
    }
}

/// Owned cache of every room seen during a session.
#[derive(Debug)]
pub struct RoomCache {
    rooms: HashMap<RoomId, RoomEntry>,
    empty: Arc<Vec<Message>>,
}

impl RoomCache {
    pub fn new() -> Self {
        Self {
            rooms: HashMap::new(),
            empty: Arc::new(Vec::new()),
        }
    }

    /// Snapshot of a room's sequence, empty if the room is unknown.
    pub fn get(&self, room: &RoomId) -> Arc<Vec<Message>> {
        self.rooms
            .get(room)
            .map(|entry| Arc::clone(&entry.messages))
            .unwrap_or_else(|| Arc::clone(&self.empty))
    }

    /// Whether an initial page has been applied for `room`.
    ///
    /// Live messages alone do not count.
    pub fn has_fetched_initial(&self, room: &RoomId) -> bool {
        self.rooms
            .get(room)
            .is_some_and(|entry| entry.cursor.is_fetched())
    }

    /// Continuation token, `None` when not fetched yet or exhausted.
    pub fn cursor_for(&self, room: &RoomId) -> Option<&str> {
        self.rooms.get(room).and_then(|entry| entry.cursor.token())
    }

    pub fn cursor_state(&self, room: &RoomId) -> CursorState {
        self.rooms
            .get(room)
            .map(|entry| entry.cursor.clone())
            .unwrap_or_default()
    }

    /// Append a pushed message at the tail.
    ///
    /// Returns `false` when the id is already cached for this room.
    pub fn append_live(&mut self, room: &RoomId, message: Message) -> bool {
        let entry = self.rooms.entry(room.clone()).or_default();
        if !entry.ids.insert(message.id.clone()) {
            debug!(room = %room, id = %message.id, "Duplicate live message ignored");
            return false;
        }

        let mut next = Vec::with_capacity(entry.messages.len() + 1);
        next.extend(entry.messages.iter().cloned());
        next.push(message);
        entry.messages = Arc::new(next);
        true
    }

    /// Apply the newest page of history.
    ///
    /// The page becomes the head of the sequence. Live messages that
    /// arrived before it and are not part of it stay after it, in arrival
    /// order. Returns the number of messages added.
    pub fn set_initial_page(
        &mut self,
        room: &RoomId,
        messages: Vec<Message>,
        next_cursor: Option<String>,
    ) -> usize {
        let entry = self.rooms.entry(room.clone()).or_default();

        let mut seen = HashSet::with_capacity(messages.len());
        let page: Vec<Message> = messages
            .into_iter()
            .filter(|m| seen.insert(m.id.clone()))
            .collect();
        let added = page.iter().filter(|m| !entry.ids.contains(&m.id)).count();

        let mut next = page;
        next.extend(
            entry
                .messages
                .iter()
                .filter(|m| !seen.contains(&m.id))
                .cloned(),
        );

        entry.ids = next.iter().map(|m| m.id.clone()).collect();
        entry.messages = Arc::new(next);
        entry.cursor = CursorState::from_next(next_cursor);

        debug!(room = %room, added, cursor = ?entry.cursor, "Initial page applied");
        added
    }

    /// Prepend an older page before the cached messages.
    ///
    /// Returns the number of messages added.
    pub fn append_older_page(
        &mut self,
        room: &RoomId,
        messages: Vec<Message>,
        next_cursor: Option<String>,
    ) -> usize {
        let entry = self.rooms.entry(room.clone()).or_default();

        let mut next = entry.fresh(messages);
        let added = next.len();
        next.extend(entry.messages.iter().cloned());

        entry.messages = Arc::new(next);
        entry.cursor = CursorState::from_next(next_cursor);

        debug!(room = %room, added, cursor = ?entry.cursor, "Older page applied");
        added
    }

    /// Number of rooms with an entry.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Number of cached messages for `room`.
    pub fn len(&self, room: &RoomId) -> usize {
        self.rooms.get(room).map_or(0, |entry| entry.messages.len())
    }
}

impl Default for RoomCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn msg(content: &str) -> Message {
        Message {
            id: MessageId::from(content),
            room: Some(RoomId::from("alice-bob")),
            sender: "alice".into(),
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    fn contents(cache: &RoomCache, room: &RoomId) -> Vec<String> {
        cache.get(room).iter().map(|m| m.content.clone()).collect()
    }

    fn room() -> RoomId {
        RoomId::from("alice-bob")
    }

    #[test]
    fn test_unknown_room_is_empty() {
        let cache = RoomCache::new();
        assert!(cache.get(&room()).is_empty());
        assert!(!cache.has_fetched_initial(&room()));
        assert_eq!(cache.cursor_for(&room()), None);
        assert_eq!(cache.cursor_state(&room()), CursorState::NotFetched);
        assert_eq!(cache.room_count(), 0);
    }

    #[test]
    fn test_initial_then_older_then_live() {
        let mut cache = RoomCache::new();
        let room = room();

        cache.set_initial_page(&room, vec![msg("m1"), msg("m2")], Some("c1".into()));
        assert_eq!(contents(&cache, &room), ["m1", "m2"]);
        assert_eq!(cache.cursor_for(&room), Some("c1"));
        assert!(cache.has_fetched_initial(&room));

        cache.append_older_page(&room, vec![msg("m0")], None);
        assert_eq!(contents(&cache, &room), ["m0", "m1", "m2"]);
        assert_eq!(cache.cursor_state(&room), CursorState::Exhausted);

        assert!(cache.append_live(&room, msg("m3")));
        assert_eq!(contents(&cache, &room), ["m0", "m1", "m2", "m3"]);
        assert_eq!(cache.cursor_state(&room), CursorState::Exhausted);
    }

    #[test]
    fn test_interleaved_operations_keep_order() {
        let mut cache = RoomCache::new();
        let room = room();

        cache.set_initial_page(&room, vec![msg("p2a"), msg("p2b")], Some("c2".into()));
        cache.append_live(&room, msg("l1"));
        cache.append_older_page(&room, vec![msg("p1a"), msg("p1b")], Some("c1".into()));
        cache.append_live(&room, msg("l2"));
        cache.append_older_page(&room, vec![msg("p0")], None);

        assert_eq!(
            contents(&cache, &room),
            ["p0", "p1a", "p1b", "p2a", "p2b", "l1", "l2"]
        );
    }

    #[test]
    fn test_live_before_initial_page_is_kept() {
        let mut cache = RoomCache::new();
        let room = room();
        let early = msg("early");
        let echoed = early.clone();

        cache.append_live(&room, early);
        cache.append_live(&room, msg("late"));
        assert!(!cache.has_fetched_initial(&room));

        // The page already contains the first live message
        cache.set_initial_page(&room, vec![msg("m1"), echoed], Some("c1".into()));
        assert_eq!(contents(&cache, &room), ["m1", "early", "late"]);
    }

    #[test]
    fn test_duplicates_are_dropped() {
        let mut cache = RoomCache::new();
        let room = room();
        let m1 = msg("m1");
        let m2 = msg("m2");

        cache.set_initial_page(&room, vec![m1.clone(), m2.clone()], Some("c1".into()));
        assert!(!cache.append_live(&room, m2.clone()));

        let added = cache.append_older_page(&room, vec![msg("m0"), m1.clone()], Some("c0".into()));
        assert_eq!(added, 1);
        assert_eq!(contents(&cache, &room), ["m0", "m1", "m2"]);
        assert_eq!(cache.len(&room), 3);
    }

    #[test]
    fn test_snapshot_is_unaffected_by_later_writes() {
        let mut cache = RoomCache::new();
        let room = room();

        cache.set_initial_page(&room, vec![msg("m1")], Some("c1".into()));
        let snapshot = cache.get(&room);

        cache.append_live(&room, msg("m2"));
        cache.append_older_page(&room, vec![msg("m0")], None);

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].content, "m1");
        assert_eq!(cache.len(&room), 3);
    }

    #[test]
    fn test_empty_history_is_exhausted() {
        let mut cache = RoomCache::new();
        let room = RoomId::from("general");

        cache.set_initial_page(&room, Vec::new(), None);
        assert!(cache.has_fetched_initial(&room));
        assert_eq!(cache.cursor_state(&room), CursorState::Exhausted);
        assert!(cache.get(&room).is_empty());
    }

    #[test]
    fn test_rooms_are_isolated() {
        let mut cache = RoomCache::new();
        let dm = room();
        let general = RoomId::from("general");

        cache.set_initial_page(&dm, vec![msg("dm")], Some("c1".into()));
        cache.append_live(&general, msg("hello"));

        assert_eq!(contents(&cache, &dm), ["dm"]);
        assert_eq!(contents(&cache, &general), ["hello"]);
        assert!(!cache.has_fetched_initial(&general));
        assert_eq!(cache.room_count(), 2);
    }
}
