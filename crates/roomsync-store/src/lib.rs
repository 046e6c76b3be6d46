//! # roomsync-store
//!
//! In-memory room message cache. The cache is an owned value: the client
//! session holds it behind its own lock and hands out `Arc` snapshots of
//! each room's sequence to the presentation layer.

pub mod cache;
pub mod cursor;

pub use cache::RoomCache;
pub use cursor::CursorState;
