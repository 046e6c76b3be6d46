//! Data model, wire protocol and room resolution shared by every roomsync
//! crate.

pub mod constants;
pub mod error;
pub mod protocol;
pub mod room;
pub mod types;

pub use error::{ProtocolError, RoomSyncError, TransportError, ValidationError};
pub use protocol::{ClientCall, CreateMessageData, Message, OldMessagesRequest, Page, ServerEvent};
pub use room::{resolve_room, validate_target, ChatParams};
pub use types::{ChatType, MessageId, RoomId, ScrollPosition};
