//! Room resolution and route parameter validation.
//!
//! A room id must be identical on both ends of a conversation, so direct
//! chats are keyed by the sorted pair of participant names.

use crate::constants::{MAX_NAME_LEN, ROOM_ID_SEPARATOR};
use crate::error::ValidationError;
use crate::types::{ChatType, RoomId};

/// Validated `{chatType, name}` pair identifying a conversation from the
/// current user's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatParams {
    chat_type: ChatType,
    name: String,
}

impl ChatParams {
    /// Parse raw route parameters, failing on any unknown chat type or
    /// malformed name.
    pub fn parse(chat_type: &str, name: &str) -> Result<Self, ValidationError> {
        let chat_type = chat_type.parse::<ChatType>()?;
        Self::new(chat_type, name)
    }

    pub fn new(chat_type: ChatType, name: &str) -> Result<Self, ValidationError> {
        validate_target(chat_type, name)?;
        Ok(Self {
            chat_type,
            name: name.to_owned(),
        })
    }

    pub fn chat_type(&self) -> ChatType {
        self.chat_type
    }

    /// Counterpart username for direct chats, channel name otherwise.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Derive the canonical room id for a conversation.
pub fn resolve_room(chat_type: ChatType, current_user: &str, counterpart: &str) -> RoomId {
    match chat_type {
        ChatType::Dm => {
            let mut pair = [current_user, counterpart];
            pair.sort_unstable();
            RoomId(pair.join(ROOM_ID_SEPARATOR))
        }
        ChatType::Channel => RoomId(counterpart.to_owned()),
    }
}

/// Validate the counterpart or channel name of a conversation.
///
/// Direct-chat room ids always contain the separator, so channel names must
/// not: otherwise channel `alice-bob` would share a room with the direct
/// chat between alice and bob.
pub fn validate_target(chat_type: ChatType, name: &str) -> Result<(), ValidationError> {
    validate_name(name)?;
    if chat_type == ChatType::Channel && name.contains(ROOM_ID_SEPARATOR) {
        return Err(ValidationError::InvalidName);
    }
    Ok(())
}

/// Usernames and channel names share the same shape.
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    let len = name.chars().count();
    if len > MAX_NAME_LEN {
        return Err(ValidationError::NameTooLong {
            len,
            max: MAX_NAME_LEN,
        });
    }
    if name.chars().any(char::is_control) {
        return Err(ValidationError::InvalidName);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dm_room_is_commutative() {
        let names = ["alice", "bob", "Zed", "carol-x", "ünï", "a"];
        for a in names {
            for b in names {
                assert_eq!(
                    resolve_room(ChatType::Dm, a, b),
                    resolve_room(ChatType::Dm, b, a),
                    "{a} / {b}"
                );
            }
        }
    }

    #[test]
    fn test_dm_room_sorted_and_joined() {
        assert_eq!(
            resolve_room(ChatType::Dm, "bob", "alice"),
            RoomId::from("alice-bob")
        );
    }

    #[test]
    fn test_channel_room_is_channel_name() {
        assert_eq!(
            resolve_room(ChatType::Channel, "alice", "general"),
            RoomId::from("general")
        );
    }

    #[test]
    fn test_parse_valid_params() {
        let params = ChatParams::parse("dm", "bob").unwrap();
        assert_eq!(params.chat_type(), ChatType::Dm);
        assert_eq!(params.name(), "bob");
    }

    #[test]
    fn test_parse_rejects_bad_params() {
        assert_eq!(
            ChatParams::parse("group", "bob").unwrap_err(),
            ValidationError::UnknownChatType("group".into())
        );
        assert_eq!(
            ChatParams::parse("channel", "  ").unwrap_err(),
            ValidationError::EmptyName
        );
        assert_eq!(
            ChatParams::parse("dm", "bo\nb").unwrap_err(),
            ValidationError::InvalidName
        );
        assert!(matches!(
            ChatParams::parse("channel", &"x".repeat(MAX_NAME_LEN + 1)),
            Err(ValidationError::NameTooLong { .. })
        ));
    }

    #[test]
    fn test_channel_cannot_shadow_dm_room() {
        assert_eq!(
            ChatParams::parse("channel", "alice-bob").unwrap_err(),
            ValidationError::InvalidName
        );
        // Usernames may still contain the separator
        let params = ChatParams::parse("dm", "carol-x").unwrap();
        assert_eq!(
            resolve_room(params.chat_type(), "alice", params.name()),
            RoomId::from("alice-carol-x")
        );
    }
}
