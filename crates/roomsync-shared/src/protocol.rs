use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{EVENT_GET_OLD_MESSAGES, EVENT_NEW_MESSAGE, MAX_MESSAGE_LEN};
use crate::error::{ProtocolError, ValidationError};
use crate::room::validate_target;
use crate::types::{ChatType, MessageId, RoomId};

/// A chat message as broadcast by the server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Server-assigned id, unique across rooms
    pub id: MessageId,
    /// Target room. Some pushes omit it; the receiver falls back to its
    /// active room.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<RoomId>,
    /// Username of the author
    pub sender: String,
    pub content: String,
    #[serde(alias = "timestamp")]
    pub created_at: DateTime<Utc>,
}

/// A user-authored message on its way to the server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageData {
    pub chat_type: ChatType,
    /// Counterpart username (dm) or channel name
    pub target: String,
    pub content: String,
}

impl CreateMessageData {
    /// Reject blank or oversized content and malformed targets before the
    /// message leaves the client.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_target(self.chat_type, &self.target)?;
        if self.content.trim().is_empty() {
            return Err(ValidationError::EmptyContent);
        }
        let len = self.content.chars().count();
        if len > MAX_MESSAGE_LEN {
            return Err(ValidationError::ContentTooLong {
                len,
                max: MAX_MESSAGE_LEN,
            });
        }
        Ok(())
    }
}

/// Parameters of a `messages:get_old_messages` call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OldMessagesRequest {
    /// `None` asks for the newest page
    pub cursor: Option<String>,
    pub chat_type: ChatType,
    pub target: String,
}

/// One page of history, oldest message first
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub data: Vec<Message>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

impl Page {
    pub fn from_json(value: Value) -> Result<Self, ProtocolError> {
        serde_json::from_value(value).map_err(|e| ProtocolError::UnexpectedPayload {
            event: EVENT_GET_OLD_MESSAGES.to_owned(),
            reason: e.to_string(),
        })
    }
}

/// Events pushed by the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    NewMessage(Message),
}

impl ServerEvent {
    /// Decode an inbound `(event, payload)` frame.
    ///
    /// Events this client does not handle yield `Ok(None)`.
    pub fn decode(event: &str, payload: Value) -> Result<Option<Self>, ProtocolError> {
        match event {
            EVENT_NEW_MESSAGE => {
                let message = serde_json::from_value(payload).map_err(|e| {
                    ProtocolError::UnexpectedPayload {
                        event: event.to_owned(),
                        reason: e.to_string(),
                    }
                })?;
                Ok(Some(Self::NewMessage(message)))
            }
            _ => Ok(None),
        }
    }
}

/// Calls emitted by the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCall {
    /// Fire-and-forget send; the server echoes it back as a push
    NewMessage(CreateMessageData),

    /// Backfill request, answered with a [`Page`]
    GetOldMessages(OldMessagesRequest),
}

impl ClientCall {
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::NewMessage(_) => EVENT_NEW_MESSAGE,
            Self::GetOldMessages(_) => EVENT_GET_OLD_MESSAGES,
        }
    }

    /// Positional arguments as sent on the wire.
    ///
    /// Backfill requests are `(cursor, chatType, target)`.
    pub fn encode_args(&self) -> Result<Vec<Value>, ProtocolError> {
        match self {
            Self::NewMessage(data) => Ok(vec![serde_json::to_value(data)?]),
            Self::GetOldMessages(req) => Ok(vec![
                serde_json::to_value(&req.cursor)?,
                serde_json::to_value(req.chat_type)?,
                Value::String(req.target.clone()),
            ]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_new_message_frame() {
        let payload = json!({
            "id": "7f9c2c1e-8d8e-4c8b-9a55-3f0f2b6b1a10",
            "room": "alice-bob",
            "sender": "alice",
            "content": "hi",
            "createdAt": "2024-05-01T12:00:00Z",
        });

        let event = ServerEvent::decode(EVENT_NEW_MESSAGE, payload)
            .unwrap()
            .expect("new_message is a known event");

        let ServerEvent::NewMessage(msg) = event;
        assert_eq!(msg.room, Some(RoomId::from("alice-bob")));
        assert_eq!(msg.sender, "alice");
        assert_eq!(msg.content, "hi");
    }

    #[test]
    fn test_decode_message_without_room() {
        let payload = json!({
            "id": "7f9c2c1e-8d8e-4c8b-9a55-3f0f2b6b1a10",
            "sender": "bob",
            "content": "yo",
            "timestamp": "2024-05-01T12:00:00Z",
        });

        let Some(ServerEvent::NewMessage(msg)) =
            ServerEvent::decode(EVENT_NEW_MESSAGE, payload).unwrap()
        else {
            panic!("expected a new message");
        };
        assert!(msg.room.is_none());
    }

    #[test]
    fn test_server_ids_are_opaque() {
        let page = Page::from_json(json!({
            "data": [
                {"id": "m1", "sender": "bob", "content": "a", "createdAt": "2024-05-01T12:00:00Z"},
                {"id": 2, "sender": "bob", "content": "b", "createdAt": "2024-05-01T12:00:01Z"},
            ],
            "nextCursor": "c1",
        }))
        .unwrap();
        let ids: Vec<&str> = page.data.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["m1", "2"]);

        let payload = json!({
            "id": 42,
            "sender": "alice",
            "content": "hi",
            "createdAt": "2024-05-01T12:00:00Z",
        });
        let Some(ServerEvent::NewMessage(msg)) =
            ServerEvent::decode(EVENT_NEW_MESSAGE, payload).unwrap()
        else {
            panic!("expected a new message");
        };
        assert_eq!(msg.id, MessageId::from("42"));
    }

    #[test]
    fn test_unknown_event_is_ignored() {
        let decoded = ServerEvent::decode("users:typing", json!({"user": "bob"})).unwrap();
        assert!(decoded.is_none());
    }

    #[test]
    fn test_malformed_payload_is_rejected() {
        let err = ServerEvent::decode(EVENT_NEW_MESSAGE, json!({"content": 3})).unwrap_err();
        assert!(matches!(err, ProtocolError::UnexpectedPayload { .. }));
    }

    #[test]
    fn test_backfill_args_are_positional() {
        let call = ClientCall::GetOldMessages(OldMessagesRequest {
            cursor: None,
            chat_type: ChatType::Dm,
            target: "bob".into(),
        });

        assert_eq!(call.event_name(), EVENT_GET_OLD_MESSAGES);
        assert_eq!(
            call.encode_args().unwrap(),
            vec![Value::Null, json!("dm"), json!("bob")]
        );
    }

    #[test]
    fn test_validate_outgoing_message() {
        let mut data = CreateMessageData {
            chat_type: ChatType::Channel,
            target: "general".into(),
            content: "hello".into(),
        };
        assert!(data.validate().is_ok());

        data.content = " \n ".into();
        assert_eq!(data.validate().unwrap_err(), ValidationError::EmptyContent);

        data.content = "x".repeat(MAX_MESSAGE_LEN + 1);
        assert!(matches!(
            data.validate(),
            Err(ValidationError::ContentTooLong { .. })
        ));

        data.content = "hello".into();
        data.target = String::new();
        assert_eq!(data.validate().unwrap_err(), ValidationError::EmptyName);

        data.target = "alice-bob".into();
        assert_eq!(data.validate().unwrap_err(), ValidationError::InvalidName);
    }

    #[test]
    fn test_page_with_null_cursor() {
        let page = Page::from_json(json!({"data": [], "nextCursor": null})).unwrap();
        assert!(page.data.is_empty());
        assert!(page.next_cursor.is_none());

        let page = Page::from_json(json!({"data": [], "nextCursor": "c1"})).unwrap();
        assert_eq!(page.next_cursor.as_deref(), Some("c1"));
    }
}
