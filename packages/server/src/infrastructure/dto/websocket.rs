//! Inbound WebSocket messages.
//!
//! A client message is a JSON object that either carries a `to` field (a
//! relay to another connection) or a `command` field naming one of the
//! [`ClientCommand`] variants.

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::ConnectionId;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    #[serde(default)]
    pub name: String,
    pub max_users: Option<usize>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JoinRoomRequest {
    pub id: String,
    pub password: Option<String>,
}

/// Commands a client can issue
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum ClientCommand {
    SetInfo { username: String },
    CreateRoom(CreateRoomRequest),
    GetRooms,
    JoinRoom(JoinRoomRequest),
    LeaveRoom,
    SendMessage { content: Value },
    Pong,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    Command(ClientCommand),
    /// Direct message to another connection, forwarded as-is
    Relay {
        to: ConnectionId,
        payload: Map<String, Value>,
    },
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("message is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("message must be a JSON object")]
    NotAnObject,

    #[error("invalid relay target: {0}")]
    InvalidRelayTarget(String),

    #[error("unknown or malformed command: {0}")]
    InvalidCommand(#[source] serde_json::Error),
}

impl InboundMessage {
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_str(text).map_err(DecodeError::InvalidJson)?;
        let Value::Object(payload) = value else {
            return Err(DecodeError::NotAnObject);
        };

        match payload.get("to") {
            None | Some(Value::Null) => serde_json::from_value(Value::Object(payload))
                .map(Self::Command)
                .map_err(DecodeError::InvalidCommand),
            Some(target) => {
                let to = parse_relay_target(target)?;
                Ok(Self::Relay { to, payload })
            }
        }
    }
}

/// Relay targets may be sent as numbers or numeric strings
fn parse_relay_target(value: &Value) -> Result<ConnectionId, DecodeError> {
    let id = match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.parse().ok(),
        _ => None,
    };
    id.map(ConnectionId::new)
        .ok_or_else(|| DecodeError::InvalidRelayTarget(value.to_string()))
}
