//! Messages the server pushes to clients.
//!
//! Every payload is a JSON object whose `command` field names its type.

use serde::{Deserialize, Serialize};

use super::value_object::{ConnectionId, RoomId};

/// Public projection of a room member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomMember {
    pub id: ConnectionId,
    pub username: String,
}

/// Lobby listing entry for a room. Never carries the password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub id: RoomId,
    pub name: String,
    pub max_users: usize,
    pub users_amount: usize,
    pub owner: RoomMember,
    pub has_password: bool,
}

/// ICE server entry handed to clients for peer-to-peer signalling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServer {
    pub urls: String,
}

/// Outbound server message
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Identity confirmation plus client configuration
    SetInfo {
        id: ConnectionId,
        username: String,
        ice_servers: Vec<IceServer>,
        ping_interval: u64,
    },
    /// Room list for the lobby
    SetRooms { rooms: Vec<RoomSnapshot> },
    /// Full view of the room the recipient is in
    SetRoom {
        id: RoomId,
        name: String,
        max_users: usize,
        owner_id: ConnectionId,
        has_password: bool,
        users: Vec<RoomMember>,
    },
    AddRoomUser { user: RoomMember },
    DeleteRoomUser { user: RoomMember },
    /// Chat message; `content` is forwarded exactly as the sender wrote it
    AddMessage {
        username: String,
        content: serde_json::Value,
    },
    /// The recipient is no longer in its room
    LeaveRoom { kick: bool },
    Error { error: String },
    Ping,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_leave_room_serialization() {
        // テスト項目: leaveRoom が command タグ付きの JSON になる
        // given (前提条件):
        let message = ServerMessage::LeaveRoom { kick: true };

        // when (操作):
        let value = serde_json::to_value(&message).unwrap();

        // then (期待する結果):
        assert_eq!(value, json!({"command": "leaveRoom", "kick": true}));
    }

    #[test]
    fn test_ping_serialization() {
        // テスト項目: ping はフィールドを持たない JSON になる
        // given (前提条件):
        let message = ServerMessage::Ping;

        // when (操作):
        let value = serde_json::to_value(&message).unwrap();

        // then (期待する結果):
        assert_eq!(value, json!({"command": "ping"}));
    }

    #[test]
    fn test_set_room_uses_camel_case_fields() {
        // テスト項目: setRoom のフィールド名が camelCase になる
        // given (前提条件):
        let message = ServerMessage::SetRoom {
            id: RoomId::parse("ABCDEFGHIJ").unwrap(),
            name: "lobby".to_string(),
            max_users: 4,
            owner_id: ConnectionId::new(1),
            has_password: false,
            users: vec![RoomMember {
                id: ConnectionId::new(1),
                username: "alice".to_string(),
            }],
        };

        // when (操作):
        let value = serde_json::to_value(&message).unwrap();

        // then (期待する結果):
        assert_eq!(
            value,
            json!({
                "command": "setRoom",
                "id": "ABCDEFGHIJ",
                "name": "lobby",
                "maxUsers": 4,
                "ownerId": 1,
                "hasPassword": false,
                "users": [{"id": 1, "username": "alice"}]
            })
        );
    }

    #[test]
    fn test_set_info_carries_ice_servers() {
        // テスト項目: setInfo に ICE サーバーと ping 間隔が含まれる
        // given (前提条件):
        let message = ServerMessage::SetInfo {
            id: ConnectionId::new(7),
            username: "bob".to_string(),
            ice_servers: vec![IceServer {
                urls: "stun:stun.example.org:3478".to_string(),
            }],
            ping_interval: 10_000,
        };

        // when (操作):
        let value = serde_json::to_value(&message).unwrap();

        // then (期待する結果):
        assert_eq!(
            value,
            json!({
                "command": "setInfo",
                "id": 7,
                "username": "bob",
                "iceServers": [{"urls": "stun:stun.example.org:3478"}],
                "pingInterval": 10000
            })
        );
    }
}
