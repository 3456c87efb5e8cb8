//! Connection handle: one client's transport session plus its identity.

use std::collections::BTreeMap;

use serde::Serialize;
use tokio::sync::mpsc;

use super::{
    message::{RoomMember, ServerMessage},
    value_object::{ConnectionId, Timestamp, Username},
};

/// Frame queued for the transport task of a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    Text(String),
    /// Close the socket and stop pushing
    Close,
}

/// Sending half of a connection's outbound queue
pub type PusherChannel = mpsc::UnboundedSender<OutboundFrame>;

/// Connections indexed by id, iterated in id order
pub type ConnectionMap = BTreeMap<ConnectionId, Connection>;

/// A live client connection.
///
/// Sending never fails from the caller's point of view: if the transport is
/// gone the frame is dropped and the failure logged. The disconnect path is
/// responsible for cleaning up the registry.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    username: Option<Username>,
    connected_at: Timestamp,
    last_pong_at: Timestamp,
    channel: PusherChannel,
}

impl Connection {
    pub fn new(id: ConnectionId, channel: PusherChannel, connected_at: Timestamp) -> Self {
        Self {
            id,
            username: None,
            connected_at,
            last_pong_at: connected_at,
            channel,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn username(&self) -> Option<&Username> {
        self.username.as_ref()
    }

    /// Username, or `""` before identity setup
    pub fn username_str(&self) -> &str {
        self.username.as_ref().map(Username::as_str).unwrap_or("")
    }

    pub fn is_identified(&self) -> bool {
        self.username.is_some()
    }

    pub fn set_username(&mut self, username: Username) {
        self.username = Some(username);
    }

    pub fn connected_at(&self) -> Timestamp {
        self.connected_at
    }

    pub fn last_pong_at(&self) -> Timestamp {
        self.last_pong_at
    }

    /// Record a liveness acknowledgment
    pub fn touch(&mut self, now: Timestamp) {
        self.last_pong_at = now;
    }

    /// Serialize and queue a message for this client
    pub fn send<T: Serialize>(&self, message: &T) {
        match serde_json::to_string(message) {
            Ok(json) => self.send_raw(json),
            Err(e) => {
                tracing::error!("Failed to serialize message for connection {}: {}", self.id, e);
            }
        }
    }

    /// Queue an already-encoded payload
    pub fn send_raw(&self, json: String) {
        if self.channel.send(OutboundFrame::Text(json)).is_err() {
            tracing::debug!("Connection {} is closed, dropping outbound message", self.id);
        }
    }

    pub fn notify_error(&self, message: impl Into<String>) {
        self.send(&ServerMessage::Error {
            error: message.into(),
        });
    }

    /// Tell the client it is no longer in its room
    pub fn force_leave(&self, was_kicked: bool) {
        self.send(&ServerMessage::LeaveRoom { kick: was_kicked });
    }

    pub fn present_as_room_member(&self) -> RoomMember {
        RoomMember {
            id: self.id,
            username: self.username_str().to_string(),
        }
    }

    /// Ask the transport to close the socket
    pub fn close(&self) {
        if self.channel.send(OutboundFrame::Close).is_err() {
            tracing::debug!("Connection {} already closed", self.id);
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{connection, drain_json};
    use super::*;
    use serde_json::json;

    #[test]
    fn test_send_queues_json_text() {
        // テスト項目: send したメッセージが JSON テキストとしてキューに積まれる
        // given (前提条件):
        let (conn, mut rx) = connection(1, Some("alice"));

        // when (操作):
        conn.send(&ServerMessage::Ping);

        // then (期待する結果):
        assert_eq!(drain_json(&mut rx), vec![json!({"command": "ping"})]);
    }

    #[test]
    fn test_send_to_closed_transport_does_not_panic() {
        // テスト項目: 切断済みのトランスポートへの送信は握りつぶされる
        // given (前提条件):
        let (conn, rx) = connection(1, Some("alice"));
        drop(rx);

        // when (操作):
        conn.send(&ServerMessage::Ping);
        conn.notify_error("boom");
        conn.close();

        // then (期待する結果): パニックしない
        assert!(conn.is_identified());
    }

    #[test]
    fn test_notify_error_envelope() {
        // テスト項目: エラーは error コマンドとして送信される
        // given (前提条件):
        let (conn, mut rx) = connection(1, None);

        // when (操作):
        conn.notify_error("Room is full!");

        // then (期待する結果):
        assert_eq!(
            drain_json(&mut rx),
            vec![json!({"command": "error", "error": "Room is full!"})]
        );
    }

    #[test]
    fn test_force_leave_distinguishes_kick() {
        // テスト項目: 自発的な退出と強制退出が kick フラグで区別される
        // given (前提条件):
        let (conn, mut rx) = connection(1, Some("alice"));

        // when (操作):
        conn.force_leave(false);
        conn.force_leave(true);

        // then (期待する結果):
        assert_eq!(
            drain_json(&mut rx),
            vec![
                json!({"command": "leaveRoom", "kick": false}),
                json!({"command": "leaveRoom", "kick": true}),
            ]
        );
    }

    #[test]
    fn test_present_as_room_member() {
        // テスト項目: ルームメンバーとしての公開情報は id と username のみ
        // given (前提条件):
        let (conn, _rx) = connection(5, Some("carol"));

        // when (操作):
        let member = conn.present_as_room_member();

        // then (期待する結果):
        assert_eq!(
            member,
            RoomMember {
                id: ConnectionId::new(5),
                username: "carol".to_string()
            }
        );
    }

    #[test]
    fn test_close_queues_close_frame() {
        // テスト項目: close で Close フレームがキューに積まれる
        // given (前提条件):
        let (conn, mut rx) = connection(1, None);

        // when (操作):
        conn.close();

        // then (期待する結果):
        assert_eq!(rx.try_recv(), Ok(OutboundFrame::Close));
    }

    #[test]
    fn test_touch_updates_last_pong() {
        // テスト項目: touch で最終応答時刻が更新される
        // given (前提条件):
        let (mut conn, _rx) = connection(1, None);

        // when (操作):
        conn.touch(Timestamp::new(42));

        // then (期待する結果):
        assert_eq!(conn.last_pong_at(), Timestamp::new(42));
        assert_eq!(conn.connected_at(), Timestamp::new(0));
    }
}
