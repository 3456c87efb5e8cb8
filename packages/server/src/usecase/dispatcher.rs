//! UseCase: client command dispatch
//!
//! ## 概要
//!
//! `Dispatcher` はサーバー状態（`Registry`）の唯一の書き込み口です。
//! 受信メッセージ・切断・生存確認スイープはすべてロックを 1 回だけ取得し、
//! 途中で await せずに処理を完了するため、操作が混ざり合うことはありません。

use std::{sync::Arc, time::Duration};

use hiroba_shared::time::{Clock, timestamp_to_rfc3339};
use tokio::sync::Mutex;

use crate::{
    config::ServerConfig,
    domain::{
        Connection, ConnectionId, ConnectionIdGenerator, DomainError, IceServer, PusherChannel,
        Registry, RoomSnapshot, ServerMessage, SweepReport, Timestamp, Username,
    },
    infrastructure::dto::websocket::{ClientCommand, InboundMessage},
};

use super::error::CommandError;

pub struct Dispatcher {
    registry: Mutex<Registry>,
    ids: ConnectionIdGenerator,
    clock: Arc<dyn Clock>,
    ice_servers: Vec<IceServer>,
    ping_interval: Duration,
}

impl Dispatcher {
    pub fn new(config: &ServerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            registry: Mutex::new(Registry::new(config.registry_settings())),
            ids: ConnectionIdGenerator::new(),
            clock,
            ice_servers: config.ice_servers.clone(),
            ping_interval: config.ping_interval,
        }
    }

    fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }

    /// Register a freshly accepted transport and return its id
    pub async fn connect(&self, channel: PusherChannel) -> ConnectionId {
        let id = self.ids.next_id();
        let connection = Connection::new(id, channel, self.now());
        self.registry.lock().await.register(connection);
        id
    }

    /// Decode and dispatch one text frame from `id`.
    ///
    /// Failures are reported to the client; nothing propagates.
    pub async fn handle_text(&self, id: ConnectionId, text: &str) {
        let inbound = match InboundMessage::decode(text) {
            Ok(inbound) => inbound,
            Err(e) => {
                tracing::warn!("Rejecting malformed message from connection {}: {}", id, e);
                let error = CommandError::Malformed(e);
                if let Some(connection) = self.registry.lock().await.connection(id) {
                    connection.notify_error(error.to_string());
                }
                return;
            }
        };
        // Already reported to the client
        let _ = self.dispatch(id, inbound).await;
    }

    /// Apply one inbound message. On error the client receives an error
    /// envelope and the error is returned.
    pub async fn dispatch(
        &self,
        id: ConnectionId,
        inbound: InboundMessage,
    ) -> Result<(), CommandError> {
        let mut registry = self.registry.lock().await;
        let result = self.apply(&mut registry, id, inbound);
        if let Err(e) = &result {
            tracing::debug!("Command from connection {} rejected: {}", id, e);
            if let Some(connection) = registry.connection(id) {
                connection.notify_error(e.to_string());
            }
        }
        result
    }

    fn apply(
        &self,
        registry: &mut Registry,
        id: ConnectionId,
        inbound: InboundMessage,
    ) -> Result<(), CommandError> {
        let command = match inbound {
            InboundMessage::Relay { to, payload } => {
                registry.relay(id, to, payload);
                return Ok(());
            }
            InboundMessage::Command(command) => command,
        };

        match command {
            ClientCommand::SetInfo { username } => {
                let username = Username::new(username).map_err(DomainError::from)?;
                registry.set_identity(id, username.clone())?;
                if let Some(connection) = registry.connection(id) {
                    connection.send(&ServerMessage::SetInfo {
                        id,
                        username: username.to_string(),
                        ice_servers: self.ice_servers.clone(),
                        ping_interval: u64::try_from(self.ping_interval.as_millis())
                            .unwrap_or(u64::MAX),
                    });
                }
            }
            ClientCommand::CreateRoom(request) => {
                registry.create_room(id, request.into(), self.now())?;
            }
            ClientCommand::GetRooms => registry.send_room_list(id),
            ClientCommand::JoinRoom(request) => {
                registry.join_room(id, &request.id, request.password.as_deref())?;
            }
            ClientCommand::LeaveRoom => registry.leave_room(id)?,
            ClientCommand::SendMessage { content } => registry.send_message(id, content)?,
            ClientCommand::Pong => registry.acknowledge_ping(id, self.now()),
        }
        Ok(())
    }

    /// Transport-level disconnect. Returns `false` if `id` was already gone.
    pub async fn disconnect(&self, id: ConnectionId) -> bool {
        let removed = self.registry.lock().await.disconnect(id);
        match removed {
            Some(connection) => {
                tracing::info!(
                    "Connection {} ({}) disconnected, connected since {}",
                    id,
                    connection.username_str(),
                    timestamp_to_rfc3339(connection.connected_at().value())
                        .unwrap_or_else(|| "unknown".to_string())
                );
                true
            }
            None => false,
        }
    }

    /// Run one liveness sweep with the given silence threshold
    pub async fn sweep(&self, timeout: Duration) -> SweepReport {
        let now = self.now();
        self.registry
            .lock()
            .await
            .sweep(now, i64::try_from(timeout.as_millis()).unwrap_or(i64::MAX))
    }

    pub async fn room_snapshots(&self) -> Vec<RoomSnapshot> {
        self.registry.lock().await.room_snapshots()
    }

    pub async fn connection_count(&self) -> usize {
        self.registry.lock().await.connection_count()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::atomic::{AtomicI64, Ordering};

    use mockall::mock;

    use super::*;

    mock! {
        pub Clock {}

        impl Clock for Clock {
            fn now_millis(&self) -> i64;
        }
    }

    /// A mocked clock that reads the shared `now` cell on every call
    pub fn clock_reading(now: Arc<AtomicI64>) -> Arc<dyn Clock> {
        let mut clock = MockClock::new();
        clock
            .expect_now_millis()
            .returning(move || now.load(Ordering::SeqCst));
        Arc::new(clock)
    }
}
