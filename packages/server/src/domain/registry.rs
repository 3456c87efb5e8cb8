//! Room registry: every live connection and every room of the process.
//!
//! All mutation goes through `&mut Registry`; the dispatcher owns the single
//! instance behind one lock, so operations never interleave.

use std::collections::HashMap;

use serde_json::{Map, Value};

use super::{
    connection::{Connection, ConnectionMap},
    error::DomainError,
    message::{RoomSnapshot, ServerMessage},
    room::{Departure, MembershipUpdates, Room},
    value_object::{ConnectionId, RoomId, RoomIdFactory, Timestamp, Username},
};

pub const DEFAULT_ROOM_CAPACITY: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrySettings {
    /// Capacity used when a create request omits `maxUsers` or sends 0
    pub default_room_capacity: usize,
    pub membership_updates: MembershipUpdates,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            default_room_capacity: DEFAULT_ROOM_CAPACITY,
            membership_updates: MembershipUpdates::default(),
        }
    }
}

/// Parameters of a create-room request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateRoom {
    pub name: String,
    pub max_users: Option<usize>,
    pub password: Option<String>,
}

/// Outcome of one liveness sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub pinged: Vec<ConnectionId>,
    pub disconnected: Vec<ConnectionId>,
}

#[derive(Debug, Default)]
pub struct Registry {
    connections: ConnectionMap,
    rooms: HashMap<RoomId, Room>,
    /// Room ids in creation order, for the lobby listing
    room_order: Vec<RoomId>,
    settings: RegistrySettings,
}

impl Registry {
    pub fn new(settings: RegistrySettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn settings(&self) -> &RegistrySettings {
        &self.settings
    }

    pub fn register(&mut self, connection: Connection) {
        tracing::debug!("Connection {} registered", connection.id());
        self.connections.insert(connection.id(), connection);
    }

    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn room(&self, id: &RoomId) -> Option<&Room> {
        self.rooms.get(id)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// The room `id` is a member of, if any
    pub fn joined_room_id(&self, id: ConnectionId) -> Option<RoomId> {
        self.rooms
            .values()
            .find(|room| room.contains(id))
            .map(|room| room.id.clone())
    }

    /// The room `id` owns, if any
    pub fn owned_room_id(&self, id: ConnectionId) -> Option<RoomId> {
        self.rooms
            .values()
            .find(|room| room.is_owner(id))
            .map(|room| room.id.clone())
    }

    fn identified(&self, id: ConnectionId) -> Result<&Connection, DomainError> {
        let connection = self
            .connections
            .get(&id)
            .ok_or(DomainError::ConnectionNotFound)?;
        if !connection.is_identified() {
            return Err(DomainError::IdentityRequired);
        }
        Ok(connection)
    }

    /// Assign a username.
    ///
    /// Repeating the current name is a no-op; renaming while inside a room is
    /// refused so the room's duplicate-name guarantee holds.
    pub fn set_identity(&mut self, id: ConnectionId, username: Username) -> Result<(), DomainError> {
        let in_room = self.joined_room_id(id).is_some();
        let connection = self
            .connections
            .get_mut(&id)
            .ok_or(DomainError::ConnectionNotFound)?;
        if in_room && connection.username() != Some(&username) {
            return Err(DomainError::UsernameLocked);
        }
        tracing::info!("{} connected as connection {}", username, id);
        connection.set_username(username);
        Ok(())
    }

    /// Create a room owned by `owner`.
    ///
    /// If `owner` is a member of another room it leaves that room first.
    pub fn create_room(
        &mut self,
        owner: ConnectionId,
        request: CreateRoom,
        now: Timestamp,
    ) -> Result<RoomId, DomainError> {
        self.identified(owner)?;
        if self.owned_room_id(owner).is_some() {
            return Err(DomainError::AlreadyOwnsRoom);
        }
        if self.joined_room_id(owner).is_some() {
            self.leave_room(owner)?;
        }

        let id = self.allocate_room_id();
        let capacity = request
            .max_users
            .filter(|capacity| *capacity > 0)
            .unwrap_or(self.settings.default_room_capacity);
        let room = Room::new(
            id.clone(),
            request.name,
            capacity,
            request.password,
            owner,
            now,
        );
        tracing::info!(
            "Room {} ('{}', capacity {}) created by connection {}",
            id,
            room.name,
            capacity,
            owner
        );
        self.rooms.insert(id.clone(), room);
        self.room_order.push(id.clone());

        self.broadcast_room_list();
        if let (Some(room), Some(connection)) = (self.rooms.get(&id), self.connections.get(&owner))
        {
            connection.send(&room.to_view(&self.connections));
        }
        Ok(id)
    }

    fn allocate_room_id(&self) -> RoomId {
        loop {
            let id = RoomIdFactory::generate();
            if !self.rooms.contains_key(&id) {
                return id;
            }
        }
    }

    /// Lobby listing in creation order
    pub fn room_snapshots(&self) -> Vec<RoomSnapshot> {
        self.room_order
            .iter()
            .filter_map(|id| self.rooms.get(id))
            .map(|room| room.to_snapshot(&self.connections))
            .collect()
    }

    pub fn send_room_list(&self, to: ConnectionId) {
        if let Some(connection) = self.connections.get(&to) {
            connection.send(&ServerMessage::SetRooms {
                rooms: self.room_snapshots(),
            });
        }
    }

    /// Send the lobby listing to every identified connection
    pub fn broadcast_room_list(&self) {
        let message = ServerMessage::SetRooms {
            rooms: self.room_snapshots(),
        };
        for connection in self.connections.values().filter(|c| c.is_identified()) {
            connection.send(&message);
        }
    }

    /// Join the room with the raw id `room_id`.
    ///
    /// Admission is checked before `id` leaves its current room, so a
    /// rejected join never costs the caller its membership.
    pub fn join_room(
        &mut self,
        id: ConnectionId,
        room_id: &str,
        password: Option<&str>,
    ) -> Result<(), DomainError> {
        let joiner = self.identified(id)?;
        let room_id = RoomId::parse(room_id).map_err(|_| DomainError::RoomNotFound)?;
        let room = self.rooms.get(&room_id).ok_or(DomainError::RoomNotFound)?;
        room.check_admission(joiner, password, &self.connections)?;

        if self.joined_room_id(id).is_some() {
            self.leave_room(id)?;
        }

        let room = self
            .rooms
            .get_mut(&room_id)
            .ok_or(DomainError::RoomNotFound)?;
        let joiner = self
            .connections
            .get(&id)
            .ok_or(DomainError::ConnectionNotFound)?;
        room.join(
            joiner,
            password,
            &self.connections,
            self.settings.membership_updates,
        )?;
        tracing::info!("Connection {} joined room {}", id, room_id);
        Ok(())
    }

    /// Leave the current room; the owner leaving destroys it.
    pub fn leave_room(&mut self, id: ConnectionId) -> Result<(), DomainError> {
        let room_id = self.joined_room_id(id).ok_or(DomainError::NotInAnyRoom)?;
        let room = self
            .rooms
            .get_mut(&room_id)
            .ok_or(DomainError::NotInAnyRoom)?;
        let leaver = self
            .connections
            .get(&id)
            .ok_or(DomainError::ConnectionNotFound)?;
        let departure = room.leave(leaver, &self.connections, self.settings.membership_updates);

        if departure == Departure::OwnerLeft {
            self.destroy_room(&room_id);
        } else {
            tracing::info!("Connection {} left room {}", id, room_id);
        }
        Ok(())
    }

    /// Broadcast a chat message to the sender's room
    pub fn send_message(&self, id: ConnectionId, content: Value) -> Result<(), DomainError> {
        let room = self
            .rooms
            .values()
            .find(|room| room.contains(id))
            .ok_or(DomainError::NotInAnyRoom)?;
        let sender = self
            .connections
            .get(&id)
            .ok_or(DomainError::ConnectionNotFound)?;
        room.broadcast_message(sender, content, &self.connections);
        Ok(())
    }

    /// Forward `payload` to `to` with a `from` field added.
    ///
    /// Returns `false` (and drops the payload) when `to` is not an
    /// identified connection.
    pub fn relay(&self, from: ConnectionId, to: ConnectionId, mut payload: Map<String, Value>) -> bool {
        let Some(target) = self
            .connections
            .get(&to)
            .filter(|connection| connection.is_identified())
        else {
            tracing::debug!("Relay from {} to unknown connection {} dropped", from, to);
            return false;
        };
        payload.insert("from".to_string(), Value::from(from.value()));
        target.send(&payload);
        true
    }

    pub fn acknowledge_ping(&mut self, id: ConnectionId, now: Timestamp) {
        if let Some(connection) = self.connections.get_mut(&id) {
            connection.touch(now);
        }
    }

    /// Remove a connection, leaving (or destroying) its room first.
    ///
    /// Idempotent: returns `None` if `id` was already gone.
    pub fn disconnect(&mut self, id: ConnectionId) -> Option<Connection> {
        let connection = self.connections.remove(&id)?;

        if let Some(room_id) = self.joined_room_id(id) {
            let departure = match self.rooms.get_mut(&room_id) {
                Some(room) => {
                    room.leave(&connection, &self.connections, self.settings.membership_updates)
                }
                None => Departure::NotMember,
            };
            if departure == Departure::OwnerLeft {
                self.destroy_room(&room_id);
            }
        }
        Some(connection)
    }

    /// Evict every member, drop the room and refresh everyone's lobby listing
    pub fn destroy_room(&mut self, room_id: &RoomId) {
        let Some(mut room) = self.rooms.remove(room_id) else {
            return;
        };
        tracing::info!(
            "Deleting room {} ('{}') because its owner left",
            room.id,
            room.name
        );
        room.evict_all(&self.connections);
        self.room_order.retain(|id| id != room_id);
        self.broadcast_room_list();
    }

    /// Disconnect connections silent for longer than `timeout_millis`, ping the rest.
    pub fn sweep(&mut self, now: Timestamp, timeout_millis: i64) -> SweepReport {
        let (idle, alive): (Vec<&Connection>, Vec<&Connection>) = self
            .connections
            .values()
            .partition(|connection| connection.last_pong_at().elapsed_until(now) > timeout_millis);
        let idle: Vec<ConnectionId> = idle.into_iter().map(Connection::id).collect();
        let alive: Vec<ConnectionId> = alive.into_iter().map(Connection::id).collect();

        for id in &idle {
            if let Some(connection) = self.connections.get(id) {
                tracing::info!("Connection {} missed its liveness deadline", id);
                connection.close();
            }
            self.disconnect(*id);
        }

        let mut report = SweepReport {
            pinged: Vec::with_capacity(alive.len()),
            disconnected: idle,
        };
        for id in alive {
            if let Some(connection) = self.connections.get(&id) {
                connection.send(&ServerMessage::Ping);
                report.pinged.push(id);
            }
        }
        report
    }
}
