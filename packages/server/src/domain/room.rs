//! Room entity: an owned, capacity-bounded, optionally password-protected
//! group of connections.
//!
//! Rooms store member ids only. Connections are resolved through the
//! [`ConnectionMap`] passed into each operation, so there is no reference
//! cycle between rooms and connections.

use serde::{Deserialize, Serialize};

use super::{
    connection::{Connection, ConnectionMap},
    error::DomainError,
    message::{RoomMember, RoomSnapshot, ServerMessage},
    value_object::{ConnectionId, RoomId, Timestamp},
};

/// How membership changes are announced to the members of a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipUpdates {
    /// Every affected member receives a full `setRoom` view
    #[default]
    Snapshot,
    /// The joiner receives `setRoom`, everyone else `addRoomUser` / `deleteRoomUser`
    Delta,
}

/// Result of [`Room::leave`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Departure {
    /// A regular member left
    Left,
    /// The owner left; the room must be destroyed
    OwnerLeft,
    /// The connection was not a member
    NotMember,
}

#[derive(Debug, Clone)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub capacity: usize,
    password: Option<String>,
    pub owner: ConnectionId,
    members: Vec<ConnectionId>,
    pub created_at: Timestamp,
}

impl Room {
    /// Create a room whose only member is its owner.
    ///
    /// An empty password means no password.
    pub fn new(
        id: RoomId,
        name: String,
        capacity: usize,
        password: Option<String>,
        owner: ConnectionId,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            name,
            capacity,
            password: password.filter(|p| !p.is_empty()),
            owner,
            members: vec![owner],
            created_at,
        }
    }

    pub fn members(&self) -> &[ConnectionId] {
        &self.members
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.members.contains(&id)
    }

    pub fn is_owner(&self, id: ConnectionId) -> bool {
        self.owner == id
    }

    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }

    /// Check whether `joiner` may enter with `password`, without changing anything.
    ///
    /// Checks run in order: capacity, password, duplicate username.
    pub fn check_admission(
        &self,
        joiner: &Connection,
        password: Option<&str>,
        connections: &ConnectionMap,
    ) -> Result<(), DomainError> {
        if self.members.len() >= self.capacity {
            return Err(DomainError::RoomFull);
        }
        if let Some(expected) = &self.password
            && password.unwrap_or_default() != expected.as_str()
        {
            return Err(DomainError::WrongPassword);
        }
        let duplicate = self
            .members
            .iter()
            .filter_map(|id| connections.get(id))
            .any(|member| member.username() == joiner.username());
        if duplicate {
            return Err(DomainError::DuplicateUsername);
        }
        Ok(())
    }

    /// Admit `joiner` and announce the new membership.
    pub fn join(
        &mut self,
        joiner: &Connection,
        password: Option<&str>,
        connections: &ConnectionMap,
        updates: MembershipUpdates,
    ) -> Result<(), DomainError> {
        self.check_admission(joiner, password, connections)?;
        self.members.push(joiner.id());

        match updates {
            MembershipUpdates::Snapshot => self.broadcast_view(connections),
            MembershipUpdates::Delta => {
                joiner.send(&self.to_view(connections));
                let notice = ServerMessage::AddRoomUser {
                    user: joiner.present_as_room_member(),
                };
                self.broadcast_except(&notice, joiner.id(), connections);
            }
        }
        Ok(())
    }

    /// Remove `leaver` from the room.
    ///
    /// The owner is never removed here: [`Departure::OwnerLeft`] tells the
    /// caller to destroy the room instead.
    pub fn leave(
        &mut self,
        leaver: &Connection,
        connections: &ConnectionMap,
        updates: MembershipUpdates,
    ) -> Departure {
        if self.is_owner(leaver.id()) {
            return Departure::OwnerLeft;
        }
        let Some(position) = self.members.iter().position(|id| *id == leaver.id()) else {
            return Departure::NotMember;
        };
        self.members.remove(position);
        leaver.force_leave(false);

        match updates {
            MembershipUpdates::Snapshot => self.broadcast_view(connections),
            MembershipUpdates::Delta => {
                let notice = ServerMessage::DeleteRoomUser {
                    user: leaver.present_as_room_member(),
                };
                self.broadcast(&notice, connections);
            }
        }
        Departure::Left
    }

    /// Send every member a kicked departure notice and empty the room.
    pub fn evict_all(&mut self, connections: &ConnectionMap) {
        for id in self.members.drain(..) {
            if let Some(member) = connections.get(&id) {
                member.force_leave(true);
            }
        }
    }

    /// Fan a chat message out to every member, sender included.
    pub fn broadcast_message(
        &self,
        sender: &Connection,
        content: serde_json::Value,
        connections: &ConnectionMap,
    ) {
        let message = ServerMessage::AddMessage {
            username: sender.username_str().to_string(),
            content,
        };
        self.broadcast(&message, connections);
    }

    pub fn to_snapshot(&self, connections: &ConnectionMap) -> RoomSnapshot {
        RoomSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            max_users: self.capacity,
            users_amount: self.members.len(),
            owner: self.owner_member(connections),
            has_password: self.has_password(),
        }
    }

    /// The `setRoom` view sent to members
    pub fn to_view(&self, connections: &ConnectionMap) -> ServerMessage {
        ServerMessage::SetRoom {
            id: self.id.clone(),
            name: self.name.clone(),
            max_users: self.capacity,
            owner_id: self.owner,
            has_password: self.has_password(),
            users: self
                .members
                .iter()
                .filter_map(|id| connections.get(id))
                .map(Connection::present_as_room_member)
                .collect(),
        }
    }

    fn owner_member(&self, connections: &ConnectionMap) -> RoomMember {
        connections
            .get(&self.owner)
            .map(Connection::present_as_room_member)
            .unwrap_or_else(|| RoomMember {
                id: self.owner,
                username: String::new(),
            })
    }

    fn broadcast_view(&self, connections: &ConnectionMap) {
        self.broadcast(&self.to_view(connections), connections);
    }

    fn broadcast(&self, message: &ServerMessage, connections: &ConnectionMap) {
        for member in self.members.iter().filter_map(|id| connections.get(id)) {
            member.send(message);
        }
    }

    fn broadcast_except(
        &self,
        message: &ServerMessage,
        exclude: ConnectionId,
        connections: &ConnectionMap,
    ) {
        for member in self
            .members
            .iter()
            .filter(|id| **id != exclude)
            .filter_map(|id| connections.get(id))
        {
            member.send(message);
        }
    }
}
