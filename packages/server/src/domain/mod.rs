//! Domain layer: connections, rooms and the registry that owns them.
//!
//! Nothing in here performs I/O. Outbound messages are queued on each
//! connection's channel and drained by the transport.

pub mod connection;
pub mod error;
pub mod message;
pub mod registry;
pub mod room;
pub mod value_object;

pub use connection::{Connection, ConnectionMap, OutboundFrame, PusherChannel};
pub use error::{DomainError, ValueObjectError};
pub use message::{IceServer, RoomMember, RoomSnapshot, ServerMessage};
pub use registry::{CreateRoom, DEFAULT_ROOM_CAPACITY, Registry, RegistrySettings, SweepReport};
pub use room::{Departure, MembershipUpdates, Room};
pub use value_object::{
    ConnectionId, ConnectionIdGenerator, RoomId, RoomIdFactory, Timestamp, Username,
};
