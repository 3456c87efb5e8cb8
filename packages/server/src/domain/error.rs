//! Domain errors.

use thiserror::Error;

/// Value object validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("Room id must be {expected} characters, got {found}")]
    InvalidRoomIdLength { expected: usize, found: usize },

    #[error("Room id contains invalid character '{ch}' at position {index}")]
    InvalidRoomIdCharacter { ch: char, index: usize },

    #[error("Username must not be empty")]
    EmptyUsername,
}

/// Errors raised by room and registry operations.
///
/// The `Display` text is what the requesting client sees in its error envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Room does not exist!")]
    RoomNotFound,

    #[error("Room is full!")]
    RoomFull,

    #[error("Incorrect password!")]
    WrongPassword,

    #[error("You are already in this room (maybe from another browser)!")]
    DuplicateUsername,

    #[error("You already have a room!")]
    AlreadyOwnsRoom,

    #[error("Join the room first!")]
    NotInAnyRoom,

    #[error("Connection is not registered")]
    ConnectionNotFound,

    #[error("Set your username first!")]
    IdentityRequired,

    #[error("Leave the room before changing your username!")]
    UsernameLocked,

    #[error("{0}")]
    InvalidValue(#[from] ValueObjectError),
}
