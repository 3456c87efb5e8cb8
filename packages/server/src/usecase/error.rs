//! UseCase errors.

use thiserror::Error;

use crate::{domain::DomainError, infrastructure::dto::websocket::DecodeError};

/// Reasons a client command is rejected.
///
/// The `Display` text is sent back to the client.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Invalid message format!")]
    Malformed(#[source] DecodeError),
}
