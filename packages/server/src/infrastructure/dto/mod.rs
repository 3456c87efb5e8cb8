//! Data Transfer Objects (DTOs) for the WebSocket protocol.
//!
//! - `websocket`: inbound message decoding
//! - `conversion`: DTO → domain request conversion

pub mod conversion;
pub mod websocket;
