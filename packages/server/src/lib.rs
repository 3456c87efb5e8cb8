//! Hiroba room relay server.
//!
//! Clients connect over WebSocket, pick a username, create or join rooms,
//! chat with the other members and relay signalling payloads to each other.

pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
