//! WebSocket server: axum router, socket handler and shutdown signal.

mod handler;
mod server;
mod signal;
pub mod state;

pub use server::{BoxError, Server};
