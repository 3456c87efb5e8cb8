//! Shared handler state.

use std::sync::Arc;

use crate::usecase::Dispatcher;

pub struct AppState {
    /// Single writer for every connection and room
    pub dispatcher: Arc<Dispatcher>,
}
