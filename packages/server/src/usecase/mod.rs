//! UseCase layer: the command dispatcher and the liveness sweeper.

mod dispatcher;
mod error;
mod liveness;

pub use dispatcher::Dispatcher;
pub use error::CommandError;
pub use liveness::LivenessSweeper;
