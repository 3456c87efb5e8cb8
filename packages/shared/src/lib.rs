//! Utilities shared by the Hiroba packages.

pub mod logger;
pub mod time;
