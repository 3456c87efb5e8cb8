//! Infrastructure layer: wire formats.

pub mod dto;
