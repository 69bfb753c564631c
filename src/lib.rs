//! A REST service for managing items, gated by JWT bearer authentication.

pub mod core;
pub mod feature;
pub mod infra;
pub mod server;
