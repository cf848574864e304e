//! Command implementations.

pub mod auth;
pub mod config;
pub mod drive;
pub mod server;
pub mod sheets;
