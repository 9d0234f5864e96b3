//! Shared E2E test helpers.

pub mod config;
pub mod irc_server;
pub mod log_file;
pub mod relay;
