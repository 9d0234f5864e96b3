//! HoneyRelay daemon library.
//!
//! Exposes the daemon's modules for integration testing.
//! In production, the `honeyrelay` binary (main.rs) is used.

pub mod cli;
pub mod dispatcher;
pub mod health;
pub mod logging;
pub mod metrics_server;

pub use dispatcher::Dispatcher;
