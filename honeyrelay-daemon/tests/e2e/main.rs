//! End-to-end tests for the honeyrelay daemon.
//!
//! A real log file is tailed from a temp directory and the IRC side is an
//! in-memory fake server, so whole relay flows run without a network.
//!
//! # Test Structure
//!
//! - `helpers/` -- config builder, log writer, fake IRC server
//! - `scenarios/` -- relay flow, stats reports, lifecycle
//!
//! # Running
//!
//! ```bash
//! cargo test -p honeyrelay-daemon --test e2e
//! ```

mod helpers;
mod scenarios;
