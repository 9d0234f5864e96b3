//! E2E scenarios.

mod lifecycle;
mod relay_flow;
mod stats_report;
