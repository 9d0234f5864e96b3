//! Aggregated health reporting.
//!
//! The dispatcher reports one [`ComponentHealth`] per background activity
//! (tailer, dispatch loop, stats reporter, channel, queue). The overall
//! daemon status is the worst component status.
//!
//! # Aggregation Rule
//!
//! - All Healthy -> Healthy
//! - Any Degraded, none Unhealthy -> Degraded(reasons)
//! - Any Unhealthy -> Unhealthy(reasons)

use serde::Serialize;

use honeyrelay_core::pipeline::HealthStatus;

/// Queue utilization above which the queue counts as degraded.
pub const QUEUE_DEGRADED_UTILIZATION: f64 = 0.9;

/// Aggregated health report for the whole daemon.
#[derive(Debug, Clone, Serialize)]
pub struct DaemonHealth {
    /// Worst status among all components.
    pub status: HealthStatus,
    /// Seconds since the dispatcher was built.
    pub uptime_secs: u64,
    /// Current IRC connection state name.
    pub channel_state: String,
    /// Messages waiting in the outbound queue.
    pub queue_depth: usize,
    /// Per-component reports.
    pub components: Vec<ComponentHealth>,
}

/// Health of a single component.
#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    /// Component name (e.g. "log-tailer", "irc-channel").
    pub name: String,
    /// Current status.
    pub status: HealthStatus,
}

impl ComponentHealth {
    pub fn new(name: impl Into<String>, status: HealthStatus) -> Self {
        Self {
            name: name.into(),
            status,
        }
    }
}

/// Return the worst status found: Unhealthy > Degraded > Healthy.
pub fn aggregate_status(components: &[ComponentHealth]) -> HealthStatus {
    let mut degraded = Vec::new();
    let mut unhealthy = Vec::new();

    for component in components {
        match &component.status {
            HealthStatus::Healthy => {}
            HealthStatus::Degraded(reason) => {
                degraded.push(format!("{}: {}", component.name, reason));
            }
            HealthStatus::Unhealthy(reason) => {
                unhealthy.push(format!("{}: {}", component.name, reason));
            }
        }
    }

    if !unhealthy.is_empty() {
        HealthStatus::Unhealthy(unhealthy.join("; "))
    } else if !degraded.is_empty() {
        HealthStatus::Degraded(degraded.join("; "))
    } else {
        HealthStatus::Healthy
    }
}

/// Classify outbound queue pressure.
pub fn queue_status(utilization: f64) -> HealthStatus {
    if utilization > QUEUE_DEGRADED_UTILIZATION {
        HealthStatus::Degraded(format!("queue {:.0}% full", utilization * 100.0))
    } else {
        HealthStatus::Healthy
    }
}
