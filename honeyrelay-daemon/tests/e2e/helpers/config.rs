//! Test configuration builder.
//!
//! [`TestConfigBuilder`] produces a `RelayConfig` that tails a file in a
//! temp directory from the beginning, polls quickly, sends plain text and
//! never reports stats unless asked to.

use std::path::Path;

use honeyrelay_core::config::RelayConfig;

#[allow(dead_code)]
pub struct TestConfigBuilder {
    config: RelayConfig,
}

#[allow(dead_code)]
impl TestConfigBuilder {
    /// Test-safe defaults tailing `log_file`.
    pub fn new(log_file: &Path) -> Self {
        let mut config = RelayConfig::default();

        config.general.pid_file = String::new();
        config.metrics.enabled = false;

        config.monitor.log_file_path = log_file.to_string_lossy().into_owned();
        config.monitor.start_at = "beginning".to_owned();
        config.monitor.poll_interval_ms = 20;

        config.irc.server_host = "irc.test".to_owned();
        config.irc.server_port = 6667;
        config.irc.use_tls = false;
        config.irc.channel = "#hp".to_owned();
        config.irc.use_colors = false;
        config.irc.join_message = String::new();
        config.irc.rate_limit.messages = 100;
        config.irc.rate_limit.window_secs = 1;

        config.stats.report_interval_secs = 3600;
        config.stats.daily_report = false;

        Self { config }
    }

    pub fn format(mut self, format: &str) -> Self {
        self.config.monitor.format = format.to_owned();
        self
    }

    pub fn start_at(mut self, start_at: &str) -> Self {
        self.config.monitor.start_at = start_at.to_owned();
        self
    }

    pub fn stats_interval(mut self, secs: u64) -> Self {
        self.config.stats.report_interval_secs = secs;
        self
    }

    pub fn join_message(mut self, message: &str) -> Self {
        self.config.irc.join_message = message.to_owned();
        self
    }

    pub fn pid_file(mut self, path: &Path) -> Self {
        self.config.general.pid_file = path.to_string_lossy().into_owned();
        self
    }

    pub fn build(self) -> RelayConfig {
        self.config
    }
}
