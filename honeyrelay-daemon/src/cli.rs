//! CLI argument definitions for the honeyrelay daemon.
//!
//! Uses `clap` v4 derive macros. Every flag except `--config`, `--validate`
//! and `--dry-run` overrides one field of the loaded configuration.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;

use honeyrelay_core::config::RelayConfig;

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/honeyrelay/honeyrelay.toml";

/// Honeypot log to IRC relay.
///
/// Tails a Cowrie log, formats each attacker event, posts it to an IRC
/// channel and periodically reports aggregated statistics.
#[derive(Parser, Debug, Default)]
#[command(name = "honeyrelay")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to honeyrelay.toml configuration file.
    ///
    /// When omitted, the default location is used if it exists,
    /// otherwise built-in defaults apply.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Honeypot log file to monitor.
    #[arg(long)]
    pub log_file: Option<String>,

    /// IRC server hostname.
    #[arg(long)]
    pub server: Option<String>,

    /// IRC server port.
    #[arg(long)]
    pub port: Option<u16>,

    /// IRC channel to join.
    #[arg(long)]
    pub channel: Option<String>,

    /// IRC nickname.
    #[arg(long)]
    pub nickname: Option<String>,

    /// Connect without TLS.
    #[arg(long)]
    pub no_tls: bool,

    /// Send plain messages without mIRC color codes.
    #[arg(long)]
    pub no_colors: bool,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    #[arg(long)]
    pub log_format: Option<String>,

    /// Override PID file path.
    #[arg(long)]
    pub pid_file: Option<String>,

    /// Validate configuration and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,

    /// Log outbound messages instead of connecting to IRC.
    #[arg(long)]
    pub dry_run: bool,
}

impl DaemonCli {
    /// Load the effective configuration.
    ///
    /// Precedence: CLI flags > `HONEYRELAY_*` environment > file > defaults.
    /// An explicit `--config` that does not exist is an error; the default
    /// location is optional.
    pub async fn load_config(&self) -> Result<RelayConfig> {
        let mut config = match &self.config {
            Some(path) => RelayConfig::from_file(path)
                .await
                .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                RelayConfig::from_file(DEFAULT_CONFIG_PATH)
                    .await
                    .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?
            }
            None => RelayConfig::default(),
        };

        config.apply_env_overrides();
        self.apply_overrides(&mut config);
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;
        Ok(config)
    }

    /// Apply command-line overrides on top of file and environment settings.
    pub fn apply_overrides(&self, config: &mut RelayConfig) {
        if let Some(path) = &self.log_file {
            config.monitor.log_file_path = path.clone();
        }
        if let Some(server) = &self.server {
            config.irc.server_host = server.clone();
        }
        if let Some(port) = self.port {
            config.irc.server_port = port;
        }
        if let Some(channel) = &self.channel {
            config.irc.channel = channel.clone();
        }
        if let Some(nickname) = &self.nickname {
            config.irc.nickname = nickname.clone();
        }
        if self.no_tls {
            config.irc.use_tls = false;
        }
        if self.no_colors {
            config.irc.use_colors = false;
        }
        if let Some(level) = &self.log_level {
            config.general.log_level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.general.log_format = format.clone();
        }
        if let Some(pid_file) = &self.pid_file {
            config.general.pid_file = pid_file.clone();
        }
    }
}
