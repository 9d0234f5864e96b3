//! Dispatcher -- task assembly, queue admission, and lifecycle management.
//!
//! The [`Dispatcher`] is the central coordinator of the daemon. It builds
//! every component from `RelayConfig`, wires them together and owns the
//! shared shutdown token.
//!
//! # Data Flow
//!
//! ```text
//! LogTailer --lines--> dispatch loop --alerts--> OutboundQueue --> IrcChannel
//!                          |                          ^
//!                          +--events--> StatsReporter-+ (reports)
//! ```
//!
//! The queue is the only shared mutable state. The channel's connection
//! state is published through a `watch` channel and only read here.
//!
//! # Shutdown
//!
//! A single `CancellationToken` stops every task. Each task gets at most
//! [`SHUTDOWN_TIMEOUT`] to finish before it is aborted.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use honeyrelay_core::clock::{Clock, SystemClock};
use honeyrelay_core::config::RelayConfig;
use honeyrelay_core::error::{PipelineError, RelayError};
use honeyrelay_core::event::{
    Event, MODULE_IRC_CHANNEL, MODULE_LOG_TAILER, MODULE_OUTBOUND_QUEUE, MODULE_STATS,
};
use honeyrelay_core::metrics as m;
use honeyrelay_core::pipeline::{HealthStatus, Pipeline};
use honeyrelay_core::types::GeoLookup;
use honeyrelay_irc_relay::{
    ChannelConfig, ConnectionState, Connector, IrcChannel, MessageFormatter, OutboundMessage,
    OutboundQueue, PushOutcome, TcpConnector, period_label,
};
use honeyrelay_log_pipeline::{
    EventParser, LogTailer, ReportPeriod, ReportSchedule, StatsAggregator, TailerConfig,
    run_stats_reporter,
};

use crate::health::{ComponentHealth, DaemonHealth, aggregate_status, queue_status};
use crate::metrics_server;

/// Module name used in log fields and health reports.
pub const MODULE_DISPATCHER: &str = "dispatcher";

/// Maximum time each task gets to stop after cancellation.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Channel capacity constants.
const LINE_CHANNEL_CAPACITY: usize = 1024;
const STATS_CHANNEL_CAPACITY: usize = 1024;

/// Period label of the whole-day stats report.
const DAILY_REPORT_LABEL: &str = "daily";

/// The relay dispatcher.
///
/// Generic over the IRC [`Connector`] so tests can substitute an
/// in-memory transport.
pub struct Dispatcher<C = TcpConnector> {
    /// Validated configuration.
    config: RelayConfig,
    /// Wall clock for stats windows and parser fallbacks.
    clock: Arc<dyn Clock>,
    /// Parser, moved into the dispatch task on start.
    parser: Option<EventParser>,
    /// Tailer settings derived from `[monitor]`.
    tailer_config: TailerConfig,
    formatter: MessageFormatter,
    queue: Arc<OutboundQueue>,
    /// IRC channel, moved into its task on start. `None` in dry-run mode.
    channel: Option<IrcChannel<C>>,
    /// Read-only view of the connection state.
    state: watch::Receiver<ConnectionState>,
    dry_run: bool,
    cancel: CancellationToken,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
    started: bool,
    start_time: Instant,
}

impl Dispatcher<TcpConnector> {
    /// Build a dispatcher that connects to the configured IRC server.
    ///
    /// With `dry_run`, no connection is made and outbound messages are
    /// logged instead.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration validation fails
    /// - The log file's parent directory cannot be created
    /// - The TLS configuration cannot be built
    /// - The metrics endpoint cannot be installed
    pub fn build(config: RelayConfig, dry_run: bool) -> Result<Self> {
        if dry_run {
            tracing::info!("dry-run mode: outbound messages are logged, not sent");
            return Self::assemble(config, None);
        }

        let connector = TcpConnector::new(
            config.irc.server_host.clone(),
            config.irc.server_port,
            config.irc.use_tls,
        )
        .map_err(|e| anyhow::anyhow!("failed to build irc connector: {}", e))?;
        Self::assemble(config, Some(connector))
    }
}

impl<C: Connector + 'static> Dispatcher<C> {
    /// Build a dispatcher that uses `connector` for the IRC connection.
    pub fn build_with_connector(config: RelayConfig, connector: C) -> Result<Self> {
        Self::assemble(config, Some(connector))
    }

    fn assemble(config: RelayConfig, connector: Option<C>) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;
        ensure_log_directory(Path::new(&config.monitor.log_file_path))?;

        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
        }

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let parser = EventParser::from_core(&config.monitor, Arc::clone(&clock))
            .map_err(|e| anyhow::anyhow!("failed to build event parser: {}", e))?;
        let tailer_config = TailerConfig::from_core(&config.monitor)
            .map_err(|e| anyhow::anyhow!("failed to build log tailer: {}", e))?;

        let queue = Arc::new(OutboundQueue::new(config.queue.capacity));
        let formatter = MessageFormatter::new(config.irc.use_colors);

        let dry_run = connector.is_none();
        let (channel, state) = match connector {
            Some(connector) => {
                tracing::info!(
                    server = %connector.target(),
                    channel = %config.irc.channel,
                    tls = config.irc.use_tls,
                    "irc channel configured"
                );
                let channel = IrcChannel::new(
                    ChannelConfig::from_core(&config.irc),
                    connector,
                    Arc::clone(&queue),
                );
                let state = channel.subscribe();
                (Some(channel), state)
            }
            // dry-run has no connection; report it as always joined
            None => {
                let (_, state) = watch::channel(ConnectionState::Joined);
                (None, state)
            }
        };

        metrics::gauge!(m::DAEMON_BUILD_INFO, "version" => env!("CARGO_PKG_VERSION")).set(1.0);
        tracing::info!(
            log_file = %config.monitor.log_file_path,
            format = %config.monitor.format,
            queue_capacity = config.queue.capacity,
            dry_run,
            "dispatcher initialized"
        );

        Ok(Self {
            config,
            clock,
            parser: Some(parser),
            tailer_config,
            formatter,
            queue,
            channel,
            state,
            dry_run,
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
            started: false,
            start_time: Instant::now(),
        })
    }

    /// Attach an IP geolocation lookup to the message formatter.
    pub fn with_geo(mut self, geo: Arc<dyn GeoLookup>) -> Self {
        self.formatter = self.formatter.clone().with_geo(geo);
        self
    }

    /// Loaded configuration.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Shared outbound queue.
    pub fn queue(&self) -> &Arc<OutboundQueue> {
        &self.queue
    }

    /// Subscribe to connection state changes.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Whether outbound messages are logged instead of sent.
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Aggregated health of every running task and the queue.
    pub fn health(&self) -> DaemonHealth {
        let channel_state = *self.state.borrow();

        let mut components: Vec<ComponentHealth> = self
            .tasks
            .iter()
            .map(|(name, handle)| {
                let status = if handle.is_finished() {
                    HealthStatus::Unhealthy("task stopped".to_owned())
                } else if *name == MODULE_IRC_CHANNEL && !channel_state.is_joined() {
                    HealthStatus::Degraded(format!("channel {channel_state}"))
                } else {
                    HealthStatus::Healthy
                };
                ComponentHealth::new(*name, status)
            })
            .collect();
        if self.tasks.is_empty() {
            components.push(ComponentHealth::new(
                MODULE_DISPATCHER,
                HealthStatus::Unhealthy("not running".to_owned()),
            ));
        }
        components.push(ComponentHealth::new(
            MODULE_OUTBOUND_QUEUE,
            queue_status(self.queue.utilization()),
        ));

        DaemonHealth {
            status: aggregate_status(&components),
            uptime_secs: self.start_time.elapsed().as_secs(),
            channel_state: channel_state.to_string(),
            queue_depth: self.queue.len(),
            components,
        }
    }

    /// Start all tasks, wait for `shutdown`, then stop.
    ///
    /// The PID file (if configured) exists for exactly this span.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let pid_path = (!self.config.general.pid_file.is_empty())
            .then(|| PathBuf::from(&self.config.general.pid_file));
        if let Some(path) = &pid_path {
            write_pid_file(path)?;
        }

        if let Err(e) = self.start().await {
            if let Some(path) = &pid_path {
                remove_pid_file(path);
            }
            return Err(e.into());
        }

        tracing::info!("relay running");
        shutdown.await;
        tracing::info!("shutting down");

        let stopped = self.stop().await;
        if let Some(path) = &pid_path {
            remove_pid_file(path);
        }
        stopped.map_err(Into::into)
    }

    /// Run until SIGTERM or SIGINT.
    pub async fn run(&mut self) -> Result<()> {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate())
            .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
        let mut sigint = signal(SignalKind::interrupt())
            .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

        self.run_until(async move {
            let name = tokio::select! {
                _ = sigterm.recv() => "SIGTERM",
                _ = sigint.recv() => "SIGINT",
            };
            tracing::info!(signal = name, "shutdown signal received");
        })
        .await
    }

    fn spawn_tasks(&mut self, parser: EventParser) {
        // fixes the start position before anything can connect
        let tailer = LogTailer::open(self.tailer_config.clone());

        let cancel = &self.cancel;
        let (line_tx, line_rx) = mpsc::channel(LINE_CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel(STATS_CHANNEL_CAPACITY);

        // consumers first
        let outbound = match self.channel.take() {
            Some(channel) => tokio::spawn(channel.run(cancel.clone())),
            None => tokio::spawn(log_outbound(Arc::clone(&self.queue), cancel.clone())),
        };

        let schedule = ReportSchedule {
            interval: Duration::from_secs(self.config.stats.report_interval_secs),
            skip_empty: self.config.stats.skip_empty_reports,
            daily: self.config.stats.daily_report,
        };
        let interval_label = period_label(schedule.interval);
        let formatter = self.formatter.clone();
        let queue = Arc::clone(&self.queue);
        let state = self.state.clone();
        let stats = tokio::spawn(run_stats_reporter(
            StatsAggregator::new(self.config.stats.top_n, Arc::clone(&self.clock)),
            event_rx,
            schedule,
            cancel.clone(),
            move |period, window| {
                let label = match period {
                    ReportPeriod::Interval => interval_label.as_str(),
                    ReportPeriod::Daily => DAILY_REPORT_LABEL,
                };
                let text = formatter.format_stats(&window, label);
                admit(&queue, &state, OutboundMessage::report(text));
            },
        ));

        let dispatch = tokio::spawn(dispatch_lines(
            line_rx,
            parser,
            self.formatter.clone(),
            event_tx,
            Arc::clone(&self.queue),
            self.state.clone(),
            cancel.clone(),
        ));

        let tail = tokio::spawn(tailer.run(line_tx, cancel.clone()));

        self.tasks = vec![
            (MODULE_LOG_TAILER, tail),
            (MODULE_DISPATCHER, dispatch),
            (MODULE_STATS, stats),
            (MODULE_IRC_CHANNEL, outbound),
        ];
    }
}

impl<C: Connector + 'static> Pipeline for Dispatcher<C> {
    async fn start(&mut self) -> Result<(), RelayError> {
        if self.started {
            return Err(PipelineError::AlreadyRunning.into());
        }
        let parser = self.parser.take().ok_or_else(|| {
            PipelineError::InitFailed("event parser already consumed".to_owned())
        })?;

        self.spawn_tasks(parser);
        self.started = true;
        tracing::info!(tasks = self.tasks.len(), "dispatcher started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), RelayError> {
        self.cancel.cancel();

        for (name, mut handle) in self.tasks.drain(..) {
            match tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut handle).await {
                Ok(Ok(())) => tracing::debug!(task = name, "task stopped"),
                Ok(Err(e)) => tracing::warn!(task = name, error = %e, "task ended abnormally"),
                Err(_) => {
                    tracing::warn!(task = name, "task did not stop in time, aborting");
                    handle.abort();
                }
            }
        }

        let unsent = self.queue.len();
        if unsent > 0 {
            tracing::info!(unsent, "outbound messages discarded at shutdown");
        }
        tracing::info!("dispatcher stopped");
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        self.health().status
    }
}

/// Offer a message to the queue, recording whether the channel is offline.
fn admit(
    queue: &OutboundQueue,
    state: &watch::Receiver<ConnectionState>,
    message: OutboundMessage,
) {
    let current = *state.borrow();
    if !current.is_joined() {
        tracing::debug!(
            module = MODULE_OUTBOUND_QUEUE,
            state = %current,
            priority = %message.priority,
            "channel offline, buffering message"
        );
        metrics::counter!(m::QUEUE_BUFFERED_OFFLINE_TOTAL).increment(1);
    }

    if let PushOutcome::Rejected = queue.push(message) {
        tracing::debug!(module = MODULE_OUTBOUND_QUEUE, "queue full, message rejected");
    }
}

/// Parse tailed lines in order, relay formatted alerts and feed stats.
async fn dispatch_lines(
    mut lines: mpsc::Receiver<String>,
    parser: EventParser,
    formatter: MessageFormatter,
    events: mpsc::Sender<Event>,
    queue: Arc<OutboundQueue>,
    state: watch::Receiver<ConnectionState>,
    cancel: CancellationToken,
) {
    loop {
        let line = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            line = lines.recv() => match line {
                Some(line) => line,
                None => break,
            },
        };

        let Some(event) = parser.parse(&line) else {
            continue;
        };

        match formatter.format_event(&event) {
            Some(text) => admit(&queue, &state, OutboundMessage::alert(text)),
            None => tracing::trace!(
                module = MODULE_DISPATCHER,
                session = %event.session_id,
                "unknown event counted, not relayed"
            ),
        }

        if events.send(event).await.is_err() {
            tracing::debug!(module = MODULE_DISPATCHER, "stats reporter gone, event not counted");
        }
    }
    tracing::debug!(module = MODULE_DISPATCHER, "dispatch loop stopped");
}

/// Dry-run consumer: log each outbound message instead of sending it.
async fn log_outbound(queue: Arc<OutboundQueue>, cancel: CancellationToken) {
    loop {
        let message = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            message = queue.pop() => message,
        };
        tracing::info!(
            module = MODULE_IRC_CHANNEL,
            priority = %message.priority,
            text = %message.text,
            "dry-run message"
        );
    }
}

/// Create the monitored log file's parent directory if it is missing.
///
/// The honeypot may not have written its log yet, but an uncreatable
/// directory means the path is wrong.
pub fn ensure_log_directory(log_file: &Path) -> Result<()> {
    let Some(parent) = log_file.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    if parent.is_dir() {
        return Ok(());
    }

    std::fs::create_dir_all(parent).map_err(|e| {
        anyhow::anyhow!(
            "log directory {} does not exist and cannot be created: {}",
            parent.display(),
            e
        )
    })?;
    tracing::info!(path = %parent.display(), "created log directory");
    Ok(())
}

/// Write the current PID to `path`.
///
/// The file is created atomically with `create_new`, so an existing file
/// (another instance, or a stale file) is an error.
pub fn write_pid_file(path: &Path) -> Result<()> {
    use std::fs::{self, OpenOptions};
    use std::io::{ErrorKind, Write};

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            fs::DirBuilder::new()
                .mode(0o700)
                .recursive(true)
                .create(parent)?;
        }
        #[cfg(not(unix))]
        fs::create_dir_all(parent)?;
    }

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = match options.open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            let existing = fs::read_to_string(path).unwrap_or_else(|_| "unknown".to_owned());
            return Err(anyhow::anyhow!(
                "PID file {} already exists with PID: {}. Is another instance running?",
                path.display(),
                existing.trim()
            ));
        }
        Err(e) => return Err(e.into()),
    };

    let pid = std::process::id();
    writeln!(file, "{}", pid)?;
    tracing::info!(pid, path = %path.display(), "PID file written");
    Ok(())
}

/// Remove the PID file. Failure is logged, not returned.
pub fn remove_pid_file(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::info!(path = %path.display(), "PID file removed"),
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to remove PID file"),
    }
}
