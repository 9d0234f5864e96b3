//! Build, start, health, and shutdown of the dispatcher.

use std::time::Duration;

use honeyrelay_core::pipeline::{HealthStatus, Pipeline};
use honeyrelay_daemon::Dispatcher;
use honeyrelay_daemon::dispatcher::MODULE_DISPATCHER;

use crate::helpers::config::TestConfigBuilder;
use crate::helpers::irc_server::{WAIT, fake_irc};
use crate::helpers::log_file::*;
use crate::helpers::relay::RunningRelay;

/// Shutdown sends QUIT and removes the PID file written at startup.
#[tokio::test]
async fn shutdown_quits_and_removes_pid_file() {
    let log = HoneypotLog::new();
    let pid_file = log.dir().join("run").join("honeyrelay.pid");

    let config = TestConfigBuilder::new(log.path())
        .pid_file(&pid_file)
        .build();
    let mut relay = RunningRelay::start(config);
    let mut session = relay.irc.accept().await;
    session.wait_for("JOIN #hp").await;
    assert!(pid_file.exists(), "PID file should exist while running");

    relay.shutdown().await.unwrap();

    let quit = session.wait_for("QUIT").await;
    assert_eq!(quit, "QUIT :HoneyRelay shutting down");
    assert!(!pid_file.exists(), "PID file should be removed on shutdown");
}

/// A second instance refuses to start over an existing PID file.
#[tokio::test]
async fn existing_pid_file_prevents_start() {
    let log = HoneypotLog::new();
    let pid_file = log.dir().join("honeyrelay.pid");
    std::fs::write(&pid_file, "4242\n").unwrap();

    let config = TestConfigBuilder::new(log.path())
        .pid_file(&pid_file)
        .build();
    let relay = RunningRelay::start(config);
    let err = relay.shutdown().await.unwrap_err();

    assert!(err.to_string().contains("already exists"), "{err}");
    assert_eq!(std::fs::read_to_string(&pid_file).unwrap(), "4242\n");
}

/// The log file's directory is created at build time.
#[tokio::test]
async fn missing_log_directory_is_created() {
    let log = HoneypotLog::new();
    assert!(!log.path().parent().unwrap().exists());

    let (connector, _irc) = fake_irc();
    Dispatcher::build_with_connector(TestConfigBuilder::new(log.path()).build(), connector)
        .unwrap();

    assert!(log.path().parent().unwrap().is_dir());
}

/// An uncreatable log directory is a fatal build error.
#[tokio::test]
async fn uncreatable_log_directory_fails_build() {
    let log = HoneypotLog::new();
    let blocker = log.dir().join("blocker");
    std::fs::write(&blocker, "").unwrap();

    let (connector, _irc) = fake_irc();
    let result = Dispatcher::build_with_connector(
        TestConfigBuilder::new(&blocker.join("cowrie.json")).build(),
        connector,
    );

    let err = result.err().expect("build should fail");
    assert!(err.to_string().contains("cannot be created"), "{err}");
}

/// Invalid configuration is rejected before anything starts.
#[tokio::test]
async fn invalid_config_fails_build() {
    let log = HoneypotLog::new();
    let mut config = TestConfigBuilder::new(log.path()).build();
    config.queue.capacity = 0;

    let (connector, _irc) = fake_irc();
    let err = Dispatcher::build_with_connector(config, connector)
        .err()
        .expect("build should fail");
    assert!(err.to_string().contains("queue.capacity"), "{err}");
}

/// Health is unhealthy before start and healthy once the channel is joined.
#[tokio::test]
async fn health_follows_channel_state() {
    let log = HoneypotLog::new();
    let (connector, mut irc) = fake_irc();
    let mut dispatcher =
        Dispatcher::build_with_connector(TestConfigBuilder::new(log.path()).build(), connector)
            .unwrap();

    let before = dispatcher.health();
    assert!(before.status.is_unhealthy());
    let names: Vec<_> = before.components.iter().map(|c| c.name.as_str()).collect();
    assert!(names.contains(&MODULE_DISPATCHER));

    dispatcher.start().await.unwrap();
    let mut state = dispatcher.state();

    let mut session = irc.accept().await;
    tokio::time::timeout(WAIT, state.wait_for(|s| s.is_joined()))
        .await
        .expect("channel never joined")
        .unwrap();
    session.wait_for("JOIN #hp").await;

    let joined = dispatcher.health();
    assert_eq!(joined.status, HealthStatus::Healthy, "{joined:?}");
    assert_eq!(joined.channel_state, "joined");
    assert_eq!(dispatcher.health_check().await, HealthStatus::Healthy);

    dispatcher.stop().await.unwrap();
}

/// Starting twice is rejected.
#[tokio::test]
async fn double_start_is_rejected() {
    let log = HoneypotLog::new();
    let (connector, _irc) = fake_irc();
    let mut dispatcher =
        Dispatcher::build_with_connector(TestConfigBuilder::new(log.path()).build(), connector)
            .unwrap();

    dispatcher.start().await.unwrap();
    assert!(dispatcher.start().await.is_err());
    dispatcher.stop().await.unwrap();
}

/// Dry-run never connects and drains the queue by logging.
#[tokio::test]
async fn dry_run_drains_without_network() {
    let log = HoneypotLog::new();
    log.append(&[connect_record(), command_record("id")]);

    let mut dispatcher =
        Dispatcher::build(TestConfigBuilder::new(log.path()).build(), true).unwrap();
    assert!(dispatcher.is_dry_run());

    dispatcher.start().await.unwrap();
    assert!(dispatcher.health().status.is_healthy());

    // give the drain task time to empty the queue
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(dispatcher.queue().is_empty());

    tokio::time::timeout(WAIT, dispatcher.stop())
        .await
        .expect("dry-run stop should be prompt")
        .unwrap();
}
