//! Periodic stats reports reach the channel alongside alerts.

use std::time::Duration;

use crate::helpers::config::TestConfigBuilder;
use crate::helpers::log_file::*;
use crate::helpers::relay::RunningRelay;

#[tokio::test]
async fn stats_report_summarizes_window() {
    let log = HoneypotLog::new();
    log.append(&[
        connect_record(),
        login_failed_record("root", "123456"),
        login_failed_record("root", "123456"),
        login_failed_record("admin", "admin"),
        unknown_record(),
    ]);

    let mut relay = RunningRelay::start(
        TestConfigBuilder::new(log.path())
            .stats_interval(1)
            .build(),
    );
    let mut session = relay.irc.accept().await;

    let report = session.wait_for("PRIVMSG #hp :STATS (1s)").await;
    assert!(report.contains("Connections: 1"), "{report}");
    assert!(report.contains("Logins: 0/3"), "{report}");
    assert!(report.contains("Commands: 0"), "{report}");
    assert!(report.contains("Unique IPs: 1"), "{report}");
    assert!(report.contains(&format!("Top IPs: {ATTACKER} (4)")), "{report}");
    assert!(report.contains("Top usernames: root (2), admin (1)"), "{report}");
    assert!(report.contains("Top passwords: 123456 (2), admin (1)"), "{report}");
    assert!(report.contains("Top commands: none"), "{report}");

    relay.shutdown().await.unwrap();
}

#[tokio::test]
async fn empty_windows_are_not_reported() {
    let log = HoneypotLog::new();
    let config = TestConfigBuilder::new(log.path()).stats_interval(1).build();
    let mut relay = RunningRelay::start(config);
    let mut session = relay.irc.accept().await;
    session.wait_for("JOIN #hp").await;

    let next = session.next_privmsg("#hp");
    let quiet = tokio::time::timeout(Duration::from_millis(2500), next).await;
    assert!(quiet.is_err(), "no message expected, got {quiet:?}");

    relay.shutdown().await.unwrap();
}
