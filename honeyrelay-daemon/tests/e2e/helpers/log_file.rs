//! Honeypot log writer and sample Cowrie records.

use std::io::Write;
use std::path::{Path, PathBuf};

/// Session used by every sample record.
pub const SESSION: &str = "a1b2c3d4";
/// Attacker address used by every sample record.
pub const ATTACKER: &str = "203.0.113.5";

pub fn connect_record() -> String {
    format!(
        r#"{{"eventid":"cowrie.session.connect","src_ip":"{ATTACKER}","src_port":50122,"dst_ip":"10.0.0.2","dst_port":2222,"session":"{SESSION}","timestamp":"2024-01-15T12:00:00.000000Z"}}"#
    )
}

pub fn login_failed_record(username: &str, password: &str) -> String {
    format!(
        r#"{{"eventid":"cowrie.login.failed","username":"{username}","password":"{password}","src_ip":"{ATTACKER}","src_port":50122,"session":"{SESSION}","timestamp":"2024-01-15T12:00:01.000000Z"}}"#
    )
}

pub fn command_record(input: &str) -> String {
    format!(
        r#"{{"eventid":"cowrie.command.input","input":"{input}","src_ip":"{ATTACKER}","session":"{SESSION}","timestamp":"2024-01-15T12:00:02.000000Z"}}"#
    )
}

pub fn unknown_record() -> String {
    format!(
        r#"{{"eventid":"cowrie.client.version","version":"SSH-2.0-Go","src_ip":"{ATTACKER}","session":"{SESSION}","timestamp":"2024-01-15T12:00:00.500000Z"}}"#
    )
}

/// Append-only honeypot log in a temp directory.
pub struct HoneypotLog {
    _dir: tempfile::TempDir,
    path: PathBuf,
}

#[allow(dead_code)]
impl HoneypotLog {
    /// A log path whose file does not exist yet.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cowrie").join("cowrie.json");
        Self { _dir: dir, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory that can hold other files for the same test.
    pub fn dir(&self) -> &Path {
        self._dir.path()
    }

    /// Append complete lines.
    pub fn append(&self, lines: &[String]) {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file.flush().unwrap();
    }
}
