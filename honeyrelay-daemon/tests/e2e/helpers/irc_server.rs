//! In-memory IRC server.
//!
//! [`DuplexConnector`] hands the client half of a `tokio::io::duplex` pair
//! to the relay and the server half to [`FakeIrc`], which completes
//! registration automatically and records every line the relay sends.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::sync::mpsc;

use honeyrelay_irc_relay::{BoxedStream, Connector, IrcError};

/// How long assertions wait for the relay.
pub const WAIT: Duration = Duration::from_secs(10);

pub struct DuplexConnector {
    servers: mpsc::UnboundedSender<DuplexStream>,
}

impl Connector for DuplexConnector {
    async fn connect(&self) -> Result<BoxedStream, IrcError> {
        let (client, server) = tokio::io::duplex(64 * 1024);
        self.servers
            .send(server)
            .map_err(|_| IrcError::Connect("fake server gone".into()))?;
        Ok(Box::new(client))
    }

    fn target(&self) -> String {
        "fake-irc:6667".into()
    }
}

/// Create a connected connector/server pair.
pub fn fake_irc() -> (DuplexConnector, FakeIrc) {
    let (tx, rx) = mpsc::unbounded_channel();
    (DuplexConnector { servers: tx }, FakeIrc { connections: rx })
}

pub struct FakeIrc {
    connections: mpsc::UnboundedReceiver<DuplexStream>,
}

impl FakeIrc {
    /// Accept the next connection and serve it in the background.
    pub async fn accept(&mut self) -> Session {
        let stream = tokio::time::timeout(WAIT, self.connections.recv())
            .await
            .expect("relay never connected")
            .expect("connector dropped");

        let (lines_tx, lines_rx) = mpsc::unbounded_channel();
        tokio::spawn(serve(stream, lines_tx));
        Session { lines: lines_rx }
    }
}

/// Auto-register the client and forward everything it sends.
async fn serve(stream: DuplexStream, lines_tx: mpsc::UnboundedSender<String>) {
    let (reader, mut writer) = tokio::io::split(stream);
    let mut lines = BufReader::new(reader).lines();
    let mut nick = String::from("*");

    while let Ok(Some(line)) = lines.next_line().await {
        let reply = if let Some(n) = line.strip_prefix("NICK ") {
            nick = n.to_owned();
            None
        } else if line.starts_with("USER ") {
            Some(format!(":fake.irc 001 {nick} :Welcome to the fake network"))
        } else if let Some(channel) = line.strip_prefix("JOIN ") {
            let channel = channel.split(' ').next().unwrap_or_default();
            Some(format!(":{nick}!relay@test JOIN {channel}"))
        } else if let Some(token) = line.strip_prefix("PING ") {
            Some(format!(":fake.irc PONG fake.irc {token}"))
        } else {
            None
        };

        if let Some(reply) = reply {
            if writer.write_all(format!("{reply}\r\n").as_bytes()).await.is_err() {
                break;
            }
        }
        if lines_tx.send(line).is_err() {
            break;
        }
    }
}

/// One accepted connection.
pub struct Session {
    lines: mpsc::UnboundedReceiver<String>,
}

#[allow(dead_code)]
impl Session {
    /// Next raw line from the client, or `None` once it disconnects.
    pub async fn next_line(&mut self) -> Option<String> {
        tokio::time::timeout(WAIT, self.lines.recv())
            .await
            .expect("timed out waiting for the relay")
    }

    /// Text of the next channel message, skipping protocol traffic.
    pub async fn next_privmsg(&mut self, channel: &str) -> String {
        let prefix = format!("PRIVMSG {channel} ");
        loop {
            let line = self.next_line().await.expect("relay disconnected");
            if let Some(rest) = line.strip_prefix(&prefix) {
                return rest.strip_prefix(':').unwrap_or(rest).to_owned();
            }
        }
    }

    /// Skip lines until one starts with `prefix`.
    pub async fn wait_for(&mut self, prefix: &str) -> String {
        loop {
            let line = self
                .next_line()
                .await
                .unwrap_or_else(|| panic!("relay disconnected before '{prefix}'"));
            if line.starts_with(prefix) {
                return line;
            }
        }
    }
}
