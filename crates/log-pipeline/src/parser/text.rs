//! Cowrie 텍스트 로그 파서
//!
//! JSON 출력을 켜지 않은 Cowrie가 남기는 사람용 로그를 파싱합니다.
//!
//! # 라인 형식
//! ```text
//! 2024-01-15T12:00:00.123456Z [HoneyPotSSHTransport,3104,203.0.113.7] login attempt [b'root'/b'admin'] failed
//! 2024-01-15T12:00:00.123456Z [cowrie.ssh.factory.CowrieSSHFactory] New connection: 203.0.113.7:51022 (10.0.0.5:2222) [session: c0ffee01]
//! ```
//!
//! 선행 타임스탬프가 없는 라인은 거부합니다. 타임스탬프는 있지만
//! 인식할 수 없는 메시지는 `Unknown`이 됩니다.
//!
//! 세션 식별자는 `[session: X]` 태그를 우선 사용하고, 없으면
//! 트랜스포트 연결 번호(`HoneyPotSSHTransport,N,ip`의 N)를 사용합니다.

use chrono::{DateTime, Utc};
use honeyrelay_core::event::{Event, EventKind};
use regex::Regex;

use super::RecordParser;
use crate::error::LogPipelineError;

/// 다운로드로 분류하는 메시지 키워드
const DOWNLOAD_KEYWORDS: [&str; 4] = ["SCP", "SFTP", "wget", "curl"];

/// Cowrie 텍스트 파서
pub struct CowrieTextParser {
    max_input_size: usize,
    header: Regex,
    transport: Regex,
    session: Regex,
    login: Regex,
    command: Regex,
    connection: Regex,
    downloaded: Regex,
    url: Regex,
    ipv4: Regex,
}

impl CowrieTextParser {
    /// 새 파서를 생성합니다. 정규식 컴파일에 실패하면 에러를 반환합니다.
    pub fn new() -> Result<Self, LogPipelineError> {
        Ok(Self {
            max_input_size: 64 * 1024,
            header: Regex::new(r"^(\d{4}-\d{2}-\d{2}T\S+)\s+\[([^\]]*)\]\s?(.*)$")?,
            transport: Regex::new(r"Transport,(\d+),([^,\s]+)$")?,
            session: Regex::new(r"\[session: ([^\]]+)\]")?,
            login: Regex::new(r"login attempt \[(.*?)/(.*)\] (succeeded|failed)")?,
            command: Regex::new(r"^CMD: (.*)$")?,
            connection: Regex::new(
                r"New connection: \[?([0-9A-Fa-f.:]+?)\]?:(\d+) \(\[?([0-9A-Fa-f.:]+?)\]?:(\d+)\)",
            )?,
            downloaded: Regex::new(
                r"Downloaded URL \((\S+)\) with SHA-256 ([0-9A-Fa-f]+) to (\S+)",
            )?,
            url: Regex::new(r"(?:https?|ftp|tftp)://\S+")?,
            ipv4: Regex::new(r"\b(\d{1,3}(?:\.\d{1,3}){3})\b")?,
        })
    }

    /// 최대 입력 크기를 설정합니다.
    pub fn with_max_input_size(mut self, size: usize) -> Self {
        self.max_input_size = size;
        self
    }

    /// `b'root'`, `"root"` 같은 리터럴 표기를 벗겨냅니다.
    fn unquote(raw: &str) -> String {
        let s = raw
            .strip_prefix('b')
            .filter(|r| r.starts_with('\'') || r.starts_with('"'))
            .unwrap_or(raw);
        for quote in ['\'', '"'] {
            if let Some(inner) = s.strip_prefix(quote).and_then(|r| r.strip_suffix(quote)) {
                return inner.to_owned();
            }
        }
        s.to_owned()
    }

    fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    fn parse_record(&self, line: &str) -> Result<Event, LogPipelineError> {
        if line.len() > self.max_input_size {
            return Err(LogPipelineError::TooLarge {
                size: line.len(),
                max: self.max_input_size,
            });
        }

        let reject = |reason: &str| LogPipelineError::Parse {
            format: "text".to_owned(),
            offset: 0,
            reason: reason.to_owned(),
        };

        let header = self
            .header
            .captures(line)
            .ok_or_else(|| reject("missing timestamp header"))?;
        let timestamp = Self::parse_timestamp(&header[1])
            .ok_or_else(|| reject("invalid timestamp"))?;
        let context = &header[2];
        let message = &header[3];

        let transport = self.transport.captures(context);
        let transport_ip = transport.as_ref().map(|c| c[2].to_owned());
        let session_id = self
            .session
            .captures(message)
            .map(|c| c[1].to_owned())
            .or_else(|| transport.as_ref().map(|c| c[1].to_owned()))
            .unwrap_or_default();

        let fallback_ip = || {
            transport_ip
                .clone()
                .or_else(|| self.ipv4.captures(message).map(|c| c[1].to_owned()))
                .unwrap_or_default()
        };

        let kind = if let Some(c) = self.login.captures(message) {
            EventKind::Login {
                src_ip: fallback_ip(),
                src_port: 0,
                username: Self::unquote(&c[1]),
                password: Self::unquote(&c[2]),
                success: &c[3] == "succeeded",
            }
        } else if let Some(c) = self.command.captures(message) {
            EventKind::Command {
                src_ip: fallback_ip(),
                command: c[1].to_owned(),
            }
        } else if let Some(c) = self.connection.captures(message) {
            EventKind::Connection {
                src_ip: c[1].to_owned(),
                src_port: c[2].parse().unwrap_or(0),
                dst_ip: c[3].to_owned(),
                dst_port: c[4].parse().unwrap_or(0),
            }
        } else if let Some(c) = self.downloaded.captures(message) {
            EventKind::Download {
                src_ip: fallback_ip(),
                url_or_path: c[1].to_owned(),
                sha256: c[2].to_owned(),
                size_bytes: 0,
            }
        } else if DOWNLOAD_KEYWORDS.iter().any(|k| message.contains(k)) {
            EventKind::Download {
                src_ip: fallback_ip(),
                url_or_path: self
                    .url
                    .find(message)
                    .map(|m| m.as_str().to_owned())
                    .unwrap_or_else(|| message.to_owned()),
                sha256: String::new(),
                size_bytes: 0,
            }
        } else {
            EventKind::Unknown {
                raw_text: line.to_owned(),
            }
        };

        // 세션 없는 알려진 레코드는 Unknown으로 보존
        let kind = if session_id.is_empty() && !matches!(kind, EventKind::Unknown { .. }) {
            EventKind::Unknown {
                raw_text: line.to_owned(),
            }
        } else {
            kind
        };

        Ok(Event::new(timestamp, session_id, kind))
    }
}

impl RecordParser for CowrieTextParser {
    fn format_name(&self) -> &str {
        "text"
    }

    fn parse(&self, line: &str) -> Result<Event, LogPipelineError> {
        self.parse_record(line)
    }
}
