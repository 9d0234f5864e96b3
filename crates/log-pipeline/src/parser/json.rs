//! Cowrie JSON 로그 파서
//!
//! 라인당 JSON 객체 하나로 기록된 Cowrie 이벤트를 파싱합니다.
//! `eventid` 필드로 이벤트 종류를 판별하고, 없는 필드는 중립 기본값
//! (텍스트는 빈 문자열, 숫자는 0)으로 채웁니다. 알 수 없는 필드는 무시합니다.
//!
//! # 판별자 매핑
//! - `cowrie.session.connect` → Connection
//! - `cowrie.login.success` / `cowrie.login.failed` → Login
//! - `cowrie.command.input` / `cowrie.command.failed` → Command
//! - `cowrie.session.file_download` / `cowrie.session.file_upload` → Download
//! - 그 외 → Unknown (원문 보존)

use std::sync::Arc;

use chrono::{DateTime, Utc};
use honeyrelay_core::clock::Clock;
use honeyrelay_core::event::{Event, EventKind};
use serde_json::Value;

use super::RecordParser;
use crate::error::LogPipelineError;

const EVENT_CONNECT: &str = "cowrie.session.connect";
const EVENT_LOGIN_SUCCESS: &str = "cowrie.login.success";
const EVENT_LOGIN_FAILED: &str = "cowrie.login.failed";
const EVENT_COMMAND_INPUT: &str = "cowrie.command.input";
const EVENT_COMMAND_FAILED: &str = "cowrie.command.failed";
const EVENT_FILE_DOWNLOAD: &str = "cowrie.session.file_download";
const EVENT_FILE_UPLOAD: &str = "cowrie.session.file_upload";

/// 다운로드 위치로 쓰는 필드 (앞쪽 우선)
const DOWNLOAD_LOCATION_FIELDS: [&str; 4] = ["url", "outfile", "filename", "destfile"];

/// Cowrie JSON 파서
pub struct CowrieJsonParser {
    /// 타임스탬프 없는 레코드의 기본 시각
    clock: Arc<dyn Clock>,
    /// 최대 허용 입력 크기 (바이트)
    max_input_size: usize,
}

impl CowrieJsonParser {
    /// 새 파서를 생성합니다.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            max_input_size: 64 * 1024, // 64KB
        }
    }

    /// 최대 입력 크기를 설정합니다.
    pub fn with_max_input_size(mut self, size: usize) -> Self {
        self.max_input_size = size;
        self
    }

    /// JSON 객체에서 문자열 필드를 추출합니다.
    ///
    /// 숫자와 불리언은 문자열로 바꿔 반환합니다.
    fn extract_string(value: &Value, field: &str) -> Option<String> {
        match value.get(field)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// 숫자 필드를 추출합니다. 문자열로 적힌 숫자도 허용합니다.
    fn extract_u64(value: &Value, field: &str) -> Option<u64> {
        match value.get(field)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn extract_port(value: &Value, field: &str) -> u16 {
        Self::extract_u64(value, field)
            .and_then(|n| u16::try_from(n).ok())
            .unwrap_or(0)
    }

    /// 타임스탬프 값을 파싱합니다.
    ///
    /// 지원 형식:
    /// - RFC 3339 문자열: `2024-01-15T12:00:00.123456Z`
    /// - Unix timestamp 숫자 (초, 소수 허용)
    /// - Unix timestamp 숫자 (밀리초)
    fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
        match value {
            Value::String(s) => {
                if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                    return Some(dt.with_timezone(&Utc));
                }
                s.parse::<i64>().ok().and_then(from_unix)
            }
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    return from_unix(i);
                }
                let f = n.as_f64()?;
                if !f.is_finite() || f < 0.0 {
                    return None;
                }
                let secs = f.trunc() as i64;
                let nanos = ((f - f.trunc()) * 1e9) as u32;
                DateTime::from_timestamp(secs, nanos)
            }
            _ => None,
        }
    }

    fn parse_record(&self, line: &str) -> Result<Event, LogPipelineError> {
        if line.len() > self.max_input_size {
            return Err(LogPipelineError::TooLarge {
                size: line.len(),
                max: self.max_input_size,
            });
        }

        let value: Value = serde_json::from_str(line).map_err(|e| LogPipelineError::Parse {
            format: "json".to_owned(),
            offset: e.column(),
            reason: e.to_string(),
        })?;

        // 최상위가 JSON 객체여야 합니다
        if !value.is_object() {
            return Err(LogPipelineError::Parse {
                format: "json".to_owned(),
                offset: 0,
                reason: "expected JSON object at top level".to_owned(),
            });
        }

        let Some(event_id) = Self::extract_string(&value, "eventid") else {
            return Err(LogPipelineError::Parse {
                format: "json".to_owned(),
                offset: 0,
                reason: "missing 'eventid' discriminator".to_owned(),
            });
        };

        let timestamp = value
            .get("timestamp")
            .and_then(Self::parse_timestamp)
            .unwrap_or_else(|| self.clock.now());
        let session_id = Self::extract_string(&value, "session").unwrap_or_default();
        let src_ip = Self::extract_string(&value, "src_ip").unwrap_or_default();

        let kind = match event_id.as_str() {
            EVENT_CONNECT => EventKind::Connection {
                src_ip,
                src_port: Self::extract_port(&value, "src_port"),
                dst_ip: Self::extract_string(&value, "dst_ip").unwrap_or_default(),
                dst_port: Self::extract_port(&value, "dst_port"),
            },
            EVENT_LOGIN_SUCCESS | EVENT_LOGIN_FAILED => EventKind::Login {
                src_ip,
                src_port: Self::extract_port(&value, "src_port"),
                username: Self::extract_string(&value, "username").unwrap_or_default(),
                password: Self::extract_string(&value, "password").unwrap_or_default(),
                success: event_id == EVENT_LOGIN_SUCCESS,
            },
            EVENT_COMMAND_INPUT | EVENT_COMMAND_FAILED => EventKind::Command {
                src_ip,
                command: Self::extract_string(&value, "input").unwrap_or_default(),
            },
            EVENT_FILE_DOWNLOAD | EVENT_FILE_UPLOAD => EventKind::Download {
                src_ip,
                url_or_path: DOWNLOAD_LOCATION_FIELDS
                    .iter()
                    .filter_map(|field| Self::extract_string(&value, field))
                    .find(|s| !s.is_empty())
                    .unwrap_or_default(),
                sha256: Self::extract_string(&value, "shasum").unwrap_or_default(),
                size_bytes: Self::extract_u64(&value, "size").unwrap_or(0),
            },
            _ => EventKind::Unknown {
                raw_text: line.to_owned(),
            },
        };

        // 세션 없는 알려진 레코드는 상관 관계를 잃으므로 Unknown으로 보존
        if session_id.is_empty() && !matches!(kind, EventKind::Unknown { .. }) {
            return Ok(Event::new(
                timestamp,
                session_id,
                EventKind::Unknown {
                    raw_text: line.to_owned(),
                },
            ));
        }

        Ok(Event::new(timestamp, session_id, kind))
    }
}

/// Unix 초 또는 밀리초를 시각으로 변환합니다.
///
/// 10자리를 넘으면 밀리초로 간주합니다.
fn from_unix(ts: i64) -> Option<DateTime<Utc>> {
    if ts > 9_999_999_999 {
        DateTime::from_timestamp_millis(ts)
    } else {
        DateTime::from_timestamp(ts, 0)
    }
}

impl RecordParser for CowrieJsonParser {
    fn format_name(&self) -> &str {
        "json"
    }

    fn parse(&self, line: &str) -> Result<Event, LogPipelineError> {
        self.parse_record(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use honeyrelay_core::clock::ManualClock;
    use serde_json::json;

    fn fixed() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap()
    }

    fn parser() -> CowrieJsonParser {
        CowrieJsonParser::new(Arc::new(ManualClock::new(fixed())))
    }

    /// 알려진 이벤트로부터 Cowrie 레코드를 만듭니다.
    fn to_record(event: &Event) -> String {
        let ts = event.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Micros, true);
        let value = match &event.kind {
            EventKind::Login {
                src_ip,
                src_port,
                username,
                password,
                success,
            } => json!({
                "eventid": if *success { EVENT_LOGIN_SUCCESS } else { EVENT_LOGIN_FAILED },
                "timestamp": ts, "session": event.session_id, "src_ip": src_ip,
                "src_port": src_port, "username": username, "password": password,
            }),
            EventKind::Command { src_ip, command } => json!({
                "eventid": EVENT_COMMAND_INPUT, "timestamp": ts,
                "session": event.session_id, "src_ip": src_ip, "input": command,
            }),
            EventKind::Connection {
                src_ip,
                src_port,
                dst_ip,
                dst_port,
            } => json!({
                "eventid": EVENT_CONNECT, "timestamp": ts, "session": event.session_id,
                "src_ip": src_ip, "src_port": src_port, "dst_ip": dst_ip, "dst_port": dst_port,
            }),
            EventKind::Download {
                src_ip,
                url_or_path,
                sha256,
                size_bytes,
            } => json!({
                "eventid": EVENT_FILE_DOWNLOAD, "timestamp": ts, "session": event.session_id,
                "src_ip": src_ip, "url": url_or_path, "shasum": sha256, "size": size_bytes,
            }),
            EventKind::Unknown { raw_text } => return raw_text.clone(),
        };
        value.to_string()
    }

    fn sample_events() -> Vec<Event> {
        let ts = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
            + chrono::Duration::microseconds(123_456);
        vec![
            Event::new(
                ts,
                "c0ffee01",
                EventKind::Connection {
                    src_ip: "203.0.113.7".into(),
                    src_port: 51022,
                    dst_ip: "10.0.0.5".into(),
                    dst_port: 2222,
                },
            ),
            Event::new(
                ts,
                "c0ffee01",
                EventKind::Login {
                    src_ip: "203.0.113.7".into(),
                    src_port: 51022,
                    username: "root".into(),
                    password: "admin".into(),
                    success: false,
                },
            ),
            Event::new(
                ts,
                "c0ffee01",
                EventKind::Login {
                    src_ip: "203.0.113.7".into(),
                    src_port: 51022,
                    username: "root".into(),
                    password: "123456".into(),
                    success: true,
                },
            ),
            Event::new(
                ts,
                "c0ffee01",
                EventKind::Command {
                    src_ip: "203.0.113.7".into(),
                    command: "cat /proc/cpuinfo | grep name | wc -l".into(),
                },
            ),
            Event::new(
                ts,
                "c0ffee01",
                EventKind::Download {
                    src_ip: "203.0.113.7".into(),
                    url_or_path: "http://198.51.100.9/x.sh".into(),
                    sha256: "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
                        .into(),
                    size_bytes: 4096,
                },
            ),
        ]
    }

    #[test]
    fn format_name_is_json() {
        assert_eq!(parser().format_name(), "json");
    }

    #[test]
    fn known_events_roundtrip_through_records() {
        let parser = parser();
        for event in sample_events() {
            let record = to_record(&event);
            let parsed = parser.parse(&record).unwrap();
            assert_eq!(parsed, event, "record: {record}");
        }
    }

    #[test]
    fn absent_fields_take_neutral_defaults() {
        let parsed = parser()
            .parse(r#"{"eventid":"cowrie.login.failed","session":"s1","timestamp":"2024-01-15T12:00:00Z"}"#)
            .unwrap();
        assert_eq!(
            parsed.kind,
            EventKind::Login {
                src_ip: String::new(),
                src_port: 0,
                username: String::new(),
                password: String::new(),
                success: false,
            }
        );
    }

    #[test]
    fn missing_timestamp_uses_clock() {
        let parsed = parser()
            .parse(r#"{"eventid":"cowrie.command.input","session":"s1","input":"w"}"#)
            .unwrap();
        assert_eq!(parsed.timestamp, fixed());
    }

    #[test]
    fn unix_timestamps_are_accepted() {
        let secs = parser()
            .parse(r#"{"eventid":"cowrie.command.input","session":"s1","timestamp":1705320000}"#)
            .unwrap();
        let millis = parser()
            .parse(r#"{"eventid":"cowrie.command.input","session":"s1","timestamp":1705320000000}"#)
            .unwrap();
        assert_eq!(secs.timestamp, millis.timestamp);
        assert_eq!(secs.timestamp.timestamp(), 1_705_320_000);
    }

    #[test]
    fn numeric_fields_may_be_strings() {
        let parsed = parser()
            .parse(r#"{"eventid":"cowrie.session.connect","session":"s1","src_ip":"192.0.2.1","src_port":"40000","dst_port":"22"}"#)
            .unwrap();
        assert!(matches!(
            parsed.kind,
            EventKind::Connection {
                src_port: 40000,
                dst_port: 22,
                ..
            }
        ));
    }

    #[test]
    fn out_of_range_port_defaults_to_zero() {
        let parsed = parser()
            .parse(r#"{"eventid":"cowrie.session.connect","session":"s1","src_port":70000}"#)
            .unwrap();
        assert!(matches!(
            parsed.kind,
            EventKind::Connection { src_port: 0, .. }
        ));
    }

    #[test]
    fn unknown_eventid_is_preserved() {
        let line = r#"{"eventid":"cowrie.client.version","session":"s1","version":"SSH-2.0-Go"}"#;
        let parsed = parser().parse(line).unwrap();
        assert_eq!(parsed.session_id, "s1");
        assert_eq!(
            parsed.kind,
            EventKind::Unknown {
                raw_text: line.to_owned()
            }
        );
    }

    #[test]
    fn known_kind_without_session_becomes_unknown() {
        let line = r#"{"eventid":"cowrie.command.input","input":"ls"}"#;
        let parsed = parser().parse(line).unwrap();
        assert!(!parsed.is_known());
    }

    #[test]
    fn upload_uses_outfile_when_url_absent() {
        let parsed = parser()
            .parse(r#"{"eventid":"cowrie.session.file_upload","session":"s1","src_ip":"192.0.2.1","filename":"payload.bin","shasum":"ab"}"#)
            .unwrap();
        assert!(matches!(
            parsed.kind,
            EventKind::Download { ref url_or_path, .. } if url_or_path == "payload.bin"
        ));
    }

    #[test]
    fn missing_discriminator_is_rejected() {
        assert!(parser().parse(r#"{"session":"s1","input":"ls"}"#).is_err());
    }

    #[test]
    fn non_object_is_rejected() {
        assert!(parser().parse(r#"["not","an","object"]"#).is_err());
        assert!(parser().parse("42").is_err());
    }

    #[test]
    fn invalid_json_is_rejected() {
        assert!(parser().parse("{not json}").is_err());
        assert!(parser().parse("").is_err());
    }

    #[test]
    fn oversized_input_is_rejected() {
        let parser = parser().with_max_input_size(32);
        let line = format!(
            r#"{{"eventid":"cowrie.command.input","session":"s1","input":"{}"}}"#,
            "a".repeat(64)
        );
        assert!(matches!(
            parser.parse(&line),
            Err(LogPipelineError::TooLarge { .. })
        ));
    }
}
