//! 이벤트 모델 — 허니팟 로그 레코드의 타입 표현
//!
//! 파서가 생성하고 포매터와 통계 집계기가 소비하는 불변 레코드입니다.
//! 모든 이벤트는 발생 시각(UTC)과 세션 ID를 공통으로 가지며,
//! 세부 내용은 [`EventKind`] 태그드 유니온으로 표현합니다.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- 모듈명 상수 ---

/// 로그 테일러 모듈명
pub const MODULE_LOG_TAILER: &str = "log-tailer";
/// 아웃바운드 채널 모듈명
pub const MODULE_IRC_CHANNEL: &str = "irc-channel";
/// 통계 집계기 모듈명
pub const MODULE_STATS: &str = "stats";
/// 아웃바운드 큐 모듈명
pub const MODULE_OUTBOUND_QUEUE: &str = "outbound-queue";

/// 허니팟 보안 이벤트
///
/// `session_id`는 같은 공격자 세션에 속한 레코드를 연결하는 유일한 키입니다.
/// 알려진 종류(`Unknown` 제외)에서는 절대 비어 있지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// 레코드 발생 시각
    pub timestamp: DateTime<Utc>,
    /// 세션 상관 키
    pub session_id: String,
    /// 이벤트 세부 내용
    pub kind: EventKind,
}

/// 이벤트 종류별 필드
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// 로그인 시도
    Login {
        src_ip: String,
        src_port: u16,
        username: String,
        password: String,
        success: bool,
    },
    /// 셸 명령 입력
    Command { src_ip: String, command: String },
    /// 새 연결
    Connection {
        src_ip: String,
        src_port: u16,
        dst_ip: String,
        dst_port: u16,
    },
    /// 파일 다운로드/업로드
    Download {
        src_ip: String,
        url_or_path: String,
        sha256: String,
        size_bytes: u64,
    },
    /// 인식하지 못한 레코드 (원문 보존)
    Unknown { raw_text: String },
}

impl Event {
    /// 새 이벤트를 생성합니다.
    pub fn new(timestamp: DateTime<Utc>, session_id: impl Into<String>, kind: EventKind) -> Self {
        Self {
            timestamp,
            session_id: session_id.into(),
            kind,
        }
    }

    /// 통계 집계용 카테고리
    pub fn category(&self) -> EventCategory {
        match &self.kind {
            EventKind::Login { success: true, .. } => EventCategory::LoginSuccess,
            EventKind::Login { success: false, .. } => EventCategory::LoginFailed,
            EventKind::Command { .. } => EventCategory::Command,
            EventKind::Connection { .. } => EventCategory::Connection,
            EventKind::Download { .. } => EventCategory::Download,
            EventKind::Unknown { .. } => EventCategory::Unknown,
        }
    }

    /// 출발지 IP (`Unknown`은 `None`)
    pub fn src_ip(&self) -> Option<&str> {
        match &self.kind {
            EventKind::Login { src_ip, .. }
            | EventKind::Command { src_ip, .. }
            | EventKind::Connection { src_ip, .. }
            | EventKind::Download { src_ip, .. } => Some(src_ip.as_str()),
            EventKind::Unknown { .. } => None,
        }
    }

    /// 알려진 종류인지 여부
    pub fn is_known(&self) -> bool {
        !matches!(self.kind, EventKind::Unknown { .. })
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] session={} kind={}",
            self.timestamp.to_rfc3339(),
            self.session_id,
            self.category(),
        )
    }
}

/// 통계 키로 사용하는 이벤트 카테고리
///
/// 로그인은 성공/실패로 나뉩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    LoginSuccess,
    LoginFailed,
    Command,
    Connection,
    Download,
    Unknown,
}

impl EventCategory {
    /// 모든 카테고리 (보고 순서)
    pub const ALL: [EventCategory; 6] = [
        EventCategory::Connection,
        EventCategory::LoginSuccess,
        EventCategory::LoginFailed,
        EventCategory::Command,
        EventCategory::Download,
        EventCategory::Unknown,
    ];

    /// 메트릭 라벨 및 로그 필드에 쓰는 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoginSuccess => "login_success",
            Self::LoginFailed => "login_failed",
            Self::Command => "command",
            Self::Connection => "connection",
            Self::Download => "download",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn login(success: bool) -> Event {
        Event::new(
            ts(),
            "a1b2c3",
            EventKind::Login {
                src_ip: "203.0.113.7".to_owned(),
                src_port: 51022,
                username: "root".to_owned(),
                password: "123456".to_owned(),
                success,
            },
        )
    }

    #[test]
    fn login_category_depends_on_outcome() {
        assert_eq!(login(true).category(), EventCategory::LoginSuccess);
        assert_eq!(login(false).category(), EventCategory::LoginFailed);
    }

    #[test]
    fn unknown_has_no_src_ip() {
        let event = Event::new(
            ts(),
            "",
            EventKind::Unknown {
                raw_text: "{\"eventid\":\"cowrie.client.size\"}".to_owned(),
            },
        );
        assert_eq!(event.src_ip(), None);
        assert!(!event.is_known());
        assert_eq!(event.category(), EventCategory::Unknown);
    }

    #[test]
    fn src_ip_is_exposed_for_known_kinds() {
        assert_eq!(login(false).src_ip(), Some("203.0.113.7"));
    }

    #[test]
    fn display_contains_session_and_kind() {
        let shown = login(false).to_string();
        assert!(shown.contains("session=a1b2c3"));
        assert!(shown.contains("kind=login_failed"));
    }

    #[test]
    fn category_names_are_snake_case() {
        for category in EventCategory::ALL {
            assert_eq!(category.as_str(), category.as_str().to_lowercase());
        }
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let json = serde_json::to_string(&login(true)).unwrap();
        assert!(json.contains("\"type\":\"login\""));
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back, login(true));
    }
}
