//! 채널 메시지 포매터
//!
//! 이벤트와 통계 스냅샷을 채널에 보낼 한 줄 텍스트로 만듭니다.
//! `use_colors`가 켜져 있으면 mIRC 제어 코드(굵게, 색상)로 필드를 강조합니다.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use honeyrelay_core::event::{Event, EventCategory, EventKind};
use honeyrelay_core::types::{GeoLookup, is_non_routable};
use honeyrelay_log_pipeline::stats::StatsWindow;

/// mIRC 제어 코드
mod code {
    pub const BOLD: &str = "\x02";
    pub const RESET: &str = "\x0f";
    pub const GREEN: &str = "\x0303";
    pub const RED: &str = "\x0304";
    pub const PURPLE: &str = "\x0306";
    pub const ORANGE: &str = "\x0307";
    pub const YELLOW: &str = "\x0308";
    pub const CYAN: &str = "\x0311";
    pub const LIGHT_BLUE: &str = "\x0312";
    pub const GREY: &str = "\x0314";
}

/// 통계 보고에 나열할 상위 항목 수 (사용자명/비밀번호/명령)
const STATS_TOP_SHOWN: usize = 3;

/// 메시지 포매터
#[derive(Clone)]
pub struct MessageFormatter {
    use_colors: bool,
    geo: Option<Arc<dyn GeoLookup>>,
}

impl MessageFormatter {
    /// 새 포매터를 생성합니다.
    pub fn new(use_colors: bool) -> Self {
        Self {
            use_colors,
            geo: None,
        }
    }

    /// IP 위치 조회기를 연결합니다.
    pub fn with_geo(mut self, geo: Arc<dyn GeoLookup>) -> Self {
        self.geo = Some(geo);
        self
    }

    /// 색상이 켜져 있으면 `color`로 감쌉니다.
    fn paint(&self, color: &str, text: &str) -> String {
        if self.use_colors {
            format!("{color}{text}{}", code::RESET)
        } else {
            text.to_owned()
        }
    }

    /// 이벤트 라벨 (`LOGIN`, `COMMAND` 등)
    fn label(&self, text: &str) -> String {
        if self.use_colors {
            format!("{}{}{text}{}", code::BOLD, code::YELLOW, code::RESET)
        } else {
            text.to_owned()
        }
    }

    /// IP와 (가능하면) 위치 정보
    fn ip(&self, ip: &str) -> String {
        let shown = if ip.is_empty() { "unknown" } else { ip };
        let mut out = self.paint(code::LIGHT_BLUE, shown);
        if let Some(geo) = self.geo.as_ref().filter(|_| !is_non_routable(ip)) {
            if let Some(info) = geo.lookup(ip) {
                let _ = write!(out, " [{info}]");
            }
        }
        out
    }

    fn session(&self, session_id: &str) -> String {
        format!("(session: {})", self.paint(code::GREY, session_id))
    }

    /// 이벤트를 한 줄로 포매팅합니다. `Unknown`은 중계하지 않으므로 `None`.
    pub fn format_event(&self, event: &Event) -> Option<String> {
        let text = match &event.kind {
            EventKind::Login {
                src_ip,
                username,
                password,
                success,
                ..
            } => {
                let status = if *success {
                    self.paint(code::GREEN, "SUCCESS")
                } else {
                    self.paint(code::RED, "FAILED")
                };
                format!(
                    "{} {status}: {} attempted to login as '{}' with password '{}'",
                    self.label("LOGIN"),
                    self.ip(src_ip),
                    self.paint(code::ORANGE, username),
                    self.paint(code::ORANGE, password),
                )
            }
            EventKind::Command { src_ip, command } => format!(
                "{}: {} executed '{}' {}",
                self.label("COMMAND"),
                self.ip(src_ip),
                self.paint(code::CYAN, command),
                self.session(&event.session_id),
            ),
            EventKind::Connection { src_ip, .. } => format!(
                "{}: New connection from {} {}",
                self.label("CONNECTION"),
                self.ip(src_ip),
                self.session(&event.session_id),
            ),
            EventKind::Download {
                src_ip,
                url_or_path,
                sha256,
                size_bytes,
            } => {
                let hash = if sha256.is_empty() { "unknown" } else { sha256 };
                format!(
                    "{}: {} downloaded {} (sha256: {hash}, {size_bytes} bytes) {}",
                    self.label("DOWNLOAD"),
                    self.ip(src_ip),
                    self.paint(code::CYAN, url_or_path),
                    self.session(&event.session_id),
                )
            }
            EventKind::Unknown { .. } => return None,
        };
        Some(text)
    }

    /// 순위 목록을 `item (n), item (n)` 형태로 만듭니다.
    fn ranked(&self, items: &[(String, u64)], limit: usize) -> String {
        if items.is_empty() {
            return "none".to_owned();
        }
        items
            .iter()
            .take(limit)
            .map(|(key, count)| format!("{} ({count})", self.paint(code::ORANGE, key)))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn field(&self, name: &str, value: &str) -> String {
        if self.use_colors {
            format!("{}{name}:{} {value}", code::BOLD, code::RESET)
        } else {
            format!("{name}: {value}")
        }
    }

    /// 통계 스냅샷을 한 줄로 포매팅합니다.
    pub fn format_stats(&self, window: &StatsWindow, period: &str) -> String {
        let number = |n: u64| self.paint(code::GREEN, &n.to_string());
        let title = format!("STATS ({period})");
        let header = if self.use_colors {
            format!("{}{}", code::BOLD, self.paint(code::PURPLE, &title))
        } else {
            title
        };

        let fields = [
            self.field(
                "Connections",
                &number(window.count(EventCategory::Connection)),
            ),
            self.field(
                "Logins",
                &format!(
                    "{}/{}",
                    number(window.count(EventCategory::LoginSuccess)),
                    number(window.count(EventCategory::LoginFailed))
                ),
            ),
            self.field("Commands", &number(window.count(EventCategory::Command))),
            self.field("Downloads", &number(window.count(EventCategory::Download))),
            self.field("Unique IPs", &number(window.unique_src_ips as u64)),
            self.field("Top IPs", &self.ranked(&window.top_src_ips, usize::MAX)),
            self.field(
                "Top usernames",
                &self.ranked(&window.top_usernames, STATS_TOP_SHOWN),
            ),
            self.field(
                "Top passwords",
                &self.ranked(&window.top_passwords, STATS_TOP_SHOWN),
            ),
            self.field(
                "Top commands",
                &self.ranked(&window.top_commands, STATS_TOP_SHOWN),
            ),
        ];

        format!("{header}: {}", fields.join(" | "))
    }
}

/// 보고 주기를 사람이 읽는 라벨로 바꿉니다 (`300s` → `5min`).
pub fn period_label(interval: Duration) -> String {
    let secs = interval.as_secs();
    match secs {
        s if s >= 3600 && s % 3600 == 0 => format!("{}h", s / 3600),
        s if s >= 60 && s % 60 == 0 => format!("{}min", s / 60),
        s => format!("{s}s"),
    }
}
