//! 설정 관리 — honeyrelay.toml 파싱 및 런타임 설정
//!
//! [`RelayConfig`]는 모든 컴포넌트의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`HONEYRELAY_IRC_SERVER_HOST=irc.example.org` 형식)
//! 3. 설정 파일 (`honeyrelay.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), honeyrelay_core::error::RelayError> {
//! use honeyrelay_core::config::RelayConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = RelayConfig::load("honeyrelay.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = RelayConfig::parse("[irc]\nchannel = \"#alerts\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, RelayError};

/// 폴링 간격 상한 (밀리초)
const MAX_POLL_INTERVAL_MS: u64 = 60_000;
/// 폴링 간격 하한 (밀리초)
const MIN_POLL_INTERVAL_MS: u64 = 10;
/// 최대 라인 길이 상한 (16MB)
const MAX_LINE_LENGTH: usize = 16 * 1024 * 1024;
/// 최대 라인 길이 하한
const MIN_LINE_LENGTH: usize = 256;
/// 큐 용량 상한
const MAX_QUEUE_CAPACITY: usize = 1_000_000;
/// 상위 N 상한
const MAX_TOP_N: usize = 50;

/// HoneyRelay 통합 설정
///
/// `honeyrelay.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 컴포넌트는 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 로그 감시 설정
    #[serde(default)]
    pub monitor: MonitorConfig,
    /// IRC 채널 설정
    #[serde(default)]
    pub irc: IrcConfig,
    /// 아웃바운드 큐 설정
    #[serde(default)]
    pub queue: QueueConfig,
    /// 통계 보고 설정
    #[serde(default)]
    pub stats: StatsConfig,
    /// 메트릭 노출 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl RelayConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, RelayError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드와 검증 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, RelayError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RelayError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                RelayError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, RelayError> {
        toml::from_str(toml_str).map_err(|e| {
            RelayError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `HONEYRELAY_{SECTION}_{FIELD}`
    /// 예: `HONEYRELAY_IRC_CHANNEL=#alerts`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "HONEYRELAY_GENERAL_LOG_LEVEL");
        override_string(
            &mut self.general.log_format,
            "HONEYRELAY_GENERAL_LOG_FORMAT",
        );
        override_string(&mut self.general.pid_file, "HONEYRELAY_GENERAL_PID_FILE");

        // Monitor
        override_string(
            &mut self.monitor.log_file_path,
            "HONEYRELAY_MONITOR_LOG_FILE_PATH",
        );
        override_u64(
            &mut self.monitor.poll_interval_ms,
            "HONEYRELAY_MONITOR_POLL_INTERVAL_MS",
        );
        override_string(&mut self.monitor.start_at, "HONEYRELAY_MONITOR_START_AT");
        override_string(&mut self.monitor.format, "HONEYRELAY_MONITOR_FORMAT");
        override_usize(
            &mut self.monitor.max_line_length,
            "HONEYRELAY_MONITOR_MAX_LINE_LENGTH",
        );

        // IRC
        override_string(&mut self.irc.server_host, "HONEYRELAY_IRC_SERVER_HOST");
        override_u16(&mut self.irc.server_port, "HONEYRELAY_IRC_SERVER_PORT");
        override_bool(&mut self.irc.use_tls, "HONEYRELAY_IRC_USE_TLS");
        override_string(&mut self.irc.nickname, "HONEYRELAY_IRC_NICKNAME");
        override_string(&mut self.irc.channel, "HONEYRELAY_IRC_CHANNEL");
        override_string(
            &mut self.irc.channel_password,
            "HONEYRELAY_IRC_CHANNEL_PASSWORD",
        );
        override_string(
            &mut self.irc.nickserv_password,
            "HONEYRELAY_IRC_NICKSERV_PASSWORD",
        );
        override_bool(&mut self.irc.use_colors, "HONEYRELAY_IRC_USE_COLORS");
        override_u64(
            &mut self.irc.backoff_base_secs,
            "HONEYRELAY_IRC_BACKOFF_BASE_SECS",
        );
        override_u64(
            &mut self.irc.backoff_cap_secs,
            "HONEYRELAY_IRC_BACKOFF_CAP_SECS",
        );
        override_u32(
            &mut self.irc.rate_limit.messages,
            "HONEYRELAY_IRC_RATE_LIMIT_MESSAGES",
        );
        override_u64(
            &mut self.irc.rate_limit.window_secs,
            "HONEYRELAY_IRC_RATE_LIMIT_WINDOW_SECS",
        );

        // Queue / Stats
        override_usize(&mut self.queue.capacity, "HONEYRELAY_QUEUE_CAPACITY");
        override_u64(
            &mut self.stats.report_interval_secs,
            "HONEYRELAY_STATS_REPORT_INTERVAL_SECS",
        );
        override_usize(&mut self.stats.top_n, "HONEYRELAY_STATS_TOP_N");
        override_bool(
            &mut self.stats.daily_report,
            "HONEYRELAY_STATS_DAILY_REPORT",
        );

        // Metrics
        override_bool(&mut self.metrics.enabled, "HONEYRELAY_METRICS_ENABLED");
        override_string(
            &mut self.metrics.listen_addr,
            "HONEYRELAY_METRICS_LISTEN_ADDR",
        );
        override_u16(&mut self.metrics.port, "HONEYRELAY_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), RelayError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        // monitor
        if self.monitor.log_file_path.trim().is_empty() {
            return Err(invalid("monitor.log_file_path", "must not be empty"));
        }
        if !(MIN_POLL_INTERVAL_MS..=MAX_POLL_INTERVAL_MS).contains(&self.monitor.poll_interval_ms) {
            return Err(invalid(
                "monitor.poll_interval_ms",
                format!("must be between {MIN_POLL_INTERVAL_MS} and {MAX_POLL_INTERVAL_MS}"),
            ));
        }
        let valid_starts = ["beginning", "end"];
        if !valid_starts.contains(&self.monitor.start_at.as_str()) {
            return Err(invalid(
                "monitor.start_at",
                format!("must be one of: {}", valid_starts.join(", ")),
            ));
        }
        let valid_record_formats = ["json", "text", "auto"];
        if !valid_record_formats.contains(&self.monitor.format.as_str()) {
            return Err(invalid(
                "monitor.format",
                format!("must be one of: {}", valid_record_formats.join(", ")),
            ));
        }
        if !(MIN_LINE_LENGTH..=MAX_LINE_LENGTH).contains(&self.monitor.max_line_length) {
            return Err(invalid(
                "monitor.max_line_length",
                format!("must be between {MIN_LINE_LENGTH} and {MAX_LINE_LENGTH}"),
            ));
        }

        // irc
        if self.irc.server_host.trim().is_empty() {
            return Err(invalid("irc.server_host", "must not be empty"));
        }
        if self.irc.server_port == 0 {
            return Err(invalid("irc.server_port", "must be greater than 0"));
        }
        if self.irc.nickname.is_empty() || self.irc.nickname.contains(char::is_whitespace) {
            return Err(invalid(
                "irc.nickname",
                "must be non-empty and contain no whitespace",
            ));
        }
        let channel = self.irc.channel.trim_start_matches('#');
        if channel.is_empty() || self.irc.channel.contains([' ', ',', '\x07']) {
            return Err(invalid(
                "irc.channel",
                "must be non-empty and contain no spaces, commas or BEL",
            ));
        }
        if self.irc.rate_limit.messages == 0 {
            return Err(invalid("irc.rate_limit.messages", "must be at least 1"));
        }
        if self.irc.rate_limit.window_secs == 0 {
            return Err(invalid("irc.rate_limit.window_secs", "must be at least 1"));
        }
        if self.irc.backoff_base_secs == 0 {
            return Err(invalid("irc.backoff_base_secs", "must be at least 1"));
        }
        if self.irc.backoff_cap_secs < self.irc.backoff_base_secs {
            return Err(invalid(
                "irc.backoff_cap_secs",
                "must be greater than or equal to irc.backoff_base_secs",
            ));
        }
        if self.irc.connect_timeout_secs == 0 || self.irc.registration_timeout_secs == 0 {
            return Err(invalid(
                "irc.connect_timeout_secs",
                "connect and registration timeouts must be at least 1",
            ));
        }
        if self.irc.keepalive_interval_secs == 0 {
            return Err(invalid("irc.keepalive_interval_secs", "must be at least 1"));
        }
        if self.irc.read_timeout_secs <= self.irc.keepalive_interval_secs {
            return Err(invalid(
                "irc.read_timeout_secs",
                "must be greater than irc.keepalive_interval_secs",
            ));
        }

        // queue / stats
        if self.queue.capacity == 0 || self.queue.capacity > MAX_QUEUE_CAPACITY {
            return Err(invalid(
                "queue.capacity",
                format!("must be between 1 and {MAX_QUEUE_CAPACITY}"),
            ));
        }
        if self.stats.report_interval_secs == 0 {
            return Err(invalid("stats.report_interval_secs", "must be at least 1"));
        }
        if self.stats.top_n == 0 || self.stats.top_n > MAX_TOP_N {
            return Err(invalid(
                "stats.top_n",
                format!("must be between 1 and {MAX_TOP_N}"),
            ));
        }

        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(invalid("metrics.port", "must be greater than 0"));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> RelayError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
    /// PID 파일 경로 (빈 문자열이면 사용하지 않음)
    pub pid_file: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
            pid_file: String::new(),
        }
    }
}

/// 로그 감시 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// 감시할 허니팟 로그 파일
    pub log_file_path: String,
    /// 폴링 간격 (밀리초)
    pub poll_interval_ms: u64,
    /// 최초 오픈 시 시작 위치 (beginning, end)
    pub start_at: String,
    /// 레코드 형식 (json, text, auto)
    pub format: String,
    /// 최대 라인 길이 (바이트)
    pub max_line_length: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            log_file_path: "/var/log/cowrie/cowrie.json".to_owned(),
            poll_interval_ms: 1000,
            start_at: "end".to_owned(),
            format: "json".to_owned(),
            max_line_length: 64 * 1024,
        }
    }
}

/// IRC 채널 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IrcConfig {
    /// 서버 호스트
    pub server_host: String,
    /// 서버 포트
    pub server_port: u16,
    /// TLS 사용 여부
    pub use_tls: bool,
    /// 닉네임
    pub nickname: String,
    /// USER 명령의 실명 필드
    pub realname: String,
    /// 참여할 채널 (`#` 생략 가능)
    pub channel: String,
    /// 채널 키 (빈 문자열이면 사용하지 않음)
    pub channel_password: String,
    /// NickServ IDENTIFY 비밀번호 (빈 문자열이면 사용하지 않음)
    pub nickserv_password: String,
    /// mIRC 색상 코드 사용 여부
    pub use_colors: bool,
    /// 종료 시 QUIT 메시지
    pub quit_message: String,
    /// 참여 직후 알림 메시지 (빈 문자열이면 보내지 않음)
    pub join_message: String,
    /// TCP/TLS 연결 타임아웃 (초)
    pub connect_timeout_secs: u64,
    /// 등록~참여 완료 타임아웃 (초)
    pub registration_timeout_secs: u64,
    /// 수신이 없을 때 PING을 보내는 간격 (초)
    pub keepalive_interval_secs: u64,
    /// 이 시간 동안 수신이 없으면 연결을 끊은 것으로 간주 (초)
    pub read_timeout_secs: u64,
    /// 백오프 기본 지연 (초)
    pub backoff_base_secs: u64,
    /// 백오프 최대 지연 (초)
    pub backoff_cap_secs: u64,
    /// 흐름 제어
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

impl Default for IrcConfig {
    fn default() -> Self {
        Self {
            server_host: "irc.libera.chat".to_owned(),
            server_port: 6697,
            use_tls: true,
            nickname: "HoneyRelay".to_owned(),
            realname: "HoneyRelay honeypot monitor".to_owned(),
            channel: "#honeypot-alerts".to_owned(),
            channel_password: String::new(),
            nickserv_password: String::new(),
            use_colors: true,
            quit_message: "HoneyRelay shutting down".to_owned(),
            join_message: "HoneyRelay connected. Now monitoring honeypot activity.".to_owned(),
            connect_timeout_secs: 30,
            registration_timeout_secs: 60,
            keepalive_interval_secs: 120,
            read_timeout_secs: 300,
            backoff_base_secs: 1,
            backoff_cap_secs: 60,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

/// 흐름 제어 설정 — `window_secs` 동안 최대 `messages`개
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// 윈도우당 최대 메시지 수
    pub messages: u32,
    /// 윈도우 길이 (초)
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            messages: 4,
            window_secs: 8,
        }
    }
}

/// 아웃바운드 큐 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// 큐 용량
    pub capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { capacity: 1000 }
    }
}

/// 통계 보고 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// 보고 주기 (초)
    pub report_interval_secs: u64,
    /// 상위 항목 수
    pub top_n: usize,
    /// 빈 윈도우 보고 생략 여부
    pub skip_empty_reports: bool,
    /// 날짜(UTC)가 바뀔 때 하루치 누적 보고 여부
    pub daily_report: bool,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            report_interval_secs: 300,
            top_n: 5,
            skip_empty_reports: true,
            daily_report: true,
        }
    }
}

/// Prometheus 메트릭 노출 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 바인드 주소
    pub listen_addr: String,
    /// 포트
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9108,
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u32(target: &mut u32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u32>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u32 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
