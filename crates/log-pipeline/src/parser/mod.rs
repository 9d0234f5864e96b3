//! 레코드 파싱 모듈 -- 허니팟 로그 라인을 타입 이벤트로 변환
//!
//! [`EventParser`]는 등록된 [`RecordParser`]를 순서대로 시도하여
//! 첫 번째 성공 결과를 반환합니다. 모든 파서가 실패한 라인은
//! 전송 중 생긴 잔해로 간주해 `None`으로 버립니다.
//!
//! # 지원 형식
//! - Cowrie JSON 로그 ([`CowrieJsonParser`])
//! - Cowrie 텍스트 로그 ([`CowrieTextParser`])
//!
//! # 사용 예시
//! ```ignore
//! use honeyrelay_log_pipeline::parser::{EventParser, LogFormat};
//!
//! let parser = EventParser::with_format(LogFormat::Json, clock, 64 * 1024)?;
//! let event = parser.parse(r#"{"eventid":"cowrie.command.input","session":"a1","input":"ls"}"#);
//! ```

pub mod json;
pub mod text;

pub use json::CowrieJsonParser;
pub use text::CowrieTextParser;

use std::str::FromStr;
use std::sync::Arc;

use honeyrelay_core::clock::Clock;
use honeyrelay_core::event::Event;
use honeyrelay_core::metrics as m;
use tracing::trace;

use crate::error::LogPipelineError;

/// 한 가지 레코드 형식을 해석하는 파서
///
/// `Err`는 형식에 맞지 않는 입력을 뜻합니다.
/// 형식은 맞지만 종류를 모르는 레코드는 `Ok(Unknown)`으로 반환해야 합니다.
pub trait RecordParser: Send + Sync {
    /// 지원하는 형식 이름
    fn format_name(&self) -> &str;

    /// 한 라인을 이벤트로 파싱
    fn parse(&self, line: &str) -> Result<Event, LogPipelineError>;
}

/// 입력 레코드 형식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// 라인당 JSON 객체 하나
    Json,
    /// Cowrie 텍스트 로그
    Text,
    /// JSON을 먼저 시도하고 실패하면 텍스트
    Auto,
}

impl FromStr for LogFormat {
    type Err = LogPipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "text" => Ok(Self::Text),
            "auto" => Ok(Self::Auto),
            other => Err(LogPipelineError::Config {
                field: "format".to_owned(),
                reason: format!("unknown record format '{other}'"),
            }),
        }
    }
}

/// 이벤트 파서 -- 라인 하나를 `Option<Event>`로 변환합니다.
///
/// 호출 간 상태가 없으므로 여러 태스크에서 공유해도 됩니다.
pub struct EventParser {
    /// 등록된 파서 목록 (순서대로 시도)
    parsers: Vec<Box<dyn RecordParser>>,
}

impl EventParser {
    /// 빈 파서를 생성합니다.
    pub fn new() -> Self {
        Self {
            parsers: Vec::new(),
        }
    }

    /// 형식에 맞는 파서 세트로 생성합니다.
    pub fn with_format(
        format: LogFormat,
        clock: Arc<dyn Clock>,
        max_line_length: usize,
    ) -> Result<Self, LogPipelineError> {
        let json = || {
            let parser = CowrieJsonParser::new(Arc::clone(&clock))
                .with_max_input_size(max_line_length);
            Box::new(parser) as Box<dyn RecordParser>
        };
        let text = || -> Result<Box<dyn RecordParser>, LogPipelineError> {
            Ok(Box::new(
                CowrieTextParser::new()?.with_max_input_size(max_line_length),
            ))
        };

        let parser = match format {
            LogFormat::Json => Self::new().register(json()),
            LogFormat::Text => Self::new().register(text()?),
            LogFormat::Auto => Self::new().register(json()).register(text()?),
        };
        Ok(parser)
    }

    /// core 모니터 설정으로부터 생성합니다.
    pub fn from_core(
        config: &honeyrelay_core::config::MonitorConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, LogPipelineError> {
        let format: LogFormat = config.format.parse()?;
        Self::with_format(format, clock, config.max_line_length)
    }

    /// 파서를 등록합니다. 등록 순서대로 시도됩니다.
    pub fn register(mut self, parser: Box<dyn RecordParser>) -> Self {
        self.parsers.push(parser);
        self
    }

    /// 라인을 파싱합니다. 실패해도 에러를 내지 않습니다.
    ///
    /// 모든 파서가 거부한 라인은 `None`이며 드롭 카운터만 증가합니다.
    pub fn parse(&self, line: &str) -> Option<Event> {
        let mut last_format = "none";
        for parser in &self.parsers {
            match parser.parse(line) {
                Ok(event) => {
                    let category = event.category().as_str();
                    metrics::counter!(m::PARSER_EVENTS_TOTAL, m::LABEL_CATEGORY => category)
                        .increment(1);
                    return Some(event);
                }
                Err(e) => {
                    trace!(format = parser.format_name(), error = %e, "parser rejected line");
                    last_format = parser.format_name();
                }
            }
        }
        metrics::counter!(m::PARSER_LINES_DROPPED_TOTAL, m::LABEL_FORMAT => last_format.to_owned())
            .increment(1);
        None
    }

    /// 특정 형식 이름의 파서로 직접 파싱합니다.
    pub fn parse_with(&self, format_name: &str, line: &str) -> Result<Event, LogPipelineError> {
        for parser in &self.parsers {
            if parser.format_name() == format_name {
                return parser.parse(line);
            }
        }
        Err(LogPipelineError::Config {
            field: "format".to_owned(),
            reason: format!("no parser registered for '{format_name}'"),
        })
    }

    /// 등록된 파서 형식 이름 목록을 반환합니다.
    pub fn registered_formats(&self) -> Vec<&str> {
        self.parsers.iter().map(|p| p.format_name()).collect()
    }
}

impl Default for EventParser {
    fn default() -> Self {
        Self::new()
    }
}
