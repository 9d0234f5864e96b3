//! 로그 파이프라인 에러 타입
//!
//! [`LogPipelineError`]는 테일러, 파서, 통계 집계기 내부에서 발생하는 에러를 표현합니다.
//! `From<LogPipelineError> for RelayError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use honeyrelay_core::error::{ConfigError, ParseError, PipelineError, RelayError};

/// 로그 파이프라인 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum LogPipelineError {
    /// 레코드 파싱 실패
    #[error("parse error: {format} at offset {offset}: {reason}")]
    Parse {
        /// 파서 형식 (json, text)
        format: String,
        /// 실패 위치 (바이트 오프셋)
        offset: usize,
        /// 실패 사유
        reason: String,
    },

    /// 입력이 최대 크기를 초과
    #[error("input too large: {size} bytes (max: {max})")]
    TooLarge {
        /// 입력 크기
        size: usize,
        /// 허용 최대 크기
        max: usize,
    },

    /// 수집기 에러 (파일 I/O 등)
    #[error("collector error: {source_type}: {reason}")]
    Collector {
        /// 수집 소스 유형 (file)
        source_type: String,
        /// 에러 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 채널 통신 에러
    #[error("channel error: {0}")]
    Channel(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// 정규식 컴파일 에러
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl From<LogPipelineError> for RelayError {
    fn from(err: LogPipelineError) -> Self {
        match err {
            LogPipelineError::Config { field, reason } => {
                RelayError::Config(ConfigError::InvalidValue { field, reason })
            }
            LogPipelineError::Parse { offset, reason, .. } => {
                RelayError::Parse(ParseError::Failed { offset, reason })
            }
            LogPipelineError::TooLarge { size, max } => {
                RelayError::Parse(ParseError::TooLarge { size, max })
            }
            LogPipelineError::Io(e) => RelayError::Io(e),
            LogPipelineError::Channel(reason) => {
                RelayError::Pipeline(PipelineError::ChannelSend(reason))
            }
            other => RelayError::Pipeline(PipelineError::InitFailed(other.to_string())),
        }
    }
}
