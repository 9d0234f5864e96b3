//! IRC 채널 에러 타입
//!
//! [`IrcError`]는 연결, 등록, 송수신 중 발생하는 에러를 표현합니다.
//! 채널 클라이언트는 모든 에러를 백오프로 처리하며 프로세스를 중단하지 않습니다.

use honeyrelay_core::error::RelayError;

/// IRC 채널 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum IrcError {
    /// 서버 연결 실패
    #[error("connect failed: {0}")]
    Connect(String),

    /// TLS 설정 또는 핸드셰이크 실패
    #[error("tls error: {0}")]
    Tls(String),

    /// 단계별 시간 초과 (connect, registration, read)
    #[error("{0} timed out")]
    Timeout(&'static str),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// 서버가 자격 증명을 거부함 (464/465)
    #[error("authentication rejected: {0}")]
    AuthFailed(String),

    /// 채널 입장 거부 (471/473/474/475)
    #[error("join {channel} rejected: {reason}")]
    JoinRejected {
        /// 채널명
        channel: String,
        /// 서버가 보낸 사유
        reason: String,
    },

    /// 채널에서 강제 퇴장됨
    #[error("kicked from {channel}: {reason}")]
    Kicked {
        /// 채널명
        channel: String,
        /// 퇴장 사유
        reason: String,
    },

    /// 서버가 ERROR로 연결을 끊음
    #[error("server error: {0}")]
    ServerError(String),

    /// 서버가 연결을 닫음
    #[error("connection closed by server")]
    Closed,

    /// 등록 절차 실패
    #[error("registration failed: {0}")]
    Registration(String),
}

impl IrcError {
    /// 자격 증명 거부인지 여부
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::AuthFailed(_))
    }
}

impl From<IrcError> for RelayError {
    fn from(err: IrcError) -> Self {
        match err {
            IrcError::Io(e) => RelayError::Io(e),
            other => RelayError::Channel(other.to_string()),
        }
    }
}
