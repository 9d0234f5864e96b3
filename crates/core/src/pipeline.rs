//! 생명주기 trait — 장기 실행 컴포넌트의 공통 인터페이스

use std::fmt;

use serde::Serialize;

use crate::error::RelayError;

/// 컴포넌트 헬스 상태
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum HealthStatus {
    /// 정상
    Healthy,
    /// 동작하지만 저하됨
    Degraded(String),
    /// 동작 불가
    Unhealthy(String),
}

impl HealthStatus {
    /// 정상 여부
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// 동작 불가 여부
    pub fn is_unhealthy(&self) -> bool {
        matches!(self, Self::Unhealthy(_))
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded(reason) => write!(f, "degraded: {reason}"),
            Self::Unhealthy(reason) => write!(f, "unhealthy: {reason}"),
        }
    }
}

/// 시작/정지/헬스 체크를 지원하는 컴포넌트
///
/// `start`는 백그라운드 태스크를 띄운 뒤 즉시 반환하고,
/// `stop`은 태스크가 끝날 때까지 기다립니다.
pub trait Pipeline: Send + Sync {
    /// 컴포넌트 시작
    fn start(&mut self) -> impl Future<Output = Result<(), RelayError>> + Send;

    /// 컴포넌트 정지
    fn stop(&mut self) -> impl Future<Output = Result<(), RelayError>> + Send;

    /// 현재 헬스 상태
    fn health_check(&self) -> impl Future<Output = HealthStatus> + Send;
}
