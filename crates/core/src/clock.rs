//! 클럭 추상화 — 벽시계 시각 주입
//!
//! 통계 윈도우 시작 시각과 타임스탬프 없는 레코드의 기본 시각은
//! [`Clock`]에서 얻습니다. 테스트는 [`ManualClock`]으로 시각을 고정합니다.
//! 단조 시간(폴링 대기, 백오프, 흐름 제어)은 `tokio::time`을 사용합니다.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

/// 현재 UTC 시각 공급자
pub trait Clock: Send + Sync {
    /// 현재 시각
    fn now(&self) -> DateTime<Utc>;
}

/// 시스템 시계
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 수동으로 조작하는 시계
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// 지정한 시각에서 시작합니다.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// 시각을 설정합니다.
    pub fn set(&self, to: DateTime<Utc>) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard = to;
    }

    /// 시각을 앞으로 이동합니다.
    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}
