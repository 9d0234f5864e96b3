//! 재연결 백오프 계산
//!
//! 지연은 `min(cap, base * 2^attempt)`이며, 시도 횟수는 입장에 성공할 때까지 유지됩니다.

use std::time::Duration;

/// 지수 백오프 상태
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    cap: Duration,
    attempt: u32,
}

impl Backoff {
    /// 새 백오프를 생성합니다.
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self {
            base,
            cap,
            attempt: 0,
        }
    }

    /// 주어진 시도 횟수의 지연을 계산합니다.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        1u32.checked_shl(attempt)
            .and_then(|factor| self.base.checked_mul(factor))
            .map_or(self.cap, |delay| delay.min(self.cap))
    }

    /// 실패를 기록하고 `(새 시도 횟수, 대기 시간)`을 반환합니다.
    pub fn next_delay(&mut self) -> (u32, Duration) {
        let delay = self.delay_for(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        (self.attempt, delay)
    }

    /// 현재까지의 연속 실패 횟수
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// 입장 성공 시 초기화합니다.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}
