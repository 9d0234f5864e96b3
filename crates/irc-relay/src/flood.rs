//! 송신 속도 제한 (flood control)
//!
//! 이동 윈도우 `window` 동안 최대 `max_messages`개만 보냅니다.
//! 한도를 넘으면 가장 오래된 송신이 윈도우를 벗어날 때까지 기다리며, 메시지를 버리지 않습니다.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use honeyrelay_core::event::MODULE_IRC_CHANNEL;
use honeyrelay_core::metrics as m;

/// 이동 윈도우 속도 제한기
#[derive(Debug)]
pub struct FloodLimiter {
    max_messages: u32,
    window: Duration,
    /// 윈도우 안의 송신 시각 (오래된 순)
    sent: VecDeque<Instant>,
}

impl FloodLimiter {
    /// 새 제한기를 생성합니다. `max_messages`가 0이면 제한하지 않습니다.
    pub fn new(max_messages: u32, window: Duration) -> Self {
        Self {
            max_messages,
            window,
            sent: VecDeque::with_capacity(max_messages as usize),
        }
    }

    /// `now`에 송신하려면 얼마나 기다려야 하는지 계산합니다.
    pub fn delay_needed(&mut self, now: Instant) -> Option<Duration> {
        if self.max_messages == 0 {
            return None;
        }
        while let Some(&oldest) = self.sent.front() {
            if now.duration_since(oldest) >= self.window {
                self.sent.pop_front();
            } else {
                break;
            }
        }
        if self.sent.len() < self.max_messages as usize {
            return None;
        }
        self.sent
            .front()
            .map(|&oldest| (oldest + self.window).saturating_duration_since(now))
    }

    /// `now`에 송신했음을 기록합니다.
    pub fn record(&mut self, now: Instant) {
        if self.max_messages > 0 {
            self.sent.push_back(now);
        }
    }

    /// 송신 슬롯을 확보할 때까지 기다린 뒤 기록합니다. 기다린 시간을 반환합니다.
    pub async fn acquire(&mut self) -> Duration {
        let mut waited = Duration::ZERO;
        loop {
            let now = Instant::now();
            match self.delay_needed(now) {
                None => {
                    self.record(now);
                    return waited;
                }
                Some(delay) => {
                    debug!(
                        module = MODULE_IRC_CHANNEL,
                        delay_ms = delay.as_millis() as u64,
                        "flood limit reached, delaying send"
                    );
                    metrics::counter!(m::CHANNEL_FLOOD_DELAYS_TOTAL).increment(1);
                    tokio::time::sleep(delay).await;
                    waited += delay;
                }
            }
        }
    }
}
