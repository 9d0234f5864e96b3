//! 송신 큐 -- 알림과 통계 보고를 채널 송신 루프로 넘기는 유한 FIFO
//!
//! [`OutboundQueue`]는 생산자(이벤트 포매터, 통계 보고)와 소비자(채널 송신 루프)가
//! 공유하는 유일한 동기화 지점입니다.
//!
//! # 오버플로우 정책
//! 큐가 가득 찬 경우:
//! - 같은 우선순위의 가장 오래된 엔트리를 내보내고 새 메시지를 넣습니다.
//! - 같은 우선순위 엔트리가 없으면 새 메시지를 거부합니다 (다른 등급은 건드리지 않음).
//!
//! `push`는 절대 블로킹하지 않습니다.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Notify;
use tracing::warn;

use honeyrelay_core::event::MODULE_OUTBOUND_QUEUE;
use honeyrelay_core::metrics as m;

/// 메시지 우선순위 등급
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    /// 이벤트별 알림
    Alert,
    /// 주기 통계 보고
    Report,
}

impl Priority {
    /// 메트릭 라벨 값
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alert => "alert",
            Self::Report => "report",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 채널로 보낼 메시지
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// 본문 (한 줄 또는 여러 줄로 분할될 수 있음)
    pub text: String,
    /// 우선순위 등급
    pub priority: Priority,
}

impl OutboundMessage {
    /// 알림 메시지를 생성합니다.
    pub fn alert(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            priority: Priority::Alert,
        }
    }

    /// 통계 보고 메시지를 생성합니다.
    pub fn report(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            priority: Priority::Report,
        }
    }
}

/// `push` 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// 여유 공간에 들어감
    Queued,
    /// 같은 등급의 가장 오래된 메시지를 내보내고 들어감
    Evicted(OutboundMessage),
    /// 내보낼 같은 등급 메시지가 없어 거부됨
    Rejected,
}

/// 유한 송신 큐
pub struct OutboundQueue {
    /// 큐 내부 저장소
    entries: Mutex<VecDeque<OutboundMessage>>,
    /// 최대 용량
    capacity: usize,
    /// 소비자 깨우기
    notify: Notify,
    /// 내보낸 엔트리 수 (통계용)
    evicted: AtomicU64,
    /// 거부한 엔트리 수
    rejected: AtomicU64,
}

impl OutboundQueue {
    /// 새 큐를 생성합니다.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(10_000))),
            capacity,
            notify: Notify::new(),
            evicted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<OutboundMessage>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 메시지를 넣습니다. 블로킹하지 않습니다.
    pub fn push(&self, message: OutboundMessage) -> PushOutcome {
        let priority = message.priority;
        let (outcome, depth) = {
            let mut entries = self.lock();
            if entries.len() < self.capacity {
                entries.push_back(message);
                (PushOutcome::Queued, entries.len())
            } else if let Some(index) = entries.iter().position(|e| e.priority == priority) {
                let evicted = entries.remove(index);
                entries.push_back(message);
                match evicted {
                    Some(evicted) => (PushOutcome::Evicted(evicted), entries.len()),
                    None => (PushOutcome::Queued, entries.len()),
                }
            } else {
                (PushOutcome::Rejected, entries.len())
            }
        };

        metrics::gauge!(m::QUEUE_DEPTH).set(depth as f64);
        match &outcome {
            PushOutcome::Queued => {}
            PushOutcome::Evicted(_) => {
                let total = self.evicted.fetch_add(1, Ordering::Relaxed) + 1;
                metrics::counter!(m::QUEUE_EVICTED_TOTAL, m::LABEL_PRIORITY => priority.as_str())
                    .increment(1);
                // 첫 번째와 매 100번째만 기록
                if total == 1 || total % 100 == 0 {
                    warn!(
                        module = MODULE_OUTBOUND_QUEUE,
                        evicted = total,
                        capacity = self.capacity,
                        %priority,
                        "queue full, evicted oldest entry"
                    );
                }
            }
            PushOutcome::Rejected => {
                let total = self.rejected.fetch_add(1, Ordering::Relaxed) + 1;
                metrics::counter!(m::QUEUE_REJECTED_TOTAL, m::LABEL_PRIORITY => priority.as_str())
                    .increment(1);
                warn!(
                    module = MODULE_OUTBOUND_QUEUE,
                    rejected = total,
                    capacity = self.capacity,
                    %priority,
                    "queue full of other class, rejected new entry"
                );
            }
        }

        if !matches!(outcome, PushOutcome::Rejected) {
            self.notify.notify_one();
        }
        outcome
    }

    /// 메시지가 있으면 즉시 꺼냅니다.
    pub fn try_pop(&self) -> Option<OutboundMessage> {
        let mut entries = self.lock();
        let message = entries.pop_front();
        if message.is_some() {
            metrics::gauge!(m::QUEUE_DEPTH).set(entries.len() as f64);
        }
        message
    }

    /// 메시지가 들어올 때까지 기다렸다가 꺼냅니다.
    ///
    /// 취소해도 메시지를 잃지 않습니다.
    pub async fn pop(&self) -> OutboundMessage {
        loop {
            if let Some(message) = self.try_pop() {
                return message;
            }
            self.notify.notified().await;
        }
    }

    /// 큐에 있는 메시지를 모두 꺼냅니다.
    pub fn drain_all(&self) -> Vec<OutboundMessage> {
        let drained: Vec<_> = self.lock().drain(..).collect();
        metrics::gauge!(m::QUEUE_DEPTH).set(0.0);
        drained
    }

    /// 현재 저장된 메시지 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// 큐가 비어있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// 최대 용량을 반환합니다.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 지금까지 내보낸 메시지 수를 반환합니다.
    pub fn evicted_count(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }

    /// 지금까지 거부한 메시지 수를 반환합니다.
    pub fn rejected_count(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    /// 큐 사용률을 0.0~1.0 범위로 반환합니다.
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        f64::from(u32::try_from(self.len()).unwrap_or(u32::MAX))
            / f64::from(u32::try_from(self.capacity).unwrap_or(u32::MAX))
    }
}
