//! 이벤트 통계 집계
//!
//! [`StatsAggregator`]는 이벤트 분류별 카운터와 상위 출발지 IP 등을
//! 메모리에 유지하며, 주기적으로 [`StatsWindow`] 스냅샷을 내보내고 초기화합니다.
//!
//! 집계기는 I/O를 하지 않습니다. 타이머와 이벤트 수신은
//! [`run_stats_reporter`] 태스크가 담당하며, 이 태스크가 집계기를 단독 소유합니다.
//! 하루치 보고용 집계기도 같은 태스크가 별도로 유지합니다.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use honeyrelay_core::clock::Clock;
use honeyrelay_core::event::{Event, EventCategory, EventKind, MODULE_STATS};
use honeyrelay_core::metrics as m;

/// 후보 테이블 크기 = 보고 개수 x 이 배수
const CANDIDATE_FACTOR: usize = 8;

/// 후보 테이블 최소 크기
const MIN_CANDIDATES: usize = 32;

#[derive(Debug, Clone)]
struct RankedEntry {
    count: u64,
    first_seen: u64,
}

/// 상위 N개 키를 추적하는 고정 크기 순위 집합
///
/// 후보 테이블이 가득 차면 가장 낮은 카운트의 키를 내보내고
/// 그 카운트를 새 키가 이어받습니다 (space-saving).
/// 동률은 먼저 관측된 키가 앞섭니다.
#[derive(Debug, Clone)]
pub struct RankedSet {
    capacity: usize,
    entries: HashMap<String, RankedEntry>,
    next_seq: u64,
}

impl RankedSet {
    /// `top_n`개를 보고하는 순위 집합을 생성합니다.
    pub fn new(top_n: usize) -> Self {
        Self {
            capacity: (top_n * CANDIDATE_FACTOR).max(MIN_CANDIDATES),
            entries: HashMap::new(),
            next_seq: 0,
        }
    }

    /// 키 관측을 1회 기록합니다.
    pub fn record(&mut self, key: &str) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.count += 1;
            return;
        }

        let mut count = 1;
        if self.entries.len() >= self.capacity {
            let victim = self
                .entries
                .iter()
                .min_by_key(|(_, e)| (e.count, std::cmp::Reverse(e.first_seen)))
                .map(|(k, e)| (k.clone(), e.count));
            if let Some((victim, victim_count)) = victim {
                self.entries.remove(&victim);
                count = victim_count + 1;
            }
        }

        let first_seen = self.next_seq;
        self.next_seq += 1;
        self.entries
            .insert(key.to_owned(), RankedEntry { count, first_seen });
    }

    /// 카운트 내림차순, 동률은 최초 관측 순으로 상위 `n`개를 반환합니다.
    pub fn top(&self, n: usize) -> Vec<(String, u64)> {
        let mut ranked: Vec<_> = self.entries.iter().collect();
        ranked.sort_by(|(_, a), (_, b)| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.first_seen.cmp(&b.first_seen))
        });
        ranked
            .into_iter()
            .take(n)
            .map(|(k, e)| (k.clone(), e.count))
            .collect()
    }

    /// 추적 중인 키 수
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 비어 있는지 여부
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 모든 키를 지웁니다.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.next_seq = 0;
    }
}

/// 한 보고 주기의 통계 스냅샷
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsWindow {
    /// 주기 시작 시각
    pub window_start: DateTime<Utc>,
    /// 스냅샷 시각
    pub window_end: DateTime<Utc>,
    /// 분류별 이벤트 수 (0인 분류는 없음)
    pub counts: BTreeMap<EventCategory, u64>,
    /// 고유 출발지 IP 수
    pub unique_src_ips: usize,
    /// 상위 출발지 IP
    pub top_src_ips: Vec<(String, u64)>,
    /// 상위 로그인 사용자명
    pub top_usernames: Vec<(String, u64)>,
    /// 상위 로그인 비밀번호
    pub top_passwords: Vec<(String, u64)>,
    /// 상위 실행 명령
    pub top_commands: Vec<(String, u64)>,
}

impl StatsWindow {
    /// 분류의 이벤트 수
    pub fn count(&self, category: EventCategory) -> u64 {
        self.counts.get(&category).copied().unwrap_or(0)
    }

    /// 전체 이벤트 수
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// 이벤트가 하나도 없는지 여부
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// 통계 집계기
pub struct StatsAggregator {
    top_n: usize,
    clock: Arc<dyn Clock>,
    window_start: DateTime<Utc>,
    counts: BTreeMap<EventCategory, u64>,
    unique_src_ips: HashSet<String>,
    src_ips: RankedSet,
    usernames: RankedSet,
    passwords: RankedSet,
    commands: RankedSet,
}

impl StatsAggregator {
    /// 새 집계기를 생성합니다. 첫 주기는 지금 시작합니다.
    pub fn new(top_n: usize, clock: Arc<dyn Clock>) -> Self {
        let window_start = clock.now();
        Self {
            top_n,
            clock,
            window_start,
            counts: BTreeMap::new(),
            unique_src_ips: HashSet::new(),
            src_ips: RankedSet::new(top_n),
            usernames: RankedSet::new(top_n),
            passwords: RankedSet::new(top_n),
            commands: RankedSet::new(top_n),
        }
    }

    /// 이벤트 하나를 집계합니다.
    pub fn process(&mut self, event: &Event) {
        *self.counts.entry(event.category()).or_insert(0) += 1;

        if let Some(ip) = event.src_ip().filter(|ip| !ip.is_empty()) {
            if !self.unique_src_ips.contains(ip) {
                self.unique_src_ips.insert(ip.to_owned());
            }
            self.src_ips.record(ip);
        }

        match &event.kind {
            EventKind::Login {
                username, password, ..
            } => {
                if !username.is_empty() {
                    self.usernames.record(username);
                }
                if !password.is_empty() {
                    self.passwords.record(password);
                }
            }
            EventKind::Command { command, .. } if !command.is_empty() => {
                self.commands.record(command);
            }
            _ => {}
        }
    }

    /// 현재 주기의 스냅샷을 반환합니다. 상태는 그대로 유지됩니다.
    pub fn snapshot(&self) -> StatsWindow {
        StatsWindow {
            window_start: self.window_start,
            window_end: self.clock.now(),
            counts: self.counts.clone(),
            unique_src_ips: self.unique_src_ips.len(),
            top_src_ips: self.src_ips.top(self.top_n),
            top_usernames: self.usernames.top(self.top_n),
            top_passwords: self.passwords.top(self.top_n),
            top_commands: self.commands.top(self.top_n),
        }
    }

    /// 스냅샷을 반환하고 카운터를 0으로 초기화합니다.
    ///
    /// 새 주기의 시작 시각은 스냅샷 시각입니다.
    pub fn take_report(&mut self) -> StatsWindow {
        let window = self.snapshot();
        self.counts.clear();
        self.unique_src_ips.clear();
        self.src_ips.clear();
        self.usernames.clear();
        self.passwords.clear();
        self.commands.clear();
        self.window_start = window.window_end;
        window
    }

    /// 현재 주기에 집계된 이벤트가 없는지 여부
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// 현재 주기 시작 시각
    pub fn window_start(&self) -> DateTime<Utc> {
        self.window_start
    }
}

/// 날짜 변경을 확인하는 주기
const DAY_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// 보고서 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportPeriod {
    /// `interval`마다 내보내는 주기 보고
    Interval,
    /// 날짜(UTC)가 바뀔 때 내보내는 하루치 보고
    Daily,
}

/// 보고 일정
#[derive(Debug, Clone, Copy)]
pub struct ReportSchedule {
    /// 주기 보고 간격
    pub interval: Duration,
    /// 빈 윈도우 보고 생략 여부
    pub skip_empty: bool,
    /// 하루치 보고 여부
    pub daily: bool,
}

/// 통계 보고 태스크
///
/// 이벤트 채널에서 받은 이벤트를 집계하고 `schedule.interval`마다 보고서를
/// `sink`에 넘깁니다. `schedule.daily`가 켜져 있으면 주입된 클럭의 날짜가
/// 바뀔 때 전날 하루치 보고서도 넘깁니다. `skip_empty`가 켜져 있으면 빈
/// 윈도우는 초기화만 하고 보고하지 않습니다.
/// 취소 신호 또는 이벤트 채널 종료 시 반환합니다.
pub async fn run_stats_reporter<F>(
    mut aggregator: StatsAggregator,
    mut events: mpsc::Receiver<Event>,
    schedule: ReportSchedule,
    cancel: CancellationToken,
    mut sink: F,
) where
    F: FnMut(ReportPeriod, StatsWindow) + Send,
{
    let mut daily = schedule
        .daily
        .then(|| StatsAggregator::new(aggregator.top_n, Arc::clone(&aggregator.clock)));

    let now = tokio::time::Instant::now();
    let mut ticker = tokio::time::interval_at(now + schedule.interval, schedule.interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut day_check = tokio::time::interval_at(now + DAY_CHECK_INTERVAL, DAY_CHECK_INTERVAL);
    day_check.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    info!(
        module = MODULE_STATS,
        interval_secs = schedule.interval.as_secs(),
        daily = schedule.daily,
        "stats reporter started"
    );

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let window = aggregator.take_report();
                emit(ReportPeriod::Interval, window, schedule.skip_empty, &mut sink);
            }
            _ = day_check.tick(), if daily.is_some() => {
                if let Some(daily) = daily.as_mut() {
                    roll_day(daily, schedule.skip_empty, &mut sink);
                }
            }
            received = events.recv() => match received {
                Some(event) => {
                    if let Some(daily) = daily.as_mut() {
                        // 자정 직후 이벤트는 새 날짜로 집계한다
                        roll_day(daily, schedule.skip_empty, &mut sink);
                        daily.process(&event);
                    }
                    aggregator.process(&event);
                }
                None => break,
            },
        }
    }

    info!(module = MODULE_STATS, "stats reporter stopped");
}

/// 날짜가 바뀌었으면 하루치 윈도우를 내보내고 초기화합니다.
fn roll_day<F>(daily: &mut StatsAggregator, skip_empty: bool, sink: &mut F)
where
    F: FnMut(ReportPeriod, StatsWindow),
{
    if daily.clock.now().date_naive() == daily.window_start.date_naive() {
        return;
    }
    let window = daily.take_report();
    emit(ReportPeriod::Daily, window, skip_empty, sink);
}

fn emit<F>(period: ReportPeriod, window: StatsWindow, skip_empty: bool, sink: &mut F)
where
    F: FnMut(ReportPeriod, StatsWindow),
{
    if skip_empty && window.is_empty() {
        debug!(module = MODULE_STATS, ?period, "empty stats window, report skipped");
        return;
    }
    debug!(
        module = MODULE_STATS,
        ?period,
        total = window.total(),
        unique_src_ips = window.unique_src_ips,
        "stats window emitted"
    );
    metrics::counter!(m::STATS_REPORTS_TOTAL).increment(1);
    sink(period, window);
}
