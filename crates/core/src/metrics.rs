//! 메트릭 이름 상수 — Prometheus 노출용
//!
//! 모든 메트릭은 `honeyrelay_` 접두사를 사용합니다.
//! 각 크레이트는 `metrics::counter!()` 등에 이 상수를 넘겨 기록합니다.
//! 레코더가 설치되지 않았으면 기록은 무시됩니다.

// ─── 라벨 키 ────────────────────────────────────────────────────────

/// 이벤트 카테고리 라벨 (login_success, command, ...)
pub const LABEL_CATEGORY: &str = "category";
/// 메시지 우선순위 라벨 (alert, report)
pub const LABEL_PRIORITY: &str = "priority";
/// 파서 형식 라벨 (json, text)
pub const LABEL_FORMAT: &str = "format";

// ─── 로그 테일러 ────────────────────────────────────────────────────

/// 읽은 완전한 라인 수 (counter)
pub const TAILER_LINES_READ_TOTAL: &str = "honeyrelay_tailer_lines_read_total";
/// 감지한 로테이션 수 (counter)
pub const TAILER_ROTATIONS_TOTAL: &str = "honeyrelay_tailer_rotations_total";
/// 감지한 제자리 절단 수 (counter)
pub const TAILER_TRUNCATIONS_TOTAL: &str = "honeyrelay_tailer_truncations_total";
/// 길이 초과로 버린 라인 수 (counter)
pub const TAILER_OVERSIZED_LINES_TOTAL: &str = "honeyrelay_tailer_oversized_lines_total";

// ─── 파서 ───────────────────────────────────────────────────────────

/// 파싱된 이벤트 수 (counter, labels: category)
pub const PARSER_EVENTS_TOTAL: &str = "honeyrelay_parser_events_total";
/// 형식 오류로 버린 라인 수 (counter, labels: format)
pub const PARSER_LINES_DROPPED_TOTAL: &str = "honeyrelay_parser_lines_dropped_total";

// ─── 아웃바운드 큐 ──────────────────────────────────────────────────

/// 현재 큐 깊이 (gauge)
pub const QUEUE_DEPTH: &str = "honeyrelay_queue_depth";
/// 오버플로로 밀려난 메시지 수 (counter, labels: priority)
pub const QUEUE_EVICTED_TOTAL: &str = "honeyrelay_queue_evicted_total";
/// 같은 우선순위 항목이 없어 거부된 메시지 수 (counter, labels: priority)
pub const QUEUE_REJECTED_TOTAL: &str = "honeyrelay_queue_rejected_total";
/// 채널 미접속 중 큐에 적재된 메시지 수 (counter)
pub const QUEUE_BUFFERED_OFFLINE_TOTAL: &str = "honeyrelay_queue_buffered_offline_total";

// ─── 아웃바운드 채널 ────────────────────────────────────────────────

/// 전송한 메시지 수 (counter)
pub const CHANNEL_MESSAGES_SENT_TOTAL: &str = "honeyrelay_channel_messages_sent_total";
/// 연결 실패 후 백오프 진입 수 (counter)
pub const CHANNEL_BACKOFFS_TOTAL: &str = "honeyrelay_channel_backoffs_total";
/// 채널 참여 성공 수 (counter)
pub const CHANNEL_JOINS_TOTAL: &str = "honeyrelay_channel_joins_total";
/// 흐름 제어로 지연된 전송 수 (counter)
pub const CHANNEL_FLOOD_DELAYS_TOTAL: &str = "honeyrelay_channel_flood_delays_total";

// ─── 통계 ───────────────────────────────────────────────────────────

/// 보낸 통계 보고서 수 (counter)
pub const STATS_REPORTS_TOTAL: &str = "honeyrelay_stats_reports_total";

// ─── 데몬 ───────────────────────────────────────────────────────────

/// 빌드 정보 (gauge, 항상 1, labels: version)
pub const DAEMON_BUILD_INFO: &str = "honeyrelay_daemon_build_info";

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge};

    describe_counter!(
        TAILER_LINES_READ_TOTAL,
        "Total number of complete lines read from the tailed log"
    );
    describe_counter!(
        TAILER_ROTATIONS_TOTAL,
        "Total number of log rotations detected"
    );
    describe_counter!(
        TAILER_TRUNCATIONS_TOTAL,
        "Total number of in-place truncations detected"
    );
    describe_counter!(
        TAILER_OVERSIZED_LINES_TOTAL,
        "Total number of lines discarded for exceeding the length limit"
    );

    describe_counter!(PARSER_EVENTS_TOTAL, "Total number of events parsed");
    describe_counter!(
        PARSER_LINES_DROPPED_TOTAL,
        "Total number of malformed lines dropped by the parser"
    );

    describe_gauge!(QUEUE_DEPTH, "Current number of queued outbound messages");
    describe_counter!(
        QUEUE_EVICTED_TOTAL,
        "Total number of outbound messages evicted on overflow"
    );
    describe_counter!(
        QUEUE_REJECTED_TOTAL,
        "Total number of outbound messages rejected on overflow"
    );
    describe_counter!(
        QUEUE_BUFFERED_OFFLINE_TOTAL,
        "Total number of messages queued while the channel was not joined"
    );

    describe_counter!(
        CHANNEL_MESSAGES_SENT_TOTAL,
        "Total number of messages written to the chat channel"
    );
    describe_counter!(
        CHANNEL_BACKOFFS_TOTAL,
        "Total number of times the channel entered backoff"
    );
    describe_counter!(CHANNEL_JOINS_TOTAL, "Total number of successful joins");
    describe_counter!(
        CHANNEL_FLOOD_DELAYS_TOTAL,
        "Total number of sends delayed by flood control"
    );

    describe_counter!(STATS_REPORTS_TOTAL, "Total number of stats reports queued");

    describe_gauge!(
        DAEMON_BUILD_INFO,
        "Build information (always 1, with version label)"
    );
}
