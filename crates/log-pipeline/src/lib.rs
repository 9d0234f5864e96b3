//! # honeyrelay-log-pipeline
//!
//! 허니팟 로그를 읽고 이벤트로 해석한 뒤 통계를 집계합니다.
//!
//! # 모듈 구성
//!
//! - [`collector`]: 폴링 기반 로그 테일러 (로테이션/절단 감지, 조각 보관)
//! - [`parser`]: Cowrie JSON/텍스트 레코드 파서와 [`EventParser`] 라우터
//! - [`stats`]: 분류별 카운터와 상위 출발지 IP 집계, 주기 보고 태스크
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! LogTailer --(String)--> EventParser --(Event)--> formatter / StatsAggregator
//!     |                        |                         |
//!  rotation/truncation    JSON / text             top-N ranked sets
//! ```

pub mod collector;
pub mod error;
pub mod parser;
pub mod stats;

// --- 주요 타입 re-export ---

// 에러
pub use error::LogPipelineError;

// 수집기
pub use collector::{FileIdentity, LogTailer, StartPosition, TailPosition, TailerConfig};

// 파서
pub use parser::{CowrieJsonParser, CowrieTextParser, EventParser, LogFormat, RecordParser};

// 통계
pub use stats::{
    RankedSet, ReportPeriod, ReportSchedule, StatsAggregator, StatsWindow, run_stats_reporter,
};
