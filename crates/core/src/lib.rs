//! HoneyRelay 공통 크레이트
//!
//! 이벤트 모델, 에러 분류, 설정, 클럭, 생명주기 trait, 메트릭 이름을 제공합니다.
//! 다른 모든 크레이트가 이 크레이트에 의존합니다.

pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod metrics;
pub mod pipeline;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, ParseError, PipelineError, RelayError};

// 설정
pub use config::RelayConfig;

// 이벤트
pub use event::{Event, EventCategory, EventKind};

// 클럭
pub use clock::{Clock, ManualClock, SystemClock};

// 생명주기 trait
pub use pipeline::{HealthStatus, Pipeline};

// 도메인 타입
pub use types::{GeoInfo, GeoLookup};
