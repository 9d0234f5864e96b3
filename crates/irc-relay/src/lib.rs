//! # honeyrelay-irc-relay
//!
//! 허니팟 알림을 IRC 채널로 중계합니다.
//!
//! # 모듈 구성
//!
//! - [`client`]: 재연결 상태 기계 ([`IrcChannel`], [`ConnectionState`])
//! - [`queue`]: 우선순위 등급별 축출 정책을 가진 유한 송신 큐
//! - [`format`]: 이벤트/통계 스냅샷을 채널 메시지로 포매팅
//! - [`codec`]: IRC 라인 코덱과 메시지 파서
//! - [`transport`]: 연결 생성 경계 (TCP, TLS)
//! - [`backoff`], [`flood`]: 재연결 지연과 송신 속도 제한
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! formatter --alert--> OutboundQueue <--report-- stats reporter
//!                           |
//!                      IrcChannel (flood limiter)
//!                           |
//!                   Connector (TCP / TLS)
//! ```

pub mod backoff;
pub mod client;
pub mod codec;
pub mod error;
pub mod flood;
pub mod format;
pub mod queue;
pub mod transport;

// --- 주요 타입 re-export ---

// 에러
pub use error::IrcError;

// 클라이언트
pub use client::{ChannelConfig, ConnectionState, IrcChannel};

// 큐
pub use queue::{OutboundMessage, OutboundQueue, Priority, PushOutcome};

// 포매터
pub use format::{MessageFormatter, period_label};

// 전송
pub use transport::{BoxedStream, Connector, TcpConnector};

// 코덱
pub use codec::{IrcCodec, IrcMessage};
