//! 로그 수집 모듈 -- 허니팟 로그 파일을 tail 방식으로 읽습니다.
//!
//! - [`LogTailer`]: 폴링 기반 파일 추적 (로테이션/절단 감지)
//! - [`TailPosition`]: 재시작 지점 (파일 식별자 + 바이트 오프셋)
//!
//! 테일러는 자체 tokio 태스크에서 실행되며, 완전한 라인만
//! `tokio::mpsc::Sender<String>` 채널로 전달합니다.

pub mod file;

pub use file::{LogTailer, StartPosition, TailerConfig};

use std::fmt;
use std::fs::Metadata;

use serde::{Deserialize, Serialize};

/// 파일 식별자 -- 같은 경로라도 로테이션되면 달라집니다.
///
/// Unix에서는 (device, inode) 쌍을 사용합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileIdentity {
    /// 장치 번호
    pub device: u64,
    /// inode 번호
    pub inode: u64,
}

impl FileIdentity {
    /// 메타데이터에서 식별자를 추출합니다.
    #[cfg(unix)]
    pub fn from_metadata(metadata: &Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;
        Self {
            device: metadata.dev(),
            inode: metadata.ino(),
        }
    }

    /// 메타데이터에서 식별자를 추출합니다.
    ///
    /// inode가 없는 플랫폼에서는 생성 시각을 대신 사용합니다.
    #[cfg(not(unix))]
    pub fn from_metadata(metadata: &Metadata) -> Self {
        let created = metadata
            .created()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
            .unwrap_or(0);
        Self {
            device: 0,
            inode: created,
        }
    }
}

impl fmt::Display for FileIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.device, self.inode)
    }
}

/// 테일러 재시작 지점
///
/// `identity`가 같은 동안 `offset`은 감소하지 않으며,
/// 로테이션이 감지되면 `(새 식별자, 0)`으로 재설정됩니다.
/// `offset`은 아직 개행을 보지 못한 조각의 시작 위치를 가리킵니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TailPosition {
    /// 파일 식별자
    pub identity: FileIdentity,
    /// 바이트 오프셋
    pub offset: u64,
}
