//! 파일 기반 로그 테일러
//!
//! 로그 파일을 주기적으로 폴링하며 새로 추가된 완전한 라인을 읽습니다.
//! `tail -F`와 유사한 동작을 비동기 방식으로 구현합니다.
//!
//! # 로테이션 감지
//! - 경로의 식별자(device+inode)가 열린 핸들과 달라지면 로테이션
//! - 파일 크기가 읽은 오프셋보다 작아지면 제자리 절단(truncation)
//! - 파일이 사라지면 에러 없이 다시 나타날 때까지 폴링

use std::collections::VecDeque;
use std::io::SeekFrom;
use std::path::PathBuf;
use std::time::Duration;

use bytes::BytesMut;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use honeyrelay_core::metrics as m;

use super::{FileIdentity, TailPosition};
use crate::error::LogPipelineError;

/// 한 번의 read 호출에 사용할 버퍼 크기
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// 최초 오픈 시 읽기 시작 위치
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartPosition {
    /// 파일 처음부터 (기존 내용 재생)
    Beginning,
    /// 파일 끝부터 (새로 추가되는 내용만)
    End,
}

impl std::str::FromStr for StartPosition {
    type Err = LogPipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "beginning" => Ok(Self::Beginning),
            "end" => Ok(Self::End),
            other => Err(LogPipelineError::Config {
                field: "start_at".to_owned(),
                reason: format!("unknown start position '{other}'"),
            }),
        }
    }
}

/// 테일러 설정
#[derive(Debug, Clone)]
pub struct TailerConfig {
    /// 감시할 파일 경로
    pub path: PathBuf,
    /// 파일 상태 체크 주기
    pub poll_interval: Duration,
    /// 최초 오픈 시 시작 위치
    pub start_at: StartPosition,
    /// 최대 라인 길이 (바이트)
    pub max_line_length: usize,
    /// 한 번의 폴링에서 반환할 최대 라인 수
    pub max_lines_per_poll: usize,
}

impl Default for TailerConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/var/log/cowrie/cowrie.json"),
            poll_interval: Duration::from_millis(1000),
            start_at: StartPosition::End,
            max_line_length: 64 * 1024, // 64KB
            max_lines_per_poll: 1000,
        }
    }
}

impl TailerConfig {
    /// core 설정의 `[monitor]` 섹션에서 테일러 설정을 만듭니다.
    pub fn from_core(
        core: &honeyrelay_core::config::MonitorConfig,
    ) -> Result<Self, LogPipelineError> {
        Ok(Self {
            path: PathBuf::from(&core.log_file_path),
            poll_interval: Duration::from_millis(core.poll_interval_ms),
            start_at: core.start_at.parse()?,
            max_line_length: core.max_line_length,
            ..Self::default()
        })
    }
}

/// 폴링 기반 로그 테일러
///
/// 완전한 라인(개행으로 끝난)만 반환하며, 끝나지 않은 조각은
/// 다음 폴링까지 보관합니다. 열린 핸들을 유지하므로 로테이션된
/// 이전 파일에 남은 라인도 전환 직전에 마저 읽습니다.
pub struct LogTailer {
    config: TailerConfig,
    /// 현재 열린 파일 핸들
    file: Option<File>,
    /// 열린 파일의 식별자
    identity: Option<FileIdentity>,
    /// 핸들에서 읽은 바이트 수 (pending 포함)
    read_offset: u64,
    /// 개행을 아직 보지 못한 조각
    pending: BytesMut,
    /// 길이 초과 라인을 다음 개행까지 버리는 중
    discarding: bool,
    /// `next_line`이 아직 돌려주지 않은 라인
    ready: VecDeque<String>,
    /// 파일 부재를 이미 로그로 남겼는지
    missing_logged: bool,
}

impl LogTailer {
    /// 새 테일러를 생성합니다.
    ///
    /// `start_at = end`의 시작 위치는 생성 시점의 파일 크기로 고정됩니다.
    /// 이때 파일이 없으면 나중에 생기는 파일을 처음부터 읽습니다.
    /// 파일 핸들은 첫 폴링에서 엽니다.
    pub fn open(config: TailerConfig) -> Self {
        let skip_history = config.start_at == StartPosition::End;
        let path = config.path.clone();
        let mut tailer = Self::unopened(config);

        match std::fs::metadata(&path) {
            Ok(meta) if skip_history => {
                tailer.identity = Some(FileIdentity::from_metadata(&meta));
                tailer.read_offset = meta.len();
            }
            Ok(_) => {}
            Err(e) => debug!(
                path = %path.display(),
                error = %e,
                "log file not present at open, will read it from the start"
            ),
        }
        tailer
    }

    /// 저장된 위치에서 재시작하는 테일러를 생성합니다.
    ///
    /// 경로의 파일이 같은 식별자면 `offset`부터, 다르면 처음부터 읽습니다.
    pub fn resume_from(config: TailerConfig, position: TailPosition) -> Self {
        let mut tailer = Self::unopened(config);
        tailer.identity = Some(position.identity);
        tailer.read_offset = position.offset;
        tailer
    }

    fn unopened(config: TailerConfig) -> Self {
        Self {
            config,
            file: None,
            identity: None,
            read_offset: 0,
            pending: BytesMut::new(),
            discarding: false,
            ready: VecDeque::new(),
            missing_logged: false,
        }
    }

    /// 현재 재시작 지점
    pub fn position(&self) -> Option<TailPosition> {
        self.identity.map(|identity| TailPosition {
            identity,
            offset: self.committed_offset(),
        })
    }

    /// 감시 중인 경로
    pub fn path(&self) -> &std::path::Path {
        &self.config.path
    }

    /// 한 번의 폴링 사이클을 수행하고 새로 완성된 라인을 반환합니다.
    ///
    /// 파일이 없으면 빈 목록을 반환합니다 (에러 아님).
    pub async fn poll(&mut self) -> Result<Vec<String>, LogPipelineError> {
        let path_meta = match tokio::fs::metadata(&self.config.path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if !self.missing_logged {
                    debug!(
                        path = %self.config.path.display(),
                        "log file absent, waiting for it to appear"
                    );
                    self.missing_logged = true;
                }
                // 삭제된 파일의 열린 핸들에 남은 라인은 마저 읽는다
                let mut lines = Vec::new();
                self.read_available(&mut lines, usize::MAX).await?;
                return Ok(lines);
            }
            Err(e) => {
                return Err(LogPipelineError::Collector {
                    source_type: "file".to_owned(),
                    reason: format!("stat {}: {}", self.config.path.display(), e),
                });
            }
        };
        if self.missing_logged {
            debug!(path = %self.config.path.display(), "log file appeared");
            self.missing_logged = false;
        }

        let path_identity = FileIdentity::from_metadata(&path_meta);
        let mut lines = Vec::new();

        match self.identity {
            // 생성 시 없던 파일: 처음부터 읽는다
            None => self.reopen(0).await?,
            Some(known) if known != path_identity => {
                // 이전 핸들에 남은 완전한 라인을 먼저 읽는다
                self.read_available(&mut lines, usize::MAX).await?;
                if !self.pending.is_empty() {
                    debug!(
                        bytes = self.pending.len(),
                        "discarding unterminated fragment of rotated file"
                    );
                }
                info!(
                    path = %self.config.path.display(),
                    old = %known,
                    new = %path_identity,
                    "log rotation detected, reopening from start"
                );
                metrics::counter!(m::TAILER_ROTATIONS_TOTAL).increment(1);
                self.reopen(0).await?;
            }
            Some(_) if path_meta.len() < self.read_offset => {
                info!(
                    path = %self.config.path.display(),
                    size = path_meta.len(),
                    offset = self.read_offset,
                    "log truncated in place, reopening from start"
                );
                metrics::counter!(m::TAILER_TRUNCATIONS_TOTAL).increment(1);
                self.reopen(0).await?;
            }
            Some(_) if self.file.is_none() => {
                // resume_from 직후: 같은 파일을 저장된 오프셋에서 연다
                let offset = self.read_offset;
                self.reopen(offset).await?;
            }
            Some(_) => {}
        }

        let budget = self
            .config
            .max_lines_per_poll
            .saturating_sub(lines.len())
            .max(1);
        self.read_available(&mut lines, budget).await?;

        if !lines.is_empty() {
            metrics::counter!(m::TAILER_LINES_READ_TOTAL).increment(lines.len() as u64);
        }
        Ok(lines)
    }

    /// 다음 라인을 반환합니다. 새 데이터가 없으면 폴링 간격만큼 대기합니다.
    ///
    /// 무한 시퀀스이므로 반환값은 항상 존재합니다.
    /// 일시적인 I/O 오류는 낮은 레벨로 기록하고 재시도합니다.
    pub async fn next_line(&mut self) -> String {
        loop {
            if let Some(line) = self.ready.pop_front() {
                return line;
            }
            match self.poll().await {
                Ok(lines) => self.ready.extend(lines),
                Err(e) => debug!(error = %e, "tail poll failed, will retry"),
            }
            if self.ready.is_empty() {
                tokio::time::sleep(self.config.poll_interval).await;
            }
        }
    }

    /// 취소될 때까지 라인을 채널로 보냅니다.
    ///
    /// 수신 측이 닫히면 종료합니다. `tokio::spawn`으로 별도 태스크에서 호출하세요.
    pub async fn run(mut self, tx: mpsc::Sender<String>, cancel: CancellationToken) {
        info!(path = %self.config.path.display(), "log tailer started");
        loop {
            let polled = tokio::select! {
                _ = cancel.cancelled() => break,
                polled = self.poll() => polled,
            };

            let lines = match polled {
                Ok(lines) => lines,
                Err(e) => {
                    debug!(error = %e, "tail poll failed, will retry");
                    Vec::new()
                }
            };
            let idle = lines.is_empty();

            for line in lines {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("log tailer stopped");
                        return;
                    }
                    sent = tx.send(line) => {
                        if sent.is_err() {
                            debug!("line receiver dropped, stopping tailer");
                            return;
                        }
                    }
                }
            }

            if idle {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.config.poll_interval) => {}
                }
            }
        }
        info!("log tailer stopped");
    }

    /// 개행 이전 조각을 제외한 확정 오프셋
    fn committed_offset(&self) -> u64 {
        if self.discarding {
            return self.read_offset;
        }
        self.read_offset.saturating_sub(self.pending.len() as u64)
    }

    /// 경로를 새로 열고 `offset`으로 이동합니다.
    async fn reopen(&mut self, offset: u64) -> Result<(), LogPipelineError> {
        self.file = None;
        self.pending.clear();
        self.discarding = false;

        let mut file = match File::open(&self.config.path).await {
            Ok(file) => file,
            // stat과 open 사이에 사라진 경우: 다음 폴링에서 다시 시도
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        let meta = file.metadata().await?;
        let offset = offset.min(meta.len());
        if offset > 0 {
            file.seek(SeekFrom::Start(offset)).await?;
        }

        self.identity = Some(FileIdentity::from_metadata(&meta));
        self.read_offset = offset;
        self.file = Some(file);
        debug!(
            path = %self.config.path.display(),
            offset,
            "log file opened"
        );
        Ok(())
    }

    /// 열린 핸들에서 EOF 또는 `budget`개 라인까지 읽습니다.
    async fn read_available(
        &mut self,
        lines: &mut Vec<String>,
        budget: usize,
    ) -> Result<(), LogPipelineError> {
        let Some(file) = self.file.as_mut() else {
            return Ok(());
        };

        let start = lines.len();
        let mut chunk = vec![0u8; READ_CHUNK_SIZE];
        loop {
            let n = file.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            self.read_offset += n as u64;
            self.pending.extend_from_slice(&chunk[..n]);
            split_lines(
                &mut self.pending,
                &mut self.discarding,
                self.config.max_line_length,
                lines,
            );
            if lines.len() - start >= budget {
                break;
            }
        }
        Ok(())
    }
}

/// `pending`에서 완전한 라인을 떼어 `out`에 추가합니다.
fn split_lines(
    pending: &mut BytesMut,
    discarding: &mut bool,
    max_line_length: usize,
    out: &mut Vec<String>,
) {
    while let Some(idx) = pending.iter().position(|b| *b == b'\n') {
        let line = pending.split_to(idx + 1);
        if *discarding {
            *discarding = false;
            continue;
        }
        let mut body = &line[..idx];
        if let [rest @ .., b'\r'] = body {
            body = rest;
        }
        if body.len() > max_line_length {
            warn!(
                length = body.len(),
                max = max_line_length,
                "discarding oversized log line"
            );
            metrics::counter!(m::TAILER_OVERSIZED_LINES_TOTAL).increment(1);
            continue;
        }
        out.push(String::from_utf8_lossy(body).into_owned());
    }

    if !*discarding && pending.len() > max_line_length {
        warn!(
            length = pending.len(),
            max = max_line_length,
            "discarding oversized partial log line"
        );
        metrics::counter!(m::TAILER_OVERSIZED_LINES_TOTAL).increment(1);
        pending.clear();
        *discarding = true;
    } else if *discarding {
        pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::Path;

    fn config_for(path: &Path, start_at: StartPosition) -> TailerConfig {
        TailerConfig {
            path: path.to_path_buf(),
            poll_interval: Duration::from_millis(10),
            start_at,
            max_line_length: 1024,
            max_lines_per_poll: 1000,
        }
    }

    fn append(path: &Path, content: &str) {
        let mut f = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
    }

    #[test]
    fn default_config() {
        let config = TailerConfig::default();
        assert_eq!(config.poll_interval, Duration::from_millis(1000));
        assert_eq!(config.max_lines_per_poll, 1000);
        assert_eq!(config.start_at, StartPosition::End);
    }

    #[test]
    fn start_position_from_str() {
        assert_eq!(
            "beginning".parse::<StartPosition>().unwrap(),
            StartPosition::Beginning
        );
        assert_eq!("end".parse::<StartPosition>().unwrap(), StartPosition::End);
        assert!("middle".parse::<StartPosition>().is_err());
    }

    #[tokio::test]
    async fn reads_complete_lines_and_holds_fragment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cowrie.json");
        append(&path, "first\nsec");

        let mut tailer = LogTailer::open(config_for(&path, StartPosition::Beginning));
        assert_eq!(tailer.poll().await.unwrap(), vec!["first"]);

        append(&path, "ond\n");
        assert_eq!(tailer.poll().await.unwrap(), vec!["second"]);
        assert!(tailer.poll().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn start_at_end_skips_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cowrie.json");
        append(&path, "old-1\nold-2\n");

        let mut tailer = LogTailer::open(config_for(&path, StartPosition::End));
        assert!(tailer.poll().await.unwrap().is_empty());

        append(&path, "new-1\n");
        assert_eq!(tailer.poll().await.unwrap(), vec!["new-1"]);
    }

    #[tokio::test]
    async fn strips_carriage_return() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cowrie.json");
        append(&path, "windows\r\nunix\n");

        let mut tailer = LogTailer::open(config_for(&path, StartPosition::Beginning));
        assert_eq!(tailer.poll().await.unwrap(), vec!["windows", "unix"]);
    }

    #[tokio::test]
    async fn rotation_yields_old_then_new_lines_without_loss() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cowrie.json");
        let rotated = dir.path().join("cowrie.json.1");

        let mut tailer = LogTailer::open(config_for(&path, StartPosition::Beginning));
        let mut produced = Vec::new();

        let old: Vec<String> = (0..5).map(|i| format!("old-{i}")).collect();
        for line in &old {
            append(&path, &format!("{line}\n"));
        }
        produced.extend(tailer.poll().await.unwrap());

        std::fs::rename(&path, &rotated).unwrap();
        let new: Vec<String> = (0..3).map(|i| format!("new-{i}")).collect();
        for line in &new {
            append(&path, &format!("{line}\n"));
        }
        produced.extend(tailer.poll().await.unwrap());

        let expected: Vec<String> = old.iter().chain(new.iter()).cloned().collect();
        assert_eq!(produced, expected);

        let pos = tailer.position().unwrap();
        assert_eq!(
            pos.identity,
            FileIdentity::from_metadata(&std::fs::metadata(&path).unwrap())
        );
    }

    #[tokio::test]
    async fn rotation_drains_lines_written_to_old_file_before_switch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cowrie.json");
        let rotated = dir.path().join("cowrie.json.1");
        append(&path, "a\n");

        let mut tailer = LogTailer::open(config_for(&path, StartPosition::Beginning));
        assert_eq!(tailer.poll().await.unwrap(), vec!["a"]);

        // 폴링 사이에 이전 파일에 추가되고 곧바로 로테이션된 경우
        append(&path, "b\npartial");
        std::fs::rename(&path, &rotated).unwrap();
        append(&path, "c\n");

        assert_eq!(tailer.poll().await.unwrap(), vec!["b", "c"]);
    }

    #[tokio::test]
    async fn truncation_in_place_reopens_at_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cowrie.json");
        append(&path, "line-1\nline-2\nline-3\n");

        let mut tailer = LogTailer::open(config_for(&path, StartPosition::Beginning));
        assert_eq!(tailer.poll().await.unwrap().len(), 3);

        let f = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
        f.set_len(0).unwrap();
        drop(f);
        append(&path, "after\n");

        assert_eq!(tailer.poll().await.unwrap(), vec!["after"]);
        assert_eq!(tailer.position().unwrap().offset, 6);
    }

    #[tokio::test]
    async fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not-yet.json");

        let mut tailer = LogTailer::open(config_for(&path, StartPosition::End));
        assert!(tailer.poll().await.unwrap().is_empty());
        assert!(tailer.position().is_none());

        // 나중에 생긴 파일은 처음부터 읽는다
        append(&path, "hello\n");
        assert_eq!(tailer.poll().await.unwrap(), vec!["hello"]);
    }

    #[tokio::test]
    async fn file_created_between_open_and_first_poll_is_read_from_start() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cowrie.json");

        let mut tailer = LogTailer::open(config_for(&path, StartPosition::End));
        append(&path, "created-after-start\n");

        assert_eq!(tailer.poll().await.unwrap(), vec!["created-after-start"]);
    }

    #[tokio::test]
    async fn start_at_end_is_fixed_when_opened() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cowrie.json");
        append(&path, "history\n");

        let mut tailer = LogTailer::open(config_for(&path, StartPosition::End));
        assert_eq!(tailer.position().unwrap().offset, 8);

        // 첫 폴링 전에 추가된 라인도 새 라인이다
        append(&path, "fresh\n");
        assert_eq!(tailer.poll().await.unwrap(), vec!["fresh"]);
    }

    #[tokio::test]
    async fn file_rotated_between_open_and_first_poll_is_read_from_start() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cowrie.json");
        append(&path, "history\n");

        let mut tailer = LogTailer::open(config_for(&path, StartPosition::End));
        std::fs::rename(&path, dir.path().join("cowrie.json.1")).unwrap();
        append(&path, "rotated-in\n");

        assert_eq!(tailer.poll().await.unwrap(), vec!["rotated-in"]);
    }

    #[tokio::test]
    async fn delete_and_recreate_recovers_without_loss() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cowrie.json");
        append(&path, "before\n");

        let mut tailer = LogTailer::open(config_for(&path, StartPosition::Beginning));
        assert_eq!(tailer.poll().await.unwrap(), vec!["before"]);

        std::fs::remove_file(&path).unwrap();
        assert!(tailer.poll().await.unwrap().is_empty());

        append(&path, "after-1\nafter-2\n");
        assert_eq!(tailer.poll().await.unwrap(), vec!["after-1", "after-2"]);
    }

    #[tokio::test]
    async fn delete_and_recreate_within_one_poll_interval() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cowrie.json");
        append(&path, "before-1\nbefore-2\nbefore-3\n");

        let mut tailer = LogTailer::open(config_for(&path, StartPosition::Beginning));
        assert_eq!(tailer.poll().await.unwrap().len(), 3);

        std::fs::remove_file(&path).unwrap();
        append(&path, "x\n");

        assert_eq!(tailer.poll().await.unwrap(), vec!["x"]);
    }

    #[tokio::test]
    async fn resume_from_position_skips_consumed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cowrie.json");
        append(&path, "one\ntwo\nthr");

        let mut first = LogTailer::open(config_for(&path, StartPosition::Beginning));
        assert_eq!(first.poll().await.unwrap(), vec!["one", "two"]);
        let pos = first.position().unwrap();
        assert_eq!(pos.offset, 8);
        drop(first);

        append(&path, "ee\nfour\n");
        let mut resumed =
            LogTailer::resume_from(config_for(&path, StartPosition::Beginning), pos);
        assert_eq!(resumed.poll().await.unwrap(), vec!["three", "four"]);
    }

    #[tokio::test]
    async fn resume_from_stale_identity_reads_from_start() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cowrie.json");
        append(&path, "fresh\n");

        let stale = TailPosition {
            identity: FileIdentity {
                device: u64::MAX,
                inode: u64::MAX,
            },
            offset: 1_000_000,
        };
        let mut tailer = LogTailer::resume_from(config_for(&path, StartPosition::End), stale);
        assert_eq!(tailer.poll().await.unwrap(), vec!["fresh"]);
    }

    #[tokio::test]
    async fn position_offset_is_monotonic_while_identity_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cowrie.json");
        let mut tailer = LogTailer::open(config_for(&path, StartPosition::Beginning));

        let mut last = 0;
        for i in 0..5 {
            append(&path, &format!("line-{i}\n"));
            tailer.poll().await.unwrap();
            let offset = tailer.position().unwrap().offset;
            assert!(offset >= last);
            last = offset;
        }
    }

    #[tokio::test]
    async fn oversized_lines_are_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cowrie.json");
        let mut config = config_for(&path, StartPosition::Beginning);
        config.max_line_length = 16;
        let mut tailer = LogTailer::open(config);

        append(&path, &format!("{}\nok\n", "x".repeat(40)));
        assert_eq!(tailer.poll().await.unwrap(), vec!["ok"]);

        // 개행 없이 한도를 넘는 조각은 다음 개행까지 버린다
        append(&path, &"y".repeat(40));
        assert!(tailer.poll().await.unwrap().is_empty());
        append(&path, "yyy\nfine\n");
        assert_eq!(tailer.poll().await.unwrap(), vec!["fine"]);
    }

    #[tokio::test]
    async fn next_line_waits_for_new_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cowrie.json");
        append(&path, "");
        let mut tailer = LogTailer::open(config_for(&path, StartPosition::Beginning));

        let writer_path = path.clone();
        let writer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            append(&writer_path, "late\n");
        });

        let line = tokio::time::timeout(Duration::from_secs(5), tailer.next_line())
            .await
            .expect("line should arrive");
        assert_eq!(line, "late");
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn run_forwards_lines_and_stops_on_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cowrie.json");
        append(&path, "l1\nl2\n");

        let tailer = LogTailer::open(config_for(&path, StartPosition::Beginning));
        let (tx, mut rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(tailer.run(tx, cancel.clone()));

        assert_eq!(rx.recv().await.unwrap(), "l1");
        assert_eq!(rx.recv().await.unwrap(), "l2");

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("tailer should stop within a poll tick")
            .unwrap();
    }
}
