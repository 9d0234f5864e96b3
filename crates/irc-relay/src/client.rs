//! IRC 채널 클라이언트 -- 재연결 상태 기계
//!
//! [`IrcChannel`]은 하나의 논리적 채널 연결을 유지하며 송신 큐의 메시지를 보냅니다.
//!
//! # 상태 전이
//! ```text
//! Disconnected -> Connecting -> Registering -> Joined
//!                     ^              |            |
//!                     |        (any failure) (any failure)
//!                     |              v            v
//!                     +-------- Backoff(attempt, until)
//! ```
//!
//! 지연은 `min(cap, base * 2^attempt)`이며 `attempt`는 입장에 성공할 때 0으로 돌아갑니다.
//! 인증 거부도 백오프로 처리하며, 연결 문제로 프로세스가 종료되지 않습니다.
//!
//! 현재 상태는 `tokio::sync::watch`로 공개되며 다른 컴포넌트는 읽기만 합니다.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::watch;
use tokio::time::{Instant, sleep_until, timeout};
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use honeyrelay_core::config::IrcConfig;
use honeyrelay_core::event::MODULE_IRC_CHANNEL;
use honeyrelay_core::metrics as m;

use crate::backoff::Backoff;
use crate::codec::{IrcCodec, IrcMessage, MAX_LINE_LENGTH, sanitize, split_message};
use crate::error::IrcError;
use crate::flood::FloodLimiter;
use crate::queue::{OutboundMessage, OutboundQueue};
use crate::transport::{BoxedStream, Connector};

/// 서버가 중계 시 붙이는 접두어(`:nick!user@host `)를 위한 여유 바이트
const PREFIX_RESERVE: usize = 100;

/// QUIT 송신 제한 시간
const QUIT_TIMEOUT: Duration = Duration::from_secs(2);

const RPL_WELCOME: &str = "001";
const ERR_NICKNAMEINUSE: &str = "433";
const ERR_PASSWDMISMATCH: &str = "464";
const ERR_YOUREBANNEDCREEP: &str = "465";
const ERR_CHANNELISFULL: &str = "471";
const ERR_INVITEONLYCHAN: &str = "473";
const ERR_BANNEDFROMCHAN: &str = "474";
const ERR_BADCHANNELKEY: &str = "475";

/// 채널 입장 거부 응답 코드
const JOIN_REJECTIONS: [&str; 4] = [
    ERR_CHANNELISFULL,
    ERR_INVITEONLYCHAN,
    ERR_BANNEDFROMCHAN,
    ERR_BADCHANNELKEY,
];

type IrcFramed = Framed<BoxedStream, IrcCodec>;

/// 채널 연결 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// 연결 없음 (시작 전 또는 종료 후)
    Disconnected,
    /// 전송 계층 연결 중
    Connecting,
    /// NICK/USER 등록 및 JOIN 진행 중
    Registering,
    /// 채널 입장 완료 -- 송신 가능
    Joined,
    /// 재연결 대기
    Backoff {
        /// 연속 실패 횟수
        attempt: u32,
        /// 재시도 시각
        until: Instant,
    },
}

impl ConnectionState {
    /// 송신 가능 상태인지 여부
    pub fn is_joined(&self) -> bool {
        matches!(self, Self::Joined)
    }

    /// 상태 이름
    pub fn name(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Registering => "registering",
            Self::Joined => "joined",
            Self::Backoff { .. } => "backoff",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backoff { attempt, .. } => write!(f, "backoff(attempt={attempt})"),
            other => f.write_str(other.name()),
        }
    }
}

/// 채널 클라이언트 설정
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// 닉네임
    pub nickname: String,
    /// 실명 필드
    pub realname: String,
    /// 채널명 (`#` 포함)
    pub channel: String,
    /// 채널 키
    pub channel_password: Option<String>,
    /// NickServ 비밀번호
    pub nickserv_password: Option<String>,
    /// 종료 메시지
    pub quit_message: String,
    /// 입장 직후 보낼 안내 메시지
    pub join_message: Option<String>,
    /// 연결 제한 시간
    pub connect_timeout: Duration,
    /// 등록(NICK부터 JOIN 확인까지) 제한 시간
    pub registration_timeout: Duration,
    /// 자체 PING 주기
    pub keepalive_interval: Duration,
    /// 수신 없음 허용 시간
    pub read_timeout: Duration,
    /// 백오프 기본 지연
    pub backoff_base: Duration,
    /// 백오프 최대 지연
    pub backoff_cap: Duration,
    /// 윈도우당 최대 송신 수
    pub rate_limit_messages: u32,
    /// 속도 제한 윈도우
    pub rate_limit_window: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::from_core(&IrcConfig::default())
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_owned())
}

impl ChannelConfig {
    /// core 설정의 `[irc]` 섹션에서 채널 설정을 만듭니다.
    pub fn from_core(core: &IrcConfig) -> Self {
        Self {
            nickname: core.nickname.clone(),
            realname: core.realname.clone(),
            channel: normalize_channel(&core.channel),
            channel_password: non_empty(&core.channel_password),
            nickserv_password: non_empty(&core.nickserv_password),
            quit_message: core.quit_message.clone(),
            join_message: non_empty(&core.join_message),
            connect_timeout: Duration::from_secs(core.connect_timeout_secs),
            registration_timeout: Duration::from_secs(core.registration_timeout_secs),
            keepalive_interval: Duration::from_secs(core.keepalive_interval_secs),
            read_timeout: Duration::from_secs(core.read_timeout_secs),
            backoff_base: Duration::from_secs(core.backoff_base_secs),
            backoff_cap: Duration::from_secs(core.backoff_cap_secs),
            rate_limit_messages: core.rate_limit.messages,
            rate_limit_window: Duration::from_secs(core.rate_limit.window_secs),
        }
    }

    /// PRIVMSG 본문 한 조각의 최대 바이트
    fn payload_limit(&self) -> usize {
        let overhead = "PRIVMSG  :\r\n".len() + self.channel.len() + PREFIX_RESERVE;
        MAX_LINE_LENGTH.saturating_sub(overhead).max(1)
    }
}

/// 채널명 앞에 `#`가 없으면 붙입니다.
pub fn normalize_channel(channel: &str) -> String {
    let channel = channel.trim();
    if channel.starts_with(['#', '&', '+', '!']) {
        channel.to_owned()
    } else {
        format!("#{channel}")
    }
}

/// 한 번의 select 결과
enum Activity {
    Shutdown,
    Inbound(Option<Result<IrcMessage, IrcError>>),
    ReadIdle,
    Keepalive,
    Outbound(OutboundMessage),
}

/// IRC 채널 클라이언트
pub struct IrcChannel<C> {
    config: ChannelConfig,
    connector: C,
    queue: Arc<OutboundQueue>,
    state_tx: watch::Sender<ConnectionState>,
    backoff: Backoff,
    flood: FloodLimiter,
    /// 큐에서 꺼냈지만 아직 보내지 못한 조각 (재연결 후 먼저 보냄)
    pending: VecDeque<String>,
    /// 현재 사용 중인 닉네임 (433 응답 시 변경)
    current_nick: String,
}

impl<C: Connector> IrcChannel<C> {
    /// 새 채널 클라이언트를 생성합니다. 연결은 [`run`](Self::run)에서 시작합니다.
    pub fn new(config: ChannelConfig, connector: C, queue: Arc<OutboundQueue>) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            backoff: Backoff::new(config.backoff_base, config.backoff_cap),
            flood: FloodLimiter::new(config.rate_limit_messages, config.rate_limit_window),
            current_nick: config.nickname.clone(),
            config,
            connector,
            queue,
            state_tx,
            pending: VecDeque::new(),
        }
    }

    /// 상태 변경을 구독합니다.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// 현재 상태
    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    fn set_state(&self, state: ConnectionState) {
        self.state_tx.send_replace(state);
    }

    /// 취소될 때까지 연결을 유지하며 큐를 비웁니다.
    pub async fn run(mut self, cancel: CancellationToken) {
        let target = self.connector.target();
        info!(
            module = MODULE_IRC_CHANNEL,
            server = %target,
            channel = %self.config.channel,
            "irc channel started"
        );

        loop {
            self.set_state(ConnectionState::Connecting);
            let session = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                session = self.establish() => session,
            };

            match session {
                Ok(mut framed) => {
                    self.backoff.reset();
                    self.set_state(ConnectionState::Joined);
                    metrics::counter!(m::CHANNEL_JOINS_TOTAL).increment(1);
                    info!(
                        module = MODULE_IRC_CHANNEL,
                        channel = %self.config.channel,
                        nick = %self.current_nick,
                        "joined channel"
                    );

                    match self.serve(&mut framed, &cancel).await {
                        Ok(()) => {
                            self.quit(&mut framed).await;
                            break;
                        }
                        Err(e) => warn!(
                            module = MODULE_IRC_CHANNEL,
                            error = %e,
                            pending = self.pending.len(),
                            "connection lost"
                        ),
                    }
                }
                Err(e) if e.is_auth_failure() => warn!(
                    module = MODULE_IRC_CHANNEL,
                    error = %e,
                    "server rejected credentials"
                ),
                Err(e) => warn!(
                    module = MODULE_IRC_CHANNEL,
                    server = %target,
                    error = %e,
                    "connection attempt failed"
                ),
            }

            let (attempt, delay) = self.backoff.next_delay();
            let until = Instant::now() + delay;
            self.set_state(ConnectionState::Backoff { attempt, until });
            metrics::counter!(m::CHANNEL_BACKOFFS_TOTAL).increment(1);
            warn!(
                module = MODULE_IRC_CHANNEL,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "reconnecting after backoff"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = sleep_until(until) => {}
            }
        }

        self.set_state(ConnectionState::Disconnected);
        info!(module = MODULE_IRC_CHANNEL, "irc channel stopped");
    }

    /// 연결하고 등록을 마칩니다.
    async fn establish(&mut self) -> Result<IrcFramed, IrcError> {
        let stream = timeout(self.config.connect_timeout, self.connector.connect())
            .await
            .map_err(|_| IrcError::Timeout("connect"))??;
        let mut framed = Framed::new(stream, IrcCodec::new());

        self.set_state(ConnectionState::Registering);
        timeout(self.config.registration_timeout, self.register(&mut framed))
            .await
            .map_err(|_| IrcError::Timeout("registration"))??;
        Ok(framed)
    }

    /// NICK/USER, 환영 응답, JOIN 확인까지의 등록 절차
    async fn register(&mut self, framed: &mut IrcFramed) -> Result<(), IrcError> {
        self.current_nick = self.config.nickname.clone();
        framed.send(IrcMessage::nick(&self.current_nick)).await?;
        framed
            .send(IrcMessage::user(&self.current_nick, &self.config.realname))
            .await?;

        let mut welcomed = false;
        loop {
            let message = framed.next().await.ok_or(IrcError::Closed)??;
            trace!(module = MODULE_IRC_CHANNEL, line = %message, "registration inbound");

            match message.command.as_str() {
                "PING" => framed.send(IrcMessage::pong(message.trailing())).await?,
                RPL_WELCOME => {
                    welcomed = true;
                    if let Some(nick) = message.param(0) {
                        self.current_nick = nick.to_owned();
                    }
                    if let Some(password) = &self.config.nickserv_password {
                        framed
                            .send(IrcMessage::privmsg(
                                "NickServ",
                                &format!("IDENTIFY {password}"),
                            ))
                            .await?;
                    }
                    framed
                        .send(IrcMessage::join(
                            &self.config.channel,
                            self.config.channel_password.as_deref(),
                        ))
                        .await?;
                }
                ERR_NICKNAMEINUSE if !welcomed => {
                    self.current_nick.push('_');
                    debug!(
                        module = MODULE_IRC_CHANNEL,
                        nick = %self.current_nick,
                        "nickname in use, retrying"
                    );
                    framed.send(IrcMessage::nick(&self.current_nick)).await?;
                }
                ERR_PASSWDMISMATCH | ERR_YOUREBANNEDCREEP => {
                    return Err(IrcError::AuthFailed(message.trailing().to_owned()));
                }
                code if JOIN_REJECTIONS.contains(&code) => {
                    return Err(IrcError::JoinRejected {
                        channel: self.config.channel.clone(),
                        reason: message.trailing().to_owned(),
                    });
                }
                "JOIN" if welcomed && self.is_own_join(&message) => return Ok(()),
                "ERROR" => return Err(IrcError::ServerError(message.trailing().to_owned())),
                _ => {}
            }
        }
    }

    fn is_current_nick(&self, nick: Option<&str>) -> bool {
        nick.is_some_and(|nick| nick.eq_ignore_ascii_case(&self.current_nick))
    }

    fn is_own_join(&self, message: &IrcMessage) -> bool {
        let nick_matches = self.is_current_nick(message.source_nick());
        let channel_matches = message
            .param(0)
            .is_some_and(|channel| channel.eq_ignore_ascii_case(&self.config.channel));
        nick_matches && channel_matches
    }

    /// 입장 상태에서 송수신을 처리합니다. 취소되면 `Ok(())`.
    async fn serve(
        &mut self,
        framed: &mut IrcFramed,
        cancel: &CancellationToken,
    ) -> Result<(), IrcError> {
        if let Some(text) = self.config.join_message.clone() {
            self.enqueue_chunks(&text);
        }
        if !self.deliver_pending(framed, cancel).await? {
            return Ok(());
        }

        let queue = Arc::clone(&self.queue);
        let start = Instant::now();
        let mut keepalive = tokio::time::interval_at(
            start + self.config.keepalive_interval,
            self.config.keepalive_interval,
        );
        keepalive.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut last_read = start;

        loop {
            let activity = tokio::select! {
                biased;
                _ = cancel.cancelled() => Activity::Shutdown,
                inbound = framed.next() => Activity::Inbound(inbound),
                _ = sleep_until(last_read + self.config.read_timeout) => Activity::ReadIdle,
                _ = keepalive.tick() => Activity::Keepalive,
                message = queue.pop() => Activity::Outbound(message),
            };

            match activity {
                Activity::Shutdown => return Ok(()),
                Activity::Inbound(None) => return Err(IrcError::Closed),
                Activity::Inbound(Some(Err(e))) => return Err(e),
                Activity::Inbound(Some(Ok(message))) => {
                    last_read = Instant::now();
                    self.handle_inbound(framed, message).await?;
                }
                Activity::ReadIdle => return Err(IrcError::Timeout("read")),
                Activity::Keepalive => {
                    framed.send(IrcMessage::ping(&self.current_nick)).await?;
                }
                Activity::Outbound(message) => {
                    self.enqueue_chunks(&message.text);
                    if !self.deliver_pending(framed, cancel).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// 입장 상태의 수신 메시지 처리
    async fn handle_inbound(
        &mut self,
        framed: &mut IrcFramed,
        message: IrcMessage,
    ) -> Result<(), IrcError> {
        trace!(module = MODULE_IRC_CHANNEL, line = %message, "inbound");
        match message.command.as_str() {
            "PING" => framed.send(IrcMessage::pong(message.trailing())).await?,
            "KICK" if self.is_current_nick(message.param(1)) => {
                return Err(IrcError::Kicked {
                    channel: message.param(0).unwrap_or_default().to_owned(),
                    reason: message.trailing().to_owned(),
                });
            }
            "NICK" if self.is_current_nick(message.source_nick()) => {
                self.current_nick = message.trailing().to_owned();
                debug!(module = MODULE_IRC_CHANNEL, nick = %self.current_nick, "nickname changed");
            }
            "ERROR" => return Err(IrcError::ServerError(message.trailing().to_owned())),
            _ => {}
        }
        Ok(())
    }

    /// 메시지를 정리하고 라인 길이에 맞게 나누어 보류 목록에 넣습니다.
    fn enqueue_chunks(&mut self, text: &str) {
        let clean = sanitize(text);
        self.pending
            .extend(split_message(&clean, self.config.payload_limit()));
    }

    /// 보류 중인 조각을 속도 제한에 맞춰 보냅니다.
    ///
    /// 취소되면 `Ok(false)`. 송신 실패 시 보내지 못한 조각은 남겨 둡니다.
    async fn deliver_pending(
        &mut self,
        framed: &mut IrcFramed,
        cancel: &CancellationToken,
    ) -> Result<bool, IrcError> {
        while let Some(chunk) = self.pending.front() {
            let chunk = chunk.clone();
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(false),
                _ = self.flood.acquire() => {}
            }
            framed
                .send(IrcMessage::privmsg(&self.config.channel, &chunk))
                .await?;
            self.pending.pop_front();
            metrics::counter!(m::CHANNEL_MESSAGES_SENT_TOTAL).increment(1);
        }
        Ok(true)
    }

    /// QUIT을 보내고 연결을 닫습니다. 최대 2초만 기다립니다.
    async fn quit(&mut self, framed: &mut IrcFramed) {
        let quit = IrcMessage::quit(&self.config.quit_message);
        let result = timeout(QUIT_TIMEOUT, async {
            framed.send(quit).await?;
            framed.close().await
        })
        .await;
        match result {
            Ok(Ok(())) => debug!(module = MODULE_IRC_CHANNEL, "quit sent"),
            Ok(Err(e)) => debug!(module = MODULE_IRC_CHANNEL, error = %e, "quit failed"),
            Err(_) => debug!(module = MODULE_IRC_CHANNEL, "quit timed out"),
        }
    }
}
