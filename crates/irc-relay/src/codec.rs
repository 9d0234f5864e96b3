//! IRC 라인 코덱
//!
//! [`IrcCodec`]은 CRLF로 구분된 IRC 라인을 [`IrcMessage`]로 변환합니다.
//! 맨 LF도 허용하며, 512바이트를 넘는 수신 라인은 건너뜁니다.
//!
//! # 메시지 형식
//! ```text
//! [@tags] [:prefix] COMMAND [param ...] [:trailing]
//! ```

use std::fmt;

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

use crate::error::IrcError;

/// 한 라인의 최대 길이 (CRLF 포함)
pub const MAX_LINE_LENGTH: usize = 512;

/// 파싱된 IRC 메시지
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrcMessage {
    /// 송신자 접두어 (`nick!user@host` 또는 서버명)
    pub prefix: Option<String>,
    /// 명령 또는 3자리 숫자 응답 코드
    pub command: String,
    /// 파라미터 (마지막 trailing 포함)
    pub params: Vec<String>,
}

impl IrcMessage {
    /// 명령과 파라미터로 메시지를 생성합니다.
    pub fn new(command: &str, params: Vec<String>) -> Self {
        Self {
            prefix: None,
            command: command.to_owned(),
            params,
        }
    }

    /// `NICK <nick>`
    pub fn nick(nick: &str) -> Self {
        Self::new("NICK", vec![nick.to_owned()])
    }

    /// `USER <nick> 0 * :<realname>`
    pub fn user(nick: &str, realname: &str) -> Self {
        Self::new(
            "USER",
            vec![
                nick.to_owned(),
                "0".to_owned(),
                "*".to_owned(),
                realname.to_owned(),
            ],
        )
    }

    /// `JOIN <channel> [key]`
    pub fn join(channel: &str, key: Option<&str>) -> Self {
        let mut params = vec![channel.to_owned()];
        if let Some(key) = key {
            params.push(key.to_owned());
        }
        Self::new("JOIN", params)
    }

    /// `PRIVMSG <target> :<text>`
    pub fn privmsg(target: &str, text: &str) -> Self {
        Self::new("PRIVMSG", vec![target.to_owned(), text.to_owned()])
    }

    /// `PING :<token>`
    pub fn ping(token: &str) -> Self {
        Self::new("PING", vec![token.to_owned()])
    }

    /// `PONG :<token>`
    pub fn pong(token: &str) -> Self {
        Self::new("PONG", vec![token.to_owned()])
    }

    /// `QUIT :<reason>`
    pub fn quit(reason: &str) -> Self {
        Self::new("QUIT", vec![reason.to_owned()])
    }

    /// 한 라인을 파싱합니다. 명령이 없으면 `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let mut rest = line.trim_end_matches(['\r', '\n']);

        // IRCv3 태그는 사용하지 않음
        if rest.starts_with('@') {
            rest = rest.split_once(' ').map_or("", |(_, r)| r);
        }
        rest = rest.trim_start_matches(' ');

        let mut prefix = None;
        if let Some(stripped) = rest.strip_prefix(':') {
            let (p, r) = stripped.split_once(' ').unwrap_or((stripped, ""));
            prefix = Some(p.to_owned());
            rest = r.trim_start_matches(' ');
        }

        let (command, mut rest) = rest.split_once(' ').unwrap_or((rest, ""));
        if command.is_empty() {
            return None;
        }

        let mut params = Vec::new();
        loop {
            rest = rest.trim_start_matches(' ');
            if rest.is_empty() {
                break;
            }
            if let Some(trailing) = rest.strip_prefix(':') {
                params.push(trailing.to_owned());
                break;
            }
            let (param, r) = rest.split_once(' ').unwrap_or((rest, ""));
            params.push(param.to_owned());
            rest = r;
        }

        Some(Self {
            prefix,
            command: command.to_ascii_uppercase(),
            params,
        })
    }

    /// 접두어의 닉네임 부분
    pub fn source_nick(&self) -> Option<&str> {
        self.prefix
            .as_deref()
            .map(|p| p.split_once('!').map_or(p, |(nick, _)| nick))
    }

    /// 마지막 파라미터 (보통 사람이 읽는 사유)
    pub fn trailing(&self) -> &str {
        self.params.last().map_or("", String::as_str)
    }

    /// n번째 파라미터
    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }
}

impl fmt::Display for IrcMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = &self.prefix {
            write!(f, ":{prefix} ")?;
        }
        f.write_str(&self.command)?;
        let last = self.params.len().saturating_sub(1);
        for (i, param) in self.params.iter().enumerate() {
            let needs_colon =
                i == last && (param.is_empty() || param.contains(' ') || param.starts_with(':'));
            if needs_colon {
                write!(f, " :{param}")?;
            } else {
                write!(f, " {param}")?;
            }
        }
        Ok(())
    }
}

/// 송신 텍스트에서 라인 구분 문자를 공백으로 바꿉니다.
pub fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| {
            if matches!(c, '\r' | '\n' | '\0') {
                ' '
            } else {
                c
            }
        })
        .collect()
}

/// 텍스트를 `max_bytes` 이하 조각으로 나눕니다. 문자 경계를 지킵니다.
pub fn split_message(text: &str, max_bytes: usize) -> Vec<String> {
    if text.len() <= max_bytes || max_bytes == 0 {
        return vec![text.to_owned()];
    }
    let mut chunks = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        if current.len() + c.len_utf8() > max_bytes && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }
        current.push(c);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// IRC 라인 코덱
#[derive(Debug, Default)]
pub struct IrcCodec {
    /// 길이 초과 라인을 다음 개행까지 버리는 중
    discarding: bool,
}

impl IrcCodec {
    /// 새 코덱을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for IrcCodec {
    type Item = IrcMessage;
    type Error = IrcError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<IrcMessage>, IrcError> {
        loop {
            let Some(newline) = src.iter().position(|&b| b == b'\n') else {
                if src.len() > MAX_LINE_LENGTH {
                    debug!(len = src.len(), "oversized inbound line, discarding");
                    src.clear();
                    self.discarding = true;
                }
                return Ok(None);
            };

            let line = src.split_to(newline + 1);
            if std::mem::take(&mut self.discarding) || line.len() > MAX_LINE_LENGTH {
                continue;
            }

            let text = String::from_utf8_lossy(&line);
            if let Some(message) = IrcMessage::parse(&text) {
                return Ok(Some(message));
            }
        }
    }
}

impl Encoder<IrcMessage> for IrcCodec {
    type Error = IrcError;

    fn encode(&mut self, item: IrcMessage, dst: &mut BytesMut) -> Result<(), IrcError> {
        let line = item.to_string();
        dst.reserve(line.len() + 2);
        dst.put_slice(line.as_bytes());
        dst.put_slice(b"\r\n");
        Ok(())
    }
}
