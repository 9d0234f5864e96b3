//! 전송 계층 -- 서버 연결을 만드는 경계
//!
//! [`Connector`] trait을 통해 연결 생성 로직을 추상화합니다.
//! 실제 구현은 [`TcpConnector`](평문 TCP 또는 rustls TLS)이며,
//! 테스트에서는 인메모리 duplex 스트림을 돌려주는 구현으로 교체합니다.

use std::future::Future;
use std::sync::Arc;

use rustls::RootCertStore;
use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::debug;

use honeyrelay_core::event::MODULE_IRC_CHANNEL;

use crate::error::IrcError;

/// 읽기/쓰기 가능한 양방향 스트림
pub trait AsyncStream: AsyncRead + AsyncWrite {}

impl<T: AsyncRead + AsyncWrite> AsyncStream for T {}

/// 타입이 지워진 연결 스트림
pub type BoxedStream = Box<dyn AsyncStream + Send + Unpin>;

/// 서버 연결 생성 trait
///
/// 연결이 끊길 때마다 채널 클라이언트가 다시 호출합니다.
pub trait Connector: Send + Sync {
    /// 새 연결을 엽니다.
    fn connect(&self) -> impl Future<Output = Result<BoxedStream, IrcError>> + Send;

    /// 로그용 대상 표기 (`host:port`)
    fn target(&self) -> String;
}

/// TCP(선택적으로 TLS) 연결기
#[derive(Clone)]
pub struct TcpConnector {
    host: String,
    port: u16,
    tls: Option<TlsConnector>,
}

impl TcpConnector {
    /// 새 연결기를 생성합니다.
    ///
    /// `use_tls`이면 webpki 루트 인증서로 서버를 검증하는 TLS 설정을 한 번 만들어 둡니다.
    pub fn new(host: impl Into<String>, port: u16, use_tls: bool) -> Result<Self, IrcError> {
        let host = host.into();
        let tls = if use_tls {
            // 서버명은 연결 전에 검증해 둡니다
            ServerName::try_from(host.clone())
                .map_err(|e| IrcError::Tls(format!("invalid server name '{host}': {e}")))?;

            let mut roots = RootCertStore::empty();
            roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

            let config = rustls::ClientConfig::builder_with_provider(Arc::new(
                rustls::crypto::ring::default_provider(),
            ))
            .with_safe_default_protocol_versions()
            .map_err(|e| IrcError::Tls(e.to_string()))?
            .with_root_certificates(roots)
            .with_no_client_auth();

            Some(TlsConnector::from(Arc::new(config)))
        } else {
            None
        };

        Ok(Self { host, port, tls })
    }

    /// TLS 사용 여부
    pub fn uses_tls(&self) -> bool {
        self.tls.is_some()
    }
}

impl Connector for TcpConnector {
    async fn connect(&self) -> Result<BoxedStream, IrcError> {
        let tcp = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(|e| IrcError::Connect(format!("{}: {e}", self.target())))?;
        // Nagle 비활성화
        tcp.set_nodelay(true)?;

        let Some(tls) = &self.tls else {
            debug!(module = MODULE_IRC_CHANNEL, server = %self.target(), "tcp connected");
            return Ok(Box::new(tcp));
        };

        let server_name = ServerName::try_from(self.host.clone())
            .map_err(|e| IrcError::Tls(format!("invalid server name '{}': {e}", self.host)))?;
        let stream = tls
            .connect(server_name, tcp)
            .await
            .map_err(|e| IrcError::Tls(format!("handshake with {}: {e}", self.target())))?;

        debug!(module = MODULE_IRC_CHANNEL, server = %self.target(), "tls connected");
        Ok(Box::new(stream))
    }

    fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
