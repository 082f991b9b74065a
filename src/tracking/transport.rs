//! HTTP/1.1 beacon transport.
//!
//! One connection per beacon: DNS -> TCP -> TLS (for `https`) -> HTTP/1.1.
//! Beacons are rare and fire-and-forget, so nothing is pooled.

use super::beacon::{BeaconRequest, BeaconResponse, BeaconTransport, Sending};
use crate::base::consenterror::ConsentError;
use boring::ssl::{SslConnector, SslMethod, SslVersion};
use bytes::Bytes;
use http::header::{CONTENT_TYPE, HOST, USER_AGENT};
use http_body_util::Full;
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use url::Url;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A connected beacon socket.
#[derive(Debug)]
enum BeaconStream {
    Tcp(TcpStream),
    Ssl(tokio_boring::SslStream<TcpStream>),
}

impl AsyncRead for BeaconStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            BeaconStream::Tcp(s) => Pin::new(s).poll_read(cx, buf),
            BeaconStream::Ssl(s) => Pin::new(s).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for BeaconStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        match self.get_mut() {
            BeaconStream::Tcp(s) => Pin::new(s).poll_write(cx, buf),
            BeaconStream::Ssl(s) => Pin::new(s).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            BeaconStream::Tcp(s) => Pin::new(s).poll_flush(cx),
            BeaconStream::Ssl(s) => Pin::new(s).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            BeaconStream::Tcp(s) => Pin::new(s).poll_shutdown(cx),
            BeaconStream::Ssl(s) => Pin::new(s).poll_shutdown(cx),
        }
    }
}

/// [`BeaconTransport`] over tokio, BoringSSL and hyper.
#[derive(Clone)]
pub struct HttpTransport {
    connector: SslConnector,
    user_agent: Option<String>,
    timeout: Duration,
}

impl HttpTransport {
    /// Transport with system roots, TLS 1.2+ and HTTP/1.1 ALPN.
    pub fn new() -> Result<Self, ConsentError> {
        let mut builder = SslConnector::builder(SslMethod::tls()).map_err(|e| {
            ConsentError::beacon_failed(format!("TLS setup failed: {}", e))
        })?;
        builder
            .set_min_proto_version(Some(SslVersion::TLS1_2))
            .map_err(|e| ConsentError::beacon_failed(format!("TLS setup failed: {}", e)))?;
        builder
            .set_alpn_protos(b"\x08http/1.1")
            .map_err(|e| ConsentError::beacon_failed(format!("TLS setup failed: {}", e)))?;

        Ok(Self {
            connector: builder.build(),
            user_agent: None,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Send `user_agent` with every beacon.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Give up on a beacon after `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn connect(&self, url: &Url) -> Result<BeaconStream, ConsentError> {
        let host = url
            .host_str()
            .ok_or_else(|| ConsentError::InvalidUrl(url.to_string()))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| ConsentError::InvalidUrl(url.to_string()))?;

        let addrs = tokio::net::lookup_host((host, port)).await.map_err(|_| {
            ConsentError::NameNotResolved {
                host: host.to_string(),
            }
        })?;

        let mut stream = None;
        for addr in addrs {
            match TcpStream::connect(addr).await {
                Ok(s) => {
                    stream = Some(s);
                    break;
                }
                Err(e) => tracing::debug!(%addr, error = %e, "beacon connect attempt failed"),
            }
        }
        let stream = stream.ok_or_else(|| ConsentError::ConnectionFailed {
            host: host.to_string(),
            port,
        })?;

        if url.scheme() != "https" {
            return Ok(BeaconStream::Tcp(stream));
        }

        let handshake_failed = || ConsentError::SslHandshakeFailed {
            host: host.to_string(),
        };
        let config = self.connector.configure().map_err(|_| handshake_failed())?;
        let tls = tokio_boring::connect(config, host, stream).await.map_err(|e| {
            tracing::debug!(host, error = ?e, "beacon TLS handshake failed");
            handshake_failed()
        })?;

        Ok(BeaconStream::Ssl(tls))
    }

    fn build_request(
        &self,
        request: &BeaconRequest,
    ) -> Result<http::Request<Full<Bytes>>, ConsentError> {
        let url = request.url();
        let host = url
            .host_str()
            .ok_or_else(|| ConsentError::InvalidUrl(url.to_string()))?;
        let authority = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        let mut builder = http::Request::builder()
            .method(request.method().clone())
            .uri(request.target())
            .header(HOST, authority);
        if let Some(user_agent) = &self.user_agent {
            builder = builder.header(USER_AGENT, user_agent.as_str());
        }
        if let Some(content_type) = request.content_type() {
            builder = builder.header(CONTENT_TYPE, content_type);
        }

        builder
            .body(Full::new(request.body().clone()))
            .map_err(ConsentError::beacon_failed)
    }

    async fn execute(&self, request: BeaconRequest) -> Result<BeaconResponse, ConsentError> {
        let http_request = self.build_request(&request)?;
        let stream = self.connect(request.url()).await?;

        let (mut sender, conn) = http1::handshake(TokioIo::new(stream))
            .await
            .map_err(ConsentError::beacon_failed)?;

        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::debug!(error = %e, "beacon connection closed with error");
            }
        });

        let response = sender
            .send_request(http_request)
            .await
            .map_err(ConsentError::beacon_failed)?;

        tracing::debug!(url = %request.url(), status = %response.status(), "beacon delivered");
        Ok(BeaconResponse::new(response.status()))
    }
}

impl BeaconTransport for HttpTransport {
    fn send(&self, request: BeaconRequest) -> Sending {
        let this = self.clone();
        Box::pin(async move {
            tokio::time::timeout(this.timeout, this.execute(request))
                .await
                .map_err(|_| ConsentError::TimedOut)?
        })
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("user_agent", &self.user_agent)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_plain_http_beacon() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = socket.read(&mut buf).await.unwrap();
            socket
                .write_all(b"HTTP/1.1 204 No Content\r\nContent-Length: 0\r\n\r\n")
                .await
                .unwrap();
            String::from_utf8_lossy(&buf[..n]).to_string()
        });

        let transport = HttpTransport::new().unwrap().with_user_agent("cookiecontrol-test");
        let url = Url::parse(&format!("http://{}/cookieconsent?uuid=abc", addr)).unwrap();
        let response = transport.send(BeaconRequest::get(url)).await.unwrap();

        assert_eq!(response.status, http::StatusCode::NO_CONTENT);
        let head = server.await.unwrap();
        assert!(head.starts_with("GET /cookieconsent?uuid=abc HTTP/1.1\r\n"));
        assert!(head.to_ascii_lowercase().contains("user-agent: cookiecontrol-test"));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        // Bind and drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = HttpTransport::new().unwrap();
        let url = Url::parse(&format!("http://{}/", addr)).unwrap();
        let err = transport.send(BeaconRequest::get(url)).await.unwrap_err();
        assert!(err.is_network());
    }
}
