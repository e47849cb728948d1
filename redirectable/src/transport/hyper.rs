//! Hyper-based native clients.
//!
//! This module provides [`HyperTransport`], the default native client for
//! both schemes, built on hyper_util's legacy pooled client.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::{HttpConnector, HttpInfo};
use hyper_util::client::legacy::Client;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use rustls::ClientConfig;
use tower_service::Service;

use super::body::TransportBody;
use super::connector::{build_http_connector, build_https_connector, TcpSettings};
use super::native::{boxed_body, ConnectionInfo, HopEvents, ResponseBody};
use crate::error::{BoxError, RedirectError};
use crate::response::ResponseHead;

#[derive(Clone)]
enum Inner {
    Plain(Client<HttpConnector, TransportBody>),
    Tls(Client<HttpsConnector<HttpConnector>, TransportBody>),
}

/// Native client for one scheme using hyper_util's legacy client.
///
/// [`HyperTransport::http`] speaks plain HTTP/1.1 (or h2c with
/// `http2_only`); [`HyperTransport::https`] speaks TLS only and negotiates
/// HTTP/1.1 or HTTP/2 via ALPN. Both pool connections.
///
/// When a hop carries [`HopEvents`] in its extensions, the transport reports
/// the connection addresses as a socket event, and a successful `CONNECT`
/// as a connect event.
///
/// # Example
///
/// ```ignore
/// use redirectable::transport::{native_client, HyperTransport};
/// use std::time::Duration;
///
/// let https = HyperTransport::builder()
///     .tcp_keepalive(Duration::from_secs(60))
///     .pool_idle_timeout(Duration::from_secs(30))
///     .build_https()?;
///
/// let agents = redirectable::Agents::new().with_https(native_client(https));
/// ```
#[derive(Clone)]
pub struct HyperTransport {
    inner: Inner,
    http2_only: bool,
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let scheme = match self.inner {
            Inner::Plain(_) => "http",
            Inner::Tls(_) => "https",
        };
        f.debug_struct("HyperTransport")
            .field("scheme", &scheme)
            .field("http2_only", &self.http2_only)
            .finish_non_exhaustive()
    }
}

impl HyperTransport {
    /// Create a new transport builder.
    pub fn builder() -> HyperTransportBuilder {
        HyperTransportBuilder::new()
    }

    /// Plain HTTP transport with default settings.
    pub fn http() -> Self {
        Self::builder().build_http()
    }

    /// HTTPS transport with the default TLS configuration.
    pub fn https() -> Result<Self, RedirectError> {
        Self::builder().build_https()
    }

    /// Check if this transport is configured for HTTP/2 only.
    pub fn is_http2_only(&self) -> bool {
        self.http2_only
    }

    /// Whether this transport connects over TLS.
    pub fn is_tls(&self) -> bool {
        matches!(self.inner, Inner::Tls(_))
    }
}

/// Builder for [`HyperTransport`].
///
/// # Example
///
/// ```ignore
/// use redirectable::transport::HyperTransportBuilder;
/// use std::time::Duration;
///
/// let transport = HyperTransportBuilder::new()
///     .tcp_nodelay(false)
///     .pool_max_idle_per_host(8)
///     .build_http();
/// ```
pub struct HyperTransportBuilder {
    /// Custom TLS configuration.
    tls_config: Option<ClientConfig>,
    /// Force HTTP/2 only.
    http2_only: bool,
    /// Connection pool idle timeout.
    pool_idle_timeout: Option<Duration>,
    /// Maximum idle connections per host.
    pool_max_idle_per_host: usize,
    /// HTTP/2 keep-alive interval.
    h2_keep_alive_interval: Option<Duration>,
    tcp: TcpSettings,
}

impl Default for HyperTransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HyperTransportBuilder {
    /// Create a new transport builder with default settings.
    pub fn new() -> Self {
        Self {
            tls_config: None,
            http2_only: false,
            pool_idle_timeout: Some(Duration::from_secs(90)),
            pool_max_idle_per_host: 32,
            h2_keep_alive_interval: None,
            tcp: TcpSettings::default(),
        }
    }

    /// Set a custom TLS configuration for [`build_https`](Self::build_https).
    pub fn tls_config(mut self, config: ClientConfig) -> Self {
        self.tls_config = Some(config);
        self
    }

    /// Enable HTTP/2 only mode (h2c for plain HTTP).
    pub fn http2_only(mut self, enabled: bool) -> Self {
        self.http2_only = enabled;
        self
    }

    /// Set the connection pool idle timeout.
    ///
    /// Default: 90 seconds.
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = Some(timeout);
        self
    }

    /// Disable connection pool idle timeout.
    pub fn pool_idle_timeout_none(mut self) -> Self {
        self.pool_idle_timeout = None;
        self
    }

    /// Set the maximum number of idle connections per host.
    ///
    /// Default: 32.
    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = max;
        self
    }

    /// Send HTTP/2 PING frames at this interval.
    pub fn h2_keep_alive_interval(mut self, interval: Duration) -> Self {
        self.h2_keep_alive_interval = Some(interval);
        self
    }

    /// Set `TCP_NODELAY` on new connections. Default: true.
    pub fn tcp_nodelay(mut self, enabled: bool) -> Self {
        self.tcp.nodelay = enabled;
        self
    }

    /// Enable TCP keepalive with the given idle time.
    pub fn tcp_keepalive(mut self, interval: Duration) -> Self {
        self.tcp.keepalive = Some(interval);
        self
    }

    /// Limit how long establishing a TCP connection may take.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.tcp.connect_timeout = Some(timeout);
        self
    }

    fn client_builder(&self) -> hyper_util::client::legacy::Builder {
        let mut builder = Client::builder(TokioExecutor::new());
        builder.pool_timer(TokioTimer::new());
        if let Some(timeout) = self.pool_idle_timeout {
            builder.pool_idle_timeout(timeout);
        }
        builder.pool_max_idle_per_host(self.pool_max_idle_per_host);
        if self.http2_only {
            builder.http2_only(true);
        }
        if let Some(interval) = self.h2_keep_alive_interval {
            builder.http2_keep_alive_interval(interval);
            builder.timer(TokioTimer::new());
        }
        builder
    }

    /// Build a plain HTTP transport.
    pub fn build_http(self) -> HyperTransport {
        let client = self
            .client_builder()
            .build(build_http_connector(&self.tcp, true));
        HyperTransport {
            inner: Inner::Plain(client),
            http2_only: self.http2_only,
        }
    }

    /// Build an HTTPS transport.
    pub fn build_https(self) -> Result<HyperTransport, RedirectError> {
        let builder = self.client_builder();
        let connector = build_https_connector(&self.tcp, self.tls_config)?;
        Ok(HyperTransport {
            inner: Inner::Tls(builder.build(connector)),
            http2_only: self.http2_only,
        })
    }
}

impl std::fmt::Debug for HyperTransportBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransportBuilder")
            .field("tls_config", &self.tls_config.is_some())
            .field("http2_only", &self.http2_only)
            .field("pool_idle_timeout", &self.pool_idle_timeout)
            .field("pool_max_idle_per_host", &self.pool_max_idle_per_host)
            .field("h2_keep_alive_interval", &self.h2_keep_alive_interval)
            .field("tcp", &self.tcp)
            .finish()
    }
}

impl Service<http::Request<TransportBody>> for HyperTransport {
    type Response = http::Response<ResponseBody>;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // hyper_util legacy::Client is always ready
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<TransportBody>) -> Self::Future {
        let inner = self.inner.clone();
        Box::pin(async move {
            let events = req.extensions().get::<HopEvents>().cloned();
            let is_connect = req.method() == http::Method::CONNECT;

            let response = match inner {
                Inner::Plain(client) => client.request(req).await?,
                Inner::Tls(client) => client.request(req).await?,
            };

            if let Some(events) = events {
                if let Some(info) = response.extensions().get::<HttpInfo>() {
                    events.socket(ConnectionInfo {
                        remote_addr: Some(info.remote_addr()),
                        local_addr: Some(info.local_addr()),
                    });
                }
                if is_connect && response.status().is_success() {
                    events.connect(ResponseHead {
                        status: response.status(),
                        version: response.version(),
                        headers: response.headers().clone(),
                    });
                }
            }

            Ok(response.map(boxed_body))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let builder = HyperTransportBuilder::new();
        assert!(!builder.http2_only);
        assert_eq!(builder.pool_max_idle_per_host, 32);
        assert!(builder.pool_idle_timeout.is_some());
        assert!(builder.tcp.nodelay);
    }

    #[test]
    fn test_builder_tcp_settings() {
        let builder = HyperTransportBuilder::new()
            .tcp_nodelay(false)
            .tcp_keepalive(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(3));
        assert!(!builder.tcp.nodelay);
        assert_eq!(builder.tcp.keepalive, Some(Duration::from_secs(60)));
        assert_eq!(builder.tcp.connect_timeout, Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_builder_pool_settings() {
        let builder = HyperTransportBuilder::new()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(10);
        assert_eq!(builder.pool_idle_timeout, Some(Duration::from_secs(60)));
        assert_eq!(builder.pool_max_idle_per_host, 10);

        let builder = builder.pool_idle_timeout_none();
        assert!(builder.pool_idle_timeout.is_none());
    }

    #[tokio::test]
    async fn test_build_http_transport() {
        let transport = HyperTransportBuilder::new().http2_only(true).build_http();
        assert!(transport.is_http2_only());
        assert!(!transport.is_tls());
    }

    #[cfg(all(
        any(feature = "tls-ring", feature = "tls-aws-lc"),
        any(feature = "tls-native-roots", feature = "tls-webpki-roots")
    ))]
    #[tokio::test]
    async fn test_build_https_transport() {
        let transport = HyperTransport::https().unwrap();
        assert!(transport.is_tls());
    }
}
