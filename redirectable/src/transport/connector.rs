//! Connector setup for the hyper native clients.
//!
//! # Feature Flags
//!
//! TLS support requires both a crypto provider and root certificates:
//!
//! - **Crypto providers** (choose one):
//!   - `tls-ring` - Use ring crypto (default with `tls` feature)
//!   - `tls-aws-lc` - Use AWS LC crypto
//!
//! - **Root certificates** (choose one):
//!   - `tls-native-roots` - Use system root certificates (default with `tls` feature)
//!   - `tls-webpki-roots` - Use bundled Mozilla root certificates
//!
//! Without a feature-gated provider, a provider installed through
//! `rustls::crypto::CryptoProvider::install_default()` is used.

use std::sync::Arc;
use std::time::Duration;

use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use rustls::ClientConfig;

use crate::error::RedirectError;

/// Socket options applied to every connection a native client opens.
///
/// These are the connection-level counterparts of Node's per-request
/// `setNoDelay` and `setSocketKeepAlive`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TcpSettings {
    pub nodelay: bool,
    pub keepalive: Option<Duration>,
    pub connect_timeout: Option<Duration>,
}

impl Default for TcpSettings {
    fn default() -> Self {
        Self {
            nodelay: true,
            keepalive: None,
            connect_timeout: None,
        }
    }
}

/// Check if TLS features are properly configured.
///
/// Returns true if both a crypto provider AND root certificates are available.
#[inline]
pub const fn has_tls_support() -> bool {
    cfg!(any(feature = "tls-ring", feature = "tls-aws-lc"))
        && cfg!(any(
            feature = "tls-native-roots",
            feature = "tls-webpki-roots"
        ))
}

/// Try to get a crypto provider ConfigBuilder.
///
/// Priority:
/// 1. Feature-gated provider (tls-ring or tls-aws-lc)
/// 2. User-installed global default provider
#[cfg_attr(
    not(any(feature = "tls-native-roots", feature = "tls-webpki-roots")),
    allow(dead_code)
)]
fn crypto_provider_builder() -> Option<rustls::ConfigBuilder<ClientConfig, rustls::WantsVerifier>> {
    #[cfg(feature = "tls-ring")]
    let provider = Some(Arc::new(rustls::crypto::ring::default_provider()));

    #[cfg(all(feature = "tls-aws-lc", not(feature = "tls-ring")))]
    let provider = Some(Arc::new(rustls::crypto::aws_lc_rs::default_provider()));

    #[cfg(not(any(feature = "tls-ring", feature = "tls-aws-lc")))]
    let provider = rustls::crypto::CryptoProvider::get_default().cloned();

    ClientConfig::builder_with_provider(provider?)
        .with_safe_default_protocol_versions()
        .ok()
}

/// Build the default TLS configuration.
///
/// Returns `None` if no crypto provider is available.
#[cfg(any(feature = "tls-native-roots", feature = "tls-webpki-roots"))]
pub fn default_tls_config() -> Option<ClientConfig> {
    let builder = crypto_provider_builder()?;
    Some(
        builder
            .with_root_certificates(build_root_store())
            .with_no_client_auth(),
    )
}

/// Without root certificate features there is no default; pass a config.
#[cfg(not(any(feature = "tls-native-roots", feature = "tls-webpki-roots")))]
pub fn default_tls_config() -> Option<ClientConfig> {
    None
}

#[cfg(any(feature = "tls-native-roots", feature = "tls-webpki-roots"))]
fn build_root_store() -> rustls::RootCertStore {
    let mut roots = rustls::RootCertStore::empty();

    // Native roots win when both features are enabled.
    #[cfg(feature = "tls-native-roots")]
    {
        let native_certs = rustls_native_certs::load_native_certs();
        if !native_certs.errors.is_empty() {
            tracing::debug!(errors = ?native_certs.errors, "errors loading native certs");
        }
        roots.add_parsable_certificates(native_certs.certs);
    }

    #[cfg(all(feature = "tls-webpki-roots", not(feature = "tls-native-roots")))]
    {
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    }

    roots
}

/// Build a plain TCP connector.
///
/// With `enforce_http`, URIs with any scheme other than `http` are rejected.
pub fn build_http_connector(settings: &TcpSettings, enforce_http: bool) -> HttpConnector {
    let mut connector = HttpConnector::new();
    connector.enforce_http(enforce_http);
    connector.set_nodelay(settings.nodelay);
    connector.set_keepalive(settings.keepalive);
    connector.set_connect_timeout(settings.connect_timeout);
    connector
}

/// Build an https-only connector.
///
/// Uses `tls_config` when given, otherwise [`default_tls_config`].
pub fn build_https_connector(
    settings: &TcpSettings,
    tls_config: Option<ClientConfig>,
) -> Result<HttpsConnector<HttpConnector>, RedirectError> {
    let config = match tls_config {
        Some(config) => config,
        None => default_tls_config().ok_or_else(|| {
            RedirectError::Transport(
                "HTTPS requires a crypto provider and root certificates; enable the `tls` feature \
                 or pass a rustls ClientConfig"
                    .into(),
            )
        })?,
    };

    Ok(HttpsConnectorBuilder::new()
        .with_tls_config(config)
        .https_only()
        .enable_all_versions()
        .wrap_connector(build_http_connector(settings, false)))
}
