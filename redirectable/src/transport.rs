//! Native client layer.
//!
//! A redirect chain never talks to the network itself: every hop is handed to
//! a per-scheme [`NativeClient`], a type-erased `tower::Service`. This module
//! defines that seam and provides [`HyperTransport`], the default
//! implementation:
//!
//! - HTTP/1.1 and HTTP/2 (ALPN for TLS, prior knowledge with `http2_only`)
//! - TLS with rustls (feature-gated)
//! - Connection pooling
//!
//! # Feature Flags
//!
//! - `tls` (default) - Enables `tls-ring` + `tls-native-roots` for convenience
//! - `tls-ring` / `tls-aws-lc` - Crypto providers
//! - `tls-native-roots` / `tls-webpki-roots` - Root certificates
//!
//! # Example
//!
//! ```ignore
//! use redirectable::transport::{native_client, HyperTransport};
//!
//! let http = native_client(HyperTransport::http());
//! let https = native_client(HyperTransport::https()?);
//! ```

mod body;
mod connector;
mod hyper;
mod native;

pub use body::{BodySender, TransportBody};
pub use connector::{
    build_http_connector, build_https_connector, default_tls_config, has_tls_support, TcpSettings,
};
pub use self::hyper::{HyperTransport, HyperTransportBuilder};
pub use native::{
    boxed_body, native_client, Agents, ConnectionInfo, HopEvents, NativeClient, NativeEvent,
    ResponseBody,
};

// Re-export rustls types that users might need for TLS configuration
pub use rustls::ClientConfig as TlsClientConfig;
