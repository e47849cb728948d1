//! Redirect-following HTTP and HTTPS requests for Rust.
//!
//! This crate wraps per-scheme native HTTP clients and follows 3xx redirects
//! transparently behind a single request object. The caller writes the body,
//! edits headers, sets a timeout or aborts through one
//! [`RedirectableRequest`] and observes one event stream, however many hops
//! the server sends it through.
//!
//! ## Features
//!
//! - Relative and absolute Location resolution, cross-scheme hops (http ↔ https)
//! - Method rules: 307/308 replay the method and body, other redirects
//!   switch non-GET/HEAD requests to GET and drop the body
//! - Credentials (`Authorization`, `Cookie`, `Proxy-Authorization`) never
//!   follow a redirect to another host or from https to http
//! - Redirect and request-body limits (21 hops, 10 MiB by default)
//! - Redirect tracking, a `before_redirect` hook and a redirect predicate
//! - Per-scheme connection pools (agents)
//! - hyper/rustls native clients out of the box, any `tower::Service` plugs in
//!
//! ## Example
//!
//! ```ignore
//! use redirectable::{Redirectable, RequestOptions};
//!
//! let client = Redirectable::new()?;
//!
//! // GET /a -> 302 /b -> 302 /c -> 200
//! let options = RequestOptions::parse("http://localhost:3000/a")?.track_redirects(true);
//! let response = client.http().get(options)?.response().await?;
//!
//! assert_eq!(response.url(), "http://localhost:3000/c");
//! for record in response.redirects() {
//!     println!("{} {}", record.status, record.url);
//! }
//! let body: serde_json::Value = response.json().await?;
//! ```
//!
//! ## Streaming a Body
//!
//! ```ignore
//! use redirectable::{Redirectable, RequestOptions};
//! use http::Method;
//!
//! let client = Redirectable::builder().max_body_length(1024 * 1024).build()?;
//! let options = RequestOptions::parse("https://example.com/upload")?.method(Method::POST);
//!
//! let mut request = client.https().request(options)?;
//! request.set_timeout(std::time::Duration::from_secs(10));
//! request.write("part one, ")?;
//! request.end_with("part two")?;
//!
//! // A 307 replays both chunks to the new location.
//! let response = request.response().await?;
//! ```
//!
//! ## Custom Native Clients
//!
//! ```ignore
//! use redirectable::transport::{native_client, HyperTransport};
//! use redirectable::Redirectable;
//! use std::time::Duration;
//!
//! let https = HyperTransport::builder()
//!     .tcp_keepalive(Duration::from_secs(30))
//!     .http2_only(true)
//!     .build_https()?;
//!
//! let client = Redirectable::builder()
//!     .https_client(native_client(https))
//!     .build()?;
//! ```

pub mod config;
mod error;
mod options;
pub mod redirect;
pub mod request;
pub mod response;
pub mod transport;
mod wrapper;

pub use error::{BoxError, RedirectError};
pub use options::{IntoRequestOptions, RequestOptions, Scheme};
pub use wrapper::{ProtocolWrapper, Redirectable, RedirectableBuilder};

// Re-export config types
pub use config::{
    defaults, BeforeRedirect, BodyLimit, Chain, ConditionalRedirect, HeaderHook, RedirectConfig,
    RedirectHook, RedirectPredicate,
};

pub use request::{RedirectableRequest, RequestEvent, ResponseCallback};

pub use response::{RedirectRecord, RedirectResponse, RequestDescriptor, ResponseHead};

// Re-export transport types
pub use transport::{
    native_client, Agents, ConnectionInfo, HopEvents, HyperTransport, HyperTransportBuilder,
    NativeClient, TlsClientConfig, TransportBody,
};

// Re-export commonly used external types
pub use bytes::Bytes;
pub use url::Url;
