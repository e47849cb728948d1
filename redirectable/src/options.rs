//! Request options threaded through every hop of a redirect chain.
//!
//! [`RequestOptions`] is the mutable record the chain rewrites on each
//! redirect (URL components, method, headers) together with the per-request
//! redirect policy (limits, tracking, hooks, agents).

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use http::{HeaderMap, HeaderName, HeaderValue, Method};
use url::Url;

use crate::config::{BeforeRedirect, ConditionalRedirect, RedirectHook, RedirectPredicate};
use crate::error::{BoxError, RedirectError};
use crate::redirect;
use crate::response::{RequestDescriptor, ResponseHead};
use crate::transport::Agents;

/// A URL scheme with a registered native client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    /// The scheme name without the trailing colon (`"http"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    /// The scheme in Node's protocol notation (`"http:"`).
    pub fn protocol(&self) -> &'static str {
        match self {
            Scheme::Http => "http:",
            Scheme::Https => "https:",
        }
    }

    /// Port used when a URL does not name one.
    pub fn default_port(&self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }

    /// Whether moving from `self` to `next` leaves TLS.
    pub fn is_downgrade_to(&self, next: Scheme) -> bool {
        *self == Scheme::Https && next == Scheme::Http
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.protocol())
    }
}

impl FromStr for Scheme {
    type Err = RedirectError;

    /// Accepts `http`, `https`, and the `http:` / `https:` protocol forms.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.strip_suffix(':').unwrap_or(s);
        if name.eq_ignore_ascii_case("http") {
            Ok(Scheme::Http)
        } else if name.eq_ignore_ascii_case("https") {
            Ok(Scheme::Https)
        } else {
            Err(RedirectError::UnsupportedProtocol {
                protocol: format!("{}:", name),
            })
        }
    }
}

/// Options for a single logical request and every hop it spawns.
///
/// The URL fields are public because [`BeforeRedirect`] hooks edit them
/// between hops, the same way `http::request::Parts` exposes its fields.
///
/// # Example
///
/// ```ignore
/// use redirectable::RequestOptions;
///
/// let options = RequestOptions::parse("http://localhost:3000/a")?
///     .method(http::Method::POST)
///     .header("content-type", "application/json")
///     .max_redirects(3)
///     .track_redirects(true);
/// ```
#[derive(Clone)]
pub struct RequestOptions {
    /// Scheme of the next hop. `None` means "the wrapper's scheme".
    pub protocol: Option<Scheme>,
    /// Host to connect to (IPv6 literals keep their brackets).
    pub hostname: String,
    /// Port to connect to; `None` uses the scheme's default.
    pub port: Option<u16>,
    /// Path plus query string.
    pub path: String,
    /// Fragment, without the leading `#`. Never sent on the wire.
    pub hash: Option<String>,
    /// Request method.
    pub method: Method,
    /// Request headers.
    pub headers: HeaderMap,
    /// Maximum number of redirects to follow; `None` uses the wrapper default.
    pub max_redirects: Option<usize>,
    /// Maximum cumulative request body size; `None` uses the wrapper default.
    pub max_body_length: Option<usize>,
    /// Whether 3xx responses are followed at all.
    pub follow_redirects: bool,
    /// Whether followed redirects are recorded on the final response.
    pub track_redirects: bool,
    /// Hook invoked with the next hop's options before each redirect.
    pub before_redirect: Option<Arc<dyn BeforeRedirect>>,
    /// Predicate deciding whether a given redirect is followed.
    pub conditionally_redirect: Option<Arc<dyn RedirectPredicate>>,
    /// Per-scheme connection pools overriding the wrapper's native clients.
    pub agents: Agents,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            protocol: None,
            hostname: "localhost".to_string(),
            port: None,
            path: "/".to_string(),
            hash: None,
            method: Method::GET,
            headers: HeaderMap::new(),
            max_redirects: None,
            max_body_length: None,
            follow_redirects: true,
            track_redirects: false,
            before_redirect: None,
            conditionally_redirect: None,
            agents: Agents::default(),
        }
    }
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("protocol", &self.protocol)
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("path", &self.path)
            .field("hash", &self.hash)
            .field("method", &self.method)
            .field("headers", &self.headers)
            .field("max_redirects", &self.max_redirects)
            .field("max_body_length", &self.max_body_length)
            .field("follow_redirects", &self.follow_redirects)
            .field("track_redirects", &self.track_redirects)
            .field("before_redirect", &self.before_redirect.is_some())
            .field("conditionally_redirect", &self.conditionally_redirect.is_some())
            .field("agents", &self.agents)
            .finish()
    }
}

impl RequestOptions {
    /// Create options for `GET http://localhost/` with no protocol pinned.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an absolute URL string into options.
    ///
    /// Relative input (such as `"/relative"`) fails with
    /// [`RedirectError::InvalidUrl`].
    pub fn parse(input: &str) -> Result<Self, RedirectError> {
        let url = Url::parse(input).map_err(|_| RedirectError::invalid_url(input))?;
        Self::from_url(&url)
    }

    /// Build options from a parsed URL.
    pub fn from_url(url: &Url) -> Result<Self, RedirectError> {
        let mut options = Self::default();
        redirect::apply_url(&mut options, url)?;
        Ok(options)
    }

    /// The absolute URL this hop targets, including the fragment.
    pub fn url(&self) -> String {
        redirect::format_url(self)
    }

    /// The scheme, falling back to `fallback` when none is pinned.
    pub fn scheme_or(&self, fallback: Scheme) -> Scheme {
        self.protocol.unwrap_or(fallback)
    }

    /// Snapshot of the request this hop sends.
    pub fn descriptor(&self) -> RequestDescriptor {
        RequestDescriptor {
            url: self.url(),
            method: self.method.clone(),
            headers: self.headers.clone(),
        }
    }

    /// Pin the scheme.
    pub fn protocol(mut self, scheme: Scheme) -> Self {
        self.protocol = Some(scheme);
        self
    }

    /// Set the host to connect to.
    pub fn hostname<S: Into<String>>(mut self, hostname: S) -> Self {
        self.hostname = hostname.into();
        self
    }

    /// Set the port to connect to.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the path (and query).
    pub fn path<S: Into<String>>(mut self, path: S) -> Self {
        self.path = path.into();
        self
    }

    /// Set the request method.
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Add a request header.
    ///
    /// # Panics
    ///
    /// Panics if the header name or value is invalid.
    pub fn header<K, V>(mut self, name: K, value: V) -> Self
    where
        K: TryInto<HeaderName>,
        K::Error: fmt::Debug,
        V: TryInto<HeaderValue>,
        V::Error: fmt::Debug,
    {
        let name = name.try_into().expect("invalid header name");
        let value = value.try_into().expect("invalid header value");
        self.headers.insert(name, value);
        self
    }

    /// Try to add a request header.
    ///
    /// Returns `None` if the header name or value is invalid.
    pub fn try_header<K, V>(mut self, name: K, value: V) -> Option<Self>
    where
        K: TryInto<HeaderName>,
        V: TryInto<HeaderValue>,
    {
        let name = name.try_into().ok()?;
        let value = value.try_into().ok()?;
        self.headers.insert(name, value);
        Some(self)
    }

    /// Replace all request headers.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Override the wrapper's redirect limit for this request.
    pub fn max_redirects(mut self, max: usize) -> Self {
        self.max_redirects = Some(max);
        self
    }

    /// Override the wrapper's body size limit for this request.
    pub fn max_body_length(mut self, max: usize) -> Self {
        self.max_body_length = Some(max);
        self
    }

    /// Enable or disable redirect following.
    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    /// Enable or disable redirect tracking.
    pub fn track_redirects(mut self, track: bool) -> Self {
        self.track_redirects = track;
        self
    }

    /// Run `hook` before every redirect.
    ///
    /// The closure receives the next hop's options (mutable), the response
    /// that triggered the redirect, and the request that produced it.
    /// Returning an error aborts the whole chain.
    pub fn before_redirect<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut RequestOptions, &ResponseHead, &RequestDescriptor) -> Result<(), BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.before_redirect = Some(Arc::new(RedirectHook::new(hook)));
        self
    }

    /// Run a pre-built [`BeforeRedirect`] implementation before every redirect.
    pub fn before_redirect_hook<H: BeforeRedirect + 'static>(mut self, hook: H) -> Self {
        self.before_redirect = Some(Arc::new(hook));
        self
    }

    /// Only follow redirects for which `predicate` returns true.
    pub fn conditionally_redirect<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&ResponseHead, &RequestDescriptor) -> bool + Send + Sync + 'static,
    {
        self.conditionally_redirect = Some(Arc::new(ConditionalRedirect::new(predicate)));
        self
    }

    /// Use these per-scheme connection pools.
    pub fn agents(mut self, agents: Agents) -> Self {
        self.agents = agents;
        self
    }
}

/// Conversion into [`RequestOptions`], used by the protocol wrappers.
///
/// Implemented for URL strings, [`Url`], [`http::Uri`] and
/// [`RequestOptions`] itself.
pub trait IntoRequestOptions {
    fn into_request_options(self) -> Result<RequestOptions, RedirectError>;
}

impl IntoRequestOptions for RequestOptions {
    fn into_request_options(self) -> Result<RequestOptions, RedirectError> {
        Ok(self)
    }
}

impl IntoRequestOptions for &str {
    fn into_request_options(self) -> Result<RequestOptions, RedirectError> {
        RequestOptions::parse(self)
    }
}

impl IntoRequestOptions for String {
    fn into_request_options(self) -> Result<RequestOptions, RedirectError> {
        RequestOptions::parse(&self)
    }
}

impl IntoRequestOptions for &String {
    fn into_request_options(self) -> Result<RequestOptions, RedirectError> {
        RequestOptions::parse(self)
    }
}

impl IntoRequestOptions for Url {
    fn into_request_options(self) -> Result<RequestOptions, RedirectError> {
        RequestOptions::from_url(&self)
    }
}

impl IntoRequestOptions for &Url {
    fn into_request_options(self) -> Result<RequestOptions, RedirectError> {
        RequestOptions::from_url(self)
    }
}

impl IntoRequestOptions for http::Uri {
    fn into_request_options(self) -> Result<RequestOptions, RedirectError> {
        RequestOptions::parse(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_from_str() {
        assert_eq!("http".parse::<Scheme>().unwrap(), Scheme::Http);
        assert_eq!("https:".parse::<Scheme>().unwrap(), Scheme::Https);
        assert_eq!("HTTPS".parse::<Scheme>().unwrap(), Scheme::Https);

        let err = "about:".parse::<Scheme>().unwrap_err();
        assert_eq!(err.code(), "ERR_UNSUPPORTED_PROTOCOL");
        assert_eq!(err.to_string(), "unsupported protocol \"about:\"");
    }

    #[test]
    fn test_scheme_downgrade() {
        assert!(Scheme::Https.is_downgrade_to(Scheme::Http));
        assert!(!Scheme::Http.is_downgrade_to(Scheme::Https));
        assert!(!Scheme::Http.is_downgrade_to(Scheme::Http));
    }

    #[test]
    fn test_defaults() {
        let options = RequestOptions::new();
        assert_eq!(options.protocol, None);
        assert_eq!(options.hostname, "localhost");
        assert_eq!(options.path, "/");
        assert_eq!(options.method, Method::GET);
        assert!(options.follow_redirects);
        assert!(!options.track_redirects);
        assert!(options.max_redirects.is_none());
        assert!(options.max_body_length.is_none());
    }

    #[test]
    fn test_parse_url() {
        let options = RequestOptions::parse("http://localhost:3600/a?x=1#frag").unwrap();
        assert_eq!(options.protocol, Some(Scheme::Http));
        assert_eq!(options.hostname, "localhost");
        assert_eq!(options.port, Some(3600));
        assert_eq!(options.path, "/a?x=1");
        assert_eq!(options.hash.as_deref(), Some("frag"));
        assert_eq!(options.url(), "http://localhost:3600/a?x=1#frag");
    }

    #[test]
    fn test_parse_default_port_is_dropped() {
        let options = RequestOptions::parse("https://example.com:443/").unwrap();
        assert_eq!(options.port, None);
        assert_eq!(options.url(), "https://example.com/");
    }

    #[test]
    fn test_parse_ipv6() {
        let options = RequestOptions::parse("http://[::1]:8080/x").unwrap();
        assert_eq!(options.hostname, "[::1]");
        assert_eq!(options.url(), "http://[::1]:8080/x");
    }

    #[test]
    fn test_parse_relative_is_invalid() {
        let err = RequestOptions::parse("/relative").unwrap_err();
        assert_eq!(err.code(), "ERR_INVALID_URL");
        assert!(matches!(err, RedirectError::InvalidUrl { ref input } if input == "/relative"));
    }

    #[test]
    fn test_parse_unsupported_scheme() {
        let err = RequestOptions::parse("ftp://example.com/file").unwrap_err();
        assert!(matches!(err, RedirectError::UnsupportedProtocol { .. }));
    }

    #[test]
    fn test_builder_methods() {
        let options = RequestOptions::new()
            .protocol(Scheme::Https)
            .hostname("example.com")
            .port(8443)
            .path("/upload")
            .method(Method::PUT)
            .header("x-custom", "value")
            .max_redirects(2)
            .max_body_length(1024)
            .follow_redirects(false)
            .track_redirects(true);

        assert_eq!(options.url(), "https://example.com:8443/upload");
        assert_eq!(options.method, Method::PUT);
        assert_eq!(options.headers.get("x-custom").unwrap(), "value");
        assert_eq!(options.max_redirects, Some(2));
        assert_eq!(options.max_body_length, Some(1024));
        assert!(!options.follow_redirects);
        assert!(options.track_redirects);
    }

    #[test]
    fn test_try_header_invalid() {
        assert!(RequestOptions::new().try_header("bad header", "v").is_none());
        assert!(RequestOptions::new().try_header("x-ok", "v").is_some());
    }

    #[test]
    fn test_descriptor() {
        let options = RequestOptions::parse("http://localhost:3600/a")
            .unwrap()
            .header("x-a", "1");
        let descriptor = options.descriptor();
        assert_eq!(descriptor.url, "http://localhost:3600/a");
        assert_eq!(descriptor.method, Method::GET);
        assert_eq!(descriptor.headers.get("x-a").unwrap(), "1");
    }

    #[test]
    fn test_into_request_options() {
        let from_str = "http://localhost/a".into_request_options().unwrap();
        assert_eq!(from_str.path, "/a");

        let url = Url::parse("https://example.com/b").unwrap();
        let from_url = (&url).into_request_options().unwrap();
        assert_eq!(from_url.protocol, Some(Scheme::Https));

        let uri: http::Uri = "http://example.com:8080/c".parse().unwrap();
        let from_uri = uri.into_request_options().unwrap();
        assert_eq!(from_uri.port, Some(8080));
        assert_eq!(from_uri.path, "/c");
    }

    #[test]
    fn test_debug_hides_hooks() {
        let options = RequestOptions::new().before_redirect(|_, _, _| Ok(()));
        let debug = format!("{:?}", options);
        assert!(debug.contains("before_redirect: true"));
    }
}
