//! Protocol wrappers.
//!
//! A [`Redirectable`] holds the wrapper-level [`RedirectConfig`] and one
//! native client per scheme. [`Redirectable::http`] and
//! [`Redirectable::https`] hand out [`ProtocolWrapper`]s mirroring the
//! native `request`/`get` entry points, with redirects followed
//! transparently.

use crate::config::RedirectConfig;
use crate::error::RedirectError;
use crate::options::{IntoRequestOptions, RequestOptions, Scheme};
use crate::request::{RedirectableRequest, ResponseCallback};
use crate::response::RedirectResponse;
use crate::transport::{has_tls_support, native_client, Agents, HyperTransport, NativeClient};

/// Entry point holding the default limits and per-scheme native clients.
///
/// # Example
///
/// ```ignore
/// use redirectable::Redirectable;
///
/// let client = Redirectable::builder().max_redirects(5).build()?;
///
/// let response = client.https().get("https://example.com/moved")?.response().await?;
/// println!("{} after {} redirects", response.url(), response.redirects().len());
/// ```
#[derive(Clone)]
pub struct Redirectable {
    config: RedirectConfig,
    clients: Agents,
}

impl std::fmt::Debug for Redirectable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Redirectable")
            .field("config", &self.config)
            .field("clients", &self.clients)
            .finish()
    }
}

impl Redirectable {
    /// Create a new builder.
    pub fn builder() -> RedirectableBuilder {
        RedirectableBuilder::new()
    }

    /// Create a wrapper with default limits and hyper native clients.
    pub fn new() -> Result<Self, RedirectError> {
        Self::builder().build()
    }

    pub fn config(&self) -> &RedirectConfig {
        &self.config
    }

    /// The `http:` wrapper.
    pub fn http(&self) -> ProtocolWrapper {
        self.wrapper(Scheme::Http)
    }

    /// The `https:` wrapper.
    pub fn https(&self) -> ProtocolWrapper {
        self.wrapper(Scheme::Https)
    }

    /// The wrapper for `scheme`.
    pub fn wrapper(&self, scheme: Scheme) -> ProtocolWrapper {
        ProtocolWrapper {
            scheme,
            config: self.config,
            clients: self.clients.clone(),
        }
    }
}

/// Builder for [`Redirectable`].
pub struct RedirectableBuilder {
    config: RedirectConfig,
    http: Option<NativeClient>,
    https: Option<NativeClient>,
    default_transports: bool,
}

impl std::fmt::Debug for RedirectableBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedirectableBuilder")
            .field("config", &self.config)
            .field("http", &self.http.is_some())
            .field("https", &self.https.is_some())
            .field("default_transports", &self.default_transports)
            .finish()
    }
}

impl Default for RedirectableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RedirectableBuilder {
    pub fn new() -> Self {
        Self {
            config: RedirectConfig::default(),
            http: None,
            https: None,
            default_transports: true,
        }
    }

    /// Replace all limits at once.
    pub fn config(mut self, config: RedirectConfig) -> Self {
        self.config = config;
        self
    }

    /// Default maximum number of redirects (21).
    pub fn max_redirects(mut self, max: usize) -> Self {
        self.config = self.config.with_max_redirects(max);
        self
    }

    /// Default maximum cumulative request body size (10 MiB).
    pub fn max_body_length(mut self, max: usize) -> Self {
        self.config = self.config.with_max_body_length(max);
        self
    }

    /// Use a custom native client for `http:`.
    pub fn http_client(mut self, client: NativeClient) -> Self {
        self.http = Some(client);
        self
    }

    /// Use a custom native client for `https:`.
    pub fn https_client(mut self, client: NativeClient) -> Self {
        self.https = Some(client);
        self
    }

    /// Use a configured [`HyperTransport`] for `http:`.
    pub fn http_transport(self, transport: HyperTransport) -> Self {
        self.http_client(native_client(transport))
    }

    /// Use a configured [`HyperTransport`] for `https:`.
    pub fn https_transport(self, transport: HyperTransport) -> Self {
        self.https_client(native_client(transport))
    }

    /// Install a default [`HyperTransport`] for schemes without a custom
    /// client (on by default).
    ///
    /// When disabled, only the clients given to this builder (or passed as
    /// per-request [`Agents`]) serve requests.
    pub fn default_transports(mut self, enabled: bool) -> Self {
        self.default_transports = enabled;
        self
    }

    /// Build the wrapper.
    ///
    /// Schemes without a custom client get a default [`HyperTransport`];
    /// `https:` only when TLS support is compiled in.
    pub fn build(self) -> Result<Redirectable, RedirectError> {
        let defaults = self.default_transports;
        let http = match self.http {
            Some(client) => Some(client),
            None if defaults => Some(native_client(HyperTransport::http())),
            None => None,
        };
        let https = match self.https {
            Some(client) => Some(client),
            None if defaults && has_tls_support() => Some(native_client(HyperTransport::https()?)),
            None => None,
        };

        Ok(Redirectable {
            config: self.config,
            clients: Agents { http, https },
        })
    }
}

/// The redirect-following counterpart of one native protocol module.
#[derive(Clone)]
pub struct ProtocolWrapper {
    scheme: Scheme,
    config: RedirectConfig,
    clients: Agents,
}

impl std::fmt::Debug for ProtocolWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolWrapper")
            .field("scheme", &self.scheme)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ProtocolWrapper {
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Start a request.
    ///
    /// The body stays open until [`RedirectableRequest::end`] (or
    /// [`RedirectableRequest::response`]) is called. Must be called from
    /// within a tokio runtime.
    ///
    /// Fails synchronously when the options name another protocol than this
    /// wrapper's, or when no native client serves it.
    pub fn request<O: IntoRequestOptions>(
        &self,
        options: O,
    ) -> Result<RedirectableRequest, RedirectError> {
        self.start(options.into_request_options()?, None)
    }

    /// Start a request whose final response is handed to `callback`.
    pub fn request_with<O, F>(
        &self,
        options: O,
        callback: F,
    ) -> Result<RedirectableRequest, RedirectError>
    where
        O: IntoRequestOptions,
        F: FnOnce(RedirectResponse) + Send + 'static,
    {
        self.start(options.into_request_options()?, Some(Box::new(callback)))
    }

    /// Start a request and end its body immediately.
    pub fn get<O: IntoRequestOptions>(
        &self,
        options: O,
    ) -> Result<RedirectableRequest, RedirectError> {
        let mut request = self.request(options)?;
        request.end()?;
        Ok(request)
    }

    /// [`get`](Self::get) with a response callback.
    pub fn get_with<O, F>(&self, options: O, callback: F) -> Result<RedirectableRequest, RedirectError>
    where
        O: IntoRequestOptions,
        F: FnOnce(RedirectResponse) + Send + 'static,
    {
        let mut request = self.request_with(options, callback)?;
        request.end()?;
        Ok(request)
    }

    fn start(
        &self,
        mut options: RequestOptions,
        callback: Option<ResponseCallback>,
    ) -> Result<RedirectableRequest, RedirectError> {
        match options.protocol {
            None => options.protocol = Some(self.scheme),
            Some(actual) if actual != self.scheme => {
                return Err(RedirectError::ProtocolMismatch {
                    expected: self.scheme,
                    actual,
                });
            }
            Some(_) => {}
        }
        if options.agents.get(self.scheme).is_none() && self.clients.get(self.scheme).is_none() {
            return Err(RedirectError::UnsupportedProtocol {
                protocol: self.scheme.protocol().to_string(),
            });
        }

        let max_redirects = options
            .max_redirects
            .unwrap_or(self.config.max_redirects());
        let max_body_length = options
            .max_body_length
            .unwrap_or(self.config.max_body_length());
        options.max_redirects = Some(max_redirects);
        options.max_body_length = Some(max_body_length);

        tracing::trace!(options = ?options, "starting request");
        Ok(RedirectableRequest::start(
            options,
            self.clients.clone(),
            max_redirects,
            max_body_length,
            callback,
        ))
    }
}
