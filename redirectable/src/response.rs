//! Response types for redirect-following requests.
//!
//! This module provides [`RedirectResponse`], the final non-redirect response
//! of a chain, along with the lightweight snapshots handed to hooks and
//! recorded when redirects are tracked.

use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode, Version};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;

use crate::error::RedirectError;
use crate::transport::ResponseBody;

/// Status line and headers of a response, without the body.
#[derive(Clone, Debug)]
pub struct ResponseHead {
    pub status: StatusCode,
    pub version: Version,
    pub headers: HeaderMap,
}

impl ResponseHead {
    pub(crate) fn from_parts(parts: &http::response::Parts) -> Self {
        Self {
            status: parts.status,
            version: parts.version,
            headers: parts.headers.clone(),
        }
    }
}

/// The request a hop sent, as seen by [`BeforeRedirect`](crate::BeforeRedirect) hooks.
#[derive(Clone, Debug)]
pub struct RequestDescriptor {
    /// Absolute URL of the hop, including any fragment.
    pub url: String,
    pub method: Method,
    pub headers: HeaderMap,
}

/// One followed redirect: the URL that was requested and the 3xx response
/// that moved it elsewhere.
#[derive(Clone, Debug, PartialEq)]
pub struct RedirectRecord {
    pub url: String,
    pub status: StatusCode,
    pub headers: HeaderMap,
}

/// The final response of a redirect chain.
///
/// Wraps the native response with the URL it was fetched from and, when
/// `track_redirects` is enabled, the redirect history.
///
/// # Example
///
/// ```ignore
/// let response = http.get("http://localhost:3000/a")?.response().await?;
///
/// println!("fetched {} -> {}", response.status(), response.url());
/// for hop in response.redirects() {
///     println!("  {} {:?}", hop.url, hop.status);
/// }
/// let body = response.text().await?;
/// ```
pub struct RedirectResponse {
    head: ResponseHead,
    url: String,
    redirects: Vec<RedirectRecord>,
    body: ResponseBody,
}

impl RedirectResponse {
    pub(crate) fn new(
        head: ResponseHead,
        url: String,
        redirects: Vec<RedirectRecord>,
        body: ResponseBody,
    ) -> Self {
        Self {
            head,
            url,
            redirects,
            body,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.head.status
    }

    pub fn version(&self) -> Version {
        self.head.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.head.headers
    }

    /// Status line and headers.
    pub fn head(&self) -> &ResponseHead {
        &self.head
    }

    /// Absolute URL of the hop that produced this response.
    ///
    /// Carries the fragment of the last Location that had one.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Redirect history; empty unless `track_redirects` was enabled.
    pub fn redirects(&self) -> &[RedirectRecord] {
        &self.redirects
    }

    pub fn body_mut(&mut self) -> &mut ResponseBody {
        &mut self.body
    }

    pub fn into_body(self) -> ResponseBody {
        self.body
    }

    /// Convert into a plain `http::Response`, dropping URL and history.
    pub fn into_http(self) -> http::Response<ResponseBody> {
        let mut response = http::Response::new(self.body);
        *response.status_mut() = self.head.status;
        *response.version_mut() = self.head.version;
        *response.headers_mut() = self.head.headers;
        response
    }

    /// Collect the whole body.
    pub async fn bytes(self) -> Result<Bytes, RedirectError> {
        let collected = self
            .body
            .collect()
            .await
            .map_err(RedirectError::Transport)?;
        Ok(collected.to_bytes())
    }

    /// Collect the body as UTF-8, replacing invalid sequences.
    pub async fn text(self) -> Result<String, RedirectError> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Collect the body and deserialize it as JSON.
    pub async fn json<T: DeserializeOwned>(self) -> Result<T, RedirectError> {
        let bytes = self.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Read and discard the remaining body so the connection can be reused.
    pub async fn drain(mut self) -> Result<(), RedirectError> {
        while let Some(frame) = self.body.frame().await {
            frame.map_err(RedirectError::Transport)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for RedirectResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedirectResponse")
            .field("status", &self.head.status)
            .field("version", &self.head.version)
            .field("url", &self.url)
            .field("headers", &self.head.headers)
            .field("redirects", &self.redirects.len())
            .finish()
    }
}
