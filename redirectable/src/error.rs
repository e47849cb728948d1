//! Error types for redirect-following requests.
//!
//! This module provides [`RedirectError`], the single error type surfaced by a
//! [`RedirectableRequest`](crate::RedirectableRequest) and by the protocol
//! wrappers that construct it.

use crate::options::Scheme;

/// Boxed error used at the native client seam.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors produced while building or driving a redirect chain.
///
/// Every chain reports at most one of these through its event stream. The
/// construction-time variants ([`ProtocolMismatch`](Self::ProtocolMismatch),
/// [`InvalidUrl`](Self::InvalidUrl) and
/// [`UnsupportedProtocol`](Self::UnsupportedProtocol)) are returned
/// synchronously from [`ProtocolWrapper::request`](crate::ProtocolWrapper::request).
#[derive(Debug, thiserror::Error)]
pub enum RedirectError {
    /// The chain needed more hops than `max_redirects` allows.
    #[error("maximum number of redirects exceeded ({max})")]
    TooManyRedirects { max: usize },

    /// The cumulative request body exceeded `max_body_length`.
    #[error("request body larger than maxBodyLength limit ({limit} bytes)")]
    BodyTooLarge { limit: usize },

    /// Computing the next hop failed (bad Location, unsupported target
    /// protocol, a `before_redirect` hook error, ...).
    #[error("redirected request failed: {source}")]
    Redirection {
        #[source]
        source: BoxError,
    },

    /// A URL (or Location header) could not be parsed.
    #[error("invalid URL: {input}")]
    InvalidUrl { input: String },

    /// A header name or value given at construction time is not valid HTTP.
    #[error("invalid header {what}: {input:?}")]
    InvalidHeader { what: &'static str, input: String },

    /// The URL uses a scheme with no registered native client.
    #[error("unsupported protocol {protocol:?}")]
    UnsupportedProtocol { protocol: String },

    /// The options name a protocol other than the wrapper's.
    #[error("protocol mismatch: expected {expected}, got {actual}")]
    ProtocolMismatch { expected: Scheme, actual: Scheme },

    /// A write arrived after `end()`.
    #[error("write after end")]
    WriteAfterEnd,

    /// Headers were edited after the first hop was dispatched.
    #[error("cannot modify headers after they are sent")]
    HeadersSent,

    /// The chain was aborted by the caller.
    #[error("request aborted")]
    Aborted,

    /// The chain deadline set through `set_timeout` expired.
    #[error("request timed out")]
    Timeout,

    /// The chain ended without delivering a response to this caller
    /// (for example because a response callback consumed it).
    #[error("request finished without a response")]
    NoResponse,

    /// Error from the native client, passed through verbatim.
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),

    /// The response body could not be decoded as JSON.
    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl RedirectError {
    /// Wrap an error raised while computing the next hop.
    pub fn redirection<E: Into<BoxError>>(cause: E) -> Self {
        RedirectError::Redirection {
            source: cause.into(),
        }
    }

    /// Create an invalid URL error for the given input.
    pub fn invalid_url<S: Into<String>>(input: S) -> Self {
        RedirectError::InvalidUrl {
            input: input.into(),
        }
    }

    /// Stable error code, in the spirit of Node's `error.code`.
    pub fn code(&self) -> &'static str {
        match self {
            RedirectError::TooManyRedirects { .. } => "ERR_FR_TOO_MANY_REDIRECTS",
            RedirectError::BodyTooLarge { .. } => "ERR_FR_MAX_BODY_LENGTH_EXCEEDED",
            RedirectError::Redirection { .. } => "ERR_FR_REDIRECTION_FAILURE",
            RedirectError::InvalidUrl { .. } => "ERR_INVALID_URL",
            RedirectError::InvalidHeader { .. } => "ERR_INVALID_HTTP_TOKEN",
            RedirectError::UnsupportedProtocol { .. } => "ERR_UNSUPPORTED_PROTOCOL",
            RedirectError::ProtocolMismatch { .. } => "ERR_PROTOCOL_MISMATCH",
            RedirectError::WriteAfterEnd => "ERR_STREAM_WRITE_AFTER_END",
            RedirectError::HeadersSent => "ERR_HTTP_HEADERS_SENT",
            RedirectError::Aborted => "ERR_FR_ABORTED",
            RedirectError::Timeout => "ERR_FR_TIMEOUT",
            RedirectError::NoResponse => "ERR_FR_NO_RESPONSE",
            RedirectError::Transport(_) => "ERR_FR_TRANSPORT",
            RedirectError::Decode(_) => "ERR_FR_DECODE",
        }
    }

    /// Returns true for [`TooManyRedirects`](Self::TooManyRedirects).
    pub fn is_redirect_limit(&self) -> bool {
        matches!(self, RedirectError::TooManyRedirects { .. })
    }

    /// Returns true for [`BodyTooLarge`](Self::BodyTooLarge).
    pub fn is_body_too_large(&self) -> bool {
        matches!(self, RedirectError::BodyTooLarge { .. })
    }

    /// Returns true for [`Redirection`](Self::Redirection).
    pub fn is_redirection_failure(&self) -> bool {
        matches!(self, RedirectError::Redirection { .. })
    }

    /// Returns true for errors passed through from the native client.
    pub fn is_transport(&self) -> bool {
        matches!(self, RedirectError::Transport(_))
    }

    /// The originating cause of a [`Redirection`](Self::Redirection) error.
    pub fn redirection_cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            RedirectError::Redirection { source } => Some(source.as_ref()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            RedirectError::TooManyRedirects { max: 21 }.code(),
            "ERR_FR_TOO_MANY_REDIRECTS"
        );
        assert_eq!(
            RedirectError::BodyTooLarge { limit: 10 }.code(),
            "ERR_FR_MAX_BODY_LENGTH_EXCEEDED"
        );
        assert_eq!(
            RedirectError::redirection("boom").code(),
            "ERR_FR_REDIRECTION_FAILURE"
        );
        assert_eq!(RedirectError::invalid_url("/relative").code(), "ERR_INVALID_URL");
        assert_eq!(RedirectError::WriteAfterEnd.code(), "ERR_STREAM_WRITE_AFTER_END");
    }

    #[test]
    fn test_redirection_keeps_cause() {
        let err = RedirectError::redirection(RedirectError::invalid_url("http://[bad"));
        assert!(err.is_redirection_failure());
        assert_eq!(
            err.to_string(),
            "redirected request failed: invalid URL: http://[bad"
        );

        let cause = err.source().expect("cause");
        assert_eq!(cause.to_string(), "invalid URL: http://[bad");
        assert!(err.redirection_cause().is_some());
    }

    #[test]
    fn test_predicates() {
        assert!(RedirectError::TooManyRedirects { max: 1 }.is_redirect_limit());
        assert!(RedirectError::BodyTooLarge { limit: 1 }.is_body_too_large());
        assert!(RedirectError::Transport("connection refused".into()).is_transport());
        assert!(!RedirectError::Aborted.is_transport());
    }

    #[test]
    fn test_protocol_mismatch_message() {
        let err = RedirectError::ProtocolMismatch {
            expected: Scheme::Http,
            actual: Scheme::Https,
        };
        assert_eq!(err.to_string(), "protocol mismatch: expected http:, got https:");
    }
}
