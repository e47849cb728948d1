use bytes::Bytes;
use http::{HeaderName, HeaderValue};
use tokio::time::Instant;

use crate::error::RedirectError;
use crate::response::{RedirectRecord, RedirectResponse, ResponseHead};
use crate::transport::ConnectionInfo;

/// Events observed on a [`RedirectableRequest`](crate::RedirectableRequest).
///
/// Events of superseded hops are never delivered. A chain emits at most one
/// terminal event: [`Response`](Self::Response), [`Error`](Self::Error) or
/// [`Abort`](Self::Abort).
#[derive(Debug)]
pub enum RequestEvent {
    /// The active hop got a connection.
    Socket(ConnectionInfo),
    /// The active hop was a `CONNECT` that succeeded.
    Connect(ResponseHead),
    /// A redirect was followed; the next hop is being dispatched.
    Redirect(RedirectRecord),
    /// The deadline set with `set_timeout` passed. The chain keeps running.
    Timeout,
    /// The final response.
    Response(RedirectResponse),
    /// The chain was aborted by the caller.
    Abort,
    /// The chain failed.
    Error(RedirectError),
}

impl RequestEvent {
    /// Whether no further events follow this one.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestEvent::Response(_) | RequestEvent::Abort | RequestEvent::Error(_)
        )
    }
}

/// Instructions from the facade to the chain driver.
#[derive(Debug)]
pub(crate) enum Command {
    Write(Bytes),
    End(Option<Bytes>),
    FlushHeaders,
    SetHeader(HeaderName, HeaderValue),
    RemoveHeader(HeaderName),
    SetTimeout(Option<Instant>),
    Abort,
    Fail(RedirectError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_events() {
        assert!(RequestEvent::Abort.is_terminal());
        assert!(RequestEvent::Error(RedirectError::Aborted).is_terminal());
        assert!(!RequestEvent::Timeout.is_terminal());
        assert!(!RequestEvent::Socket(ConnectionInfo::default()).is_terminal());
    }
}
