//! The public request facade.
//!
//! A [`RedirectableRequest`] is created once per logical request and lives
//! for the whole redirect chain. Body writes, header edits, aborts and
//! timeouts all go through it regardless of how many hops happen underneath,
//! and it exposes one ordered event stream for the whole chain.
//!
//! # Cancellation
//!
//! Dropping the facade before [`end`](RedirectableRequest::end) cancels the
//! chain. Dropping it after `end` lets the chain run to completion, so a
//! response callback registered with
//! [`ProtocolWrapper::request_with`](crate::ProtocolWrapper::request_with)
//! still fires.

mod chain;
mod deadline;
mod event;

use std::time::Duration;

use bytes::Bytes;
use http::header::AsHeaderName;
use http::{HeaderMap, HeaderName, HeaderValue};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::Instrument;

use crate::config::BodyLimit;
use crate::error::RedirectError;
use crate::options::RequestOptions;
use crate::response::RedirectResponse;
use crate::transport::Agents;

pub use chain::ResponseCallback;
pub use event::RequestEvent;

use chain::ChainDriver;
use event::Command;

/// A request that transparently follows redirects.
///
/// # Example
///
/// ```ignore
/// use redirectable::{Redirectable, RequestEvent};
///
/// let client = Redirectable::new()?;
/// let mut request = client.http().request("http://localhost:3000/upload")?;
/// request.set_header(http::header::CONTENT_TYPE, "text/plain".parse()?)?;
/// request.write("hello ")?;
/// request.end_with("world")?;
///
/// while let Some(event) = request.next_event().await {
///     match event {
///         RequestEvent::Redirect(record) => println!("{} -> moved", record.url),
///         RequestEvent::Response(response) => {
///             println!("{} from {}", response.status(), response.url());
///             break;
///         }
///         RequestEvent::Error(err) => return Err(err.into()),
///         _ => {}
///     }
/// }
/// ```
#[derive(Debug)]
pub struct RedirectableRequest {
    commands: mpsc::UnboundedSender<Command>,
    events: mpsc::UnboundedReceiver<RequestEvent>,
    limit: BodyLimit,
    headers: HeaderMap,
    headers_sent: bool,
    ended: bool,
    aborted: bool,
    body_too_large: bool,
}

impl RedirectableRequest {
    /// Spawn the chain driver and return the facade.
    ///
    /// `options` must already carry its protocol and limits.
    pub(crate) fn start(
        options: RequestOptions,
        clients: Agents,
        max_redirects: usize,
        max_body_length: usize,
        callback: Option<ResponseCallback>,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let span = tracing::info_span!(
            "redirect.chain",
            url = %options.url(),
            method = %options.method,
        );
        let headers = options.headers.clone();
        let driver = ChainDriver::new(
            options,
            clients,
            max_redirects,
            command_rx,
            event_tx,
            callback,
        );
        tokio::spawn(driver.run().instrument(span));

        Self {
            commands: command_tx,
            events: event_rx,
            limit: BodyLimit::new(max_body_length),
            headers,
            headers_sent: false,
            ended: false,
            aborted: false,
            body_too_large: false,
        }
    }

    fn send(&self, command: Command) {
        // A finished chain ignores further commands.
        let _ = self.commands.send(command);
    }

    fn check_writable(&self) -> Result<(), RedirectError> {
        if self.body_too_large {
            return Err(RedirectError::BodyTooLarge {
                limit: self.limit.limit(),
            });
        }
        if self.ended {
            return Err(RedirectError::WriteAfterEnd);
        }
        if self.aborted {
            return Err(RedirectError::Aborted);
        }
        Ok(())
    }

    /// Count `len` bytes against the body limit, failing the chain when exceeded.
    fn account(&mut self, len: usize) -> Result<(), RedirectError> {
        if let Err(error) = self.limit.check_size(len) {
            self.body_too_large = true;
            self.send(Command::Fail(RedirectError::BodyTooLarge {
                limit: self.limit.limit(),
            }));
            return Err(error);
        }
        Ok(())
    }

    /// Write a chunk of the request body.
    ///
    /// The first non-empty write dispatches the first hop. Chunks are kept so
    /// they can be replayed on a 307/308 redirect.
    pub fn write(&mut self, chunk: impl Into<Bytes>) -> Result<(), RedirectError> {
        self.check_writable()?;
        let chunk = chunk.into();
        if chunk.is_empty() {
            return Ok(());
        }
        self.account(chunk.len())?;
        self.headers_sent = true;
        self.send(Command::Write(chunk));
        Ok(())
    }

    /// Finish the request body. Ending twice is a no-op.
    pub fn end(&mut self) -> Result<(), RedirectError> {
        self.finish(None)
    }

    /// Write a final chunk and finish the request body.
    pub fn end_with(&mut self, chunk: impl Into<Bytes>) -> Result<(), RedirectError> {
        self.finish(Some(chunk.into()))
    }

    fn finish(&mut self, chunk: Option<Bytes>) -> Result<(), RedirectError> {
        if self.ended {
            return Ok(());
        }
        if self.body_too_large || self.aborted {
            self.check_writable()?;
        }
        let chunk = chunk.filter(|chunk| !chunk.is_empty());
        if let Some(chunk) = &chunk {
            self.account(chunk.len())?;
        }
        self.ended = true;
        self.headers_sent = true;
        self.send(Command::End(chunk));
        Ok(())
    }

    /// Abort the chain. Only the first call has an effect.
    pub fn abort(&mut self) {
        if self.aborted {
            return;
        }
        self.aborted = true;
        self.send(Command::Abort);
    }

    /// Alias of [`abort`](Self::abort).
    pub fn destroy(&mut self) {
        self.abort();
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Arm the chain deadline, replacing any previous one.
    ///
    /// When it passes a [`RequestEvent::Timeout`] is emitted once. The chain
    /// is not aborted; [`response`](Self::response) aborts on timeout.
    /// A zero duration disarms the deadline.
    pub fn set_timeout(&mut self, timeout: Duration) {
        let at = (!timeout.is_zero()).then(|| Instant::now() + timeout);
        self.send(Command::SetTimeout(at));
    }

    /// Dispatch the first hop without ending the body.
    pub fn flush_headers(&mut self) {
        self.headers_sent = true;
        self.send(Command::FlushHeaders);
    }

    /// Whether the first hop has been dispatched.
    pub fn headers_sent(&self) -> bool {
        self.headers_sent
    }

    /// Set a header on the first hop.
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) -> Result<(), RedirectError> {
        if self.headers_sent {
            return Err(RedirectError::HeadersSent);
        }
        self.headers.insert(name.clone(), value.clone());
        self.send(Command::SetHeader(name, value));
        Ok(())
    }

    /// Look up a header of the first hop.
    pub fn get_header<K: AsHeaderName>(&self, name: K) -> Option<&HeaderValue> {
        self.headers.get(name)
    }

    /// Remove a header from the first hop.
    pub fn remove_header(&mut self, name: HeaderName) -> Result<(), RedirectError> {
        if self.headers_sent {
            return Err(RedirectError::HeadersSent);
        }
        self.headers.remove(&name);
        self.send(Command::RemoveHeader(name));
        Ok(())
    }

    /// Wait for the next event of the chain.
    ///
    /// Returns `None` once the chain has finished and every event was read.
    pub async fn next_event(&mut self) -> Option<RequestEvent> {
        self.events.recv().await
    }

    /// End the body if needed and wait for the final response.
    ///
    /// A timeout aborts the chain and yields [`RedirectError::Timeout`].
    pub async fn response(mut self) -> Result<RedirectResponse, RedirectError> {
        if !self.ended && !self.aborted && !self.body_too_large {
            self.end()?;
        }
        while let Some(event) = self.next_event().await {
            match event {
                RequestEvent::Response(response) => return Ok(response),
                RequestEvent::Error(error) => return Err(error),
                RequestEvent::Abort => return Err(RedirectError::Aborted),
                RequestEvent::Timeout => {
                    self.abort();
                    return Err(RedirectError::Timeout);
                }
                RequestEvent::Socket(_) | RequestEvent::Connect(_) | RequestEvent::Redirect(_) => {}
            }
        }
        Err(RedirectError::NoResponse)
    }
}
