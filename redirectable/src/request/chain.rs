//! The redirect chain driver.
//!
//! One driver task owns all chain state for a [`RedirectableRequest`]. It
//! multiplexes facade commands, native client events, the in-flight hop and
//! the chain deadline, and guarantees that hop N+1 is only dispatched after
//! hop N's response has been classified.
//!
//! [`RedirectableRequest`]: crate::RedirectableRequest

use std::future::{self, Future};
use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use http::header::LOCATION;
use tokio::sync::mpsc;
use tower::ServiceExt;

use super::deadline::Deadline;
use super::event::{Command, RequestEvent};
use crate::error::{BoxError, RedirectError};
use crate::options::{RequestOptions, Scheme};
use crate::redirect;
use crate::response::{RedirectRecord, RedirectResponse, RequestDescriptor, ResponseHead};
use crate::transport::{
    Agents, BodySender, HopEvents, NativeClient, NativeEvent, ResponseBody, TransportBody,
};

/// Callback receiving the final response instead of the event stream.
pub type ResponseCallback = Box<dyn FnOnce(RedirectResponse) + Send + 'static>;

type HopFuture =
    Pin<Box<dyn Future<Output = Result<http::Response<ResponseBody>, BoxError>> + Send>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ChainState {
    /// Nothing dispatched yet.
    Idle,
    /// A hop is in flight.
    AwaitingResponse,
    Responded,
    Failed,
    Aborted,
    Cancelled,
}

impl ChainState {
    fn is_finished(self) -> bool {
        matches!(
            self,
            ChainState::Responded | ChainState::Failed | ChainState::Aborted | ChainState::Cancelled
        )
    }
}

pub(crate) struct ChainDriver {
    options: RequestOptions,
    clients: Agents,
    max_redirects: usize,
    commands: mpsc::UnboundedReceiver<Command>,
    commands_open: bool,
    events: mpsc::UnboundedSender<RequestEvent>,
    callback: Option<ResponseCallback>,
    native_tx: mpsc::UnboundedSender<(usize, NativeEvent)>,
    native_rx: mpsc::UnboundedReceiver<(usize, NativeEvent)>,
    state: ChainState,
    hop: usize,
    redirect_count: usize,
    redirects: Vec<RedirectRecord>,
    buffer: Vec<Bytes>,
    body_sender: Option<BodySender>,
    discard_body: bool,
    ended: bool,
    deadline: Deadline,
    in_flight: Option<HopFuture>,
}

impl ChainDriver {
    pub(crate) fn new(
        options: RequestOptions,
        clients: Agents,
        max_redirects: usize,
        commands: mpsc::UnboundedReceiver<Command>,
        events: mpsc::UnboundedSender<RequestEvent>,
        callback: Option<ResponseCallback>,
    ) -> Self {
        let (native_tx, native_rx) = mpsc::unbounded_channel();
        Self {
            options,
            clients,
            max_redirects,
            commands,
            commands_open: true,
            events,
            callback,
            native_tx,
            native_rx,
            state: ChainState::Idle,
            hop: 0,
            redirect_count: 0,
            redirects: Vec::new(),
            buffer: Vec::new(),
            body_sender: None,
            discard_body: false,
            ended: false,
            deadline: Deadline::default(),
            in_flight: None,
        }
    }

    pub(crate) async fn run(mut self) {
        while !self.state.is_finished() {
            tokio::select! {
                biased;

                Some((hop, event)) = self.native_rx.recv() => {
                    if hop == self.hop {
                        self.on_native_event(event);
                    }
                }

                result = in_flight_response(&mut self.in_flight) => {
                    self.in_flight = None;
                    self.on_response(result);
                }

                command = self.commands.recv(), if self.commands_open => match command {
                    Some(command) => self.on_command(command),
                    None => self.on_facade_dropped(),
                },

                () = self.deadline.expired() => {
                    self.deadline.clear();
                    tracing::debug!(hop = self.hop, "request timed out");
                    self.emit(RequestEvent::Timeout);
                }
            }
        }
        tracing::trace!(state = ?self.state, redirects = self.redirect_count, "chain finished");
    }

    fn emit(&self, event: RequestEvent) {
        // The facade may be gone; a chain that was ended keeps running anyway.
        let _ = self.events.send(event);
    }

    fn fail(&mut self, error: RedirectError) {
        tracing::debug!(error = %error, code = error.code(), "request failed");
        self.stop_hop();
        self.state = ChainState::Failed;
        self.emit(RequestEvent::Error(error));
    }

    fn stop_hop(&mut self) {
        self.in_flight = None;
        self.body_sender = None;
    }

    fn on_native_event(&mut self, event: NativeEvent) {
        tracing::trace!(hop = self.hop, ?event, "native event");
        match event {
            NativeEvent::Socket(info) => self.emit(RequestEvent::Socket(info)),
            NativeEvent::Connect(head) => self.emit(RequestEvent::Connect(head)),
        }
    }

    fn on_command(&mut self, command: Command) {
        match command {
            Command::Write(chunk) => self.on_write(chunk),
            Command::End(chunk) => {
                if let Some(chunk) = chunk {
                    self.on_write(chunk);
                }
                self.ended = true;
                self.body_sender = None;
                self.ensure_dispatched();
            }
            Command::FlushHeaders => self.ensure_dispatched(),
            Command::SetHeader(name, value) => {
                if self.state == ChainState::Idle {
                    self.options.headers.insert(name, value);
                }
            }
            Command::RemoveHeader(name) => {
                if self.state == ChainState::Idle {
                    self.options.headers.remove(name);
                }
            }
            Command::SetTimeout(at) => self.deadline.set(at),
            Command::Abort => {
                tracing::debug!(hop = self.hop, "request aborted");
                self.stop_hop();
                self.state = ChainState::Aborted;
                self.emit(RequestEvent::Abort);
            }
            Command::Fail(error) => self.fail(error),
        }
    }

    fn on_write(&mut self, chunk: Bytes) {
        if self.discard_body || chunk.is_empty() {
            return;
        }
        self.buffer.push(chunk.clone());
        if self.state == ChainState::Idle {
            self.ensure_dispatched();
        } else if let Some(sender) = &self.body_sender {
            sender.send(chunk);
        }
    }

    fn on_facade_dropped(&mut self) {
        self.commands_open = false;
        if !self.ended {
            tracing::debug!(hop = self.hop, "request dropped before end, cancelling");
            self.stop_hop();
            self.state = ChainState::Cancelled;
        }
    }

    fn ensure_dispatched(&mut self) {
        if self.state != ChainState::Idle {
            return;
        }
        let scheme = self.options.scheme_or(Scheme::Http);
        let dispatched = self
            .client_for(scheme)
            .and_then(|client| Ok((client, request_uri(&self.options)?)));
        match dispatched {
            Ok((client, uri)) => self.dispatch(client, uri),
            Err(error) => self.fail(error),
        }
    }

    fn client_for(&self, scheme: Scheme) -> Result<NativeClient, RedirectError> {
        self.options
            .agents
            .get(scheme)
            .or_else(|| self.clients.get(scheme))
            .cloned()
            .ok_or_else(|| RedirectError::UnsupportedProtocol {
                protocol: scheme.protocol().to_string(),
            })
    }

    /// Body for the next hop, built from what has been written so far.
    fn next_body(&mut self) -> TransportBody {
        if self.discard_body {
            return TransportBody::empty();
        }
        if self.ended {
            return match self.buffer.len() {
                0 => TransportBody::empty(),
                1 => TransportBody::full(self.buffer[0].clone()),
                _ => {
                    let total = self.buffer.iter().map(Bytes::len).sum();
                    let mut data = BytesMut::with_capacity(total);
                    for chunk in &self.buffer {
                        data.extend_from_slice(chunk);
                    }
                    TransportBody::full(data.freeze())
                }
            };
        }
        let (sender, body) = TransportBody::channel();
        for chunk in &self.buffer {
            sender.send(chunk.clone());
        }
        self.body_sender = Some(sender);
        body
    }

    fn dispatch(&mut self, client: NativeClient, uri: http::Uri) {
        let body = self.next_body();

        let mut request = http::Request::new(body);
        *request.method_mut() = self.options.method.clone();
        *request.uri_mut() = uri;
        *request.headers_mut() = self.options.headers.clone();
        request
            .extensions_mut()
            .insert(HopEvents::new(self.hop, self.native_tx.clone()));

        tracing::debug!(
            hop = self.hop,
            method = %self.options.method,
            url = %self.options.url(),
            "dispatching request"
        );
        self.in_flight = Some(Box::pin(client.oneshot(request)));
        self.state = ChainState::AwaitingResponse;
    }

    fn on_response(&mut self, result: Result<http::Response<ResponseBody>, BoxError>) {
        let response = match result {
            Ok(response) => response,
            Err(error) => return self.fail(RedirectError::Transport(error)),
        };
        let (parts, body) = response.into_parts();
        let head = ResponseHead::from_parts(&parts);

        if !self.options.follow_redirects || !redirect::is_redirect(head.status, &head.headers) {
            return self.deliver(head, body);
        }

        let request = self.options.descriptor();
        if let Some(predicate) = &self.options.conditionally_redirect {
            if !predicate.should_redirect(&head, &request) {
                tracing::debug!(status = %head.status, "redirect declined by predicate");
                return self.deliver(head, body);
            }
        }

        // The previous response must be consumed so its connection can be reused.
        tokio::spawn(drain(body));

        self.redirect_count += 1;
        if self.redirect_count > self.max_redirects {
            return self.fail(RedirectError::TooManyRedirects {
                max: self.max_redirects,
            });
        }

        let next = match self.next_options(&head, &request) {
            Ok(next) => next,
            Err(cause) => return self.fail(RedirectError::redirection(cause)),
        };
        let client = match self.client_for(next.scheme_or(Scheme::Http)) {
            Ok(client) => client,
            Err(cause) => return self.fail(RedirectError::redirection(cause)),
        };
        let uri = match request_uri(&next) {
            Ok(uri) => uri,
            Err(cause) => return self.fail(RedirectError::redirection(cause)),
        };

        let record = RedirectRecord {
            url: request.url,
            status: head.status,
            headers: head.headers,
        };
        if self.options.track_redirects {
            self.redirects.push(record.clone());
        }

        tracing::debug!(
            status = %record.status,
            from = %record.url,
            to = %next.url(),
            method = %next.method,
            "redirecting"
        );
        self.options = next;
        self.hop += 1;
        self.emit(RequestEvent::Redirect(record));
        self.dispatch(client, uri);
    }

    /// Options for the hop following `head`, with every redirect rule applied.
    fn next_options(
        &mut self,
        head: &ResponseHead,
        request: &RequestDescriptor,
    ) -> Result<RequestOptions, BoxError> {
        let location = head
            .headers
            .get(LOCATION)
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
            .unwrap_or_default();
        let target = redirect::resolve_location(&self.options, &location)?;

        let previous_scheme = self.options.scheme_or(Scheme::Http);
        let previous_host = redirect::effective_host(&self.options);

        let mut next = self.options.clone();
        let method = redirect::next_method(&next.method, head.status);
        if method != next.method {
            redirect::remove_body_headers(&mut next.headers);
            self.discard_body = true;
            self.buffer.clear();
            self.body_sender = None;
        }
        next.method = method;
        redirect::remove_host_header(&mut next.headers);
        redirect::apply_url(&mut next, &target)?;

        let next_scheme = next.scheme_or(Scheme::Http);
        if redirect::host_of(&target) != previous_host || previous_scheme.is_downgrade_to(next_scheme)
        {
            redirect::drop_sensitive_headers(&mut next.headers);
        }

        if let Some(hook) = next.before_redirect.clone() {
            hook.before_redirect(&mut next, head, request)?;
        }
        Ok(next)
    }

    fn deliver(&mut self, head: ResponseHead, body: ResponseBody) {
        let url = self.options.url();
        tracing::debug!(
            status = %head.status,
            url = %url,
            redirects = self.redirect_count,
            "response received"
        );
        self.deadline.clear();
        self.body_sender = None;
        self.state = ChainState::Responded;

        let response = RedirectResponse::new(head, url, std::mem::take(&mut self.redirects), body);
        match self.callback.take() {
            Some(callback) => callback(response),
            None => self.emit(RequestEvent::Response(response)),
        }
    }
}

async fn in_flight_response(
    in_flight: &mut Option<HopFuture>,
) -> Result<http::Response<ResponseBody>, BoxError> {
    match in_flight {
        Some(future) => future.await,
        None => future::pending().await,
    }
}

async fn drain(mut body: ResponseBody) {
    use http_body_util::BodyExt;

    while let Some(frame) = body.frame().await {
        if let Err(error) = frame {
            tracing::trace!(error = %error, "error draining redirect response");
            break;
        }
    }
}

/// Request target for the native client; the fragment is never sent.
fn request_uri(options: &RequestOptions) -> Result<http::Uri, RedirectError> {
    let scheme = options.scheme_or(Scheme::Http);
    let authority = match options.port {
        Some(port) => format!("{}:{}", options.hostname, port),
        None => options.hostname.clone(),
    };
    let path = if options.path.starts_with('/') {
        options.path.clone()
    } else {
        format!("/{}", options.path)
    };
    format!("{}://{}{}", scheme.as_str(), authority, path)
        .parse()
        .map_err(|_| RedirectError::invalid_url(options.url()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_uri_strips_fragment() {
        let options = RequestOptions::parse("http://localhost:3600/a?x=1#frag").unwrap();
        let uri = request_uri(&options).unwrap();
        assert_eq!(uri.to_string(), "http://localhost:3600/a?x=1");
    }

    #[test]
    fn test_request_uri_relative_path() {
        let options = RequestOptions::new()
            .protocol(Scheme::Https)
            .hostname("example.com")
            .path("b");
        let uri = request_uri(&options).unwrap();
        assert_eq!(uri.to_string(), "https://example.com/b");
    }

    #[test]
    fn test_request_uri_invalid_host() {
        let options = RequestOptions::new().hostname("bad host");
        let err = request_uri(&options).unwrap_err();
        assert_eq!(err.code(), "ERR_INVALID_URL");
    }

    #[test]
    fn test_finished_states() {
        assert!(!ChainState::Idle.is_finished());
        assert!(!ChainState::AwaitingResponse.is_finished());
        assert!(ChainState::Responded.is_finished());
        assert!(ChainState::Aborted.is_finished());
        assert!(ChainState::Cancelled.is_finished());
    }
}
