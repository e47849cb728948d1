//! The seam between a redirect chain and the per-scheme native clients.

use std::net::SocketAddr;

use bytes::Bytes;
use http_body::Body;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::BodyExt;
use tokio::sync::mpsc;
use tower::util::BoxCloneService;
use tower::{Service, ServiceExt};

use super::body::TransportBody;
use crate::error::BoxError;
use crate::options::Scheme;
use crate::response::ResponseHead;

/// Response body type produced by every native client.
pub type ResponseBody = UnsyncBoxBody<Bytes, BoxError>;

/// A type-erased native protocol client.
///
/// Any `tower::Service` taking `http::Request<TransportBody>` can be adapted
/// with [`native_client`].
pub type NativeClient =
    BoxCloneService<http::Request<TransportBody>, http::Response<ResponseBody>, BoxError>;

/// Box an arbitrary response body into a [`ResponseBody`].
pub fn boxed_body<B>(body: B) -> ResponseBody
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    body.map_err(Into::into).boxed_unsync()
}

/// Adapt a tower service into a [`NativeClient`].
///
/// # Example
///
/// ```ignore
/// use redirectable::transport::{native_client, TransportBody};
///
/// let client = native_client(tower::service_fn(|req: http::Request<TransportBody>| async move {
///     Ok::<_, std::convert::Infallible>(http::Response::new(http_body_util::Empty::<bytes::Bytes>::new()))
/// }));
/// ```
pub fn native_client<S, B>(service: S) -> NativeClient
where
    S: Service<http::Request<TransportBody>, Response = http::Response<B>>
        + Clone
        + Send
        + 'static,
    S::Error: Into<BoxError>,
    S::Future: Send + 'static,
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    BoxCloneService::new(
        service
            .map_response(|response: http::Response<B>| response.map(boxed_body))
            .map_err(|err: S::Error| -> BoxError { err.into() }),
    )
}

/// Per-scheme connection pools that override a wrapper's native clients.
#[derive(Clone, Default)]
pub struct Agents {
    pub http: Option<NativeClient>,
    pub https: Option<NativeClient>,
}

impl Agents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_http(mut self, client: NativeClient) -> Self {
        self.http = Some(client);
        self
    }

    pub fn with_https(mut self, client: NativeClient) -> Self {
        self.https = Some(client);
        self
    }

    /// The agent registered for `scheme`, if any.
    pub fn get(&self, scheme: Scheme) -> Option<&NativeClient> {
        match scheme {
            Scheme::Http => self.http.as_ref(),
            Scheme::Https => self.https.as_ref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.http.is_none() && self.https.is_none()
    }
}

impl std::fmt::Debug for Agents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agents")
            .field("http", &self.http.is_some())
            .field("https", &self.https.is_some())
            .finish()
    }
}

/// Addresses of the connection a hop was sent on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub remote_addr: Option<SocketAddr>,
    pub local_addr: Option<SocketAddr>,
}

/// Events a native client reports while serving one hop.
#[derive(Clone, Debug)]
pub enum NativeEvent {
    /// A connection was assigned to the hop.
    Socket(ConnectionInfo),
    /// A `CONNECT` request was answered with a 2xx.
    Connect(ResponseHead),
}

/// Reporter placed in the request extensions of every hop.
///
/// Native clients look it up with
/// `request.extensions().get::<HopEvents>()` and report connection events
/// through it. Events from superseded hops are ignored by the chain.
#[derive(Clone, Debug)]
pub struct HopEvents {
    hop: usize,
    tx: mpsc::UnboundedSender<(usize, NativeEvent)>,
}

impl HopEvents {
    pub(crate) fn new(hop: usize, tx: mpsc::UnboundedSender<(usize, NativeEvent)>) -> Self {
        Self { hop, tx }
    }

    /// Index of the hop this reporter belongs to (0 for the first request).
    pub fn hop(&self) -> usize {
        self.hop
    }

    pub fn socket(&self, info: ConnectionInfo) {
        self.emit(NativeEvent::Socket(info));
    }

    pub fn connect(&self, head: ResponseHead) {
        self.emit(NativeEvent::Connect(head));
    }

    pub fn emit(&self, event: NativeEvent) {
        // The chain may already be gone.
        let _ = self.tx.send((self.hop, event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::Full;

    #[tokio::test]
    async fn test_native_client_adapter() {
        let client = native_client(tower::service_fn(
            |req: http::Request<TransportBody>| async move {
                let body = Full::new(Bytes::from(req.uri().path().to_string()));
                Ok::<_, std::convert::Infallible>(http::Response::new(body))
            },
        ));

        let request = http::Request::builder()
            .uri("http://localhost/echo")
            .body(TransportBody::empty())
            .unwrap();
        let response = client.oneshot(request).await.unwrap();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, Bytes::from("/echo"));
    }

    #[test]
    fn test_agents_lookup() {
        let client = native_client(tower::service_fn(
            |_req: http::Request<TransportBody>| async move {
                Ok::<_, std::convert::Infallible>(http::Response::new(Full::new(Bytes::new())))
            },
        ));
        let agents = Agents::new().with_https(client);
        assert!(agents.get(Scheme::Https).is_some());
        assert!(agents.get(Scheme::Http).is_none());
        assert!(!agents.is_empty());
        assert!(Agents::default().is_empty());
    }

    #[test]
    fn test_hop_events_tagging() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let events = HopEvents::new(3, tx);
        events.socket(ConnectionInfo::default());

        let (hop, event) = rx.try_recv().unwrap();
        assert_eq!(hop, 3);
        assert!(matches!(event, NativeEvent::Socket(_)));
    }

    #[test]
    fn test_hop_events_after_chain_dropped() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        HopEvents::new(0, tx).socket(ConnectionInfo::default());
    }
}
