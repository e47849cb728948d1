//! Scripted in-memory native clients for chain tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use http_body_util::{BodyExt, Full};
use redirectable::transport::{native_client, ConnectionInfo, HopEvents, NativeClient, TransportBody};

/// A request as seen by the mock server.
#[derive(Clone, Debug)]
pub struct Recorded {
    pub method: Method,
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

type Handler = Arc<dyn Fn(&Recorded) -> http::Response<Full<Bytes>> + Send + Sync>;

#[derive(Clone)]
enum Route {
    Respond(Handler),
    /// Answer without waiting for the request body.
    RespondEarly(Handler),
    Hang,
    Fail(&'static str),
}

/// Routes keyed by absolute URI (`http://localhost/a`).
#[derive(Clone, Default)]
pub struct MockServer {
    routes: Arc<Mutex<HashMap<String, Route>>>,
    log: Arc<Mutex<Vec<Recorded>>>,
    socket: Option<SocketAddr>,
}

impl MockServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a socket event with this remote address for every hop.
    pub fn with_socket(mut self, addr: &str) -> Self {
        self.socket = Some(addr.parse().unwrap());
        self
    }

    pub fn route<F>(self, uri: &str, handler: F) -> Self
    where
        F: Fn(&Recorded) -> http::Response<Full<Bytes>> + Send + Sync + 'static,
    {
        self.routes
            .lock()
            .unwrap()
            .insert(uri.to_string(), Route::Respond(Arc::new(handler)));
        self
    }

    pub fn redirect(self, uri: &str, status: u16, location: &'static str) -> Self {
        self.route(uri, move |_| {
            http::Response::builder()
                .status(status)
                .header("location", location)
                .header("x-hop", "redirect")
                .body(Full::new(Bytes::from_static(b"redirecting")))
                .unwrap()
        })
    }

    /// Redirect as soon as the request head arrives, leaving the body unread.
    pub fn redirect_early(self, uri: &str, status: u16, location: &'static str) -> Self {
        self.routes.lock().unwrap().insert(
            uri.to_string(),
            Route::RespondEarly(Arc::new(move |_: &Recorded| {
                http::Response::builder()
                    .status(status)
                    .header("location", location)
                    .body(Full::new(Bytes::new()))
                    .unwrap()
            })),
        );
        self
    }

    pub fn ok(self, uri: &str, body: &'static str) -> Self {
        self.route(uri, move |_| {
            http::Response::builder()
                .status(StatusCode::OK)
                .header("content-type", "application/json")
                .body(Full::new(Bytes::from_static(body.as_bytes())))
                .unwrap()
        })
    }

    /// Echo `METHOD body` back.
    pub fn echo(self, uri: &str) -> Self {
        self.route(uri, |req| {
            let text = format!("{} {}", req.method, String::from_utf8_lossy(&req.body));
            http::Response::new(Full::new(Bytes::from(text)))
        })
    }

    /// Never answer requests to `uri`.
    pub fn hang(self, uri: &str) -> Self {
        self.routes.lock().unwrap().insert(uri.to_string(), Route::Hang);
        self
    }

    /// Fail requests to `uri` with a transport error.
    pub fn fail(self, uri: &str, message: &'static str) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert(uri.to_string(), Route::Fail(message));
        self
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.log.lock().unwrap().clone()
    }

    pub fn client(&self) -> NativeClient {
        let server = self.clone();
        native_client(tower::service_fn(move |req: http::Request<TransportBody>| {
            let server = server.clone();
            async move { server.serve(req).await }
        }))
    }

    async fn serve(
        &self,
        req: http::Request<TransportBody>,
    ) -> Result<http::Response<Full<Bytes>>, redirectable::BoxError> {
        let (parts, body) = req.into_parts();
        if let (Some(events), Some(addr)) = (parts.extensions.get::<HopEvents>(), self.socket) {
            events.socket(ConnectionInfo {
                remote_addr: Some(addr),
                local_addr: None,
            });
        }

        let uri = parts.uri.to_string();
        let route = self.routes.lock().unwrap().get(&uri).cloned();
        let body = match route {
            Some(Route::RespondEarly(_)) => Bytes::new(),
            _ => body.collect().await?.to_bytes(),
        };
        let recorded = Recorded {
            method: parts.method,
            uri,
            headers: parts.headers,
            body,
        };
        self.log.lock().unwrap().push(recorded.clone());

        match route {
            Some(Route::Respond(handler)) | Some(Route::RespondEarly(handler)) => {
                Ok(handler(&recorded))
            }
            Some(Route::Hang) => std::future::pending().await,
            Some(Route::Fail(message)) => Err(message.into()),
            None => Ok(http::Response::builder()
                .status(StatusCode::NOT_FOUND)
                .body(Full::new(Bytes::new()))
                .unwrap()),
        }
    }
}
