//! # Web façade: the embedded management surface.
//!
//! [`WebFacade`] is the lifecycle-visible front of the management/HTTP
//! surface. It is a plain [`Service`]: the orchestrator can attach it as a
//! runtime dependency and it participates in start/stop like any other
//! subsystem. Driver-specific serving (accept loop, TLS, real HTTP parsing)
//! lives behind this façade and is out of scope here; what this module fixes
//! is the contract drivers and handlers code against:
//!
//! - routes are registered before `finalize()` seals the application;
//! - handlers are async and produce a [`Response`];
//! - [`WebFacade::text`] and [`WebFacade::bytes`] are the response
//!   primitives every driver must support.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::services::{Node, Service};

/// Default content type for [`WebFacade::text`] responses.
const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Default content type for [`WebFacade::bytes`] responses.
const BINARY_CONTENT_TYPE: &str = "application/octet-stream";

/// Minimal request view handed to route handlers.
#[derive(Clone, Debug)]
pub struct Request {
    /// HTTP method, uppercase.
    pub method: String,
    /// Request path, starting with `/`.
    pub path: String,
}

/// Response produced by a route handler.
#[derive(Clone, Debug)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Content type of the body.
    pub content_type: String,
    /// Raw body bytes.
    pub body: Vec<u8>,
}

/// Async route handler.
pub type Handler = Arc<dyn Fn(Request) -> BoxFuture<'static, Response> + Send + Sync>;

/// Lifecycle front of the embedded web surface.
pub struct WebFacade {
    node: Node,
    host: String,
    port: u16,
    routes: Mutex<Vec<(String, Handler)>>,
}

impl WebFacade {
    /// Creates a façade bound to `host:port`. Nothing listens until start.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            node: Node::new("web"),
            host: host.into(),
            port,
            routes: Mutex::new(Vec::new()),
        }
    }

    /// The configured bind host.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The configured bind port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// The canonical root URL of this surface.
    pub fn url(&self) -> String {
        format!("http://{}:{}/", self.host, self.port)
    }

    /// Registers a handler for `pattern`. Registration order is preserved;
    /// the first matching pattern wins.
    pub fn route<F, Fut>(&self, pattern: impl Into<String>, handler: F)
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Response> + Send + 'static,
    {
        let handler: Handler = Arc::new(move |req| Box::pin(handler(req)));
        self.routes.lock().unwrap().push((pattern.into(), handler));
    }

    /// The registered routes, in registration order.
    pub fn routes(&self) -> Vec<(String, Handler)> {
        self.routes.lock().unwrap().clone()
    }

    /// Finds the handler for `path` (exact match, first registered wins).
    pub fn resolve(&self, path: &str) -> Option<Handler> {
        self.routes
            .lock()
            .unwrap()
            .iter()
            .find(|(pattern, _)| pattern == path)
            .map(|(_, handler)| Arc::clone(handler))
    }

    /// Builds a plain-text response.
    pub fn text(&self, status: u16, body: impl Into<String>) -> Response {
        Response {
            status,
            content_type: TEXT_CONTENT_TYPE.to_string(),
            body: body.into().into_bytes(),
        }
    }

    /// Builds a raw-bytes response; `content_type` defaults to
    /// `application/octet-stream` when not given.
    pub fn bytes(&self, status: u16, body: Vec<u8>, content_type: Option<&str>) -> Response {
        Response {
            status,
            content_type: content_type.unwrap_or(BINARY_CONTENT_TYPE).to_string(),
            body,
        }
    }
}

#[async_trait]
impl Service for WebFacade {
    fn node(&self) -> &Node {
        &self.node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{ServiceExt, State};

    #[test]
    fn test_url_reflects_bind_address() {
        let web = WebFacade::new("0.0.0.0", 6066);
        assert_eq!(web.url(), "http://0.0.0.0:6066/");
    }

    #[tokio::test]
    async fn test_routes_resolve_in_registration_order() {
        let web = Arc::new(WebFacade::new("127.0.0.1", 6066));

        let first = Arc::clone(&web);
        web.route("/ping", move |_req| {
            let resp = first.text(200, "pong");
            async move { resp }
        });
        let shadowed = Arc::clone(&web);
        web.route("/ping", move |_req| {
            let resp = shadowed.text(500, "never");
            async move { resp }
        });

        let handler = web.resolve("/ping").expect("route registered");
        let resp = handler(Request {
            method: "GET".to_string(),
            path: "/ping".to_string(),
        })
        .await;
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, b"pong");
        assert!(web.resolve("/missing").is_none());
    }

    #[tokio::test]
    async fn test_response_primitives_set_content_types() {
        let web = WebFacade::new("127.0.0.1", 6066);
        let text = web.text(200, "ok");
        assert_eq!(text.content_type, "text/plain; charset=utf-8");

        let raw = web.bytes(200, vec![1, 2, 3], None);
        assert_eq!(raw.content_type, "application/octet-stream");

        let tagged = web.bytes(200, vec![], Some("application/json"));
        assert_eq!(tagged.content_type, "application/json");
    }

    #[tokio::test]
    async fn test_facade_participates_in_the_lifecycle() {
        let web = Arc::new(WebFacade::new("127.0.0.1", 6066));
        web.start().await.unwrap();
        assert_eq!(web.node().state(), State::Started);
        web.stop().await;
        assert_eq!(web.node().state(), State::Stopped);
    }
}
