//! Incoming HTTP request state.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::StatusCode;
use http_body_util::BodyExt;
use tracing::debug;

use crate::method::Method;
use crate::response::Response;

#[derive(Clone)]
struct Inner {
    method: Method,
    path: String,
    query: Option<String>,
    headers: HeaderMap,
    body: Bytes,
    remote_addr: Option<SocketAddr>,
}

/// An incoming HTTP request with its body fully read.
///
/// Every filter, wrap layer and handler receives its own `Request` value;
/// clones share one allocation.
#[derive(Clone)]
pub struct Request {
    inner: Arc<Inner>,
}

impl Request {
    /// A request with no headers and an empty body, mostly useful for driving
    /// a pipeline in-process.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let path = path.into();
        let (path, query) = match path.split_once('?') {
            Some((p, q)) => (p.to_owned(), Some(q.to_owned())),
            None => (path, None),
        };
        Self {
            inner: Arc::new(Inner {
                method,
                path,
                query,
                headers: HeaderMap::new(),
                body: Bytes::new(),
                remote_addr: None,
            }),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        Arc::make_mut(&mut self.inner).headers.append(name, value);
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        Arc::make_mut(&mut self.inner).body = body.into();
        self
    }

    pub fn method(&self) -> Method { self.inner.method }
    pub fn path(&self) -> &str { &self.inner.path }
    pub fn query(&self) -> Option<&str> { self.inner.query.as_deref() }
    pub fn headers(&self) -> &HeaderMap { &self.inner.headers }
    pub fn body(&self) -> &Bytes { &self.inner.body }
    pub fn remote_addr(&self) -> Option<SocketAddr> { self.inner.remote_addr }

    /// Case-insensitive header lookup. Values that are not visible ASCII are
    /// treated as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Reads a transport request into a `Request`.
    ///
    /// The error is the response to send instead: `405` for a method the
    /// router cannot hold, `400` for a body that failed mid-read.
    pub(crate) async fn from_http<B>(
        req: http::Request<B>,
        remote_addr: Option<SocketAddr>,
    ) -> Result<Self, Response>
    where
        B: hyper::body::Body,
        B::Error: fmt::Display,
    {
        let (parts, body) = req.into_parts();

        let Ok(method) = parts.method.as_str().parse::<Method>() else {
            debug!(method = %parts.method, "unsupported method");
            return Err(Response::status(StatusCode::METHOD_NOT_ALLOWED));
        };

        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                debug!("failed to read request body: {e}");
                return Err(Response::status(StatusCode::BAD_REQUEST));
            }
        };

        Ok(Self {
            inner: Arc::new(Inner {
                method,
                path: parts.uri.path().to_owned(),
                query: parts.uri.query().map(str::to_owned),
                headers: parts.headers,
                body,
                remote_addr,
            }),
        })
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.inner.method)
            .field("path", &self.inner.path)
            .field("query", &self.inner.query)
            .field("body_len", &self.inner.body.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header;
    use http_body_util::Full;

    #[test]
    fn new_splits_query() {
        let req = Request::new(Method::Get, "/search?q=rust");
        assert_eq!(req.path(), "/search");
        assert_eq!(req.query(), Some("q=rust"));
    }

    #[test]
    fn header_lookup_ignores_case() {
        let req = Request::new(Method::Get, "/")
            .with_header(header::AUTHORIZATION, HeaderValue::from_static("Bearer t"));
        assert_eq!(req.header("authorization"), Some("Bearer t"));
        assert_eq!(req.header("Authorization"), Some("Bearer t"));
        assert_eq!(req.header("x-missing"), None);
    }

    #[test]
    fn clones_share_state() {
        let req = Request::new(Method::Post, "/items").with_body("payload");
        let copy = req.clone();
        assert_eq!(copy.body().as_ref(), b"payload");
        assert_eq!(copy.method(), Method::Post);
    }

    #[tokio::test]
    async fn from_http_reads_parts_and_body() {
        let raw = http::Request::builder()
            .method("PUT")
            .uri("/items/7?force=true")
            .header("x-trace", "abc")
            .body(Full::new(Bytes::from_static(b"{}")))
            .expect("valid request");

        let req = Request::from_http(raw, None).await.expect("readable");
        assert_eq!(req.method(), Method::Put);
        assert_eq!(req.path(), "/items/7");
        assert_eq!(req.query(), Some("force=true"));
        assert_eq!(req.header("x-trace"), Some("abc"));
        assert_eq!(req.body().as_ref(), b"{}");
    }

    #[tokio::test]
    async fn from_http_rejects_unknown_method() {
        let raw = http::Request::builder()
            .method("BREW")
            .uri("/pot")
            .body(Full::new(Bytes::new()))
            .expect("valid request");

        let rejected = Request::from_http(raw, None).await.expect_err("rejected");
        assert_eq!(rejected.status_code(), 405);
    }
}
