//! Radix-tree request router.
//!
//! One tree per HTTP method, O(path-length) lookup via [`matchit`]. The router
//! knows nothing about pipelines: it stores one [`Route`] per method and
//! pattern and calls it with the captured parameters.
//!
//! Every [`Builder`](crate::Builder) derived from a common root holds the same
//! `Arc<Router>`, so registration goes through `&self` behind a lock. Routes
//! are meant to be registered during startup; dispatch only takes the read
//! lock long enough to clone the matched route.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use http::header::{self, HeaderValue};
use http::StatusCode;
use matchit::Router as MatchitRouter;
use parking_lot::RwLock;
use tracing::debug;

use crate::context::Context;
use crate::error::Error;
use crate::handler::BoxFuture;
use crate::method::Method;
use crate::params::Params;
use crate::request::Request;
use crate::response::Response;

/// What the router calls on a match.
pub type Route = Arc<dyn Fn(Context, Request, Params) -> BoxFuture<Response> + Send + Sync>;

/// The shared dispatch table.
#[derive(Default)]
pub struct Router {
    routes: RwLock<HashMap<Method, MatchitRouter<Route>>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `route` for `method` and `path`.
    ///
    /// Parameters use `{name}` and `{*rest}`. The `:name` and `*rest` segment
    /// forms are accepted too and rewritten, so `/users/:id` and
    /// `/users/{id}` are the same pattern.
    pub fn insert(&self, method: Method, path: &str, route: Route) -> Result<(), Error> {
        let pattern = normalize(path);
        self.routes
            .write()
            .entry(method)
            .or_default()
            .insert(pattern.as_ref(), route)
            .map_err(|source| Error::Route { method, path: path.to_owned(), source })?;
        debug!(%method, path, "route registered");
        Ok(())
    }

    /// Finds the route for `method` and `path` along with its captures.
    pub fn lookup(&self, method: Method, path: &str) -> Option<(Route, Params)> {
        let routes = self.routes.read();
        let matched = routes.get(&method)?.at(path).ok()?;
        let params = matched.params.iter().collect();
        Some((Arc::clone(matched.value), params))
    }

    /// Methods accepted for `path`, in `Allow` header order.
    ///
    /// `OPTIONS` is listed whenever anything matches, since
    /// [`dispatch_in`](Router::dispatch_in) answers it on the route's behalf.
    pub fn allowed(&self, path: &str) -> Vec<Method> {
        let routes = self.routes.read();
        let registered = |m: &Method| routes.get(m).is_some_and(|tree| tree.at(path).is_ok());
        let any = Method::ALL.iter().any(registered);
        Method::ALL
            .into_iter()
            .filter(|m| registered(m) || (any && *m == Method::Options))
            .collect()
    }

    /// Routes `req` starting from an empty context.
    pub async fn dispatch(&self, req: Request) -> Response {
        self.dispatch_in(Context::background(), req).await
    }

    /// Routes `req` with `ctx` as the base of its context chain.
    ///
    /// Unmatched paths get `404`. Paths that match under other methods get
    /// `405` with an `Allow` header, except `OPTIONS`, which gets `200` with
    /// the same header.
    pub async fn dispatch_in(&self, ctx: Context, req: Request) -> Response {
        if let Some((route, params)) = self.lookup(req.method(), req.path()) {
            return route(ctx, req, params).await;
        }

        let allowed = self.allowed(req.path());
        if allowed.is_empty() {
            debug!(method = %req.method(), path = req.path(), "no route");
            return Response::status(StatusCode::NOT_FOUND);
        }

        let status = if req.method() == Method::Options {
            StatusCode::OK
        } else {
            StatusCode::METHOD_NOT_ALLOWED
        };
        let allow = allowed.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(", ");
        let mut builder = Response::builder().status(status);
        if let Ok(value) = HeaderValue::from_str(&allow) {
            builder = builder.header(header::ALLOW, value);
        }
        builder.no_body()
    }
}

/// Rewrites `:name` and `*name` segments into matchit's brace syntax.
fn normalize(path: &str) -> Cow<'_, str> {
    if !path.contains([':', '*']) {
        return Cow::Borrowed(path);
    }

    let segments: Vec<String> = path
        .split('/')
        .map(|segment| {
            if let Some(name) = segment.strip_prefix(':') {
                format!("{{{name}}}")
            } else if let Some(name) = segment.strip_prefix('*') {
                format!("{{*{name}}}")
            } else {
                segment.to_owned()
            }
        })
        .collect();
    Cow::Owned(segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo_route() -> Route {
        Arc::new(|_ctx: Context, _req: Request, params: Params| -> BoxFuture<Response> {
            let body = params
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("&");
            Box::pin(async move { Response::text(body) })
        })
    }

    #[test]
    fn normalize_rewrites_colon_and_star() {
        assert_eq!(normalize("/users/:id"), "/users/{id}");
        assert_eq!(normalize("/static/*file"), "/static/{*file}");
        assert_eq!(normalize("/a/:b/c/:d"), "/a/{b}/c/{d}");
        assert!(matches!(normalize("/plain/{id}"), Cow::Borrowed(_)));
    }

    #[test]
    fn lookup_captures_params() {
        let router = Router::new();
        router.insert(Method::Get, "/users/:id/posts/:post", echo_route()).expect("valid");

        let (_, params) = router.lookup(Method::Get, "/users/7/posts/9").expect("matched");
        assert_eq!(params.get("id"), Some("7"));
        assert_eq!(params.get("post"), Some("9"));
        assert!(router.lookup(Method::Post, "/users/7/posts/9").is_none());
    }

    #[test]
    fn conflicting_route_is_an_error() {
        let router = Router::new();
        router.insert(Method::Get, "/items/:id", echo_route()).expect("valid");
        let err = router
            .insert(Method::Get, "/items/{id}", echo_route())
            .expect_err("duplicate");
        assert!(err.to_string().contains("GET /items/{id}"), "{err}");
    }

    #[tokio::test]
    async fn dispatch_runs_matched_route() {
        let router = Router::new();
        router.insert(Method::Get, "/files/*path", echo_route()).expect("valid");

        let res = router.dispatch(Request::new(Method::Get, "/files/a/b.txt")).await;
        assert_eq!(res.status_code(), 200);
        assert_eq!(res.body().as_ref(), b"path=a/b.txt");
    }

    #[tokio::test]
    async fn dispatch_distinguishes_404_and_405() {
        let router = Router::new();
        router.insert(Method::Get, "/items", echo_route()).expect("valid");
        router.insert(Method::Post, "/items", echo_route()).expect("valid");

        let missing = router.dispatch(Request::new(Method::Get, "/nope")).await;
        assert_eq!(missing.status_code(), 404);

        let wrong = router.dispatch(Request::new(Method::Delete, "/items")).await;
        assert_eq!(wrong.status_code(), 405);
        assert_eq!(wrong.headers()[header::ALLOW], "GET, POST, OPTIONS");
    }

    #[tokio::test]
    async fn options_is_answered_for_known_paths() {
        let router = Router::new();
        router.insert(Method::Put, "/items/:id", echo_route()).expect("valid");
        router.insert(Method::Get, "/items/:id", echo_route()).expect("valid");

        let res = router.dispatch(Request::new(Method::Options, "/items/3")).await;
        assert_eq!(res.status_code(), 200);
        assert_eq!(res.headers()[header::ALLOW], "GET, PUT, OPTIONS");
        assert!(res.body().is_empty());

        let unknown = router.dispatch(Request::new(Method::Options, "/elsewhere")).await;
        assert_eq!(unknown.status_code(), 404);
    }

    #[tokio::test]
    async fn registered_options_route_wins() {
        let router = Router::new();
        router.insert(Method::Get, "/items", echo_route()).expect("valid");
        router.insert(Method::Options, "/items", echo_route()).expect("valid");

        assert_eq!(router.allowed("/items"), [Method::Get, Method::Options]);
        let res = router.dispatch(Request::new(Method::Options, "/items")).await;
        assert!(res.headers().get(header::ALLOW).is_none());
    }
}
