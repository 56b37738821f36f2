//! Immutable pipeline builder.
//!
//! A [`Builder`] is a value: a shared router, the filters attached so far and
//! the wrap layers composed so far. [`with`](Builder::with) and
//! [`wrap`](Builder::wrap) return a new builder and leave `self` alone, so one
//! parent can fan out into any number of independent pipelines that all
//! register into the same router.
//!
//! ```rust
//! use strata::{Builder, Context, Request, Response};
//! use strata::middleware;
//!
//! let root = Builder::new().wrap(middleware::trace());
//! let api = root.with(|ctx: Context, _req: Request| async move { ctx });
//! let admin = root.with(|ctx: Context, _req: Request| async move { ctx });
//!
//! api.get("/status", |_ctx: Context, _req: Request| async { "ok" });
//! admin.delete("/cache", |_ctx: Context, _req: Request| async { Response::text("flushed") });
//! ```

use std::future::Future;
use std::sync::Arc;

use crate::compose::{self, Chain};
use crate::context::Context;
use crate::error::Error;
use crate::filter::{BoxedFilter, Filter};
use crate::handler::{BoxFuture, Handler, Next};
use crate::method::Method;
use crate::params::{self, Params};
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::router::{Route, Router};
use crate::wrap::{self, Wrap};

/// An immutable pipeline configuration.
///
/// Cloning and deriving are cheap: the router, the filter list and the wrap
/// chain are all behind `Arc`s.
#[derive(Clone)]
pub struct Builder {
    router: Arc<Router>,
    filters: Arc<[BoxedFilter]>,
    chain: Chain,
}

impl Builder {
    /// A root builder with its own fresh [`Router`].
    pub fn new() -> Self {
        Self::from_router(Arc::new(Router::new()))
    }

    /// A root builder registering into an existing router.
    pub fn from_router(router: Arc<Router>) -> Self {
        Self {
            router,
            filters: Arc::from(Vec::new()),
            chain: Chain::identity(),
        }
    }

    /// Returns a builder that also runs `filter`, after every filter attached
    /// so far.
    ///
    /// The new list is a fresh allocation of exactly the new length, so
    /// siblings derived from the same parent never share or clobber storage.
    #[must_use]
    pub fn with(&self, filter: impl Filter) -> Self {
        let mut filters = Vec::with_capacity(self.filters.len() + 1);
        filters.extend(self.filters.iter().cloned());
        filters.push(filter.into_boxed_filter());
        Self {
            router: Arc::clone(&self.router),
            filters: Arc::from(filters),
            chain: self.chain.clone(),
        }
    }

    /// Returns a builder with `layer` nested inside every wrap layer added so
    /// far.
    ///
    /// Filters attached before this call run before `layer` is entered; if
    /// one of them cancels, `layer` does not run at all. Filters attached
    /// after this call run inside `layer`, when it calls `next`.
    #[must_use]
    pub fn wrap(&self, layer: impl Wrap) -> Self {
        Self {
            router: Arc::clone(&self.router),
            filters: Arc::from(Vec::new()),
            chain: self.chain.nest(Arc::clone(&self.filters), layer),
        }
    }

    /// [`wrap`](Builder::wrap) for middleware written in the call-next form.
    ///
    /// ```rust
    /// use strata::{Builder, Context, Next, Request};
    /// use http::{header, HeaderValue};
    ///
    /// let app = Builder::new().around(|ctx: Context, req: Request, next: Next| async move {
    ///     let mut res = next.run(ctx, req).await;
    ///     res.headers_mut().insert(header::SERVER, HeaderValue::from_static("strata"));
    ///     res
    /// });
    /// ```
    #[must_use]
    pub fn around<M, Fut, R>(&self, middleware: M) -> Self
    where
        M: Fn(Context, Request, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse + Send + 'static,
    {
        self.wrap(wrap::around(middleware))
    }

    /// The router every builder derived from the same root registers into.
    pub fn router(&self) -> Arc<Router> {
        Arc::clone(&self.router)
    }

    /// Composes `handler` with this builder's wrap layers and filters and
    /// registers the result.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid pattern or conflicts with an existing
    /// route. Use [`try_handle`](Builder::try_handle) to get the error instead.
    pub fn handle(&self, method: Method, path: &str, handler: impl Handler) {
        if let Err(e) = self.try_handle(method, path, handler) {
            panic!("{e}");
        }
    }

    pub fn try_handle(&self, method: Method, path: &str, handler: impl Handler) -> Result<(), Error> {
        let composed = compose::endpoint(&self.chain, Arc::clone(&self.filters), handler.into_next());
        let route: Route = Arc::new(
            move |ctx: Context, req: Request, captured: Params| -> BoxFuture<Response> {
                composed.run(params::attach(&ctx, captured), req)
            },
        );
        self.router.insert(method, path, route)
    }

    pub fn get(&self, path: &str, handler: impl Handler) {
        self.handle(Method::Get, path, handler);
    }

    pub fn post(&self, path: &str, handler: impl Handler) {
        self.handle(Method::Post, path, handler);
    }

    pub fn put(&self, path: &str, handler: impl Handler) {
        self.handle(Method::Put, path, handler);
    }

    pub fn delete(&self, path: &str, handler: impl Handler) {
        self.handle(Method::Delete, path, handler);
    }

    pub fn patch(&self, path: &str, handler: impl Handler) {
        self.handle(Method::Patch, path, handler);
    }

    pub fn head(&self, path: &str, handler: impl Handler) {
        self.handle(Method::Head, path, handler);
    }

    pub fn options(&self, path: &str, handler: impl Handler) {
        self.handle(Method::Options, path, handler);
    }

    /// Dispatches `req` through the shared router in-process.
    pub async fn serve(&self, req: Request) -> Response {
        self.router.dispatch(req).await
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Arc<Router>> for Builder {
    fn from(router: Arc<Router>) -> Self {
        Self::from_router(router)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn with_allocates_exactly() {
        let root = Builder::new();
        let one = root.with(|ctx: Context, _req: Request| async move { ctx });
        let two = one.with(|ctx: Context, _req: Request| async move { ctx });

        assert_eq!(root.filters.len(), 0);
        assert_eq!(one.filters.len(), 1);
        assert_eq!(two.filters.len(), 2);
        assert!(Arc::ptr_eq(&root.router, &two.router));
    }

    #[test]
    fn wrap_absorbs_pending_filters() {
        let filtered = Builder::new().with(|ctx: Context, _req: Request| async move { ctx });
        let wrapped = filtered.wrap(|next: Next| next);

        assert_eq!(filtered.filters.len(), 1);
        assert_eq!(wrapped.filters.len(), 0);
    }

    #[tokio::test]
    async fn verbs_register_under_their_method() {
        let app = Builder::new();
        app.get("/r", |_ctx: Context, _req: Request| async { "get" });
        app.post("/r", |_ctx: Context, _req: Request| async { "post" });
        app.put("/r", |_ctx: Context, _req: Request| async { "put" });
        app.delete("/r", |_ctx: Context, _req: Request| async { "delete" });
        app.patch("/r", |_ctx: Context, _req: Request| async { "patch" });
        app.head("/r", |_ctx: Context, _req: Request| async { StatusCode::OK });
        app.options("/r", |_ctx: Context, _req: Request| async { StatusCode::NO_CONTENT });

        for (method, body) in [
            (Method::Get, "get"),
            (Method::Post, "post"),
            (Method::Put, "put"),
            (Method::Delete, "delete"),
            (Method::Patch, "patch"),
        ] {
            let res = app.serve(Request::new(method, "/r")).await;
            assert_eq!(res.body().as_ref(), body.as_bytes(), "{method}");
        }
        assert_eq!(app.serve(Request::new(Method::Options, "/r")).await.status_code(), 204);
        assert_eq!(app.serve(Request::new(Method::Head, "/r")).await.status_code(), 200);
    }

    #[test]
    fn try_handle_reports_conflicts() {
        let app = Builder::new();
        app.get("/dup", |_ctx: Context, _req: Request| async {});
        let err = app
            .try_handle(Method::Get, "/dup", |_ctx: Context, _req: Request| async {})
            .expect_err("conflict");
        assert!(matches!(err, Error::Route { method: Method::Get, .. }));
    }

    #[test]
    #[should_panic(expected = "invalid route")]
    fn handle_panics_on_conflict() {
        let app = Builder::new();
        app.get("/dup", |_ctx: Context, _req: Request| async {});
        app.get("/dup", |_ctx: Context, _req: Request| async {});
    }
}
