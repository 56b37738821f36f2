//! Handler trait, type erasure, and the [`Next`] continuation.
//!
//! # How handlers are stored
//!
//! A pipeline is assembled from closures of many different concrete types. To
//! fold them into one value we hide each behind a trait object:
//!
//! ```text
//! |ctx, req| async { … }                        ← user writes this
//!        ↓ builder.get("/", handler)
//! handler.into_next()                           ← Handler blanket impl
//!        ↓
//! Next(Arc::new(FnHandler(handler)))            ← one heap allocation
//!        ↓
//! next.run(ctx, req) at request time            ← one vtable dispatch
//!        ↓
//! Box::pin(async { fut.await.into_response() }) ← BoxFuture
//! ```
//!
//! Wrap layers receive the rest of the chain as a [`Next`] and return a new
//! handler, which is erased the same way.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::Context;
use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// A heap-allocated, type-erased future.
///
/// `'static` because every stage owns its `Context` and `Request`; nothing is
/// borrowed across an await point.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

#[doc(hidden)]
pub trait ErasedHandler: Send + Sync + 'static {
    fn call(&self, ctx: Context, req: Request) -> BoxFuture<Response>;
}

/// Implemented for every valid route handler.
///
/// Satisfied automatically by any function or closure of the shape
///
/// ```text
/// Fn(Context, Request) -> impl Future<Output = impl IntoResponse>
/// ```
///
/// and by [`Next`]. The trait is sealed.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_next(self) -> Next;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Context, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Context, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_next(self) -> Next {
        Next(Arc::new(FnHandler(self)))
    }
}

struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Context, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, ctx: Context, req: Request) -> BoxFuture<Response> {
        let fut = (self.0)(ctx, req);
        Box::pin(async move { fut.await.into_response() })
    }
}

/// The rest of a pipeline, as seen from a wrap layer.
///
/// Cloning is one atomic increment. Calling [`run`](Next::run) more than once
/// runs the downstream chain more than once; not calling it skips the chain.
#[derive(Clone)]
pub struct Next(Arc<dyn ErasedHandler>);

impl Next {
    /// Erases any handler into a `Next`.
    pub fn new(handler: impl Handler) -> Self {
        handler.into_next()
    }

    /// Runs the downstream chain.
    pub fn run(&self, ctx: Context, req: Request) -> BoxFuture<Response> {
        self.0.call(ctx, req)
    }
}

impl private::Sealed for Next {}

impl Handler for Next {
    fn into_next(self) -> Next {
        self
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Next")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::Method;
    use http::StatusCode;

    #[tokio::test]
    async fn closures_become_next() {
        let next = Next::new(|_ctx: Context, req: Request| async move {
            format!("hello {}", req.path())
        });
        let res = next.run(Context::background(), Request::new(Method::Get, "/x")).await;
        assert_eq!(res.body().as_ref(), b"hello /x");
    }

    #[tokio::test]
    async fn next_is_a_handler() {
        let inner = Next::new(|_ctx: Context, _req: Request| async { StatusCode::GONE });
        let outer = Next::new(inner.clone());
        let res = outer.run(Context::background(), Request::new(Method::Get, "/")).await;
        assert_eq!(res.status_code(), 410);
    }
}
