//! Wrap-style middleware.
//!
//! A wrap layer is a transform over "the rest of the chain": it receives a
//! [`Next`] and returns a new handler that can run code before and after
//! calling it, rewrite the context or the response, or not call it at all.

use std::future::Future;
use std::sync::Arc;

use crate::context::Context;
use crate::handler::{Handler, Next};
use crate::request::Request;
use crate::response::IntoResponse;

/// Implemented for every `Fn(Next) -> impl Handler`.
///
/// ```rust
/// use std::time::Instant;
/// use strata::{Builder, Context, Next, Request};
///
/// let timed = Builder::new().wrap(|next: Next| {
///     move |ctx: Context, req: Request| {
///         let next = next.clone();
///         async move {
///             let started = Instant::now();
///             let res = next.run(ctx, req).await;
///             tracing::info!(elapsed = ?started.elapsed(), "done");
///             res
///         }
///     }
/// });
/// ```
pub trait Wrap: Send + Sync + 'static {
    fn wrap(&self, next: Next) -> Next;
}

impl<W, H> Wrap for W
where
    W: Fn(Next) -> H + Send + Sync + 'static,
    H: Handler,
{
    fn wrap(&self, next: Next) -> Next {
        self(next).into_next()
    }
}

/// Adapts the call-next form `(ctx, req, next) -> response` into a [`Wrap`].
pub(crate) fn around<M, Fut, R>(middleware: M) -> impl Wrap
where
    M: Fn(Context, Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    let middleware = Arc::new(middleware);
    move |next: Next| {
        let middleware = Arc::clone(&middleware);
        move |ctx: Context, req: Request| (*middleware)(ctx, req, next.clone())
    }
}
