//! Short-circuiting context filters.
//!
//! A filter looks at the request, and either hands a (possibly enriched)
//! context to the next stage or cancels the pipeline. It has no continuation
//! and never sees the response, which keeps it trivial to compose: filters are
//! simply appended to a list.

use std::future::Future;
use std::sync::Arc;

use crate::context::Context;
use crate::handler::BoxFuture;
use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// What a filter decided.
#[derive(Debug)]
pub enum Flow {
    /// Keep going with this context.
    Continue(Context),
    /// Stop here. No later filter, inner wrap layer or handler runs; the
    /// response is what the client receives unless an outer wrap layer
    /// rewrites it.
    Cancel(Response),
}

impl Flow {
    pub fn cancel(response: impl IntoResponse) -> Self {
        Self::Cancel(response.into_response())
    }

    pub fn is_cancel(&self) -> bool {
        matches!(self, Self::Cancel(_))
    }
}

impl From<Context> for Flow {
    fn from(ctx: Context) -> Self {
        Self::Continue(ctx)
    }
}

impl<R: IntoResponse> From<Result<Context, R>> for Flow {
    fn from(result: Result<Context, R>) -> Self {
        match result {
            Ok(ctx) => Self::Continue(ctx),
            Err(rejection) => Self::Cancel(rejection.into_response()),
        }
    }
}

#[doc(hidden)]
pub trait ErasedFilter: Send + Sync + 'static {
    fn call(&self, ctx: Context, req: Request) -> BoxFuture<Flow>;
}

pub(crate) type BoxedFilter = Arc<dyn ErasedFilter>;

/// Implemented for every function or closure of the shape
///
/// ```text
/// Fn(Context, Request) -> impl Future<Output = impl Into<Flow>>
/// ```
///
/// Returning a plain [`Context`] continues; returning
/// `Result<Context, impl IntoResponse>` cancels on `Err`.
///
/// ```rust
/// use strata::{Builder, Context, Flow, Key, Request};
/// use http::StatusCode;
///
/// struct Token;
/// impl Key for Token {
///     type Value = String;
/// }
///
/// let authed = Builder::new().with(|ctx: Context, req: Request| async move {
///     match req.header("authorization") {
///         Some(token) => Flow::Continue(ctx.with_value::<Token>(token.to_owned())),
///         None => Flow::cancel(StatusCode::UNAUTHORIZED),
///     }
/// });
/// ```
pub trait Filter: Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_filter(self) -> BoxedFilter;
}

impl<F, Fut, O> Filter for F
where
    F: Fn(Context, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = O> + Send + 'static,
    O: Into<Flow> + 'static,
{
    fn into_boxed_filter(self) -> BoxedFilter {
        Arc::new(FnFilter(self))
    }
}

struct FnFilter<F>(F);

impl<F, Fut, O> ErasedFilter for FnFilter<F>
where
    F: Fn(Context, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = O> + Send + 'static,
    O: Into<Flow> + 'static,
{
    fn call(&self, ctx: Context, req: Request) -> BoxFuture<Flow> {
        let fut = (self.0)(ctx, req);
        Box::pin(async move { fut.await.into() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn result_maps_to_flow() {
        let ok: Result<Context, StatusCode> = Ok(Context::background());
        assert!(!Flow::from(ok).is_cancel());

        let denied: Result<Context, StatusCode> = Err(StatusCode::FORBIDDEN);
        match Flow::from(denied) {
            Flow::Cancel(res) => assert_eq!(res.status_code(), 403),
            Flow::Continue(_) => panic!("expected cancellation"),
        }
    }
}
