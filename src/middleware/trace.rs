//! Request span and access log.

use std::time::Instant;

use tracing::{Instrument, info, info_span};

use crate::context::Context;
use crate::handler::Next;
use crate::request::Request;
use crate::wrap::Wrap;

/// Opens an `http.request` span for the rest of the chain and logs the outcome.
pub fn trace() -> impl Wrap {
    |next: Next| {
        move |ctx: Context, req: Request| {
            let next = next.clone();
            let span = info_span!("http.request", method = %req.method(), path = req.path());
            async move {
                let started = Instant::now();
                let res = next.run(ctx, req).await;
                info!(status = res.status_code(), elapsed = ?started.elapsed(), "request completed");
                res
            }
            .instrument(span)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::Method;
    use crate::response::Response;

    #[tokio::test]
    async fn passes_response_through() {
        let inner = Next::new(|_ctx: Context, _req: Request| async { Response::code(418) });
        let traced = trace().wrap(inner);
        let res = traced.run(Context::background(), Request::new(Method::Get, "/tea")).await;
        assert_eq!(res.status_code(), 418);
    }
}
