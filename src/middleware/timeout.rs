//! Deadline layer.

use std::time::Duration;

use http::StatusCode;
use tracing::warn;

use crate::context::Context;
use crate::handler::Next;
use crate::request::Request;
use crate::response::Response;
use crate::wrap::Wrap;

/// Gives the rest of the chain `limit` to produce a response. When it runs
/// out, the downstream future is dropped and the client gets `503`.
pub fn timeout(limit: Duration) -> impl Wrap {
    move |next: Next| {
        move |ctx: Context, req: Request| {
            let next = next.clone();
            async move {
                let path = req.path().to_owned();
                match tokio::time::timeout(limit, next.run(ctx, req)).await {
                    Ok(res) => res,
                    Err(_) => {
                        warn!(path, ?limit, "request timed out");
                        Response::status(StatusCode::SERVICE_UNAVAILABLE)
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::Method;

    #[tokio::test(start_paused = true)]
    async fn slow_chain_gets_503() {
        let slow = Next::new(|_ctx: Context, _req: Request| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Response::default()
        });
        let bounded = timeout(Duration::from_secs(1)).wrap(slow);
        let res = bounded.run(Context::background(), Request::new(Method::Get, "/")).await;
        assert_eq!(res.status_code(), 503);
    }

    #[tokio::test]
    async fn fast_chain_is_untouched() {
        let fast = Next::new(|_ctx: Context, _req: Request| async { Response::code(204) });
        let bounded = timeout(Duration::from_secs(1)).wrap(fast);
        let res = bounded.run(Context::background(), Request::new(Method::Get, "/")).await;
        assert_eq!(res.status_code(), 204);
    }
}
