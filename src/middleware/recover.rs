//! Panic recovery layer.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use http::StatusCode;
use tracing::error;

use crate::context::Context;
use crate::handler::Next;
use crate::request::Request;
use crate::response::Response;
use crate::wrap::Wrap;

/// Catches a panic anywhere downstream and answers `500` instead of dropping
/// the connection.
pub fn recover() -> impl Wrap {
    |next: Next| {
        move |ctx: Context, req: Request| {
            let next = next.clone();
            let path = req.path().to_owned();
            // Calling `next` inside the guarded future also covers handlers that
            // panic before returning their future.
            AssertUnwindSafe(async move { next.run(ctx, req).await })
                .catch_unwind()
                .map(move |outcome| match outcome {
                    Ok(res) => res,
                    Err(panic) => {
                        error!(path, panic = panic_message(panic.as_ref()), "handler panicked");
                        Response::status(StatusCode::INTERNAL_SERVER_ERROR)
                    }
                })
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::Method;

    #[tokio::test]
    async fn panic_becomes_500() {
        let inner = Next::new(|_ctx: Context, _req: Request| async {
            if true {
                panic!("boom");
            }
            Response::default()
        });
        let guarded = recover().wrap(inner);
        let res = guarded.run(Context::background(), Request::new(Method::Get, "/")).await;
        assert_eq!(res.status_code(), 500);
    }

    #[tokio::test]
    async fn synchronous_panic_is_caught_too() {
        let inner = Next::new(|_ctx: Context, _req: Request| -> std::future::Ready<Response> {
            panic!("before the future exists")
        });
        let guarded = recover().wrap(inner);
        let res = guarded.run(Context::background(), Request::new(Method::Get, "/")).await;
        assert_eq!(res.status_code(), 500);
    }

    #[test]
    fn extracts_string_payloads() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let borrowed: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(owned.as_ref()), "owned");
        assert_eq!(panic_message(borrowed.as_ref()), "static");
    }
}
