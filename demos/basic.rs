//! Minimal strata example: one shared router, a public pipeline and an
//! authenticated one derived from the same base.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl -i http://localhost:3000/users/42
//!   curl -i -X DELETE http://localhost:3000/users/42
//!   curl -i -X DELETE -H 'authorization: Bearer admin' http://localhost:3000/users/42

use std::time::Duration;

use http::{StatusCode, header, HeaderValue};
use strata::{Builder, Context, Flow, Key, Request, Response, Server, middleware, param};
use tracing_subscriber::EnvFilter;

struct Caller;
impl Key for Caller {
    type Value = String;
}

#[tokio::main]
async fn main() -> Result<(), strata::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let base = Builder::new()
        .wrap(middleware::trace())
        .wrap(middleware::recover())
        .wrap(middleware::timeout(Duration::from_secs(5)));

    let admin = base.with(require_token);

    base.get("/users/:id", get_user);
    admin.delete("/users/:id", delete_user);

    Server::bind("0.0.0.0:3000")?.serve(base.router()).await
}

// Cancels with 401 unless an `authorization: Bearer <name>` header is present.
async fn require_token(ctx: Context, req: Request) -> Flow {
    match req.header("authorization").and_then(|v| v.strip_prefix("Bearer ")) {
        Some(name) => Flow::Continue(ctx.with_value::<Caller>(name.to_owned())),
        None => Flow::cancel(
            Response::builder()
                .status(StatusCode::UNAUTHORIZED)
                .header(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"))
                .no_body(),
        ),
    }
}

// GET /users/:id
async fn get_user(ctx: Context, _req: Request) -> Response {
    let id = param(&ctx, "id");
    Response::json(format!(r#"{{"id":"{id}","name":"alice"}}"#).into_bytes())
}

// DELETE /users/:id → 204, logged with the caller the filter attached.
async fn delete_user(ctx: Context, _req: Request) -> StatusCode {
    let caller = ctx.value::<Caller>().map(String::as_str).unwrap_or("unknown");
    tracing::info!(caller, id = param(&ctx, "id"), "user deleted");
    StatusCode::NO_CONTENT
}
