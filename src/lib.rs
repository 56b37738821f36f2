//! # strata
//!
//! Immutable, composable request pipelines in front of a radix-tree router.
//!
//! ## Two kinds of middleware
//!
//! - **Filters** ([`Builder::with`]) take the request context and either
//!   return a new one or cancel the request with a response. No continuation,
//!   no post-processing, trivially composable.
//! - **Wrap layers** ([`Builder::wrap`]) receive the rest of the chain as a
//!   [`Next`] and can run code on both sides of it, rewrite the response, or
//!   skip it entirely.
//!
//! Both return a *new* [`Builder`]. A parent builder is never modified, so one
//! base pipeline can be extended in several directions at once, and every
//! derived builder registers into the same shared [`Router`].
//!
//! ## Order of execution
//!
//! Layers run in the order they were added, outermost first. A filter runs at
//! the point in that order where it was attached:
//!
//! ```text
//! Builder::new().with(auth).wrap(trace).with(load_user).get(path, handler)
//!
//! auth → trace(before) → load_user → handler → trace(after)
//! ```
//!
//! If `auth` cancels, nothing to its right runs. Layers to its left get the
//! cancellation response back from `next` like any other response.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use strata::{Builder, Context, Flow, Key, Request, Response, Server, middleware, param};
//! use http::StatusCode;
//!
//! struct User;
//! impl Key for User {
//!     type Value = String;
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), strata::Error> {
//!     let app = Builder::new()
//!         .wrap(middleware::trace())
//!         .wrap(middleware::timeout(Duration::from_secs(5)));
//!
//!     let authed = app.with(|ctx: Context, req: Request| async move {
//!         match req.header("x-user") {
//!             Some(user) => Flow::Continue(ctx.with_value::<User>(user.to_owned())),
//!             None => Flow::cancel(StatusCode::UNAUTHORIZED),
//!         }
//!     });
//!
//!     authed.get("/users/:id", |ctx: Context, _req: Request| async move {
//!         let caller = ctx.value::<User>().cloned().unwrap_or_default();
//!         Response::text(format!("{caller} looked up {}", param(&ctx, "id")))
//!     });
//!
//!     Server::bind("0.0.0.0:3000")?.serve(app.router()).await
//! }
//! ```

mod builder;
mod compose;
mod context;
mod error;
mod filter;
mod handler;
mod method;
mod params;
mod request;
mod response;
mod router;
mod server;
mod wrap;

pub mod middleware;

pub use builder::Builder;
pub use context::{Context, Key};
pub use error::Error;
pub use filter::{Filter, Flow};
pub use handler::{BoxFuture, Handler, Next};
pub use method::{Method, UnknownMethod};
pub use params::{Params, param, params};
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use router::{Route, Router};
pub use server::Server;
pub use wrap::Wrap;
