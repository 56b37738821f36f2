//! Built-in wrap layers.
//!
//! The pipeline itself never catches, retries or times out anything. Those
//! behaviours are ordinary wrap layers, and these are the ones worth having
//! out of the box:
//!
//! - [`trace`]: per-request span with method and path; logs status and latency
//! - [`recover`]: turns a panic downstream into `500 Internal Server Error`
//! - [`timeout`]: answers `503 Service Unavailable` when downstream is too slow
//!
//! ```rust
//! use std::time::Duration;
//! use strata::{Builder, middleware};
//!
//! let app = Builder::new()
//!     .wrap(middleware::trace())
//!     .wrap(middleware::recover())
//!     .wrap(middleware::timeout(Duration::from_secs(10)));
//! ```
//!
//! Order matters: layers added first are outermost. Putting `trace` first
//! means it also logs the `500` that `recover` produces.

mod recover;
mod timeout;
mod trace;

pub use recover::recover;
pub use timeout::timeout;
pub use trace::trace;
