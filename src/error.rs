//! Unified error type.

use std::net::AddrParseError;

use thiserror::Error;

use crate::method::Method;

/// Infrastructure failures: binding a socket, accepting a connection,
/// registering a route.
///
/// A filter cancelling a request is not an error, and neither is a handler
/// answering `404`; both are ordinary [`Response`](crate::Response) values.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid socket address `{addr}`: {source}")]
    Address {
        addr: String,
        #[source]
        source: AddrParseError,
    },

    #[error("invalid route `{method} {path}`: {source}")]
    Route {
        method: Method,
        path: String,
        #[source]
        source: matchit::InsertError,
    },
}
