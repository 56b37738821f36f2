//! HTTP server and graceful shutdown.
//!
//! The server is the transport half of the crate: it reads requests off the
//! wire, hands them to a [`Router`], and writes back whatever the matched
//! pipeline returned. On shutdown it stops accepting, tells every open
//! connection to finish its current request and close, then returns from
//! [`Server::serve`]. Idle keep-alive connections close immediately.

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::error::Error;
use crate::request::Request;
use crate::router::Router;

type Signal = Pin<Box<dyn Future<Output = ()> + Send>>;

/// The HTTP server.
pub struct Server {
    listen: Listen,
    shutdown: Option<Signal>,
}

enum Listen {
    Addr(SocketAddr),
    Listener(TcpListener),
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// ```rust
    /// use strata::Server;
    /// assert!(Server::bind("0.0.0.0:3000").is_ok());
    /// assert!(Server::bind("not an address").is_err());
    /// ```
    pub fn bind(addr: &str) -> Result<Self, Error> {
        let parsed = addr.parse::<SocketAddr>().map_err(|source| Error::Address {
            addr: addr.to_owned(),
            source,
        })?;
        Ok(Self { listen: Listen::Addr(parsed), shutdown: None })
    }

    /// Serves on an already bound listener, e.g. one on port 0 whose real
    /// address the caller needs to know.
    pub fn from_listener(listener: TcpListener) -> Self {
        Self { listen: Listen::Listener(listener), shutdown: None }
    }

    /// Replaces the default shutdown trigger (SIGTERM or Ctrl-C) with `signal`.
    #[must_use]
    pub fn with_shutdown(mut self, signal: impl Future<Output = ()> + Send + 'static) -> Self {
        self.shutdown = Some(Box::pin(signal));
        self
    }

    /// Starts accepting connections and dispatching them through `router`.
    ///
    /// Returns only after a full graceful shutdown.
    pub async fn serve(self, router: Arc<Router>) -> Result<(), Error> {
        let listener = match self.listen {
            Listen::Addr(addr) => TcpListener::bind(addr).await?,
            Listen::Listener(listener) => listener,
        };
        info!(addr = %listener.local_addr()?, "strata listening");

        let mut tasks = tokio::task::JoinSet::new();
        let (drain_tx, drain_rx) = watch::channel(false);
        let mut shutdown: Signal = match self.shutdown {
            Some(signal) => signal,
            None => Box::pin(shutdown_signal()),
        };

        loop {
            tokio::select! {
                // Checked first so a pending signal stops accepting at once,
                // even with connections queued.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let router = Arc::clone(&router);
                    let drain = drain_rx.clone();
                    tasks.spawn(connection(TokioIo::new(stream), remote_addr, router, drain));
                }

                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        drop(listener);
        drain_tx.send_replace(true);
        while tasks.join_next().await.is_some() {}

        info!("strata stopped");
        Ok(())
    }
}

/// Serves one connection until the peer closes it or `drain` flips, at which
/// point the current request is allowed to finish and the connection closes.
async fn connection(
    io: TokioIo<tokio::net::TcpStream>,
    remote_addr: SocketAddr,
    router: Arc<Router>,
    mut drain: watch::Receiver<bool>,
) {
    let svc = service_fn(move |req| {
        let router = Arc::clone(&router);
        async move { dispatch(router, req, remote_addr).await }
    });

    let builder = ConnBuilder::new(TokioExecutor::new());
    let mut conn = std::pin::pin!(builder.serve_connection(io, svc));
    let mut draining = false;

    let result = loop {
        tokio::select! {
            res = conn.as_mut() => break res,
            Ok(()) = drain.changed(), if !draining => {
                draining = true;
                debug!(peer = %remote_addr, "closing connection for shutdown");
                conn.as_mut().graceful_shutdown();
            }
        }
    };

    if let Err(e) = result {
        debug!(peer = %remote_addr, "connection error: {e}");
    }
}

/// Routes one request and produces one response. Every failure is already a
/// response by the time it gets here, so hyper never sees an error.
async fn dispatch(
    router: Arc<Router>,
    req: hyper::Request<hyper::body::Incoming>,
    remote_addr: SocketAddr,
) -> Result<http::Response<Full<Bytes>>, std::convert::Infallible> {
    let response = match Request::from_http(req, Some(remote_addr)).await {
        Ok(req) => router.dispatch(req).await,
        Err(rejection) => rejection,
    };
    Ok(response.into_http())
}

/// Resolves on SIGTERM or SIGINT. On non-Unix platforms only Ctrl-C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
