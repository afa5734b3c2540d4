//! The hyper/tokio adapter and graceful shutdown.
//!
//! The adapter owns everything the dispatch core does not: the accept loop,
//! body collection, deadlines, panic isolation and error translation. Every
//! request ends in a well-formed response.
//!
//! # Graceful shutdown and Kubernetes
//!
//! When Kubernetes terminates a pod it sends **SIGTERM** and waits
//! `terminationGracePeriodSeconds` (default 30 s) before sending SIGKILL.
//!
//! The server reacts by:
//! 1. Immediately stopping `listener.accept()`, so no new connections are made.
//! 2. Letting every in-flight connection task run to completion.
//! 3. Returning from [`Server::serve`], which lets `main` exit cleanly.

use std::future::Future;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use bytes::Bytes;
use futures::FutureExt;
use http::StatusCode;
use http_body::Body;
use http_body_util::{BodyExt, Full};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::chain::Chain;
use crate::config::Config;
use crate::error::{BoxError, Error, HttpError, ServeError, ValidationError};
use crate::request::Request;
use crate::response::Response;
use crate::translate::ErrorTranslator;

/// The HTTP server.
#[derive(Debug)]
pub struct Server {
    addr: SocketAddr,
    errors: ErrorTranslator,
    timeout: Option<Duration>,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    pub fn bind(addr: impl Into<SocketAddr>) -> Self {
        Self { addr: addr.into(), errors: ErrorTranslator::default(), timeout: None }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            addr: config.addr,
            errors: ErrorTranslator::new(config.error_detail()),
            timeout: config.timeout(),
        }
    }

    /// Replaces the error translator.
    pub fn errors(mut self, translator: ErrorTranslator) -> Self {
        self.errors = translator;
        self
    }

    /// Answers `504` when a request takes longer than `limit`.
    ///
    /// The chain is dropped at its next suspension point; work it spawned
    /// elsewhere is not cancelled.
    pub fn timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    /// Serves `chain` until SIGTERM or Ctrl-C, then drains in-flight
    /// connections.
    pub async fn serve(self, chain: Chain<Request, Response>) -> Result<(), ServeError> {
        self.serve_with_shutdown(chain, shutdown_signal()).await
    }

    /// Serves `chain` until `signal` resolves, then drains in-flight
    /// connections.
    pub async fn serve_with_shutdown(
        self,
        chain: Chain<Request, Response>,
        signal: impl Future<Output = ()>,
    ) -> Result<(), ServeError> {
        let listener = TcpListener::bind(self.addr).await?;
        info!(addr = %listener.local_addr()?, handlers = chain.handlers().len(), "skein listening");

        let dispatcher = Dispatcher { chain, errors: self.errors, timeout: self.timeout };

        // JoinSet tracks every spawned connection task so we can wait for
        // them all to finish during graceful shutdown.
        let mut tasks = tokio::task::JoinSet::new();

        tokio::pin!(signal);

        loop {
            tokio::select! {
                // Shutdown first: a signal stops accepting even if more
                // connections are queued.
                biased;

                () = &mut signal => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, peer) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let dispatcher = dispatcher.clone();
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // Called once per request on the connection.
                        let svc = service_fn(move |req: hyper::Request<hyper::body::Incoming>| {
                            let dispatcher = dispatcher.clone();
                            async move { Ok::<_, std::convert::Infallible>(dispatcher.dispatch(req).await) }
                        });

                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %peer, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks so the JoinSet does not grow
                // without bound on long-running servers.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("skein stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Everything one request needs, cloned per connection.
#[derive(Clone)]
struct Dispatcher {
    chain: Chain<Request, Response>,
    errors: ErrorTranslator,
    timeout: Option<Duration>,
}

impl Dispatcher {
    /// Runs one request through the chain; never fails.
    async fn dispatch<B>(&self, req: http::Request<B>) -> http::Response<Full<Bytes>>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<BoxError>,
    {
        let (head, body) = req.into_parts();
        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                let e: BoxError = e.into();
                let err = ValidationError::new(format!("unreadable body: {e}"));
                return self.errors.translate(err.into()).into_inner();
            }
        };
        let request = Request::from(http::Request::from_parts(head, body));

        let run = AssertUnwindSafe(self.chain.handle(request)).catch_unwind();
        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, run).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(?limit, "request timed out");
                    Ok(Err(HttpError::new(StatusCode::GATEWAY_TIMEOUT).into()))
                }
            },
            None => run.await,
        };

        let result = outcome.unwrap_or_else(|_| {
            error!("handler panicked");
            Err(Error::invocation("handler panicked"))
        });
        let response = match result {
            Ok(res) => res,
            Err(err) => self.errors.translate(err),
        };
        response.into_inner()
    }
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal the process receives.
///
/// On Unix this listens for both **SIGTERM** and **SIGINT** (Ctrl-C).
/// On Windows only Ctrl-C is available. A signal that cannot be installed is
/// logged and never fires.
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
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    // `pending()` never resolves; on non-Unix platforms the SIGTERM arm is
    // effectively disabled.
    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Resource;

    async fn slow(_req: Request) -> Result<&'static str, BoxError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok("late")
    }

    async fn explode(_req: Request) -> Result<&'static str, BoxError> {
        panic!("boom")
    }

    async fn echo(req: Request) -> Result<String, BoxError> {
        Ok(req.text()?.to_owned())
    }

    fn dispatcher(timeout: Option<Duration>) -> Dispatcher {
        let chain = Chain::http([
            Resource::new(["/slow"]).get(slow),
            Resource::new(["/panic"]).get(explode),
            Resource::new(["/echo"]).post(echo),
        ])
        .unwrap();
        Dispatcher { chain, errors: ErrorTranslator::default(), timeout }
    }

    fn request(method: &str, uri: &str, body: &'static str) -> http::Request<Full<Bytes>> {
        http::Request::builder()
            .method(method)
            .uri(uri)
            .body(Full::new(Bytes::from_static(body.as_bytes())))
            .unwrap()
    }

    #[tokio::test]
    async fn bodies_reach_resources() {
        let res = dispatcher(None).dispatch(request("POST", "/echo", "ping")).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = res.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, "ping");
    }

    #[tokio::test]
    async fn missing_resources_are_translated() {
        let res = dispatcher(None).dispatch(request("GET", "/nope", "")).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test(start_paused = true)]
    async fn deadlines_answer_gateway_timeout() {
        let res = dispatcher(Some(Duration::from_millis(10)))
            .dispatch(request("GET", "/slow", ""))
            .await;
        assert_eq!(res.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[tokio::test]
    async fn panics_become_internal_errors() {
        let res = dispatcher(None).dispatch(request("GET", "/panic", "")).await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn serve_stops_on_signal() {
        let chain = Chain::http([Resource::new(["/"]).get(slow)]).unwrap();
        let server = Server::bind(([127, 0, 0, 1], 0));
        server.serve_with_shutdown(chain, async {}).await.unwrap();
    }
}
