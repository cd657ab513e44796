//! Serving one accepted connection.
//!
//! Each connection runs on its own task with HTTP/1.1 keep-alive. It reacts
//! to three outside events:
//!
//! - shutdown: stop taking new requests, finish the one in flight, close;
//! - idle timeout: same as shutdown, once nothing has been in flight for the
//!   configured time;
//! - abort: the drain deadline passed, drop the connection immediately.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use clientrest_endpoint::{ApiError, Response, APPLICATION_JSON};
use http::header::{HeaderValue, CONTENT_TYPE};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::net::TcpStream;

use crate::router::Dispatch;
use crate::shutdown::{ConnectionToken, ShutdownSignal};

/// Everything a connection task needs, shared by all connections.
#[derive(Clone)]
pub(crate) struct ConnectionContext {
    pub(crate) router: Arc<dyn Dispatch>,
    pub(crate) read_timeout: Duration,
    pub(crate) write_timeout: Duration,
    pub(crate) idle_timeout: Duration,
    pub(crate) shutdown: ShutdownSignal,
    pub(crate) abort: ShutdownSignal,
}

/// Serves `stream` until the client closes it, it goes idle, or the server
/// shuts down. `token` is released when this returns.
pub(crate) async fn serve(
    stream: TcpStream,
    remote_addr: SocketAddr,
    ctx: ConnectionContext,
    token: ConnectionToken,
) {
    let activity = Arc::new(Activity::new());

    let service = {
        let router = Arc::clone(&ctx.router);
        let activity = Arc::clone(&activity);
        let (read_timeout, write_timeout) = (ctx.read_timeout, ctx.write_timeout);

        service_fn(move |request: http::Request<Incoming>| {
            let router = Arc::clone(&router);
            let busy = activity.begin();
            async move {
                let response = handle(router.as_ref(), request, read_timeout, write_timeout).await;
                drop(busy);
                Ok::<_, Infallible>(response)
            }
        })
    };

    let conn = http1::Builder::new()
        .timer(TokioTimer::new())
        .header_read_timeout(ctx.read_timeout)
        .keep_alive(true)
        .serve_connection(TokioIo::new(stream), service);
    tokio::pin!(conn);

    let mut closing = false;
    loop {
        tokio::select! {
            result = conn.as_mut() => {
                if let Err(e) = result {
                    tracing::debug!(remote = %remote_addr, error = %e, "connection closed with error");
                }
                break;
            }
            () = ctx.shutdown.recv(), if !closing => {
                closing = true;
                conn.as_mut().graceful_shutdown();
            }
            () = activity.idle_for(ctx.idle_timeout), if !closing => {
                tracing::debug!(remote = %remote_addr, "closing idle connection");
                closing = true;
                conn.as_mut().graceful_shutdown();
            }
            () = ctx.abort.recv() => {
                tracing::debug!(remote = %remote_addr, "connection aborted at shutdown deadline");
                break;
            }
        }
    }

    drop(token);
}

/// Reads the body and dispatches one request under the transport timeouts.
async fn handle(
    router: &dyn Dispatch,
    request: http::Request<Incoming>,
    read_timeout: Duration,
    write_timeout: Duration,
) -> Response {
    let (parts, body) = request.into_parts();

    let body = match tokio::time::timeout(read_timeout, body.collect()).await {
        Ok(Ok(collected)) => collected.to_bytes(),
        Ok(Err(e)) => {
            return transport_error(&ApiError::bad_request(format!(
                "failed to read request body: {e}"
            )));
        }
        Err(_) => {
            return transport_error(&ApiError::bad_request("timed out reading request body"));
        }
    };

    let request = http::Request::from_parts(parts, Full::new(body));
    match tokio::time::timeout(write_timeout, router.dispatch(request)).await {
        Ok(response) => response,
        Err(_) => transport_error(&ApiError::service_unavailable("request timed out")),
    }
}

/// Renders an error raised by the transport itself, outside the middleware chain.
fn transport_error(error: &ApiError) -> Response {
    tracing::warn!(status = error.status().as_u16(), error = %error, "request failed in transport");
    let mut response = error.respond_error();
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
    response
}

/// Tracks whether a connection has a request in flight and since when it
/// has been quiet.
#[derive(Debug)]
struct Activity {
    in_flight: AtomicUsize,
    last_active: Mutex<Instant>,
}

impl Activity {
    fn new() -> Self {
        Self {
            in_flight: AtomicUsize::new(0),
            last_active: Mutex::new(Instant::now()),
        }
    }

    fn begin(self: &Arc<Self>) -> Busy {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        Busy {
            activity: Arc::clone(self),
        }
    }

    fn touch(&self) {
        if let Ok(mut last) = self.last_active.lock() {
            *last = Instant::now();
        }
    }

    fn quiet_since(&self) -> Option<Instant> {
        if self.in_flight.load(Ordering::SeqCst) > 0 {
            return None;
        }
        self.last_active.lock().ok().map(|last| *last)
    }

    /// Completes once nothing has been in flight for `idle`.
    async fn idle_for(&self, idle: Duration) {
        loop {
            match self.quiet_since() {
                Some(since) => {
                    let remaining = idle.saturating_sub(since.elapsed());
                    if remaining.is_zero() {
                        return;
                    }
                    tokio::time::sleep(remaining).await;
                }
                None => tokio::time::sleep(idle).await,
            }
        }
    }
}

/// Marks one request in flight until dropped.
struct Busy {
    activity: Arc<Activity>,
}

impl Drop for Busy {
    fn drop(&mut self) {
        self.activity.touch();
        self.activity.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
