//! The server lifecycle.
//!
//! ```text
//! Configured ──listen()──▶ Listening ──signal / listen failure──▶ Draining ──▶ Stopped
//! ```
//!
//! `listen` runs three tasks:
//!
//! 1. the accept loop, which binds the socket and spawns one task per
//!    connection;
//! 2. a supervisor waiting on a single-use failure channel; a bind or accept
//!    failure is logged and turned into a shutdown trigger, so both failure
//!    and OS signals leave through the same path;
//! 3. the calling task, which waits for the shutdown signal and then drains
//!    open connections for at most the configured shutdown timeout.
//!
//! Connections still open at the deadline are dropped and `listen` returns
//! [`ServerError::ShutdownTimeout`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clientrest_telemetry::Logger;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, watch};

use crate::config::ServerConfig;
use crate::connection::{self, ConnectionContext};
use crate::error::ServerError;
use crate::health::ReadinessCheck;
use crate::router::Dispatch;
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// Pause after the process runs out of file descriptors before accepting again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Where a server is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Built, not yet listening.
    Configured,
    /// Accepting connections on the given local address.
    Listening(SocketAddr),
    /// No longer accepting; waiting for open connections to finish.
    Draining,
    /// Every task has finished.
    Stopped,
}

impl LifecycleState {
    /// Returns the bound address while listening.
    #[must_use]
    pub fn listening_addr(&self) -> Option<SocketAddr> {
        match self {
            Self::Listening(addr) => Some(*addr),
            _ => None,
        }
    }
}

/// An HTTP server serving one [`Dispatch`] implementation.
///
/// Built with [`Server::builder()`]; consumed by [`Server::listen()`].
pub struct Server {
    config: ServerConfig,
    router: Arc<dyn Dispatch>,
    logger: Logger,
    readiness: ReadinessCheck,
    state: Arc<watch::Sender<LifecycleState>>,
}

impl Server {
    /// Creates a new server builder.
    #[must_use]
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the readiness check flipped to not-ready on drain.
    #[must_use]
    pub fn readiness(&self) -> &ReadinessCheck {
        &self.readiness
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// Subscribes to lifecycle transitions.
    ///
    /// The receiver outlives the server, so it observes `Stopped` too.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Serves until SIGTERM/SIGINT or a listen failure, then drains.
    ///
    /// # Errors
    ///
    /// Returns the bind or accept error that ended the server, or
    /// [`ServerError::ShutdownTimeout`] if connections outlived the drain.
    pub async fn listen(self) -> Result<(), ServerError> {
        let shutdown = ShutdownSignal::with_os_signals(self.logger.clone());
        self.listen_with_shutdown(shutdown).await
    }

    /// Serves until `shutdown` is triggered or a listen failure occurs.
    ///
    /// Useful for tests and for embedding the server in a larger process.
    ///
    /// # Errors
    ///
    /// See [`Server::listen`].
    pub async fn listen_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let tracker = ConnectionTracker::new();
        let abort = ShutdownSignal::new();
        let (failure_tx, failure_rx) = oneshot::channel();

        let ctx = ConnectionContext {
            router: Arc::clone(&self.router),
            read_timeout: self.config.read_timeout(),
            write_timeout: self.config.write_timeout(),
            idle_timeout: self.config.idle_timeout(),
            shutdown: shutdown.clone(),
            abort: abort.clone(),
        };

        let accept = tokio::spawn(accept_loop(
            self.config.clone(),
            ctx,
            tracker.clone(),
            Arc::clone(&self.state),
            self.logger.clone(),
            failure_tx,
        ));
        let supervisor = tokio::spawn(supervise(failure_rx, shutdown.clone(), self.logger.clone()));

        shutdown.recv().await;

        self.state.send_replace(LifecycleState::Draining);
        self.readiness.set_ready(false);

        if let Err(e) = accept.await {
            self.logger.error(format_args!("accept loop ended abnormally: {e}"));
        }
        let failure = supervisor.await.ok().flatten();

        let deadline = self.config.shutdown_timeout();
        let active = tracker.active_connections();
        if active > 0 {
            self.logger.info(format_args!(
                "draining {active} connection(s), deadline {}ms",
                deadline.as_millis()
            ));
        }

        let drained = match tokio::time::timeout(deadline, tracker.wait_for_shutdown()).await {
            Ok(()) => Ok(()),
            Err(_) => {
                let active = tracker.active_connections();
                abort.trigger();
                self.logger.warn(format_args!(
                    "shutdown deadline passed, closing {active} connection(s)"
                ));
                Err(ServerError::ShutdownTimeout { active })
            }
        };

        self.state.send_replace(LifecycleState::Stopped);
        self.logger.info("server stopped");

        match failure {
            Some(error) => Err(error),
            None => drained,
        }
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("state", &self.state())
            .field("readiness", &self.readiness)
            .finish_non_exhaustive()
    }
}

/// Binds the socket and accepts connections until shutdown.
async fn accept_loop(
    config: ServerConfig,
    ctx: ConnectionContext,
    tracker: ConnectionTracker,
    state: Arc<watch::Sender<LifecycleState>>,
    logger: Logger,
    failure: oneshot::Sender<ServerError>,
) {
    let listener = match bind(&config).await {
        Ok(listener) => listener,
        Err(error) => {
            let _ = failure.send(error);
            return;
        }
    };

    let local_addr = match listener.local_addr() {
        Ok(addr) => addr,
        Err(e) => {
            let _ = failure.send(ServerError::Listen(e));
            return;
        }
    };
    state.send_replace(LifecycleState::Listening(local_addr));
    logger.info(format_args!("server listening on {local_addr}"));

    loop {
        tokio::select! {
            biased;

            () = ctx.shutdown.recv() => break,

            accepted = listener.accept() => match accepted {
                Ok((stream, remote_addr)) => {
                    let token = tracker.acquire();
                    tokio::spawn(connection::serve(stream, remote_addr, ctx.clone(), token));
                }
                Err(e) if is_exhausted(&e) => {
                    logger.warn(format_args!("accept failed, backing off: {e}"));
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
                Err(e) if is_transient(&e) => {
                    tracing::debug!(error = %e, "connection failed during accept");
                }
                Err(e) => {
                    let _ = failure.send(ServerError::Listen(e));
                    return;
                }
            },
        }
    }

    logger.info("listener closed, no longer accepting connections");
}

/// Forwards a listen failure into the shutdown signal.
async fn supervise(
    failure: oneshot::Receiver<ServerError>,
    shutdown: ShutdownSignal,
    logger: Logger,
) -> Option<ServerError> {
    // A closed channel means the accept loop ended without failing
    let error = failure.await.ok()?;
    logger.error(format_args!("{error}"));
    shutdown.trigger();
    Some(error)
}

async fn bind(config: &ServerConfig) -> Result<TcpListener, ServerError> {
    let address = config.connection_string();
    if config.address().trim().is_empty() {
        return Err(ServerError::InvalidAddress {
            address,
            reason: "empty host".to_string(),
        });
    }

    let resolved = tokio::net::lookup_host(address.as_str())
        .await
        .map_err(|e| ServerError::InvalidAddress {
            address: address.clone(),
            reason: e.to_string(),
        })?
        .next()
        .ok_or_else(|| ServerError::InvalidAddress {
            address: address.clone(),
            reason: "resolved to no addresses".to_string(),
        })?;

    TcpListener::bind(resolved)
        .await
        .map_err(|source| ServerError::Bind { address, source })
}

/// Errors that concern one incoming connection, not the listener.
fn is_transient(error: &std::io::Error) -> bool {
    use std::io::ErrorKind;
    matches!(
        error.kind(),
        ErrorKind::ConnectionRefused
            | ErrorKind::ConnectionAborted
            | ErrorKind::ConnectionReset
            | ErrorKind::Interrupted
            | ErrorKind::WouldBlock
    )
}

/// EMFILE / ENFILE.
fn is_exhausted(error: &std::io::Error) -> bool {
    matches!(error.raw_os_error(), Some(23 | 24))
}

/// Builder for [`Server`].
#[derive(Default)]
pub struct ServerBuilder {
    config: Option<ServerConfig>,
    router: Option<Arc<dyn Dispatch>>,
    logger: Option<Logger>,
    readiness: Option<ReadinessCheck>,
}

impl ServerBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the server configuration. Defaults to [`ServerConfig::default()`].
    #[must_use]
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the router every request is dispatched to.
    #[must_use]
    pub fn router<D: Dispatch>(self, router: D) -> Self {
        self.shared_router(Arc::new(router))
    }

    /// Sets an already shared router.
    #[must_use]
    pub fn shared_router(mut self, router: Arc<dyn Dispatch>) -> Self {
        self.router = Some(router);
        self
    }

    /// Sets the logger for lifecycle events. Defaults to [`Logger::default()`].
    #[must_use]
    pub fn logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Shares a readiness check with the application so its `/ready`
    /// endpoint reflects draining.
    #[must_use]
    pub fn readiness(mut self, readiness: ReadinessCheck) -> Self {
        self.readiness = Some(readiness);
        self
    }

    /// Builds the server.
    ///
    /// # Panics
    ///
    /// Panics if no router was set. A server without routes is a startup
    /// defect and must not get as far as binding a socket.
    #[must_use]
    pub fn build(self) -> Server {
        let Some(router) = self.router else {
            panic!("server: handler router not set");
        };
        let (state, _) = watch::channel(LifecycleState::Configured);

        Server {
            config: self.config.unwrap_or_default(),
            router,
            logger: self.logger.unwrap_or_default(),
            readiness: self.readiness.unwrap_or_default(),
            state: Arc::new(state),
        }
    }
}

impl std::fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerBuilder")
            .field("config", &self.config)
            .field("router", &self.router.is_some())
            .finish_non_exhaustive()
    }
}
