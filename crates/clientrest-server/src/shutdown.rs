//! Graceful shutdown coordination.
//!
//! [`ShutdownSignal`] is the cancellation token the whole lifecycle hangs
//! off. It has any number of producers (the OS signal listener, the listen
//! failure supervisor, tests) and any number of waiters (the accept loop,
//! every connection, the main task). Triggering is idempotent: only the
//! first producer wins, later calls are no-ops.
//!
//! [`ConnectionTracker`] counts open connections so the drain phase knows
//! when the last one has finished.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use clientrest_telemetry::Logger;
use tokio::sync::{broadcast, Notify};

/// A signal that can be used to trigger and await graceful shutdown.
///
/// # Example
///
/// ```rust
/// use clientrest_server::ShutdownSignal;
///
/// let shutdown = ShutdownSignal::new();
/// let producer = shutdown.clone();
///
/// assert!(producer.trigger());
/// assert!(!shutdown.trigger());
/// assert!(shutdown.is_shutdown());
/// ```
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    triggered: Arc<AtomicBool>,
    sender: broadcast::Sender<()>,
}

impl ShutdownSignal {
    /// Creates a new, untriggered signal.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self {
            triggered: Arc::new(AtomicBool::new(false)),
            sender,
        }
    }

    /// Triggers the signal.
    ///
    /// Returns `true` for the call that actually triggered it and `false`
    /// for every later call.
    pub fn trigger(&self) -> bool {
        let first = self
            .triggered
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if first {
            // No receivers is fine; late waiters take the fast path
            let _ = self.sender.send(());
        }
        first
    }

    /// Returns `true` if shutdown has been triggered.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Returns a future that completes once the signal is triggered.
    ///
    /// Completes immediately if it already was.
    pub fn recv(&self) -> ShutdownReceiver {
        ShutdownReceiver {
            triggered: Arc::clone(&self.triggered),
            receiver: self.sender.subscribe(),
        }
    }

    /// Creates a signal triggered by SIGTERM or SIGINT (Ctrl+C elsewhere).
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn with_os_signals(logger: Logger) -> Self {
        let signal = Self::new();
        let producer = signal.clone();

        tokio::spawn(async move {
            let name = wait_for_os_signal(&logger).await;
            if producer.trigger() {
                logger.info(format_args!("received {name}, shutting down"));
            }
        });

        signal
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// A future that completes when the shutdown signal is triggered.
///
/// Created by [`ShutdownSignal::recv()`].
pub struct ShutdownReceiver {
    triggered: Arc<AtomicBool>,
    receiver: broadcast::Receiver<()>,
}

impl Future for ShutdownReceiver {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.triggered.load(Ordering::SeqCst) {
            return Poll::Ready(());
        }

        // A closed or lagged channel also means the signal fired
        match Pin::new(&mut self.receiver).poll_recv(cx) {
            Poll::Ready(_) => Poll::Ready(()),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Waits for an OS shutdown signal and returns its name.
async fn wait_for_os_signal(logger: &Logger) -> &'static str {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => "SIGTERM",
                    _ = sigint.recv() => "SIGINT",
                }
            }
            (Err(e), _) | (_, Err(e)) => {
                logger.error(format_args!(
                    "failed to register signal handlers, falling back to Ctrl+C: {e}"
                ));
                wait_for_ctrl_c(logger).await
            }
        }
    }

    #[cfg(not(unix))]
    {
        wait_for_ctrl_c(logger).await
    }
}

async fn wait_for_ctrl_c(logger: &Logger) -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        logger.error(format_args!("failed to listen for Ctrl+C: {e}"));
        std::future::pending::<()>().await;
    }
    "Ctrl+C"
}

/// Counts open connections.
///
/// # Example
///
/// ```rust
/// use clientrest_server::ConnectionTracker;
///
/// let tracker = ConnectionTracker::new();
///
/// let token = tracker.acquire();
/// assert_eq!(tracker.active_connections(), 1);
///
/// drop(token);
/// assert_eq!(tracker.active_connections(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionTracker {
    active: Arc<AtomicUsize>,
    notify: Arc<Notify>,
}

impl ConnectionTracker {
    /// Creates a new connection tracker.
    #[must_use]
    pub fn new() -> Self {
        Self {
            active: Arc::new(AtomicUsize::new(0)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Acquires a token, held for the lifetime of one connection.
    #[must_use]
    pub fn acquire(&self) -> ConnectionToken {
        self.active.fetch_add(1, Ordering::SeqCst);
        ConnectionToken {
            active: Arc::clone(&self.active),
            notify: Arc::clone(&self.notify),
        }
    }

    /// Returns the number of open connections.
    #[must_use]
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Waits until every token has been dropped.
    pub async fn wait_for_shutdown(&self) {
        loop {
            // Registered before the check so a drop in between is not missed
            let notified = self.notify.notified();
            if self.active.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// One open connection. Dropping it releases the slot in the tracker.
#[derive(Debug)]
pub struct ConnectionToken {
    active: Arc<AtomicUsize>,
    notify: Arc<Notify>,
}

impl Drop for ConnectionToken {
    fn drop(&mut self) {
        if self.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.notify.notify_waiters();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio_test::{assert_pending, assert_ready, task};

    #[test]
    fn test_shutdown_signal_new() {
        let signal = ShutdownSignal::new();
        assert!(!signal.is_shutdown());
    }

    #[test]
    fn test_only_first_trigger_wins() {
        let signal = ShutdownSignal::new();
        let other = signal.clone();

        assert!(signal.trigger());
        assert!(!other.trigger());
        assert!(!signal.trigger());
        assert!(other.is_shutdown());
    }

    #[test]
    fn test_recv_wakes_on_trigger() {
        let signal = ShutdownSignal::new();
        let mut recv = task::spawn(signal.recv());

        assert_pending!(recv.poll());
        signal.trigger();
        assert!(recv.is_woken());
        assert_ready!(recv.poll());
    }

    #[tokio::test]
    async fn test_recv_completes_immediately_if_triggered() {
        let signal = ShutdownSignal::new();
        signal.trigger();

        tokio::time::timeout(Duration::from_millis(10), signal.recv())
            .await
            .expect("recv should complete immediately");
    }

    #[tokio::test]
    async fn test_recv_from_another_task() {
        let signal = ShutdownSignal::new();
        let producer = signal.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            producer.trigger();
        });

        tokio::time::timeout(Duration::from_secs(1), signal.recv())
            .await
            .expect("recv should complete");
    }

    #[test]
    fn test_connection_tracker_counts() {
        let tracker = ConnectionTracker::new();
        let first = tracker.acquire();
        let second = tracker.acquire();
        assert_eq!(tracker.active_connections(), 2);

        drop(first);
        assert_eq!(tracker.active_connections(), 1);
        drop(second);
        assert_eq!(tracker.active_connections(), 0);
    }

    #[tokio::test]
    async fn test_wait_for_shutdown_immediate() {
        let tracker = ConnectionTracker::new();
        tokio::time::timeout(Duration::from_millis(10), tracker.wait_for_shutdown())
            .await
            .expect("no connections, should complete immediately");
    }

    #[tokio::test]
    async fn test_wait_for_shutdown_after_last_drop() {
        let tracker = ConnectionTracker::new();
        let token = tracker.acquire();

        let waiter = tracker.clone();
        let handle = tokio::spawn(async move { waiter.wait_for_shutdown().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!handle.is_finished());
        drop(token);

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("wait should complete")
            .expect("task should not panic");
    }
}
