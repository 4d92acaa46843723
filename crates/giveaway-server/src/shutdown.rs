//! Graceful shutdown.
//!
//! A [`ShutdownSignal`] is a cloneable one-shot broadcast: the first
//! [`trigger`](ShutdownSignal::trigger) wakes every receiver, later ones are
//! no-ops. A [`ConnectionTracker`] counts open connections so the server can
//! drain them before exiting.
//!
//! ```rust,ignore
//! let shutdown = ShutdownSignal::with_os_signals();
//! server.run_with_shutdown(shutdown).await?;
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use giveaway_core::BoxFuture;
use tokio::sync::{broadcast, Notify};

/// A cloneable shutdown trigger.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    triggered: Arc<AtomicBool>,
    sender: broadcast::Sender<()>,
}

impl ShutdownSignal {
    /// Creates an untriggered signal.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self {
            triggered: Arc::new(AtomicBool::new(false)),
            sender,
        }
    }

    /// Triggers shutdown. Idempotent.
    ///
    /// ```
    /// use giveaway_server::ShutdownSignal;
    ///
    /// let shutdown = ShutdownSignal::new();
    /// shutdown.trigger();
    /// shutdown.trigger();
    /// assert!(shutdown.is_shutdown());
    /// ```
    pub fn trigger(&self) {
        if self
            .triggered
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            // No receivers is fine.
            let _ = self.sender.send(());
        }
    }

    /// Returns `true` once shutdown has been triggered.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Returns a future that completes when shutdown is triggered, or
    /// immediately if it already was.
    pub fn recv(&self) -> ShutdownReceiver {
        // Subscribe before reading the flag so a concurrent trigger is never missed.
        let mut receiver = self.sender.subscribe();
        let triggered = Arc::clone(&self.triggered);
        ShutdownReceiver {
            inner: Box::pin(async move {
                if !triggered.load(Ordering::SeqCst) {
                    let _ = receiver.recv().await;
                }
            }),
        }
    }

    /// Creates a signal triggered by SIGTERM or SIGINT (Ctrl+C elsewhere).
    ///
    /// Must be called inside a Tokio runtime.
    #[must_use]
    pub fn with_os_signals() -> Self {
        let signal = Self::new();
        let trigger = signal.clone();

        tokio::spawn(async move {
            wait_for_os_signal().await;
            trigger.trigger();
        });

        signal
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Future returned by [`ShutdownSignal::recv`].
pub struct ShutdownReceiver {
    inner: BoxFuture<'static, ()>,
}

impl Future for ShutdownReceiver {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.as_mut().poll(cx)
    }
}

#[cfg(unix)]
async fn wait_for_os_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut sigterm, mut sigint) =
        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(term), Ok(int)) => (term, int),
            (Err(e), _) | (_, Err(e)) => {
                tracing::error!(error = %e, "failed to register signal handlers, falling back to ctrl-c");
                wait_for_ctrl_c().await;
                return;
            }
        };

    tokio::select! {
        _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => tracing::info!("received SIGINT, shutting down"),
    }
}

#[cfg(not(unix))]
async fn wait_for_os_signal() {
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("received ctrl-c, shutting down"),
        Err(e) => {
            // Without a signal source the process only stops when killed.
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    }
}

/// Counts open connections.
///
/// ```
/// use giveaway_server::shutdown::ConnectionTracker;
///
/// let tracker = ConnectionTracker::new();
/// let first = tracker.try_acquire(1).expect("below the limit");
/// assert!(tracker.try_acquire(1).is_none());
/// drop(first);
/// assert_eq!(tracker.active_connections(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    active: Arc<AtomicUsize>,
    notify: Arc<Notify>,
}

impl ConnectionTracker {
    /// Creates a tracker with no open connections.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection. It stays counted until the token is dropped.
    #[must_use]
    pub fn acquire(&self) -> ConnectionToken {
        self.active.fetch_add(1, Ordering::SeqCst);
        self.token()
    }

    /// Registers a connection unless `limit` are already open.
    #[must_use]
    pub fn try_acquire(&self, limit: usize) -> Option<ConnectionToken> {
        self.active
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < limit).then_some(n + 1)
            })
            .ok()
            .map(|_| self.token())
    }

    fn token(&self) -> ConnectionToken {
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

    /// Waits until every connection has closed.
    pub async fn wait_for_shutdown(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.active.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// An open connection; see [`ConnectionTracker`].
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

    #[test]
    fn test_trigger_is_idempotent_and_shared() {
        let shutdown = ShutdownSignal::new();
        let clone = shutdown.clone();
        assert!(!clone.is_shutdown());

        shutdown.trigger();
        shutdown.trigger();
        assert!(clone.is_shutdown());
    }

    #[tokio::test]
    async fn test_recv_completes_when_triggered() {
        let shutdown = ShutdownSignal::new();
        let receiver = shutdown.recv();
        let trigger = shutdown.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.trigger();
        });

        tokio::time::timeout(Duration::from_secs(1), receiver)
            .await
            .expect("receiver should complete");
    }

    #[tokio::test]
    async fn test_recv_after_trigger_is_immediate() {
        let shutdown = ShutdownSignal::new();
        shutdown.trigger();

        tokio::time::timeout(Duration::from_millis(50), shutdown.recv())
            .await
            .expect("already triggered");
    }

    #[test]
    fn test_tokens_count_connections() {
        let tracker = ConnectionTracker::new();
        let a = tracker.acquire();
        let b = tracker.acquire();
        assert_eq!(tracker.active_connections(), 2);

        drop(a);
        assert_eq!(tracker.active_connections(), 1);
        drop(b);
        assert_eq!(tracker.active_connections(), 0);
    }

    #[test]
    fn test_try_acquire_respects_limit() {
        let tracker = ConnectionTracker::new();
        let held: Vec<_> = (0..3).filter_map(|_| tracker.try_acquire(2)).collect();
        assert_eq!(held.len(), 2);
        assert_eq!(tracker.active_connections(), 2);

        drop(held);
        assert!(tracker.try_acquire(2).is_some());
    }

    #[tokio::test]
    async fn test_wait_for_shutdown_with_no_connections() {
        let tracker = ConnectionTracker::new();
        tokio::time::timeout(Duration::from_millis(50), tracker.wait_for_shutdown())
            .await
            .expect("nothing to drain");
    }

    #[tokio::test]
    async fn test_wait_for_shutdown_drains() {
        let tracker = ConnectionTracker::new();
        let token = tracker.acquire();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            drop(token);
        });

        tokio::time::timeout(Duration::from_secs(1), tracker.wait_for_shutdown())
            .await
            .expect("drained");
        assert_eq!(tracker.active_connections(), 0);
    }
}
