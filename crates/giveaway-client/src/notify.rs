//! Transient notifications.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// How long a toast stays visible by default.
pub const DEFAULT_TOAST_TTL: Duration = Duration::from_secs(5);

/// Toasts kept before the oldest are dropped.
const MAX_TOASTS: usize = 32;

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    /// Something went well.
    Success,
    /// Something went wrong.
    Error,
}

/// One transient notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    /// Severity.
    pub level: ToastLevel,
    /// Text shown to the user.
    pub message: String,
    /// When it was raised.
    pub raised_at: Instant,
}

/// Surface for user-visible notifications.
pub trait Notifier: Send + Sync {
    /// Shows `message` at `level`.
    fn notify(&self, level: ToastLevel, message: &str);
}

/// A bounded queue of toasts that expire after a fixed time.
#[derive(Debug)]
pub struct ToastQueue {
    ttl: Duration,
    toasts: Mutex<VecDeque<Toast>>,
}

impl Default for ToastQueue {
    fn default() -> Self {
        Self::new(DEFAULT_TOAST_TTL)
    }
}

impl ToastQueue {
    /// Creates a queue whose toasts live for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            toasts: Mutex::new(VecDeque::new()),
        }
    }

    /// Toasts still visible now.
    #[must_use]
    pub fn active(&self) -> Vec<Toast> {
        self.active_at(Instant::now())
    }

    /// Toasts still visible at `now`, dropping the expired ones.
    #[must_use]
    pub fn active_at(&self, now: Instant) -> Vec<Toast> {
        let mut toasts = self.toasts.lock();
        toasts.retain(|toast| now.saturating_duration_since(toast.raised_at) < self.ttl);
        toasts.iter().cloned().collect()
    }

    /// Messages of the visible toasts, oldest first.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.active().into_iter().map(|toast| toast.message).collect()
    }

    /// Dismisses every toast.
    pub fn clear(&self) {
        self.toasts.lock().clear();
    }
}

impl Notifier for ToastQueue {
    fn notify(&self, level: ToastLevel, message: &str) {
        let mut toasts = self.toasts.lock();
        if toasts.len() == MAX_TOASTS {
            toasts.pop_front();
        }
        toasts.push_back(Toast {
            level,
            message: message.to_string(),
            raised_at: Instant::now(),
        });
    }
}
