//! Liveness and readiness probes.
//!
//! `GET /health` always answers 200 while the process is serving;
//! `GET /ready` answers 503 once shutdown begins or any registered check
//! fails.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Always `"healthy"` while the server answers.
    pub status: String,
    /// Service name.
    pub service: String,
    /// Service version.
    pub version: String,
    /// Seconds since the server was built.
    pub uptime_seconds: u64,
    /// Number of registered procedures.
    pub procedures: usize,
}

/// Liveness probe.
#[derive(Debug, Clone)]
pub struct HealthCheck {
    service: String,
    version: String,
    procedures: usize,
    started: Instant,
}

impl HealthCheck {
    /// Creates a probe for `service` at `version` exposing `procedures` procedures.
    #[must_use]
    pub fn new(service: impl Into<String>, version: impl Into<String>, procedures: usize) -> Self {
        Self {
            service: service.into(),
            version: version.into(),
            procedures,
            started: Instant::now(),
        }
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> HealthStatus {
        HealthStatus {
            status: "healthy".to_string(),
            service: self.service.clone(),
            version: self.version.clone(),
            uptime_seconds: self.uptime().as_secs(),
            procedures: self.procedures,
        }
    }

    /// Time since the probe was created.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Body of `GET /ready`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessStatus {
    /// Overall readiness.
    pub ready: bool,
    /// Result of each named check.
    pub checks: BTreeMap<String, bool>,
}

type ReadinessFn = Arc<dyn Fn() -> bool + Send + Sync>;

/// Readiness probe: a manual switch plus named checks.
#[derive(Clone)]
pub struct ReadinessCheck {
    ready: Arc<AtomicBool>,
    checks: Vec<(String, ReadinessFn)>,
}

impl fmt::Debug for ReadinessCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadinessCheck")
            .field("ready", &self.ready)
            .field(
                "checks",
                &self.checks.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Default for ReadinessCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessCheck {
    /// Creates a probe that is ready and has no checks.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ready: Arc::new(AtomicBool::new(true)),
            checks: Vec::new(),
        }
    }

    /// Adds a named check evaluated on every probe.
    #[must_use]
    pub fn add_check<F>(mut self, name: impl Into<String>, check: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.checks.push((name.into(), Arc::new(check)));
        self
    }

    /// Flips the manual switch. Clones share it.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Returns `true` when the switch is on and every check passes.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.status().ready
    }

    /// Evaluates every check.
    #[must_use]
    pub fn status(&self) -> ReadinessStatus {
        let checks: BTreeMap<String, bool> = self
            .checks
            .iter()
            .map(|(name, check)| (name.clone(), check()))
            .collect();
        let ready = self.ready.load(Ordering::SeqCst) && checks.values().all(|ok| *ok);
        ReadinessStatus { ready, checks }
    }
}
