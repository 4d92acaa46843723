//! The per-call-site invocation tracker.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use giveaway_core::{AppError, Failure, Outcome};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;

use crate::caller::ProcedureCaller;
use crate::notify::{Notifier, ToastLevel, ToastQueue};

/// Lifecycle of the most recent call made through a [`UseProcedure`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallState<O> {
    /// Nothing has run yet.
    Idle,
    /// A call is in flight.
    Pending,
    /// The latest call to finish produced this outcome.
    Settled(Outcome<O>),
}

impl<O> CallState<O> {
    /// Returns `true` while pending.
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Returns the settled outcome, if any.
    pub const fn outcome(&self) -> Option<&Outcome<O>> {
        match self {
            Self::Settled(outcome) => Some(outcome),
            Self::Idle | Self::Pending => None,
        }
    }
}

type SuccessCallback<O> = Arc<dyn Fn(&O) + Send + Sync>;
type FailureCallback = Arc<dyn Fn(&Failure) + Send + Sync>;

/// Invokes one procedure on behalf of one call site.
///
/// Tracks how many calls are in flight and publishes the latest
/// [`CallState`] on a watch channel. Settled outcomes go to the success or
/// failure callback; without a failure callback the message is shown via
/// the [`Notifier`].
///
/// Concurrent [`run`](Self::run) calls are allowed. They are neither
/// de-duplicated nor cancelled, and the published state reflects whichever
/// call settled last. When the last pending run is dropped before settling,
/// the state falls back to the previous settled outcome (or `Idle`).
///
/// # Example
///
/// ```rust,ignore
/// let create = UseProcedure::new(Arc::new(HttpCaller::new(base, "createSweepstakes")))
///     .on_success(|created: &CreatedSweepstakes| println!("created {}", created.id));
///
/// let outcome = create.run(&json!({ "id": "team_123" })).await;
/// assert!(!create.is_loading());
/// ```
pub struct UseProcedure<O> {
    caller: Arc<dyn ProcedureCaller<O>>,
    state: watch::Sender<CallState<O>>,
    last_settled: Mutex<CallState<O>>,
    in_flight: Arc<AtomicUsize>,
    on_success: Option<SuccessCallback<O>>,
    on_failure: Option<FailureCallback>,
    notifier: Arc<dyn Notifier>,
}

impl<O> fmt::Debug for UseProcedure<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UseProcedure")
            .field("procedure", &self.caller.name())
            .field("in_flight", &self.in_flight.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl<O: Clone + Send + Sync + 'static> UseProcedure<O> {
    /// Creates a tracker around `caller`, notifying failures on a fresh
    /// [`ToastQueue`].
    #[must_use]
    pub fn new(caller: Arc<dyn ProcedureCaller<O>>) -> Self {
        let (state, _) = watch::channel(CallState::Idle);
        Self {
            caller,
            state,
            last_settled: Mutex::new(CallState::Idle),
            in_flight: Arc::new(AtomicUsize::new(0)),
            on_success: None,
            on_failure: None,
            notifier: Arc::new(ToastQueue::default()),
        }
    }

    /// Runs `callback` with the output of every successful call.
    #[must_use]
    pub fn on_success<F>(mut self, callback: F) -> Self
    where
        F: Fn(&O) + Send + Sync + 'static,
    {
        self.on_success = Some(Arc::new(callback));
        self
    }

    /// Runs `callback` on every failure instead of the default notification.
    #[must_use]
    pub fn on_failure<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Failure) + Send + Sync + 'static,
    {
        self.on_failure = Some(Arc::new(callback));
        self
    }

    /// Routes default failure notifications to `notifier`.
    #[must_use]
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Returns `true` while at least one call is in flight.
    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Subscribes to state changes.
    pub fn state(&self) -> watch::Receiver<CallState<O>> {
        self.state.subscribe()
    }

    /// Returns a snapshot of the current state.
    pub fn current(&self) -> CallState<O> {
        self.state.borrow().clone()
    }

    /// Calls the procedure with `input` and routes the outcome.
    ///
    /// Never fails: transport errors settle as `UNKNOWN_HTTP_ERROR`.
    pub async fn run<T: Serialize + ?Sized>(&self, input: &T) -> Outcome<O> {
        let mut flight = InFlight::enter(&self.in_flight, &self.state, &self.last_settled);
        self.state.send_replace(CallState::Pending);

        let outcome = match serde_json::to_value(input) {
            Ok(raw) => match self.caller.call(raw).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    tracing::warn!(
                        procedure = self.caller.name(),
                        error = %err,
                        "procedure call failed in transport"
                    );
                    Outcome::Failure(err.to_failure())
                }
            },
            Err(err) => AppError::validation(format!("$: {err}")).into(),
        };

        match &outcome {
            Outcome::Success(output) => {
                if let Some(callback) = &self.on_success {
                    callback(output);
                }
            }
            Outcome::Failure(failure) => match &self.on_failure {
                Some(callback) => callback(failure),
                None => self.notifier.notify(ToastLevel::Error, &failure.message),
            },
        }

        let settled = CallState::Settled(outcome.clone());
        *self.last_settled.lock() = settled.clone();
        self.state.send_replace(settled);
        flight.settled = true;
        outcome
    }
}

/// Counts a call as in flight until dropped, including on cancellation.
///
/// A guard dropped unsettled by the last pending call restores the previous
/// settled state.
struct InFlight<'a, O: Clone> {
    counter: &'a AtomicUsize,
    state: &'a watch::Sender<CallState<O>>,
    last_settled: &'a Mutex<CallState<O>>,
    settled: bool,
}

impl<'a, O: Clone> InFlight<'a, O> {
    fn enter(
        counter: &'a AtomicUsize,
        state: &'a watch::Sender<CallState<O>>,
        last_settled: &'a Mutex<CallState<O>>,
    ) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self {
            counter,
            state,
            last_settled,
            settled: false,
        }
    }
}

impl<O: Clone> Drop for InFlight<'_, O> {
    fn drop(&mut self) {
        let remaining = self.counter.fetch_sub(1, Ordering::SeqCst) - 1;
        if self.settled || remaining > 0 {
            return;
        }
        let previous = self.last_settled.lock().clone();
        self.state.send_if_modified(|state| {
            if state.is_pending() {
                *state = previous;
                true
            } else {
                false
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caller::TransportError;
    use giveaway_core::ErrorCode;
    use giveaway_procedure::BoxFuture;
    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use tokio::sync::Notify;

    /// Answers from a script, optionally waiting for a go signal first.
    struct Scripted {
        answer: Box<dyn Fn(Value) -> Result<Outcome<String>, TransportError> + Send + Sync>,
        gate: Option<Arc<Notify>>,
    }

    impl ProcedureCaller<String> for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn call(&self, input: Value) -> BoxFuture<'_, Result<Outcome<String>, TransportError>> {
            Box::pin(async move {
                if let Some(gate) = &self.gate {
                    gate.notified().await;
                }
                (self.answer)(input)
            })
        }
    }

    fn echo() -> Arc<dyn ProcedureCaller<String>> {
        Arc::new(Scripted {
            answer: Box::new(|input| Ok(Outcome::success(input["name"].to_string()))),
            gate: None,
        })
    }

    fn conflict() -> Arc<dyn ProcedureCaller<String>> {
        Arc::new(Scripted {
            answer: Box::new(|_| Ok(Outcome::failure(ErrorCode::Conflict, "Profile already exists"))),
            gate: None,
        })
    }

    #[tokio::test]
    async fn test_success_routes_to_callback() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let toasts = Arc::new(ToastQueue::default());
        let hook = UseProcedure::new(echo())
            .notifier(toasts.clone())
            .on_success(move |out: &String| sink.lock().push(out.clone()));

        assert_eq!(hook.current(), CallState::Idle);
        let outcome = hook.run(&json!({ "name": "Ann" })).await;

        assert!(outcome.is_ok());
        assert_eq!(*seen.lock(), vec!["\"Ann\"".to_string()]);
        assert!(toasts.messages().is_empty());
        assert!(matches!(hook.current(), CallState::Settled(Outcome::Success(_))));
        assert!(!hook.is_loading());
    }

    #[tokio::test]
    async fn test_default_failure_shows_toast() {
        let toasts = Arc::new(ToastQueue::default());
        let hook = UseProcedure::new(conflict()).notifier(toasts.clone());

        let outcome = hook.run(&json!({})).await;

        assert_eq!(outcome.code(), Some(ErrorCode::Conflict));
        assert_eq!(toasts.messages(), vec!["Profile already exists".to_string()]);
    }

    #[tokio::test]
    async fn test_failure_callback_replaces_toast() {
        let toasts = Arc::new(ToastQueue::default());
        let codes = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&codes);
        let hook = UseProcedure::new(conflict())
            .notifier(toasts.clone())
            .on_failure(move |failure| sink.lock().push(failure.code));

        hook.run(&json!({})).await;

        assert_eq!(*codes.lock(), vec![ErrorCode::Conflict]);
        assert!(toasts.messages().is_empty());
    }

    #[tokio::test]
    async fn test_transport_error_settles_as_unknown_http_error() {
        let caller: Arc<dyn ProcedureCaller<String>> = Arc::new(Scripted {
            answer: Box::new(|_| {
                Err(TransportError::UnexpectedResponse {
                    status: 502,
                    reason: "not json".to_string(),
                })
            }),
            gate: None,
        });
        let toasts = Arc::new(ToastQueue::default());
        let hook = UseProcedure::new(caller).notifier(toasts.clone());

        let outcome = hook.run(&json!({})).await;

        assert_eq!(outcome.code(), Some(ErrorCode::UnknownHttpError));
        assert_eq!(toasts.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_loading_tracks_concurrent_runs() {
        let gate = Arc::new(Notify::new());
        let caller: Arc<dyn ProcedureCaller<String>> = Arc::new(Scripted {
            answer: Box::new(|_| Ok(Outcome::success("done".to_string()))),
            gate: Some(gate.clone()),
        });
        let hook = Arc::new(UseProcedure::new(caller));
        let mut state = hook.state();

        let first = tokio::spawn({
            let hook = Arc::clone(&hook);
            async move { hook.run(&json!({})).await }
        });
        let second = tokio::spawn({
            let hook = Arc::clone(&hook);
            async move { hook.run(&json!({})).await }
        });

        state
            .wait_for(CallState::is_pending)
            .await
            .expect("sender alive");
        while hook.in_flight.load(Ordering::SeqCst) < 2 {
            tokio::task::yield_now().await;
        }
        assert!(hook.is_loading());

        gate.notify_waiters();
        assert!(first.await.expect("joined").is_ok());
        assert!(second.await.expect("joined").is_ok());

        assert!(!hook.is_loading());
        assert!(hook.current().outcome().is_some_and(Outcome::is_ok));
    }

    #[tokio::test]
    async fn test_cancelled_run_is_not_loading() {
        let gate = Arc::new(Notify::new());
        let caller: Arc<dyn ProcedureCaller<String>> = Arc::new(Scripted {
            answer: Box::new(|_| Ok(Outcome::success("never".to_string()))),
            gate: Some(gate),
        });
        let hook = UseProcedure::new(caller);

        let input = json!({});
        let run = hook.run(&input);
        let timed_out = tokio::time::timeout(std::time::Duration::from_millis(10), run).await;

        assert!(timed_out.is_err());
        assert!(!hook.is_loading());
        assert_eq!(hook.current(), CallState::Idle);
    }

    #[tokio::test]
    async fn test_cancelled_run_restores_last_outcome() {
        let gate = Arc::new(Notify::new());
        let caller: Arc<dyn ProcedureCaller<String>> = Arc::new(Scripted {
            answer: Box::new(|input| Ok(Outcome::success(input["name"].to_string()))),
            gate: Some(gate.clone()),
        });
        let hook = UseProcedure::new(caller);

        gate.notify_one();
        let settled = hook.run(&json!({ "name": "Ann" })).await;
        assert!(settled.is_ok());

        let input = json!({ "name": "Ben" });
        let abandoned = hook.run(&input);
        let timed_out = tokio::time::timeout(std::time::Duration::from_millis(10), abandoned).await;

        assert!(timed_out.is_err());
        assert!(!hook.is_loading());
        assert_eq!(hook.current(), CallState::Settled(settled));
    }
}
