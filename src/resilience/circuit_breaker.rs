//! Circuit breaker for predictor protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: predictor assumed down, calls fail fast
//! - Half-Open: testing if predictor recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive_failures >= failure_threshold
//! Open → Half-Open: recovery_timeout elapsed since opened_at
//! Half-Open → Closed: consecutive_successes >= success_threshold
//! Half-Open → Open: any probe fails
//! ```
//!
//! # Design Decisions
//! - One breaker per service, shared by reference
//! - All bookkeeping under one mutex; never held across the protected call
//! - Single probe in Half-Open (concurrent callers are short-circuited)
//! - Outcomes only count in the state they were admitted under; every
//!   transition bumps a generation and late results from an older one are dropped

use std::fmt;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;

use crate::config::BreakerConfig;
use crate::observability::metrics;

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(self) -> &'static str {
        match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPEN",
            CircuitState::HalfOpen => "HALF_OPEN",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by [`CircuitBreaker::call`].
#[derive(Debug, Error)]
pub enum BreakerError<E> {
    /// The call was short-circuited; the operation never ran.
    #[error("Circuit breaker [{name}] is OPEN")]
    Open { name: String },

    /// The operation ran and failed.
    #[error(transparent)]
    Inner(E),
}

impl<E> BreakerError<E> {
    pub fn is_open(&self) -> bool {
        matches!(self, BreakerError::Open { .. })
    }
}

/// Mutable bookkeeping, only touched under the breaker's lock.
#[derive(Debug)]
struct BreakerRuntime {
    state: CircuitState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
    /// Bumped on every state change.
    generation: u64,
}

impl BreakerRuntime {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            consecutive_successes: 0,
            opened_at: None,
            probe_in_flight: false,
            generation: 0,
        }
    }

    fn enter(&mut self, to: CircuitState) {
        self.state = to;
        self.generation += 1;
    }
}

/// Point-in-time view of the breaker, safe to serialize.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
    /// Milliseconds since the circuit last opened, while not closed.
    pub open_for_ms: Option<u64>,
}

/// Guards calls to an unreliable dependency.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    failure_threshold: u32,
    success_threshold: u32,
    recovery_timeout: Duration,
    runtime: Mutex<BreakerRuntime>,
}

impl CircuitBreaker {
    pub fn new(config: &BreakerConfig) -> Self {
        let breaker = Self {
            name: config.name.clone(),
            failure_threshold: config.failure_threshold.max(1),
            success_threshold: config.success_threshold.max(1),
            recovery_timeout: config.recovery_timeout(),
            runtime: Mutex::new(BreakerRuntime::new()),
        };
        metrics::record_circuit_state(&breaker.name, CircuitState::Closed);
        breaker
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let rt = self.lock();
        BreakerSnapshot {
            name: self.name.clone(),
            state: rt.state,
            consecutive_failures: rt.consecutive_failures,
            consecutive_successes: rt.consecutive_successes,
            open_for_ms: match rt.state {
                CircuitState::Closed => None,
                _ => rt.opened_at.map(|at| at.elapsed().as_millis() as u64),
            },
        }
    }

    /// Force the circuit closed and clear all counters.
    pub fn reset(&self) {
        let mut rt = self.lock();
        let from = rt.state;
        let generation = rt.generation + 1;
        *rt = BreakerRuntime {
            generation,
            ..BreakerRuntime::new()
        };
        drop(rt);
        tracing::info!(breaker = %self.name, from = %from, "Circuit breaker reset");
        if from != CircuitState::Closed {
            self.report_transition(CircuitState::Closed);
        }
    }

    /// Run `operation` if the circuit admits it, recording the outcome.
    ///
    /// The lock is released while `operation` runs. An open circuit returns
    /// [`BreakerError::Open`] without calling `operation` at all.
    pub async fn call<F, Fut, T, E>(&self, operation: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let mut attempt = self.admit().ok_or_else(|| self.open_error())?;
        let outcome = operation().await;

        match &outcome {
            Ok(_) => attempt.succeed(),
            Err(e) => attempt.fail(e),
        }

        outcome.map_err(BreakerError::Inner)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerRuntime> {
        self.runtime.lock().expect("circuit breaker mutex poisoned")
    }

    /// Check and transition state; `None` means short-circuit.
    fn admit(&self) -> Option<Attempt<'_>> {
        let mut rt = self.lock();

        if rt.state == CircuitState::Open {
            let elapsed = rt.opened_at.map(|at| at.elapsed()).unwrap_or(Duration::MAX);
            if elapsed < self.recovery_timeout {
                tracing::debug!(breaker = %self.name, "Call short-circuited");
                return None;
            }
            rt.enter(CircuitState::HalfOpen);
            rt.consecutive_successes = 0;
            tracing::info!(breaker = %self.name, "Circuit breaker entering HALF_OPEN");
            self.report_transition(CircuitState::HalfOpen);
        }

        let probe = rt.state == CircuitState::HalfOpen;
        if probe {
            if rt.probe_in_flight {
                tracing::debug!(breaker = %self.name, "Trial call already in flight, short-circuiting");
                return None;
            }
            rt.probe_in_flight = true;
        }

        Some(Attempt {
            breaker: self,
            probe,
            generation: rt.generation,
            settled: false,
        })
    }

    /// Lock the runtime if `generation` is still current.
    fn lock_current(&self, generation: u64) -> Option<std::sync::MutexGuard<'_, BreakerRuntime>> {
        let rt = self.lock();
        if rt.generation == generation {
            Some(rt)
        } else {
            tracing::debug!(
                breaker = %self.name,
                state = %rt.state,
                "Ignoring outcome of a call admitted before the last transition"
            );
            None
        }
    }

    fn on_success(&self, probe: bool, generation: u64) {
        let Some(mut rt) = self.lock_current(generation) else {
            return;
        };
        if probe {
            rt.probe_in_flight = false;
        }
        rt.consecutive_failures = 0;

        if rt.state == CircuitState::HalfOpen {
            rt.consecutive_successes += 1;
            if rt.consecutive_successes >= self.success_threshold {
                rt.enter(CircuitState::Closed);
                rt.consecutive_successes = 0;
                rt.consecutive_failures = 0;
                rt.opened_at = None;
                drop(rt);
                tracing::info!(breaker = %self.name, "Circuit breaker CLOSED");
                self.report_transition(CircuitState::Closed);
            }
        }
    }

    fn on_failure(&self, probe: bool, generation: u64, error: &dyn fmt::Display) {
        let Some(mut rt) = self.lock_current(generation) else {
            tracing::warn!(breaker = %self.name, error = %error, "Late call failed");
            return;
        };
        if probe {
            rt.probe_in_flight = false;
        }
        rt.consecutive_failures += 1;
        rt.consecutive_successes = 0;

        // Nothing is admitted while OPEN, so a current attempt is never in that state.
        let trip = match rt.state {
            CircuitState::HalfOpen => true,
            CircuitState::Closed => rt.consecutive_failures >= self.failure_threshold,
            CircuitState::Open => false,
        };

        let failures = rt.consecutive_failures;
        let from = rt.state;
        if trip {
            rt.enter(CircuitState::Open);
            rt.opened_at = Some(Instant::now());
        }
        drop(rt);

        tracing::warn!(
            breaker = %self.name,
            state = %from,
            consecutive_failures = failures,
            error = %error,
            "Protected call failed"
        );

        if trip {
            tracing::error!(
                breaker = %self.name,
                from = %from,
                retry_in_ms = self.recovery_timeout.as_millis() as u64,
                "Circuit breaker OPEN"
            );
            self.report_transition(CircuitState::Open);
        }
    }

    fn release_probe(&self, generation: u64) {
        let Some(mut rt) = self.lock_current(generation) else {
            return;
        };
        rt.probe_in_flight = false;
        drop(rt);
        tracing::debug!(breaker = %self.name, "Trial call abandoned, releasing probe slot");
    }

    fn open_error<E>(&self) -> BreakerError<E> {
        BreakerError::Open {
            name: self.name.clone(),
        }
    }

    fn report_transition(&self, to: CircuitState) {
        metrics::record_circuit_state(&self.name, to);
        metrics::record_circuit_transition(&self.name, to);
    }
}

/// An admitted call. Dropping it unsettled frees the half-open probe slot.
struct Attempt<'a> {
    breaker: &'a CircuitBreaker,
    probe: bool,
    generation: u64,
    settled: bool,
}

impl Attempt<'_> {
    fn succeed(&mut self) {
        self.settled = true;
        self.breaker.on_success(self.probe, self.generation);
    }

    fn fail(&mut self, error: &dyn fmt::Display) {
        self.settled = true;
        self.breaker.on_failure(self.probe, self.generation, error);
    }
}

impl Drop for Attempt<'_> {
    fn drop(&mut self) {
        if !self.settled && self.probe {
            self.breaker.release_probe(self.generation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn breaker(failure_threshold: u32, success_threshold: u32, recovery_secs: u64) -> CircuitBreaker {
        CircuitBreaker::new(&BreakerConfig {
            name: "test".into(),
            failure_threshold,
            success_threshold,
            recovery_timeout_ms: recovery_secs * 1000,
        })
    }

    async fn fail(cb: &CircuitBreaker, calls: &AtomicU32) -> Result<(), BreakerError<String>> {
        cb.call(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>("model exploded".to_string())
        })
        .await
    }

    async fn succeed(cb: &CircuitBreaker, calls: &AtomicU32) -> Result<u32, BreakerError<String>> {
        cb.call(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, String>(7)
        })
        .await
    }

    #[tokio::test]
    async fn test_opens_after_threshold_and_short_circuits() {
        let cb = breaker(3, 1, 30);
        let calls = AtomicU32::new(0);

        for _ in 0..3 {
            let err = fail(&cb, &calls).await.unwrap_err();
            assert!(matches!(err, BreakerError::Inner(ref m) if m == "model exploded"));
        }
        assert_eq!(cb.state(), CircuitState::Open);

        let err = fail(&cb, &calls).await.unwrap_err();
        assert!(err.is_open());
        assert_eq!(err.to_string(), "Circuit breaker [test] is OPEN");
        assert_eq!(calls.load(Ordering::SeqCst), 3, "4th call must not reach the operation");
    }

    #[tokio::test]
    async fn test_stays_closed_below_threshold() {
        let cb = breaker(3, 1, 30);
        let calls = AtomicU32::new(0);

        fail(&cb, &calls).await.unwrap_err();
        fail(&cb, &calls).await.unwrap_err();
        assert_eq!(cb.state(), CircuitState::Closed);

        // A success resets the streak.
        succeed(&cb, &calls).await.unwrap();
        fail(&cb, &calls).await.unwrap_err();
        fail(&cb, &calls).await.unwrap_err();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.snapshot().consecutive_failures, 2);
    }

    #[tokio::test]
    async fn test_successes_while_closed_leave_counters_untouched() {
        let cb = breaker(3, 2, 30);
        let calls = AtomicU32::new(0);

        for _ in 0..10 {
            assert_eq!(succeed(&cb, &calls).await.unwrap(), 7);
        }
        let snap = cb.snapshot();
        assert_eq!(snap.state, CircuitState::Closed);
        assert_eq!(snap.consecutive_failures, 0);
        assert_eq!(snap.consecutive_successes, 0);
        assert_eq!(snap.open_for_ms, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_timeout_with_single_success() {
        let cb = breaker(3, 1, 30);
        let calls = AtomicU32::new(0);

        for _ in 0..3 {
            fail(&cb, &calls).await.unwrap_err();
        }
        assert_eq!(cb.state(), CircuitState::Open);

        tokio::time::advance(Duration::from_secs(29)).await;
        assert!(succeed(&cb, &calls).await.unwrap_err().is_open());
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(succeed(&cb, &calls).await.unwrap(), 7);
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_failure_reopens_immediately() {
        let cb = breaker(2, 2, 10);
        let calls = AtomicU32::new(0);

        fail(&cb, &calls).await.unwrap_err();
        fail(&cb, &calls).await.unwrap_err();
        tokio::time::advance(Duration::from_secs(10)).await;

        let err = fail(&cb, &calls).await.unwrap_err();
        assert!(!err.is_open(), "probe must reach the operation");
        assert_eq!(cb.state(), CircuitState::Open);

        // opened_at was refreshed, so the full timeout applies again.
        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(succeed(&cb, &calls).await.unwrap_err().is_open());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_needs_success_threshold() {
        let cb = breaker(1, 3, 5);
        let calls = AtomicU32::new(0);

        fail(&cb, &calls).await.unwrap_err();
        tokio::time::advance(Duration::from_secs(5)).await;

        succeed(&cb, &calls).await.unwrap();
        succeed(&cb, &calls).await.unwrap();
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert_eq!(cb.snapshot().consecutive_successes, 2);

        succeed(&cb, &calls).await.unwrap();
        let snap = cb.snapshot();
        assert_eq!(snap.state, CircuitState::Closed);
        assert_eq!(snap.consecutive_successes, 0);
        assert_eq!(snap.consecutive_failures, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_one_probe_in_flight() {
        let cb = Arc::new(breaker(1, 1, 1));
        let calls = Arc::new(AtomicU32::new(0));

        fail(&cb, &calls).await.unwrap_err();
        tokio::time::advance(Duration::from_secs(1)).await;

        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let probe = {
            let cb = cb.clone();
            let calls = calls.clone();
            tokio::spawn(async move {
                cb.call(|| async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    let _ = release_rx.await;
                    Ok::<_, String>(1)
                })
                .await
            })
        };

        // Let the probe get admitted.
        while calls.load(Ordering::SeqCst) < 2 {
            tokio::task::yield_now().await;
        }
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert!(succeed(&cb, &calls).await.unwrap_err().is_open());

        release_tx.send(()).unwrap();
        assert_eq!(probe.await.unwrap().unwrap(), 1);
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_probe_frees_slot() {
        let cb = breaker(1, 1, 1);
        let calls = AtomicU32::new(0);

        fail(&cb, &calls).await.unwrap_err();
        tokio::time::advance(Duration::from_secs(1)).await;

        let stalled = cb.call(|| std::future::pending::<Result<(), String>>());
        let timed_out = tokio::time::timeout(Duration::from_millis(10), stalled).await;
        assert!(timed_out.is_err());
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        succeed(&cb, &calls).await.unwrap();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    /// Spawn a call that stays in flight until the returned sender fires.
    fn held(
        cb: &Arc<CircuitBreaker>,
        calls: &Arc<AtomicU32>,
        outcome: Result<u32, String>,
    ) -> (
        tokio::sync::oneshot::Sender<()>,
        tokio::task::JoinHandle<Result<u32, BreakerError<String>>>,
    ) {
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let cb = cb.clone();
        let calls = calls.clone();
        let handle = tokio::spawn(async move {
            cb.call(|| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                let _ = release_rx.await;
                outcome
            })
            .await
        });
        (release_tx, handle)
    }

    async fn wait_for_calls(calls: &AtomicU32, n: u32) {
        while calls.load(Ordering::SeqCst) < n {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_closed_success_does_not_close_half_open() {
        let cb = Arc::new(breaker(1, 1, 1));
        let calls = Arc::new(AtomicU32::new(0));

        let (release_slow, slow) = held(&cb, &calls, Ok(1));
        wait_for_calls(&calls, 1).await;

        fail(&cb, &calls).await.unwrap_err();
        assert_eq!(cb.state(), CircuitState::Open);
        tokio::time::advance(Duration::from_secs(1)).await;

        let (release_trial, trial) = held(&cb, &calls, Ok(2));
        wait_for_calls(&calls, 3).await;
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        release_slow.send(()).unwrap();
        assert_eq!(slow.await.unwrap().unwrap(), 1);
        let snap = cb.snapshot();
        assert_eq!(snap.state, CircuitState::HalfOpen);
        assert_eq!(snap.consecutive_successes, 0);
        assert!(succeed(&cb, &calls).await.unwrap_err().is_open(), "trial still in flight");

        release_trial.send(()).unwrap();
        assert_eq!(trial.await.unwrap().unwrap(), 2);
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_closed_failure_does_not_reopen_half_open() {
        let cb = Arc::new(breaker(1, 1, 1));
        let calls = Arc::new(AtomicU32::new(0));

        let (release_slow, slow) = held(&cb, &calls, Err("late".into()));
        wait_for_calls(&calls, 1).await;

        fail(&cb, &calls).await.unwrap_err();
        tokio::time::advance(Duration::from_secs(1)).await;

        let (release_trial, trial) = held(&cb, &calls, Ok(2));
        wait_for_calls(&calls, 3).await;

        release_slow.send(()).unwrap();
        let err = slow.await.unwrap().unwrap_err();
        assert!(matches!(err, BreakerError::Inner(ref m) if m == "late"));
        let snap = cb.snapshot();
        assert_eq!(snap.state, CircuitState::HalfOpen);
        assert_eq!(snap.consecutive_failures, 1);

        release_trial.send(()).unwrap();
        trial.await.unwrap().unwrap();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trial_from_before_reset_keeps_new_probe_slot() {
        let cb = Arc::new(breaker(1, 1, 1));
        let calls = Arc::new(AtomicU32::new(0));

        fail(&cb, &calls).await.unwrap_err();
        tokio::time::advance(Duration::from_secs(1)).await;
        let (release_old, old_trial) = held(&cb, &calls, Ok(1));
        wait_for_calls(&calls, 2).await;

        cb.reset();
        fail(&cb, &calls).await.unwrap_err();
        tokio::time::advance(Duration::from_secs(1)).await;
        let (release_new, new_trial) = held(&cb, &calls, Ok(2));
        wait_for_calls(&calls, 4).await;

        release_old.send(()).unwrap();
        old_trial.await.unwrap().unwrap();
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert!(succeed(&cb, &calls).await.unwrap_err().is_open());

        release_new.send(()).unwrap();
        new_trial.await.unwrap().unwrap();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_reset_closes_circuit() {
        let cb = breaker(1, 1, 3600);
        let calls = AtomicU32::new(0);

        fail(&cb, &calls).await.unwrap_err();
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(cb.snapshot().open_for_ms.is_some());

        cb.reset();
        assert_eq!(cb.state(), CircuitState::Closed);
        succeed(&cb, &calls).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_failures_counted_once_each() {
        let cb = Arc::new(breaker(1000, 1, 30));
        let calls = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..50 {
            let cb = cb.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move { fail(&cb, &calls).await }));
        }
        for h in handles {
            h.await.unwrap().unwrap_err();
        }

        assert_eq!(cb.snapshot().consecutive_failures, 50);
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn test_state_serialization() {
        assert_eq!(serde_json::to_string(&CircuitState::HalfOpen).unwrap(), "\"HALF_OPEN\"");
        assert_eq!(CircuitState::Open.to_string(), "OPEN");
    }
}
