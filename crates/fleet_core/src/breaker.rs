use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Observable state of a [`CircuitBreaker`]. `HalfOpen` is never stored directly;
/// it is derived lazily from `Open` + elapsed time whenever the state is read
/// (SPEC_FULL §4.1 state table).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

struct Inner {
    state: RawState,
    failures: u32,
    last_failure: Option<Instant>,
}

#[derive(PartialEq, Eq, Clone, Copy)]
enum RawState {
    Closed,
    Open,
    HalfOpen,
}

/// Per-cluster failure guard. One mutex, no condition variables, per §5 "Shared-resource policy".
pub struct CircuitBreaker {
    threshold: u32,
    reset_timeout: Duration,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            threshold,
            reset_timeout,
            inner: Mutex::new(Inner {
                state: RawState::Closed,
                failures: 0,
                last_failure: None,
            }),
        }
    }

    /// Reads the current state, lazily promoting `Open` to `HalfOpen` once the
    /// reset timeout has elapsed since the last failure.
    pub fn state(&self) -> BreakerState {
        let mut inner = self.inner.lock().expect("breaker mutex poisoned");
        self.observe_half_open(&mut inner);
        match inner.state {
            RawState::Closed => BreakerState::Closed,
            RawState::Open => BreakerState::Open,
            RawState::HalfOpen => BreakerState::HalfOpen,
        }
    }

    /// `true` unless the breaker is currently open (a half-open breaker allows
    /// exactly the probe the caller is about to make).
    pub fn allow_request(&self) -> bool {
        self.state() != BreakerState::Open
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock().expect("breaker mutex poisoned");
        self.observe_half_open(&mut inner);
        inner.state = RawState::Closed;
        inner.failures = 0;
    }

    pub fn record_failure(&self) {
        let mut inner = self.inner.lock().expect("breaker mutex poisoned");
        self.observe_half_open(&mut inner);
        inner.last_failure = Some(Instant::now());
        match inner.state {
            RawState::Closed => {
                inner.failures += 1;
                if inner.failures >= self.threshold {
                    inner.state = RawState::Open;
                }
            }
            RawState::Open => {
                // already tripped; just re-stamp lastFailure, counter stays >= threshold
            }
            RawState::HalfOpen => {
                inner.state = RawState::Open;
            }
        }
    }

    /// Promotes `Open` -> `HalfOpen` once `now - lastFailure >= reset_timeout`.
    /// Called at the top of every public method so the promotion is observed
    /// consistently regardless of which method triggers the read.
    fn observe_half_open(&self, inner: &mut Inner) {
        if inner.state == RawState::Open {
            if let Some(last_failure) = inner.last_failure {
                if last_failure.elapsed() >= self.reset_timeout {
                    inner.state = RawState::HalfOpen;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_until_threshold_failures() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(30));
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Closed);
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Closed);
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Open);
    }

    #[test]
    fn success_resets_failure_counter() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(30));
        breaker.record_failure();
        breaker.record_failure();
        breaker.record_success();
        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[test]
    fn half_open_after_timeout_then_success_closes() {
        let breaker = CircuitBreaker::new(2, Duration::from_millis(20));
        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Open);

        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(breaker.state(), BreakerState::HalfOpen);

        breaker.record_success();
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[test]
    fn half_open_failure_reopens() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(20));
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Open);

        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(breaker.state(), BreakerState::HalfOpen);

        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Open);
    }

    #[test]
    fn allow_request_reflects_state() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(20));
        assert!(breaker.allow_request());
        breaker.record_failure();
        assert!(!breaker.allow_request());
        std::thread::sleep(Duration::from_millis(30));
        assert!(breaker.allow_request());
    }
}
