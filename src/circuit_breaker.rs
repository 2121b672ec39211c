//! Circuit breaker guarding outbound carrier API calls.
//!
//! Carrier APIs are external and unreliable; once a provider starts failing
//! repeatedly the breaker opens and rejects calls until a cool-down passes.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,
    /// Cool-down before an open circuit lets a probe call through.
    pub timeout: Duration,
    /// Successes required in half-open before closing again.
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            timeout: Duration::from_secs(60),
            success_threshold: 2,
        }
    }
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    last_failure_time: Option<Instant>,
}

#[derive(Error, Debug)]
pub enum CircuitBreakerError<E: std::fmt::Display> {
    #[error("circuit breaker is open")]
    Open,
    #[error("{0}")]
    Inner(E),
}

#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: Arc<Mutex<BreakerState>>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(BreakerState {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                last_failure_time: None,
            })),
        }
    }

    /// Run `f` under breaker protection.
    pub async fn call<F, Fut, T, E>(&self, f: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        if !self.can_execute() {
            return Err(CircuitBreakerError::Open);
        }
        match f().await {
            Ok(v) => {
                self.on_success();
                Ok(v)
            }
            Err(e) => {
                self.on_failure();
                Err(CircuitBreakerError::Inner(e))
            }
        }
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn can_execute(&self) -> bool {
        let mut state = self.lock();
        match state.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => match state.last_failure_time {
                Some(last) if last.elapsed() >= self.config.timeout => {
                    state.state = CircuitState::HalfOpen;
                    state.success_count = 0;
                    true
                }
                _ => false,
            },
        }
    }

    fn on_success(&self) {
        let mut state = self.lock();
        match state.state {
            CircuitState::Closed => state.failure_count = 0,
            CircuitState::HalfOpen => {
                state.success_count += 1;
                if state.success_count >= self.config.success_threshold {
                    state.state = CircuitState::Closed;
                    state.failure_count = 0;
                    state.success_count = 0;
                    state.last_failure_time = None;
                }
            }
            CircuitState::Open => {}
        }
    }

    fn on_failure(&self) {
        let mut state = self.lock();
        state.failure_count += 1;
        state.last_failure_time = Some(Instant::now());
        match state.state {
            CircuitState::Closed => {
                if state.failure_count >= self.config.failure_threshold {
                    state.state = CircuitState::Open;
                }
            }
            // Any failure while probing re-opens the circuit.
            CircuitState::HalfOpen => {
                state.state = CircuitState::Open;
                state.success_count = 0;
            }
            CircuitState::Open => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(failures: u32) -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: failures,
            timeout: Duration::from_millis(20),
            success_threshold: 1,
        })
    }

    #[tokio::test]
    async fn opens_after_consecutive_failures() {
        let cb = breaker(2);
        for _ in 0..2 {
            let _ = cb
                .call(|| async { Err::<(), _>("carrier down".to_string()) })
                .await;
        }
        assert_eq!(cb.state(), CircuitState::Open);
        let res = cb.call(|| async { Ok::<_, String>(1) }).await;
        assert!(matches!(res, Err(CircuitBreakerError::Open)));
    }

    #[tokio::test]
    async fn closes_again_after_cooldown_and_success() {
        let cb = breaker(1);
        let _ = cb
            .call(|| async { Err::<(), _>("boom".to_string()) })
            .await;
        assert_eq!(cb.state(), CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(30)).await;
        let res = cb.call(|| async { Ok::<_, String>(42) }).await;
        assert!(matches!(res, Ok(42)));
        assert_eq!(cb.state(), CircuitState::Closed);
    }
}
