//! Circuit breaker wrapper: stops calling a node that keeps failing.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::context::Context;
use crate::error::GraphError;
use crate::graph::node::Node;

/// Observable state of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls pass through; consecutive failures are counted.
    Closed,
    /// Calls are rejected until the open timeout elapses.
    Open,
    /// A limited number of probe calls are allowed through.
    HalfOpen,
}

/// Thresholds and timing for [`CircuitBreaker`].
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,
    /// Consecutive half-open successes that close it again.
    pub success_threshold: u32,
    /// How long the circuit stays open before probing.
    pub open_timeout: Duration,
    /// Probe calls allowed while half-open.
    pub half_open_max_calls: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            open_timeout: Duration::from_secs(30),
            half_open_max_calls: 3,
        }
    }
}

struct BreakerState {
    state: CircuitState,
    failures: u32,
    successes: u32,
    half_open_calls: u32,
    last_failure: Option<Instant>,
}

/// Node wrapper guarding its inner node with a Closed/Open/HalfOpen state
/// machine.
///
/// Rejections ([`GraphError::CircuitOpen`],
/// [`GraphError::CircuitHalfOpenLimitReached`]) happen before the inner
/// node runs and do not count as node failures. Inner errors pass through
/// unwrapped while the breaker records them.
pub struct CircuitBreaker<S> {
    name: String,
    inner: Arc<dyn Node<S>>,
    config: CircuitBreakerConfig,
    breaker: Mutex<BreakerState>,
}

impl<S> CircuitBreaker<S> {
    pub fn new(
        name: impl Into<String>,
        inner: Arc<dyn Node<S>>,
        config: CircuitBreakerConfig,
    ) -> Self {
        Self {
            name: name.into(),
            inner,
            config,
            breaker: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                failures: 0,
                successes: 0,
                half_open_calls: 0,
                last_failure: None,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state, for monitoring and tests.
    pub fn state(&self) -> CircuitState {
        self.breaker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .state
    }

    /// Admission check, run before the inner node. The lock is never held
    /// across an await.
    fn before_call(&self) -> Result<(), GraphError> {
        let mut breaker = self.breaker.lock().unwrap_or_else(PoisonError::into_inner);
        match breaker.state {
            CircuitState::Closed => Ok(()),
            CircuitState::Open => {
                let waited_out = breaker
                    .last_failure
                    .map_or(true, |at| at.elapsed() >= self.config.open_timeout);
                if waited_out {
                    breaker.state = CircuitState::HalfOpen;
                    breaker.successes = 0;
                    // the transitioning call is the first probe
                    breaker.half_open_calls = 1;
                    tracing::debug!(node = %self.name, "circuit half-open, probing");
                    Ok(())
                } else {
                    Err(GraphError::CircuitOpen(self.name.clone()))
                }
            }
            CircuitState::HalfOpen => {
                if breaker.half_open_calls >= self.config.half_open_max_calls {
                    breaker.state = CircuitState::Open;
                    Err(GraphError::CircuitHalfOpenLimitReached(self.name.clone()))
                } else {
                    breaker.half_open_calls += 1;
                    Ok(())
                }
            }
        }
    }

    fn record_success(&self) {
        let mut breaker = self.breaker.lock().unwrap_or_else(PoisonError::into_inner);
        breaker.failures = 0;
        breaker.successes += 1;
        if breaker.state == CircuitState::HalfOpen
            && breaker.successes >= self.config.success_threshold
        {
            breaker.state = CircuitState::Closed;
            breaker.successes = 0;
            breaker.half_open_calls = 0;
            tracing::debug!(node = %self.name, "circuit closed");
        }
    }

    fn record_failure(&self) {
        let mut breaker = self.breaker.lock().unwrap_or_else(PoisonError::into_inner);
        breaker.failures += 1;
        breaker.successes = 0;
        breaker.last_failure = Some(Instant::now());
        match breaker.state {
            // a half-open probe failing reopens the circuit at once
            CircuitState::HalfOpen => {
                breaker.state = CircuitState::Open;
                tracing::warn!(node = %self.name, "circuit reopened by failed probe");
            }
            _ => {
                if breaker.failures >= self.config.failure_threshold {
                    breaker.state = CircuitState::Open;
                    tracing::warn!(node = %self.name, failures = breaker.failures, "circuit opened");
                }
            }
        }
    }
}

#[async_trait]
impl<S> Node<S> for CircuitBreaker<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn run(&self, ctx: &Context, state: S) -> Result<S, GraphError> {
        self.before_call()?;
        match self.inner.run(ctx, state).await {
            Ok(next) => {
                self.record_success();
                Ok(next)
            }
            Err(err) => {
                self.record_failure();
                Err(err)
            }
        }
    }
}
