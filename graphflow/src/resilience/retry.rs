//! Retry wrapper: exponential backoff around a flaky node.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::context::Context;
use crate::error::GraphError;
use crate::graph::node::Node;

/// Retry policy: attempt count, backoff shape and an optional classifier
/// deciding which errors are worth retrying.
///
/// Defaults to 3 attempts starting at 100ms, doubling up to a 5s cap,
/// retrying every error.
#[derive(Clone)]
pub struct RetryConfig {
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
    backoff_factor: f64,
    retryable: Option<Arc<dyn Fn(&GraphError) -> bool + Send + Sync>>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            backoff_factor: 2.0,
            retryable: None,
        }
    }
}

impl RetryConfig {
    /// Policy with `max_attempts` total attempts and default backoff.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Delay before the second attempt.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Upper bound for the growing delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Multiplier applied to the delay after each failed attempt.
    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    /// Classifier deciding whether an error is retried. Errors it rejects
    /// end the retry loop immediately as [`GraphError::NonRetryable`].
    pub fn with_retryable(
        mut self,
        classifier: impl Fn(&GraphError) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.retryable = Some(Arc::new(classifier));
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn is_retryable(&self, err: &GraphError) -> bool {
        self.retryable.as_ref().map_or(true, |f| f(err))
    }
}

/// Node wrapper that re-runs its inner node on failure.
///
/// Each attempt receives a clone of the input state. Between attempts the
/// wrapper sleeps for the current delay, racing the sleep against context
/// cancellation; the delay then grows by the backoff factor up to the cap.
pub struct RetryNode<S> {
    name: String,
    inner: Arc<dyn Node<S>>,
    config: RetryConfig,
}

impl<S> RetryNode<S> {
    pub fn new(name: impl Into<String>, inner: Arc<dyn Node<S>>, config: RetryConfig) -> Self {
        Self {
            name: name.into(),
            inner,
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl<S> Node<S> for RetryNode<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn run(&self, ctx: &Context, state: S) -> Result<S, GraphError> {
        let mut delay = self.config.initial_delay;
        let mut last_err: Option<GraphError> = None;

        for attempt in 1..=self.config.max_attempts {
            if ctx.is_cancelled() {
                return Err(GraphError::Cancelled);
            }
            match self.inner.run(ctx, state.clone()).await {
                Ok(next) => return Ok(next),
                Err(err) => {
                    if !self.config.is_retryable(&err) {
                        return Err(GraphError::NonRetryable {
                            source: Box::new(err),
                        });
                    }
                    last_err = Some(err);
                }
            }
            if attempt < self.config.max_attempts {
                tracing::debug!(
                    node = %self.name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "retrying node after failure"
                );
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = ctx.cancelled() => return Err(GraphError::Cancelled),
                }
                delay = next_delay(delay, self.config.backoff_factor, self.config.max_delay);
            }
        }

        Err(GraphError::RetryExhausted {
            attempts: self.config.max_attempts,
            source: Box::new(last_err.unwrap_or_else(|| {
                GraphError::ExecutionFailed("no attempts were made".to_string())
            })),
        })
    }
}

fn next_delay(current: Duration, factor: f64, cap: Duration) -> Duration {
    let scaled = current.mul_f64(factor);
    if scaled > cap {
        cap
    } else {
        scaled
    }
}
