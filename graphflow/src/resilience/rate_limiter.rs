//! Rate limit wrapper: caps how often a node runs inside a time window.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::context::Context;
use crate::error::GraphError;
use crate::graph::node::Node;

/// Node wrapper enforcing a sliding-window call budget.
///
/// Keeps the timestamps of recent admissions; a call is admitted when,
/// after dropping timestamps older than the window, fewer than `max_calls`
/// remain. Rejected calls fail fast with [`GraphError::RateLimited`] and a
/// suggested wait, they do not queue.
pub struct RateLimiter<S> {
    name: String,
    inner: Arc<dyn Node<S>>,
    max_calls: usize,
    window: Duration,
    admissions: Mutex<VecDeque<Instant>>,
}

impl<S> RateLimiter<S> {
    pub fn new(
        name: impl Into<String>,
        inner: Arc<dyn Node<S>>,
        max_calls: usize,
        window: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            inner,
            max_calls,
            window,
            admissions: Mutex::new(VecDeque::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn try_acquire(&self) -> Result<(), GraphError> {
        let mut admissions = self
            .admissions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        while admissions
            .front()
            .map_or(false, |at| now.duration_since(*at) >= self.window)
        {
            admissions.pop_front();
        }
        if admissions.len() >= self.max_calls {
            let retry_after = admissions.front().map_or(self.window, |oldest| {
                self.window.saturating_sub(now.duration_since(*oldest))
            });
            tracing::debug!(node = %self.name, retry_after_ms = retry_after.as_millis() as u64, "rate limit hit");
            return Err(GraphError::RateLimited {
                node: self.name.clone(),
                retry_after,
            });
        }
        admissions.push_back(now);
        Ok(())
    }
}

#[async_trait]
impl<S> Node<S> for RateLimiter<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn run(&self, ctx: &Context, state: S) -> Result<S, GraphError> {
        self.try_acquire()?;
        self.inner.run(ctx, state).await
    }
}
