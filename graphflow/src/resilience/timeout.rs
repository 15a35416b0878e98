//! Timeout wrapper: bounds how long a node may run.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::context::Context;
use crate::error::GraphError;
use crate::graph::node::Node;

/// Node wrapper that races its inner node against a deadline.
///
/// The inner node runs on its own task with a child context. When the
/// deadline passes first, the child context is cancelled and
/// [`GraphError::ExecutionTimeout`] is returned; the inner task is not
/// forcibly killed, so a node that ignores its context keeps running in
/// the background until it finishes on its own.
pub struct TimeoutNode<S> {
    name: String,
    inner: Arc<dyn Node<S>>,
    timeout: Duration,
}

impl<S> TimeoutNode<S> {
    pub fn new(name: impl Into<String>, inner: Arc<dyn Node<S>>, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            inner,
            timeout,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl<S> Node<S> for TimeoutNode<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn run(&self, ctx: &Context, state: S) -> Result<S, GraphError> {
        let child = ctx.child();
        let inner = Arc::clone(&self.inner);
        let task_ctx = child.clone();
        let handle = tokio::spawn(async move { inner.run(&task_ctx, state).await });

        tokio::select! {
            joined = handle => match joined {
                Ok(result) => result,
                Err(_) => Err(GraphError::ExecutionFailed(format!(
                    "node {} panicked",
                    self.name
                ))),
            },
            _ = tokio::time::sleep(self.timeout) => {
                child.cancel();
                tracing::warn!(node = %self.name, timeout_ms = self.timeout.as_millis() as u64, "node timed out");
                Err(GraphError::ExecutionTimeout {
                    node: self.name.clone(),
                    timeout: self.timeout,
                })
            }
            _ = ctx.cancelled() => {
                child.cancel();
                Err(GraphError::Cancelled)
            }
        }
    }
}
