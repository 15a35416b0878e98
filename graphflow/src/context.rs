//! Execution context threaded through every node, listener and hook.

use tokio_util::sync::CancellationToken;

/// Per-run context carrying cooperative cancellation and the id of the
/// enclosing trace span.
///
/// Cancellation is cooperative: the engine's waits (retry backoff, timeout
/// races, stream sends) observe the token, plain node bodies must check it
/// themselves. Cloning is cheap and clones share the same token.
///
/// **Interaction**: created by the caller per run, passed by reference into
/// [`Node::run`](crate::graph::Node::run); the engine derives children via
/// [`Context::with_span`] so spans nest, wrappers derive children via
/// [`Context::child`] so they can cancel their subtree without touching the
/// caller's token.
#[derive(Clone, Debug, Default)]
pub struct Context {
    cancel: CancellationToken,
    span_id: Option<String>,
}

impl Context {
    /// Creates a root context with a fresh cancellation token and no span.
    pub fn new() -> Self {
        Self::default()
    }

    /// Context sharing this token whose enclosing span is `span_id`.
    pub fn with_span(&self, span_id: impl Into<String>) -> Self {
        Self {
            cancel: self.cancel.clone(),
            span_id: Some(span_id.into()),
        }
    }

    /// Id of the span enclosing the current execution, if tracing is active.
    pub fn span_id(&self) -> Option<&str> {
        self.span_id.as_deref()
    }

    /// Derives a child context: cancelling the child leaves this context
    /// untouched, cancelling this context also cancels the child.
    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            span_id: self.span_id.clone(),
        }
    }

    /// Requests cancellation of this context and every child derived from it.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// True once [`Context::cancel`] was called here or on an ancestor.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves when the context is cancelled. Intended for `tokio::select!`
    /// arms racing work against cancellation.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }
}
