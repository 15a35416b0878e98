//! Error types for graph construction and execution.

use std::time::Duration;

use thiserror::Error;

/// Error raised while compiling or running a graph.
///
/// Cloneable so stream events, listener notifications and trace spans can
/// carry the error while the original still propagates to the caller.
/// Wrapped causes are boxed and clone together with their wrapper.
#[derive(Debug, Clone, Error)]
pub enum GraphError {
    /// `compile` was called before `set_entry_point`.
    #[error("entry point not set")]
    EntryPointNotSet,

    /// Traversal reached a name with no registered node.
    #[error("node not found: {0}")]
    NodeNotFound(String),

    /// A node completed and neither a conditional nor a static edge leaves it.
    #[error("no outgoing edge from node: {0}")]
    NoOutgoingEdge(String),

    /// A conditional edge returned an empty node name.
    #[error("conditional edge from {0} returned an empty target")]
    EmptyConditionalTarget(String),

    /// A node body failed; carries the node name and the underlying error.
    #[error("error in node {node}: {source}")]
    NodeExecution {
        node: String,
        #[source]
        source: Box<GraphError>,
    },

    /// Leaf failure raised from user node bodies.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// Every retry attempt failed; carries the last attempt's error.
    #[error("retry exhausted after {attempts} attempts: {source}")]
    RetryExhausted {
        attempts: u32,
        #[source]
        source: Box<GraphError>,
    },

    /// The retry classifier rejected the error after a single attempt.
    #[error("non-retryable error: {source}")]
    NonRetryable {
        #[source]
        source: Box<GraphError>,
    },

    /// The circuit is open; the wrapped node was not called.
    #[error("circuit breaker open for node: {0}")]
    CircuitOpen(String),

    /// The half-open probe quota is used up; the wrapped node was not called.
    #[error("circuit breaker half-open call limit reached for node: {0}")]
    CircuitHalfOpenLimitReached(String),

    /// The sliding-window rate limit rejected the call. `retry_after` is the
    /// wait until the oldest counted call leaves the window.
    #[error("rate limit exceeded for node {node}, retry after {retry_after:?}")]
    RateLimited { node: String, retry_after: Duration },

    /// The wrapped node did not finish within its time budget.
    #[error("node {node} timed out after {timeout:?}")]
    ExecutionTimeout { node: String, timeout: Duration },

    /// The context was cancelled at a cooperative point.
    #[error("execution cancelled")]
    Cancelled,
}
