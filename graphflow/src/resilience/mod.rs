//! Resilience wrappers around the node contract.
//!
//! Each wrapper implements [`Node`](crate::graph::Node) over an inner
//! `Arc<dyn Node<S>>`, so they stack in any order and the engine runs them
//! like plain nodes. [`StateGraph`](crate::graph::StateGraph) offers
//! `add_node_with_*` shorthands for the common single-wrapper case.

pub mod backoff;
pub mod circuit_breaker;
pub mod rate_limiter;
pub mod retry;
pub mod timeout;

pub use backoff::retry_with_backoff;
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use rate_limiter::RateLimiter;
pub use retry::{RetryConfig, RetryNode};
pub use timeout::TimeoutNode;
