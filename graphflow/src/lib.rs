//! # graphflow
//!
//! Stateful workflow graphs in Rust: typed state in, typed state out.
//!
//! A workflow is described as a [`graph::StateGraph`] of named nodes joined
//! by static and conditional edges, then frozen with `compile()` into a
//! [`graph::CompiledGraph`] that can be invoked any number of times, from
//! any number of tasks, without further synchronization.
//!
//! Design principles:
//!
//! - **State owns the data.** Nodes receive the state by value and return
//!   the next state; the engine never clones or merges behind your back.
//! - **Build, then run.** Graph construction is cheap and unvalidated;
//!   `compile()` freezes the shape so execution needs no locks.
//! - **Decorate, don't rewrite.** Retries, timeouts, circuit breaking,
//!   rate limiting, listeners and checkpoints are all nodes wrapping other
//!   nodes, so they compose with each other and with subgraphs.
//!
//! Main modules:
//!
//! - [`graph`]: the builder, the compiled engine, function nodes, subgraphs
//! - [`context`]: cancellation and span propagation across a run
//! - [`resilience`]: retry, timeout, circuit breaker, rate limiter wrappers
//! - [`parallel`]: fan-out over branch nodes with a merge function
//! - [`listener`]: node lifecycle events, logging and metrics listeners
//! - [`stream`]: event streaming over channels while a run progresses
//! - [`checkpoint`]: state snapshots to pluggable stores during a run
//! - [`trace`]: span tree construction with synchronous hooks
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use graphflow::{fn_node, Context, StateGraph, Target};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut graph = StateGraph::<String>::new();
//!     graph.add_node(
//!         "greet",
//!         fn_node(|_ctx, state: String| async move { Ok(format!("hello {state}")) }),
//!     );
//!     graph.add_node(
//!         "shout",
//!         fn_node(|_ctx, state: String| async move { Ok(state.to_uppercase()) }),
//!     );
//!     graph.add_edge("greet", "shout");
//!     graph.add_edge("shout", Target::End);
//!     graph.set_entry_point("greet");
//!
//!     let compiled = graph.compile()?;
//!     let out = compiled.invoke(&Context::new(), "world".to_string()).await?;
//!     assert_eq!(out, "HELLO WORLD");
//!     Ok(())
//! }
//! ```

pub mod checkpoint;
pub mod context;
pub mod error;
pub mod graph;
pub mod listener;
pub mod parallel;
pub mod resilience;
pub mod stream;
pub mod trace;

pub use checkpoint::{
    Checkpoint, CheckpointConfig, CheckpointError, CheckpointErrorSink, CheckpointListener,
    CheckpointMetadata, CheckpointStore, CheckpointableGraph, CheckpointableRunnable,
    FileCheckpointStore, MemoryCheckpointStore, SharedCheckpointStore, CHECKPOINT_VERSION,
};
pub use context::Context;
pub use error::GraphError;
pub use graph::{fn_node, CompiledGraph, Condition, FnNode, Node, StateGraph, Subgraph, Target};
pub use listener::{
    FnListener, ListenableGraph, ListenableNode, ListenableRunnable, LoggingListener,
    MetricsListener, NodeEvent, NodeListener,
};
pub use parallel::ParallelNode;
pub use resilience::{
    retry_with_backoff, CircuitBreaker, CircuitBreakerConfig, CircuitState, RateLimiter,
    RetryConfig, RetryNode, TimeoutNode,
};
pub use stream::{
    StreamConfig, StreamEvent, StreamRun, StreamingExecutor, StreamingGraph, StreamingListener,
    StreamingRunnable,
};
pub use trace::{TraceEvent, TraceHook, TraceSpan, Tracer};
