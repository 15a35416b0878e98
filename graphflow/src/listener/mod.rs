//! Node lifecycle observation: events, the listener contract, observable
//! nodes and graphs, and ready-made listeners.
//!
//! Listeners are notified from [`ListenableNode`]: a `Start` event before
//! the inner node runs, then `Complete` or `Error` after, plus `Progress`
//! for nodes that report it themselves. Dispatch spawns one task per
//! listener and joins the batch before execution proceeds; a panicking
//! listener is contained and never aborts the run.

pub mod builtin;
pub mod graph;
pub mod listenable;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::context::Context;
use crate::error::GraphError;

pub use builtin::{LoggingListener, MetricsListener};
pub use graph::{ListenableGraph, ListenableRunnable};
pub use listenable::ListenableNode;

/// Lifecycle events a node broadcasts to its listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeEvent {
    /// The node is about to run; carries the input state.
    Start,
    /// Emitted by node bodies that report intermediate progress.
    Progress,
    /// The node finished; carries the produced state.
    Complete,
    /// The node failed; carries the input state and the error.
    Error,
}

impl NodeEvent {
    /// Stable lowercase name, used in logs and checkpoint metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeEvent::Start => "start",
            NodeEvent::Progress => "progress",
            NodeEvent::Complete => "complete",
            NodeEvent::Error => "error",
        }
    }
}

impl fmt::Display for NodeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observer of node lifecycle events.
///
/// Arguments are owned because every notification crosses a task boundary.
/// `error` is `Some` only for [`NodeEvent::Error`]; the state passed with
/// an error event is the node's input, not a partial result.
#[async_trait]
pub trait NodeListener<S>: Send + Sync {
    async fn on_node_event(
        &self,
        ctx: Context,
        event: NodeEvent,
        node_name: String,
        state: S,
        error: Option<GraphError>,
    );
}

/// Adapter lifting a plain closure into [`NodeListener`].
pub struct FnListener<F> {
    func: F,
}

impl<F> FnListener<F> {
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<S, F> NodeListener<S> for FnListener<F>
where
    S: Send + 'static,
    F: Fn(Context, NodeEvent, String, S, Option<GraphError>) + Send + Sync,
{
    async fn on_node_event(
        &self,
        ctx: Context,
        event: NodeEvent,
        node_name: String,
        state: S,
        error: Option<GraphError>,
    ) {
        (self.func)(ctx, event, node_name, state, error)
    }
}
