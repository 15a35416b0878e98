//! Execution tracing: hierarchical spans over graph, node and edge
//! activity.
//!
//! Attach a [`Tracer`] via
//! [`CompiledGraph::with_tracer`](crate::graph::CompiledGraph::with_tracer).
//! Each run then produces a graph span, one span per node execution and a
//! zero-duration span per traversed edge; [`TraceHook`]s observe every
//! span start and end synchronously.

pub mod span;
pub mod tracer;

use std::fmt;

pub use span::TraceSpan;
pub use tracer::{TraceHook, Tracer};

/// Kind of activity a span records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceEvent {
    GraphStart,
    GraphEnd,
    GraphError,
    NodeStart,
    NodeEnd,
    NodeError,
    EdgeTraversal,
}

impl TraceEvent {
    /// Stable snake_case name for log lines and exporters.
    pub fn as_str(&self) -> &'static str {
        match self {
            TraceEvent::GraphStart => "graph_start",
            TraceEvent::GraphEnd => "graph_end",
            TraceEvent::GraphError => "graph_error",
            TraceEvent::NodeStart => "node_start",
            TraceEvent::NodeEnd => "node_end",
            TraceEvent::NodeError => "node_error",
            TraceEvent::EdgeTraversal => "edge_traversal",
        }
    }

    /// The terminal form of a start event: the error form when `failed`,
    /// the end form otherwise. Non-start events are returned unchanged.
    pub(crate) fn terminal(self, failed: bool) -> TraceEvent {
        match (self, failed) {
            (TraceEvent::GraphStart, false) => TraceEvent::GraphEnd,
            (TraceEvent::GraphStart, true) => TraceEvent::GraphError,
            (TraceEvent::NodeStart, false) => TraceEvent::NodeEnd,
            (TraceEvent::NodeStart, true) => TraceEvent::NodeError,
            (other, _) => other,
        }
    }
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
