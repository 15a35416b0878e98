//! Span record produced by the tracer.

use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use crate::error::GraphError;
use crate::trace::TraceEvent;

/// One timed unit of traced execution.
///
/// Hierarchy is by id: a span's `parent_id` is the span that was current
/// on the context when it started, so node spans hang under their graph
/// span and spans opened inside a node body hang under the node span.
/// `state` and `error` are filled in when the span ends; edge spans are
/// complete at creation with zero duration.
#[derive(Debug, Clone)]
pub struct TraceSpan<S> {
    pub id: String,
    pub parent_id: Option<String>,
    pub event: TraceEvent,
    /// Node the span belongs to; "graph" for the run span, empty for
    /// edge spans.
    pub node_name: String,
    /// Source node, set on edge spans only.
    pub from_node: Option<String>,
    /// Destination node, set on edge spans only.
    pub to_node: Option<String>,
    pub start_time: SystemTime,
    pub end_time: Option<SystemTime>,
    pub duration: Option<Duration>,
    /// State at span end: the produced state on success, `None` on error.
    pub state: Option<S>,
    pub error: Option<GraphError>,
    /// Extra key/value context for exporters.
    pub metadata: HashMap<String, String>,
}

impl<S> TraceSpan<S> {
    /// True once the span has ended (or was created complete, like edge
    /// spans).
    pub fn is_finished(&self) -> bool {
        self.end_time.is_some()
    }
}
