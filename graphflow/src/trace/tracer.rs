//! Span lifecycle management and hook dispatch.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, SystemTime};

use crate::context::Context;
use crate::error::GraphError;
use crate::trace::span::TraceSpan;
use crate::trace::TraceEvent;

/// Synchronous observer of span starts and ends.
///
/// Hooks run inline on the executing task, so a slow hook slows the run.
/// This is the deliberate opposite of listener dispatch, which is spawned:
/// exporters that buffer internally stay cheap, and span order is exact.
pub trait TraceHook<S>: Send + Sync {
    fn on_event(&self, ctx: &Context, span: &TraceSpan<S>);
}

/// Builds hierarchical spans for graph execution and retains them for
/// inspection.
///
/// Shared as `Arc<Tracer<S>>` between the graph and any code that wants
/// to read spans afterwards. Span ids are random, parentage comes from
/// the [`Context`] the engine threads through the run.
pub struct Tracer<S> {
    hooks: RwLock<Vec<Arc<dyn TraceHook<S>>>>,
    spans: Mutex<HashMap<String, TraceSpan<S>>>,
}

impl<S> Default for Tracer<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Tracer<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            hooks: RwLock::new(Vec::new()),
            spans: Mutex::new(HashMap::new()),
        }
    }

    pub fn add_hook(&self, hook: Arc<dyn TraceHook<S>>) {
        self.hooks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(hook);
    }

    /// Opens a span parented to the context's current span and dispatches
    /// its start to the hooks.
    pub fn start_span(
        &self,
        ctx: &Context,
        event: TraceEvent,
        node_name: impl Into<String>,
    ) -> TraceSpan<S> {
        let span = TraceSpan {
            id: format!("span-{}", uuid::Uuid::new_v4()),
            parent_id: ctx.span_id().map(str::to_string),
            event,
            node_name: node_name.into(),
            from_node: None,
            to_node: None,
            start_time: SystemTime::now(),
            end_time: None,
            duration: None,
            state: None,
            error: None,
            metadata: HashMap::new(),
        };
        self.remember(span.clone());
        self.dispatch(ctx, &span);
        span
    }

    /// Closes `span`: stamps end time and duration, rewrites the event to
    /// its terminal form, attaches outcome state or error, and dispatches
    /// the end to the hooks.
    pub fn end_span(
        &self,
        ctx: &Context,
        span: &mut TraceSpan<S>,
        state: Option<S>,
        error: Option<GraphError>,
    ) {
        let ended_at = SystemTime::now();
        span.end_time = Some(ended_at);
        span.duration = Some(
            ended_at
                .duration_since(span.start_time)
                .unwrap_or_default(),
        );
        span.event = span.event.terminal(error.is_some());
        span.state = state;
        span.error = error;
        self.remember(span.clone());
        self.dispatch(ctx, span);
    }

    /// Records a hop between two nodes as a complete zero-duration span.
    pub fn trace_edge_traversal(&self, ctx: &Context, from: &str, to: &str) {
        let now = SystemTime::now();
        let span = TraceSpan {
            id: format!("span-{}", uuid::Uuid::new_v4()),
            parent_id: ctx.span_id().map(str::to_string),
            event: TraceEvent::EdgeTraversal,
            node_name: String::new(),
            from_node: Some(from.to_string()),
            to_node: Some(to.to_string()),
            start_time: now,
            end_time: Some(now),
            duration: Some(Duration::ZERO),
            state: None,
            error: None,
            metadata: HashMap::new(),
        };
        self.remember(span.clone());
        self.dispatch(ctx, &span);
    }

    /// Snapshot of every recorded span, ordered by start time.
    pub fn spans(&self) -> Vec<TraceSpan<S>> {
        let mut all: Vec<TraceSpan<S>> = self
            .spans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        all.sort_by_key(|span| span.start_time);
        all
    }

    pub fn span(&self, id: &str) -> Option<TraceSpan<S>> {
        self.spans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Drops every recorded span. Hooks stay attached.
    pub fn clear(&self) {
        self.spans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn remember(&self, span: TraceSpan<S>) {
        self.spans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(span.id.clone(), span);
    }

    // snapshot the hook list first; a hook adding hooks must not deadlock
    fn dispatch(&self, ctx: &Context, span: &TraceSpan<S>) {
        let hooks: Vec<Arc<dyn TraceHook<S>>> = self
            .hooks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for hook in hooks {
            hook.on_event(ctx, span);
        }
    }
}
