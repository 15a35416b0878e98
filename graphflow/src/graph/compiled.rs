//! Compiled graph: immutable node/edge tables plus the traversal loop.

use std::collections::HashMap;
use std::sync::Arc;

use crate::context::Context;
use crate::error::GraphError;
use crate::graph::node::Node;
use crate::graph::state_graph::Condition;
use crate::graph::target::Target;
use crate::trace::{TraceEvent, Tracer};

/// Executable graph produced by [`StateGraph::compile`](crate::graph::StateGraph::compile).
///
/// Holds no run state of its own, so one compiled graph can serve any
/// number of concurrent [`invoke`](Self::invoke) calls.
///
/// **Interaction**: traversal starts at the entry point and repeats
/// "run node, resolve next transition" until a transition is
/// [`Target::End`]. The conditional edge of a node, when present, is
/// consulted instead of its static edges; otherwise the first static edge
/// added for that node wins.
#[derive(Clone)]
pub struct CompiledGraph<S> {
    nodes: HashMap<String, Arc<dyn Node<S>>>,
    edges: Vec<(String, Target)>,
    conditional_edges: HashMap<String, Condition<S>>,
    entry_point: String,
    tracer: Option<Arc<Tracer<S>>>,
}

impl<S> CompiledGraph<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(
        nodes: HashMap<String, Arc<dyn Node<S>>>,
        edges: Vec<(String, Target)>,
        conditional_edges: HashMap<String, Condition<S>>,
        entry_point: String,
    ) -> Self {
        Self {
            nodes,
            edges,
            conditional_edges,
            entry_point,
            tracer: None,
        }
    }

    /// Attaches a tracer. Every subsequent run produces a graph span, one
    /// span per node execution and zero-duration edge spans.
    pub fn with_tracer(mut self, tracer: Arc<Tracer<S>>) -> Self {
        self.tracer = Some(tracer);
        self
    }

    /// Name of the node where traversal starts.
    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    /// Registered node names, sorted for deterministic output.
    pub fn node_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.nodes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// True when a node is registered under `name`.
    pub fn has_node(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Static edges in insertion order.
    pub fn edges(&self) -> &[(String, Target)] {
        &self.edges
    }

    /// Runs the graph to completion and returns the final state.
    ///
    /// Aborts on the first failing node; the error names the node via
    /// [`GraphError::NodeExecution`] and no partial state is returned.
    pub async fn invoke(&self, ctx: &Context, state: S) -> Result<S, GraphError> {
        match &self.tracer {
            Some(tracer) => {
                let mut graph_span = tracer.start_span(ctx, TraceEvent::GraphStart, "graph");
                let run_ctx = ctx.with_span(graph_span.id.clone());
                let result = self.run_loop(&run_ctx, state).await;
                match &result {
                    Ok(final_state) => {
                        tracer.end_span(&run_ctx, &mut graph_span, Some(final_state.clone()), None)
                    }
                    Err(err) => tracer.end_span(&run_ctx, &mut graph_span, None, Some(err.clone())),
                }
                result
            }
            None => self.run_loop(ctx, state).await,
        }
    }

    async fn run_loop(&self, ctx: &Context, mut state: S) -> Result<S, GraphError> {
        let mut cursor = Target::Node(self.entry_point.clone());
        loop {
            let name = match cursor {
                Target::End => {
                    tracing::debug!("graph run complete");
                    return Ok(state);
                }
                Target::Node(name) => name,
            };
            let node = self
                .nodes
                .get(&name)
                .ok_or_else(|| GraphError::NodeNotFound(name.clone()))?
                .clone();

            tracing::debug!(node = %name, "running node");
            state = self
                .run_node(ctx, &name, node, state)
                .await
                .map_err(|err| GraphError::NodeExecution {
                    node: name.clone(),
                    source: Box::new(err),
                })?;

            cursor = self.next_target(ctx, &name, &state)?;
            if let (Some(tracer), Target::Node(to)) = (&self.tracer, &cursor) {
                tracer.trace_edge_traversal(ctx, &name, to);
            }
        }
    }

    async fn run_node(
        &self,
        ctx: &Context,
        name: &str,
        node: Arc<dyn Node<S>>,
        state: S,
    ) -> Result<S, GraphError> {
        match &self.tracer {
            Some(tracer) => {
                let mut span = tracer.start_span(ctx, TraceEvent::NodeStart, name);
                let node_ctx = ctx.with_span(span.id.clone());
                let outcome = node.run(&node_ctx, state).await;
                match &outcome {
                    Ok(next) => tracer.end_span(&node_ctx, &mut span, Some(next.clone()), None),
                    Err(err) => tracer.end_span(&node_ctx, &mut span, None, Some(err.clone())),
                }
                outcome
            }
            None => node.run(ctx, state).await,
        }
    }

    /// Resolves the transition leaving `from`: the conditional edge when one
    /// exists, otherwise the first matching static edge.
    fn next_target(&self, ctx: &Context, from: &str, state: &S) -> Result<Target, GraphError> {
        if let Some(condition) = self.conditional_edges.get(from) {
            return match condition(ctx, state) {
                Target::Node(name) if name.is_empty() => {
                    Err(GraphError::EmptyConditionalTarget(from.to_string()))
                }
                target => Ok(target),
            };
        }
        self.edges
            .iter()
            .find(|(f, _)| f == from)
            .map(|(_, to)| to.clone())
            .ok_or_else(|| GraphError::NoOutgoingEdge(from.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::state_graph::StateGraph;

    fn build_two_step_graph() -> CompiledGraph<String> {
        let mut graph = StateGraph::<String>::new();
        graph.add_node_fn("a", |_ctx, state: String| async move {
            Ok(format!("{state}_a"))
        });
        graph.add_node_fn("b", |_ctx, state: String| async move {
            Ok(format!("{state}_b"))
        });
        graph.add_edge("a", "b");
        graph.add_edge("b", Target::End);
        graph.set_entry_point("a");
        graph.compile().unwrap()
    }

    /// **Scenario**: A two-node pipeline threads the state through both
    /// nodes in edge order.
    #[tokio::test]
    async fn invoke_runs_nodes_in_edge_order() {
        let compiled = build_two_step_graph();
        let out = compiled.invoke(&Context::new(), "x".to_string()).await.unwrap();
        assert_eq!(out, "x_a_b");
    }

    /// **Scenario**: A conditional edge overrides static edges from the
    /// same node, even ones added first.
    #[tokio::test]
    async fn conditional_edge_takes_precedence() {
        let mut graph = StateGraph::<String>::new();
        graph.add_node_fn("router", |_ctx, state: String| async move { Ok(state) });
        graph.add_node_fn("unreachable", |_ctx, _state: String| async move {
            Ok("static edge won".to_string())
        });
        graph.add_node_fn("chosen", |_ctx, state: String| async move {
            Ok(format!("{state}_chosen"))
        });
        graph.add_edge("router", "unreachable");
        graph.add_conditional_edge("router", |_ctx, _state| Target::node("chosen"));
        graph.add_edge("chosen", Target::End);
        graph.set_entry_point("router");

        let compiled = graph.compile().unwrap();
        let out = compiled.invoke(&Context::new(), "x".to_string()).await.unwrap();
        assert_eq!(out, "x_chosen");
    }

    /// **Scenario**: A conditional edge can route back to an earlier node,
    /// forming a loop that ends when the condition returns End.
    #[tokio::test]
    async fn conditional_edge_drives_a_loop() {
        let mut graph = StateGraph::<i32>::new();
        graph.add_node_fn("increment", |_ctx, state: i32| async move { Ok(state + 1) });
        graph.add_conditional_edge("increment", |_ctx, state| {
            if *state < 3 {
                Target::node("increment")
            } else {
                Target::End
            }
        });
        graph.set_entry_point("increment");

        let compiled = graph.compile().unwrap();
        let out = compiled.invoke(&Context::new(), 0).await.unwrap();
        assert_eq!(out, 3);
    }

    /// **Scenario**: With several static edges from one node, the first
    /// added is the one followed.
    #[tokio::test]
    async fn first_static_edge_wins() {
        let mut graph = StateGraph::<String>::new();
        graph.add_node_fn("a", |_ctx, state: String| async move { Ok(state) });
        graph.add_node_fn("first", |_ctx, state: String| async move {
            Ok(format!("{state}_first"))
        });
        graph.add_node_fn("second", |_ctx, state: String| async move {
            Ok(format!("{state}_second"))
        });
        graph.add_edge("a", "first");
        graph.add_edge("a", "second");
        graph.add_edge("first", Target::End);
        graph.add_edge("second", Target::End);
        graph.set_entry_point("a");

        let compiled = graph.compile().unwrap();
        let out = compiled.invoke(&Context::new(), "x".to_string()).await.unwrap();
        assert_eq!(out, "x_first");
    }

    /// **Scenario**: An edge naming an unregistered node fails at
    /// traversal time with the missing name.
    #[tokio::test]
    async fn missing_node_fails_at_traversal() {
        let mut graph = StateGraph::<i32>::new();
        graph.add_node_fn("a", |_ctx, state: i32| async move { Ok(state) });
        graph.add_edge("a", "missing");
        graph.set_entry_point("a");

        let compiled = graph.compile().unwrap();
        match compiled.invoke(&Context::new(), 0).await {
            Err(GraphError::NodeNotFound(name)) => assert_eq!(name, "missing"),
            other => panic!("expected NodeNotFound, got {other:?}"),
        }
    }

    /// **Scenario**: A node with no outgoing transition aborts the run.
    #[tokio::test]
    async fn dangling_node_reports_no_outgoing_edge() {
        let mut graph = StateGraph::<i32>::new();
        graph.add_node_fn("a", |_ctx, state: i32| async move { Ok(state) });
        graph.set_entry_point("a");

        let compiled = graph.compile().unwrap();
        match compiled.invoke(&Context::new(), 0).await {
            Err(GraphError::NoOutgoingEdge(name)) => assert_eq!(name, "a"),
            other => panic!("expected NoOutgoingEdge, got {other:?}"),
        }
    }

    /// **Scenario**: A conditional edge returning an empty node name is an
    /// error, not a silent halt.
    #[tokio::test]
    async fn empty_conditional_target_is_an_error() {
        let mut graph = StateGraph::<i32>::new();
        graph.add_node_fn("a", |_ctx, state: i32| async move { Ok(state) });
        graph.add_conditional_edge("a", |_ctx, _state| Target::node(""));
        graph.set_entry_point("a");

        let compiled = graph.compile().unwrap();
        match compiled.invoke(&Context::new(), 0).await {
            Err(GraphError::EmptyConditionalTarget(name)) => assert_eq!(name, "a"),
            other => panic!("expected EmptyConditionalTarget, got {other:?}"),
        }
    }

    /// **Scenario**: A failing node aborts the run and the error names the
    /// node that failed.
    #[tokio::test]
    async fn node_failure_aborts_and_names_the_node() {
        let mut graph = StateGraph::<i32>::new();
        graph.add_node_fn("boom", |_ctx, _state: i32| async move {
            Err(GraphError::ExecutionFailed("kaput".to_string()))
        });
        graph.add_edge("boom", Target::End);
        graph.set_entry_point("boom");

        let compiled = graph.compile().unwrap();
        match compiled.invoke(&Context::new(), 0).await {
            Err(GraphError::NodeExecution { node, source }) => {
                assert_eq!(node, "boom");
                assert!(matches!(*source, GraphError::ExecutionFailed(_)));
            }
            other => panic!("expected NodeExecution, got {other:?}"),
        }
    }

    /// **Scenario**: One compiled graph serves concurrent runs; each run
    /// keeps its own state.
    #[tokio::test]
    async fn concurrent_invokes_are_independent() {
        let compiled = Arc::new(build_two_step_graph());

        let left = {
            let g = Arc::clone(&compiled);
            tokio::spawn(async move { g.invoke(&Context::new(), "left".to_string()).await })
        };
        let right = {
            let g = Arc::clone(&compiled);
            tokio::spawn(async move { g.invoke(&Context::new(), "right".to_string()).await })
        };

        assert_eq!(left.await.unwrap().unwrap(), "left_a_b");
        assert_eq!(right.await.unwrap().unwrap(), "right_a_b");
    }

    /// **Scenario**: Accessors expose the compiled topology for
    /// collaborators such as diagram exporters.
    #[tokio::test]
    async fn accessors_expose_topology() {
        let compiled = build_two_step_graph();

        assert_eq!(compiled.entry_point(), "a");
        assert_eq!(compiled.node_names(), vec!["a", "b"]);
        assert!(compiled.has_node("a"));
        assert!(!compiled.has_node("c"));
        assert_eq!(compiled.edges().len(), 2);
        assert_eq!(compiled.edges()[0], ("a".to_string(), Target::node("b")));
    }
}
