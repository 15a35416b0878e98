//! Traversal through compiled graphs: linear runs, subgraphs, parallel
//! fan-out, tracing, error and cancellation surfacing.

use std::sync::Arc;

use graphflow::{
    Context, GraphError, ParallelNode, StateGraph, Subgraph, Target, TraceEvent, Tracer,
};

use crate::common::{visiting, TraceState};

#[tokio::test]
async fn invoke_runs_nodes_in_edge_order() {
    let mut graph = StateGraph::<TraceState>::new();
    graph.add_node("a", visiting("a"));
    graph.add_node("b", visiting("b"));
    graph.add_node("c", visiting("c"));
    graph.add_edge("a", "b");
    graph.add_edge("b", "c");
    graph.add_edge("c", Target::End);
    graph.set_entry_point("a");

    let compiled = graph.compile().unwrap();
    let out = compiled.invoke(&Context::new(), TraceState::new()).await.unwrap();
    assert_eq!(out.visited, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn state_is_threaded_through_each_node() {
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

    let compiled = graph.compile().unwrap();
    let out = compiled
        .invoke(&Context::new(), "x".to_string())
        .await
        .unwrap();
    assert_eq!(out, "x_a_b");
}

#[tokio::test]
async fn compile_requires_an_entry_point() {
    let mut graph = StateGraph::<TraceState>::new();
    graph.add_node("a", visiting("a"));
    graph.add_edge("a", Target::End);

    match graph.compile() {
        Err(GraphError::EntryPointNotSet) => {}
        other => panic!("expected EntryPointNotSet, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_edge_target_fails_at_execution_time() {
    let mut graph = StateGraph::<TraceState>::new();
    graph.add_node("a", visiting("a"));
    graph.add_edge("a", "missing");
    graph.set_entry_point("a");

    // The dangling edge is not a build error; the run trips over it.
    let compiled = graph.compile().unwrap();
    match compiled.invoke(&Context::new(), TraceState::new()).await {
        Err(GraphError::NodeNotFound(name)) => assert_eq!(name, "missing"),
        other => panic!("expected NodeNotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn subgraph_runs_as_a_single_node() {
    let mut inner = StateGraph::<TraceState>::new();
    inner.add_node("i1", visiting("i1"));
    inner.add_node("i2", visiting("i2"));
    inner.add_edge("i1", "i2");
    inner.add_edge("i2", Target::End);
    inner.set_entry_point("i1");

    let mut outer = StateGraph::<TraceState>::new();
    outer.add_node("pre", visiting("pre"));
    outer.add_node("inner", Arc::new(Subgraph::new("inner", inner).unwrap()));
    outer.add_node("post", visiting("post"));
    outer.add_edge("pre", "inner");
    outer.add_edge("inner", "post");
    outer.add_edge("post", Target::End);
    outer.set_entry_point("pre");

    let compiled = outer.compile().unwrap();
    let out = compiled.invoke(&Context::new(), TraceState::new()).await.unwrap();
    assert_eq!(out.visited, vec!["pre", "i1", "i2", "post"]);
}

#[tokio::test]
async fn subgraph_failure_names_the_inner_chain() {
    let mut inner = StateGraph::<TraceState>::new();
    inner.add_node_fn("bad", |_ctx, _state: TraceState| async move {
        Err(GraphError::ExecutionFailed("inner failure".to_string()))
    });
    inner.add_edge("bad", Target::End);
    inner.set_entry_point("bad");

    let mut outer = StateGraph::<TraceState>::new();
    outer.add_node("stage", Arc::new(Subgraph::new("stage", inner).unwrap()));
    outer.add_edge("stage", Target::End);
    outer.set_entry_point("stage");

    let compiled = outer.compile().unwrap();
    match compiled.invoke(&Context::new(), TraceState::new()).await {
        Err(GraphError::NodeExecution { node, source }) => {
            assert_eq!(node, "stage");
            match *source {
                GraphError::NodeExecution { ref node, .. } => assert_eq!(node, "bad"),
                ref other => panic!("expected nested NodeExecution, got {other:?}"),
            }
        }
        other => panic!("expected NodeExecution, got {other:?}"),
    }
}

#[tokio::test]
async fn parallel_node_joins_inside_a_graph() {
    let fan = ParallelNode::new(
        "fan",
        vec![visiting("left"), visiting("right")],
        |mut results: Vec<TraceState>| {
            let mut merged = results.remove(0);
            for rest in &results {
                if let Some(last) = rest.visited.last() {
                    merged.visited.push(last.clone());
                }
            }
            Ok(merged)
        },
    );

    let mut graph = StateGraph::<TraceState>::new();
    graph.add_node("start", visiting("start"));
    graph.add_node("fan", Arc::new(fan));
    graph.add_node("finish", visiting("finish"));
    graph.add_edge("start", "fan");
    graph.add_edge("fan", "finish");
    graph.add_edge("finish", Target::End);
    graph.set_entry_point("start");

    let compiled = graph.compile().unwrap();
    let out = compiled.invoke(&Context::new(), TraceState::new()).await.unwrap();
    assert_eq!(out.visited, vec!["start", "left", "right", "finish"]);
}

#[tokio::test]
async fn traced_run_records_span_tree() {
    let mut graph = StateGraph::<TraceState>::new();
    graph.add_node("a", visiting("a"));
    graph.add_node("b", visiting("b"));
    graph.add_edge("a", "b");
    graph.add_edge("b", Target::End);
    graph.set_entry_point("a");

    let tracer = Arc::new(Tracer::new());
    let compiled = graph.compile().unwrap().with_tracer(Arc::clone(&tracer));
    compiled.invoke(&Context::new(), TraceState::new()).await.unwrap();

    // One graph span, two node spans, one edge span.
    let spans = tracer.spans();
    assert_eq!(spans.len(), 4);
    assert!(spans.iter().all(|span| span.is_finished()));

    let graph_span = &spans[0];
    assert_eq!(graph_span.event, TraceEvent::GraphEnd);
    assert_eq!(graph_span.node_name, "graph");
    assert!(graph_span.parent_id.is_none());

    let edge = spans
        .iter()
        .find(|span| span.event == TraceEvent::EdgeTraversal)
        .unwrap();
    assert_eq!(edge.from_node.as_deref(), Some("a"));
    assert_eq!(edge.to_node.as_deref(), Some("b"));

    let node_spans: Vec<_> = spans
        .iter()
        .filter(|span| span.event == TraceEvent::NodeEnd)
        .collect();
    assert_eq!(node_spans.len(), 2);
    assert!(node_spans
        .iter()
        .all(|span| span.parent_id.as_deref() == Some(graph_span.id.as_str())));
}

#[tokio::test]
async fn cancellation_surfaces_through_node_errors() {
    let mut graph = StateGraph::<TraceState>::new();
    graph.add_node_fn("waiting", |ctx: Context, _state: TraceState| async move {
        ctx.cancelled().await;
        Err(GraphError::Cancelled)
    });
    graph.add_edge("waiting", Target::End);
    graph.set_entry_point("waiting");

    let ctx = Context::new();
    ctx.cancel();

    let compiled = graph.compile().unwrap();
    match compiled.invoke(&ctx, TraceState::new()).await {
        Err(GraphError::NodeExecution { node, source }) => {
            assert_eq!(node, "waiting");
            assert!(matches!(*source, GraphError::Cancelled));
        }
        other => panic!("expected cancelled NodeExecution, got {other:?}"),
    }
}
