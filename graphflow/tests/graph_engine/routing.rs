//! Edge selection: conditional routing on state, precedence over static
//! edges, first-match ordering and loops.

use std::sync::Arc;

use graphflow::{fn_node, Context, Node, StateGraph, Target};

use crate::common::{visiting, TraceState};

/// Node that records a visit and bumps the score.
fn working() -> Arc<dyn Node<TraceState>> {
    fn_node(|_ctx, mut state: TraceState| async move {
        state.visited.push("work".to_string());
        state.score += 1;
        Ok(state)
    })
}

fn approval_graph() -> StateGraph<TraceState> {
    let mut graph = StateGraph::<TraceState>::new();
    graph.add_node("classify", visiting("classify"));
    graph.add_node("approve", visiting("approve"));
    graph.add_node("reject", visiting("reject"));
    graph.add_conditional_edge("classify", |_ctx, state: &TraceState| {
        if state.score >= 0 {
            Target::node("approve")
        } else {
            Target::node("reject")
        }
    });
    graph.add_edge("approve", Target::End);
    graph.add_edge("reject", Target::End);
    graph.set_entry_point("classify");
    graph
}

#[tokio::test]
async fn conditional_edge_routes_on_state() {
    let approved = approval_graph()
        .compile()
        .unwrap()
        .invoke(&Context::new(), TraceState::with_score(1))
        .await
        .unwrap();
    assert_eq!(approved.visited, vec!["classify", "approve"]);

    let rejected = approval_graph()
        .compile()
        .unwrap()
        .invoke(&Context::new(), TraceState::with_score(-5))
        .await
        .unwrap();
    assert_eq!(rejected.visited, vec!["classify", "reject"]);
}

#[tokio::test]
async fn conditional_edge_wins_over_static_edges() {
    let mut graph = StateGraph::<TraceState>::new();
    graph.add_node("gate", visiting("gate"));
    graph.add_node("unrouted", visiting("unrouted"));
    graph.add_node("routed", visiting("routed"));
    graph.add_edge("gate", "unrouted");
    graph.add_conditional_edge("gate", |_ctx, _state| Target::node("routed"));
    graph.add_edge("routed", Target::End);
    graph.add_edge("unrouted", Target::End);
    graph.set_entry_point("gate");

    let out = graph
        .compile()
        .unwrap()
        .invoke(&Context::new(), TraceState::new())
        .await
        .unwrap();
    assert_eq!(out.visited, vec!["gate", "routed"]);
}

#[tokio::test]
async fn first_matching_static_edge_wins() {
    let mut graph = StateGraph::<TraceState>::new();
    graph.add_node("a", visiting("a"));
    graph.add_node("b", visiting("b"));
    graph.add_node("c", visiting("c"));
    graph.add_edge("a", "b");
    graph.add_edge("a", "c");
    graph.add_edge("b", Target::End);
    graph.add_edge("c", Target::End);
    graph.set_entry_point("a");

    let out = graph
        .compile()
        .unwrap()
        .invoke(&Context::new(), TraceState::new())
        .await
        .unwrap();
    assert_eq!(out.visited, vec!["a", "b"]);
}

#[tokio::test]
async fn conditional_loop_runs_until_done() {
    let mut graph = StateGraph::<TraceState>::new();
    graph.add_node("work", working());
    graph.add_conditional_edge("work", |_ctx, state: &TraceState| {
        if state.score < 3 {
            Target::node("work")
        } else {
            Target::End
        }
    });
    graph.set_entry_point("work");

    let out = graph
        .compile()
        .unwrap()
        .invoke(&Context::new(), TraceState::new())
        .await
        .unwrap();
    assert_eq!(out.score, 3);
    assert_eq!(out.visited.len(), 3);
}
