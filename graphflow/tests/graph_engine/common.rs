//! Shared state and node helpers for the graph engine tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use graphflow::{fn_node, GraphError, Node};

/// State threaded through the engine tests: the nodes visited in order,
/// plus a score the routing tests branch on.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceState {
    pub visited: Vec<String>,
    pub score: i32,
}

impl TraceState {
    pub fn new() -> Self {
        Self {
            visited: Vec::new(),
            score: 0,
        }
    }

    pub fn with_score(score: i32) -> Self {
        Self {
            visited: Vec::new(),
            score,
        }
    }
}

/// Node that records its own name on the state.
pub fn visiting(name: &'static str) -> Arc<dyn Node<TraceState>> {
    fn_node(move |_ctx, mut state: TraceState| async move {
        state.visited.push(name.to_string());
        Ok(state)
    })
}

/// Node that fails its first `failures` calls, then records its name.
/// Every call bumps `calls`, including the failing ones.
pub fn flaky(
    name: &'static str,
    failures: u32,
    calls: Arc<AtomicU32>,
) -> Arc<dyn Node<TraceState>> {
    fn_node(move |_ctx, mut state: TraceState| {
        let calls = Arc::clone(&calls);
        async move {
            let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= failures {
                return Err(GraphError::ExecutionFailed(format!(
                    "{name} failed on call {call}"
                )));
            }
            state.visited.push(name.to_string());
            Ok(state)
        }
    })
}
