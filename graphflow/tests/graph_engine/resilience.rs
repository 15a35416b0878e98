//! Resilience wrappers exercised through whole graphs: retry budgets,
//! timeouts, circuit breaker state transitions and rate limit windows.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use graphflow::{
    fn_node, CircuitBreaker, CircuitBreakerConfig, CircuitState, Context, GraphError, Node,
    RetryConfig, StateGraph, Target,
};

use crate::common::{flaky, visiting, TraceState};

#[tokio::test]
async fn retry_recovers_after_transient_failures() {
    let calls = Arc::new(AtomicU32::new(0));
    let mut graph = StateGraph::<TraceState>::new();
    graph.add_node_with_retry(
        "fetch",
        flaky("fetch", 2, Arc::clone(&calls)),
        RetryConfig::new(5).with_initial_delay(Duration::from_millis(1)),
    );
    graph.add_edge("fetch", Target::End);
    graph.set_entry_point("fetch");

    let out = graph
        .compile()
        .unwrap()
        .invoke(&Context::new(), TraceState::new())
        .await
        .unwrap();
    assert_eq!(out.visited, vec!["fetch"]);
    // Two failures plus the successful attempt.
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn retry_exhaustion_reports_attempts() {
    let calls = Arc::new(AtomicU32::new(0));
    let mut graph = StateGraph::<TraceState>::new();
    graph.add_node_with_retry(
        "fetch",
        flaky("fetch", u32::MAX, Arc::clone(&calls)),
        RetryConfig::new(3).with_initial_delay(Duration::from_millis(1)),
    );
    graph.add_edge("fetch", Target::End);
    graph.set_entry_point("fetch");

    match graph
        .compile()
        .unwrap()
        .invoke(&Context::new(), TraceState::new())
        .await
    {
        Err(GraphError::NodeExecution { node, source }) => {
            assert_eq!(node, "fetch");
            match *source {
                GraphError::RetryExhausted { attempts, .. } => assert_eq!(attempts, 3),
                ref other => panic!("expected RetryExhausted, got {other:?}"),
            }
        }
        other => panic!("expected NodeExecution, got {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn non_retryable_error_fails_fast() {
    let calls = Arc::new(AtomicU32::new(0));
    let config = RetryConfig::new(5)
        .with_initial_delay(Duration::from_millis(1))
        .with_retryable(|err| matches!(err, GraphError::ExecutionTimeout { .. }));

    let mut graph = StateGraph::<TraceState>::new();
    graph.add_node_with_retry("fetch", flaky("fetch", u32::MAX, Arc::clone(&calls)), config);
    graph.add_edge("fetch", Target::End);
    graph.set_entry_point("fetch");

    match graph
        .compile()
        .unwrap()
        .invoke(&Context::new(), TraceState::new())
        .await
    {
        Err(GraphError::NodeExecution { source, .. }) => match *source {
            GraphError::NonRetryable { ref source } => {
                assert!(matches!(**source, GraphError::ExecutionFailed(_)));
            }
            ref other => panic!("expected NonRetryable, got {other:?}"),
        },
        other => panic!("expected NodeExecution, got {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn timeout_cuts_off_a_slow_node() {
    let mut graph = StateGraph::<TraceState>::new();
    graph.add_node_with_timeout(
        "slow",
        fn_node(|_ctx, state: TraceState| async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(state)
        }),
        Duration::from_millis(20),
    );
    graph.add_edge("slow", Target::End);
    graph.set_entry_point("slow");

    match graph
        .compile()
        .unwrap()
        .invoke(&Context::new(), TraceState::new())
        .await
    {
        Err(GraphError::NodeExecution { node, source }) => {
            assert_eq!(node, "slow");
            match *source {
                GraphError::ExecutionTimeout { ref node, timeout } => {
                    assert_eq!(node, "slow");
                    assert_eq!(timeout, Duration::from_millis(20));
                }
                ref other => panic!("expected ExecutionTimeout, got {other:?}"),
            }
        }
        other => panic!("expected NodeExecution, got {other:?}"),
    }
}

#[tokio::test]
async fn circuit_opens_after_consecutive_failures() {
    let calls = Arc::new(AtomicU32::new(0));
    let config = CircuitBreakerConfig {
        failure_threshold: 2,
        ..CircuitBreakerConfig::default()
    };

    let mut graph = StateGraph::<TraceState>::new();
    graph.add_node_with_circuit_breaker("svc", flaky("svc", u32::MAX, Arc::clone(&calls)), config);
    graph.add_edge("svc", Target::End);
    graph.set_entry_point("svc");
    let compiled = graph.compile().unwrap();

    for _ in 0..2 {
        match compiled.invoke(&Context::new(), TraceState::new()).await {
            Err(GraphError::NodeExecution { source, .. }) => {
                assert!(matches!(*source, GraphError::ExecutionFailed(_)));
            }
            other => panic!("expected NodeExecution, got {other:?}"),
        }
    }

    // The open circuit rejects before reaching the node.
    match compiled.invoke(&Context::new(), TraceState::new()).await {
        Err(GraphError::NodeExecution { source, .. }) => match *source {
            GraphError::CircuitOpen(ref name) => assert_eq!(name, "svc"),
            ref other => panic!("expected CircuitOpen, got {other:?}"),
        },
        other => panic!("expected NodeExecution, got {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn circuit_recovers_through_half_open() {
    let calls = Arc::new(AtomicU32::new(0));
    let config = CircuitBreakerConfig {
        failure_threshold: 2,
        success_threshold: 1,
        open_timeout: Duration::from_millis(20),
        half_open_max_calls: 3,
    };
    let breaker = Arc::new(CircuitBreaker::new(
        "svc",
        flaky("svc", 2, Arc::clone(&calls)),
        config,
    ));

    let mut graph = StateGraph::<TraceState>::new();
    graph.add_node("svc", Arc::clone(&breaker) as Arc<dyn Node<TraceState>>);
    graph.add_edge("svc", Target::End);
    graph.set_entry_point("svc");
    let compiled = graph.compile().unwrap();

    for _ in 0..2 {
        let _ = compiled.invoke(&Context::new(), TraceState::new()).await;
    }
    assert_eq!(breaker.state(), CircuitState::Open);

    tokio::time::sleep(Duration::from_millis(25)).await;

    // The probe succeeds and closes the circuit again.
    let out = compiled
        .invoke(&Context::new(), TraceState::new())
        .await
        .unwrap();
    assert_eq!(out.visited, vec!["svc"]);
    assert_eq!(breaker.state(), CircuitState::Closed);
}

#[tokio::test]
async fn rate_limit_rejects_over_budget() {
    let mut graph = StateGraph::<TraceState>::new();
    graph.add_node_with_rate_limit("api", visiting("api"), 2, Duration::from_millis(100));
    graph.add_edge("api", Target::End);
    graph.set_entry_point("api");
    let compiled = graph.compile().unwrap();

    compiled
        .invoke(&Context::new(), TraceState::new())
        .await
        .unwrap();
    compiled
        .invoke(&Context::new(), TraceState::new())
        .await
        .unwrap();

    match compiled.invoke(&Context::new(), TraceState::new()).await {
        Err(GraphError::NodeExecution { source, .. }) => match *source {
            GraphError::RateLimited {
                ref node,
                retry_after,
            } => {
                assert_eq!(node, "api");
                assert!(retry_after > Duration::ZERO);
                assert!(retry_after <= Duration::from_millis(100));
            }
            ref other => panic!("expected RateLimited, got {other:?}"),
        },
        other => panic!("expected NodeExecution, got {other:?}"),
    }

    // The window slides past the first admissions and calls pass again.
    tokio::time::sleep(Duration::from_millis(120)).await;
    let out = compiled
        .invoke(&Context::new(), TraceState::new())
        .await
        .unwrap();
    assert_eq!(out.visited, vec!["api"]);
}
