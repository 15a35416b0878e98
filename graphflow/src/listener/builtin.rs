//! Ready-made listeners: structured logging and in-process metrics.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::context::Context;
use crate::error::GraphError;
use crate::listener::{NodeEvent, NodeListener};

/// Listener that logs node events through the `tracing` macros.
///
/// Start and complete log at info, progress at debug, errors at error
/// level. State rendering (via `Debug`) is off by default since states can
/// be large.
#[derive(Debug, Clone, Default)]
pub struct LoggingListener {
    include_state: bool,
}

impl LoggingListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also renders the state on start/complete lines.
    pub fn with_state(mut self) -> Self {
        self.include_state = true;
        self
    }
}

#[async_trait]
impl<S> NodeListener<S> for LoggingListener
where
    S: fmt::Debug + Send + Sync + 'static,
{
    async fn on_node_event(
        &self,
        _ctx: Context,
        event: NodeEvent,
        node_name: String,
        state: S,
        error: Option<GraphError>,
    ) {
        match event {
            NodeEvent::Start | NodeEvent::Complete => {
                if self.include_state {
                    tracing::info!(node = %node_name, event = %event, state = ?state, "node event");
                } else {
                    tracing::info!(node = %node_name, event = %event, "node event");
                }
            }
            NodeEvent::Progress => {
                tracing::debug!(node = %node_name, event = %event, "node progress");
            }
            NodeEvent::Error => {
                let error = error
                    .map(|err| err.to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                tracing::error!(node = %node_name, %error, "node failed");
            }
        }
    }
}

#[derive(Default)]
struct Metrics {
    executions: HashMap<String, u64>,
    errors: HashMap<String, u64>,
    durations: HashMap<String, Vec<Duration>>,
    started: HashMap<String, Instant>,
    total_executions: u64,
}

/// Listener that aggregates per-node execution counts, error counts and
/// durations.
///
/// Durations are measured between a node's Start and its Complete or Error
/// event. Counters survive across runs until [`reset`](Self::reset).
#[derive(Default)]
pub struct MetricsListener {
    metrics: Mutex<Metrics>,
}

impl MetricsListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Completed executions per node.
    pub fn node_executions(&self) -> HashMap<String, u64> {
        self.lock().executions.clone()
    }

    /// Failed executions per node.
    pub fn node_errors(&self) -> HashMap<String, u64> {
        self.lock().errors.clone()
    }

    /// Mean duration of `node`'s finished executions, if any were recorded.
    pub fn average_duration(&self, node: &str) -> Option<Duration> {
        let metrics = self.lock();
        let durations = metrics.durations.get(node)?;
        if durations.is_empty() {
            return None;
        }
        let total: Duration = durations.iter().sum();
        Some(total / durations.len() as u32)
    }

    /// Node starts observed since the last reset.
    pub fn total_executions(&self) -> u64 {
        self.lock().total_executions
    }

    /// Clears every counter and in-flight start time.
    pub fn reset(&self) {
        *self.lock() = Metrics::default();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Metrics> {
        self.metrics.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl<S> NodeListener<S> for MetricsListener
where
    S: Send + Sync + 'static,
{
    async fn on_node_event(
        &self,
        _ctx: Context,
        event: NodeEvent,
        node_name: String,
        _state: S,
        _error: Option<GraphError>,
    ) {
        let mut metrics = self.lock();
        match event {
            NodeEvent::Start => {
                metrics.started.insert(node_name, Instant::now());
                metrics.total_executions += 1;
            }
            NodeEvent::Complete => {
                *metrics.executions.entry(node_name.clone()).or_default() += 1;
                if let Some(started) = metrics.started.remove(&node_name) {
                    metrics
                        .durations
                        .entry(node_name)
                        .or_default()
                        .push(started.elapsed());
                }
            }
            NodeEvent::Error => {
                *metrics.errors.entry(node_name.clone()).or_default() += 1;
                if let Some(started) = metrics.started.remove(&node_name) {
                    metrics
                        .durations
                        .entry(node_name)
                        .or_default()
                        .push(started.elapsed());
                }
            }
            NodeEvent::Progress => {}
        }
    }
}
