//! Checkpointing: persist state snapshots during a run, load them later.
//!
//! A [`CheckpointListener`] saves a [`Checkpoint`] after every successful
//! node completion; [`CheckpointableRunnable`] attaches it per run and
//! offers the manual save/load/list surface. Stores implement
//! [`CheckpointStore`]: [`MemoryCheckpointStore`] for the full surface,
//! [`FileCheckpointStore`] for single-record persistence.

pub mod file;
pub mod listener;
pub mod memory;
pub mod runnable;

use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::listener::NodeEvent;

pub use file::FileCheckpointStore;
pub use listener::{CheckpointErrorSink, CheckpointListener};
pub use memory::MemoryCheckpointStore;
pub use runnable::{CheckpointConfig, CheckpointableGraph, CheckpointableRunnable};

/// Record format version written into every checkpoint.
pub const CHECKPOINT_VERSION: u32 = 1;

/// Who and what produced a checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    /// Id of the run that produced this checkpoint.
    pub execution_id: String,
    /// Listener event that triggered an auto-save, `None` for manual saves.
    pub event: Option<NodeEvent>,
    /// True for checkpoints saved through the manual surface.
    pub manual: bool,
}

/// Snapshot of the state after a node completed.
///
/// **Interaction**: produced by [`CheckpointListener`] (auto-save) or
/// [`CheckpointableRunnable::save_checkpoint`] (manual), persisted by a
/// [`CheckpointStore`], read back via load/list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint<S> {
    pub id: String,
    /// Node whose completion produced the snapshot.
    pub node_name: String,
    pub state: S,
    pub metadata: CheckpointMetadata,
    pub timestamp: SystemTime,
    pub version: u32,
}

/// Errors from checkpoint stores and the checkpointing surface.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint not found: {0}")]
    NotFound(String),

    /// The store does not implement this operation.
    #[error("{0} is not supported by this store")]
    Unsupported(&'static str),

    #[error("checkpoint serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("checkpoint io failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Persistence contract for checkpoints.
///
/// Implementations synchronize internally; one store instance may serve
/// many concurrent runs.
#[async_trait]
pub trait CheckpointStore<S>: Send + Sync {
    /// Persists `checkpoint` under its id.
    async fn save(&self, checkpoint: Checkpoint<S>) -> Result<(), CheckpointError>;

    /// Loads a checkpoint by id.
    async fn load(&self, id: &str) -> Result<Checkpoint<S>, CheckpointError>;

    /// Checkpoints recorded for one execution, oldest first.
    async fn list(&self, execution_id: &str) -> Result<Vec<Checkpoint<S>>, CheckpointError>;

    /// Deletes a checkpoint by id.
    async fn delete(&self, id: &str) -> Result<(), CheckpointError>;

    /// Removes every checkpoint of one execution.
    async fn clear(&self, execution_id: &str) -> Result<(), CheckpointError>;
}

pub(crate) fn new_checkpoint_id() -> String {
    format!("checkpoint-{}", uuid::Uuid::new_v4())
}

pub(crate) fn checkpoint_for_node<S>(
    execution_id: &str,
    node_name: String,
    state: S,
    event: Option<NodeEvent>,
    manual: bool,
) -> Checkpoint<S> {
    Checkpoint {
        id: new_checkpoint_id(),
        node_name,
        state,
        metadata: CheckpointMetadata {
            execution_id: execution_id.to_string(),
            event,
            manual,
        },
        timestamp: SystemTime::now(),
        version: CHECKPOINT_VERSION,
    }
}

/// Shared dyn-store handle, the form every consumer takes.
pub type SharedCheckpointStore<S> = Arc<dyn CheckpointStore<S>>;
