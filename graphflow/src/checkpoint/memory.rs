//! In-memory checkpoint store.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::checkpoint::{Checkpoint, CheckpointError, CheckpointStore};

/// Checkpoint store backed by a read/write-locked map, for development and
/// tests. Supports the whole [`CheckpointStore`] surface.
pub struct MemoryCheckpointStore<S> {
    checkpoints: RwLock<HashMap<String, Checkpoint<S>>>,
}

impl<S> MemoryCheckpointStore<S> {
    pub fn new() -> Self {
        Self {
            checkpoints: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored checkpoints across all executions.
    pub fn len(&self) -> usize {
        self.checkpoints
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S> Default for MemoryCheckpointStore<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<S> CheckpointStore<S> for MemoryCheckpointStore<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn save(&self, checkpoint: Checkpoint<S>) -> Result<(), CheckpointError> {
        self.checkpoints
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(checkpoint.id.clone(), checkpoint);
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<Checkpoint<S>, CheckpointError> {
        self.checkpoints
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| CheckpointError::NotFound(id.to_string()))
    }

    async fn list(&self, execution_id: &str) -> Result<Vec<Checkpoint<S>>, CheckpointError> {
        let mut found: Vec<Checkpoint<S>> = self
            .checkpoints
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|checkpoint| checkpoint.metadata.execution_id == execution_id)
            .cloned()
            .collect();
        found.sort_by_key(|checkpoint| checkpoint.timestamp);
        Ok(found)
    }

    async fn delete(&self, id: &str) -> Result<(), CheckpointError> {
        self.checkpoints
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| CheckpointError::NotFound(id.to_string()))
    }

    async fn clear(&self, execution_id: &str) -> Result<(), CheckpointError> {
        self.checkpoints
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|_, checkpoint| checkpoint.metadata.execution_id != execution_id);
        Ok(())
    }
}
