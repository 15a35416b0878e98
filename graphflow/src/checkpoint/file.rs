//! Single-record checkpoint store over a writer/reader pair.

use std::io::{self, Read, Write};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::checkpoint::{Checkpoint, CheckpointError, CheckpointStore};

/// Write-once, read-once checkpoint persistence as one JSON line.
///
/// `save` appends a serialized record to the writer; `load` consumes the
/// reader and parses the first record, verifying the requested id.
/// Listing, deleting and clearing need a database-shaped store and report
/// [`CheckpointError::Unsupported`] here.
pub struct FileCheckpointStore<W, R> {
    writer: Mutex<W>,
    reader: Mutex<Option<R>>,
}

impl<W, R> FileCheckpointStore<W, R>
where
    W: Write + Send,
    R: Read + Send,
{
    pub fn new(writer: W, reader: R) -> Self {
        Self {
            writer: Mutex::new(writer),
            reader: Mutex::new(Some(reader)),
        }
    }
}

#[async_trait]
impl<S, W, R> CheckpointStore<S> for FileCheckpointStore<W, R>
where
    S: Serialize + DeserializeOwned + Send + Sync + 'static,
    W: Write + Send + 'static,
    R: Read + Send + 'static,
{
    async fn save(&self, checkpoint: Checkpoint<S>) -> Result<(), CheckpointError> {
        let record = serde_json::to_vec(&checkpoint)?;
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_all(&record)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<Checkpoint<S>, CheckpointError> {
        let mut reader = self
            .reader
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| {
                CheckpointError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "single-record reader already consumed",
                ))
            })?;

        let mut contents = String::new();
        reader.read_to_string(&mut contents)?;
        let first_line = contents
            .lines()
            .next()
            .filter(|line| !line.trim().is_empty())
            .ok_or_else(|| CheckpointError::NotFound(id.to_string()))?;

        let checkpoint: Checkpoint<S> = serde_json::from_str(first_line)?;
        if checkpoint.id != id {
            return Err(CheckpointError::NotFound(id.to_string()));
        }
        Ok(checkpoint)
    }

    async fn list(&self, _execution_id: &str) -> Result<Vec<Checkpoint<S>>, CheckpointError> {
        Err(CheckpointError::Unsupported("list"))
    }

    async fn delete(&self, _id: &str) -> Result<(), CheckpointError> {
        Err(CheckpointError::Unsupported("delete"))
    }

    async fn clear(&self, _execution_id: &str) -> Result<(), CheckpointError> {
        Err(CheckpointError::Unsupported("clear"))
    }
}
