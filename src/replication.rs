//! The write endpoint for metadata.
//!
//! Reads always hit the local database. Writes go through a `MetadataWriter`, which is
//! either the database itself (single process) or the muster node, which replicates
//! through the leader before every node applies the op.

use async_trait::async_trait;
use thiserror::Error;

use crate::state_machine::ForumStateMachine;
use crate::storage::models::WriteOp;
use crate::storage::{Database, DatabaseError};

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("Write endpoint unavailable: {0}")]
    Unavailable(String),
    #[error("Replication failed: {0}")]
    Replication(String),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<muster::MusterError> for WriteError {
    fn from(e: muster::MusterError) -> Self {
        match e {
            muster::MusterError::NotLeader { .. } => {
                WriteError::Unavailable("No leader available, retry shortly".to_string())
            }
            muster::MusterError::NoQuorum => {
                WriteError::Unavailable("Failed to reach quorum for replication".to_string())
            }
            _ => WriteError::Replication(e.to_string()),
        }
    }
}

#[async_trait]
pub trait MetadataWriter: Send + Sync {
    async fn submit(&self, op: WriteOp) -> Result<(), WriteError>;
}

#[async_trait]
impl MetadataWriter for Database {
    async fn submit(&self, op: WriteOp) -> Result<(), WriteError> {
        self.apply(&op)?;
        Ok(())
    }
}

#[async_trait]
impl MetadataWriter for muster::RedbNode<ForumStateMachine> {
    async fn submit(&self, op: WriteOp) -> Result<(), WriteError> {
        self.replicate(op).await.map(|_| ()).map_err(WriteError::from)
    }
}
