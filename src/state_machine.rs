//! Metadata state machine for muster cluster replication.

use serde::{Deserialize, Serialize};

use crate::page_store::PageId;
use crate::storage::models::{ForumRecord, ThreadProps, ThreadRecord, WriteOp};
use crate::storage::Database;

/// The forum metadata state machine, replicated by muster.
pub struct ForumStateMachine {
    db: Database,
}

impl ForumStateMachine {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

/// Full state snapshot for syncing lagging followers.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ForumSnapshot {
    pub forums: Vec<ForumRecord>,
    pub threads: Vec<ThreadRecord>,
    pub thread_properties: Vec<(PageId, ThreadProps)>,
}

impl muster::StateMachine for ForumStateMachine {
    type WriteOp = WriteOp;
    type Snapshot = ForumSnapshot;

    fn apply(&self, op: &WriteOp) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.db.apply(op)?;
        Ok(())
    }

    fn snapshot(&self) -> Result<ForumSnapshot, Box<dyn std::error::Error + Send + Sync>> {
        Ok(ForumSnapshot {
            forums: self.db.all_forum_rows()?,
            threads: self.db.all_thread_rows()?,
            thread_properties: self.db.all_thread_props()?,
        })
    }

    fn restore(
        &self,
        snapshot: ForumSnapshot,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        // Rows the snapshot no longer carries must not survive
        self.db.purge_all()?;
        for forum in &snapshot.forums {
            self.db.put_forum_row(forum)?;
        }
        for thread in &snapshot.threads {
            self.db.put_thread_row(thread)?;
        }
        for (page_id, props) in snapshot.thread_properties {
            self.db.put_thread_props(page_id, props)?;
        }
        Ok(())
    }
}
