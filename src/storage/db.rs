use redb::{
    Database as RedbDatabase, ReadOnlyTable, ReadTransaction, ReadableTable, TableDefinition,
    TableHandle, WriteTransaction,
};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use super::models::WriteOp;
use super::tables::*;
use crate::page_store::PageId;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Commit error: {0}")]
    Commit(Box<redb::CommitError>),
    #[error("Database error: {0}")]
    Redb(Box<redb::Error>),
    #[error("Database error: {0}")]
    RedbDatabase(Box<redb::DatabaseError>),
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] rmp_serde::decode::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] rmp_serde::encode::Error),
    #[error("Storage error: {0}")]
    Storage(Box<redb::StorageError>),
    #[error("Table error: {0}")]
    Table(Box<redb::TableError>),
    #[error("Transaction error: {0}")]
    Transaction(Box<redb::TransactionError>),
}

impl From<redb::CommitError> for DatabaseError {
    fn from(e: redb::CommitError) -> Self {
        DatabaseError::Commit(Box::new(e))
    }
}

impl From<redb::DatabaseError> for DatabaseError {
    fn from(e: redb::DatabaseError) -> Self {
        DatabaseError::RedbDatabase(Box::new(e))
    }
}

impl From<redb::Error> for DatabaseError {
    fn from(e: redb::Error) -> Self {
        DatabaseError::Redb(Box::new(e))
    }
}

impl From<redb::StorageError> for DatabaseError {
    fn from(e: redb::StorageError) -> Self {
        DatabaseError::Storage(Box::new(e))
    }
}

impl From<redb::TableError> for DatabaseError {
    fn from(e: redb::TableError) -> Self {
        DatabaseError::Table(Box::new(e))
    }
}

impl From<redb::TransactionError> for DatabaseError {
    fn from(e: redb::TransactionError) -> Self {
        DatabaseError::Transaction(Box::new(e))
    }
}

/// Row tables share one shape: page id -> msgpack record.
pub(crate) type RowTable = TableDefinition<'static, PageId, &'static [u8]>;

/// Which metadata tables exist in the store right now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetadataCapabilities {
    pub forums: bool,
    pub threads: bool,
    pub thread_properties: bool,
}

pub struct Database {
    db: Arc<RedbDatabase>,
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
        }
    }
}

/// Rows removed by a purge or prune.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PurgeStats {
    pub forums: u64,
    pub threads: u64,
    pub thread_properties: u64,
}

impl Database {
    /// Open or create a database at the given path with the metadata tables installed.
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self, DatabaseError> {
        let database = Self::open_bare(data_dir)?;

        let write_txn = database.begin_write()?;
        {
            let _ = write_txn.open_table(FORUMS)?;
            let _ = write_txn.open_table(THREADS)?;
            let _ = write_txn.open_table(FORUM_THREADS)?;
            let _ = write_txn.open_table(THREAD_PROPERTIES)?;
        }
        write_txn.commit()?;

        Ok(database)
    }

    /// Open or create a database without installing any metadata table. Listings
    /// against it run in title-scan mode until tables appear.
    pub fn open_bare<P: AsRef<Path>>(data_dir: P) -> Result<Self, DatabaseError> {
        std::fs::create_dir_all(data_dir.as_ref())?;
        let db_path = data_dir.as_ref().join("forum-directory.redb");
        let db = Arc::new(RedbDatabase::create(db_path)?);
        Ok(Self { db })
    }

    /// Get a reference to the underlying redb database (for sharing with muster).
    pub fn inner(&self) -> Arc<RedbDatabase> {
        Arc::clone(&self.db)
    }

    /// Begin a read transaction
    pub fn begin_read(&self) -> Result<ReadTransaction, DatabaseError> {
        Ok(self.db.begin_read()?)
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> Result<WriteTransaction, DatabaseError> {
        Ok(self.db.begin_write()?)
    }

    /// Probe which metadata tables are present.
    pub fn capabilities(&self) -> Result<MetadataCapabilities, DatabaseError> {
        let read_txn = self.begin_read()?;
        let mut caps = MetadataCapabilities::default();
        for handle in read_txn.list_tables()? {
            let name = handle.name();
            if name == FORUMS.name() {
                caps.forums = true;
            } else if name == THREADS.name() {
                caps.threads = true;
            } else if name == THREAD_PROPERTIES.name() {
                caps.thread_properties = true;
            }
        }
        Ok(caps)
    }

    /// Apply a replicated write.
    pub fn apply(&self, op: &WriteOp) -> Result<(), DatabaseError> {
        match op {
            WriteOp::UpsertForum(forum) => self.upsert_forum(forum)?,
            WriteOp::InsertThread(thread) => {
                self.insert_thread(thread)?;
            }
            WriteOp::TouchLastReply { page_id, user, at } => {
                self.touch_last_reply(*page_id, *user, *at)?;
            }
            WriteOp::SetThreadFlag {
                page_id,
                flag,
                value,
            } => self.set_thread_flag(*page_id, *flag, *value)?,
            WriteOp::RemoveMetadata { page_ids } => {
                self.remove_metadata(page_ids)?;
            }
        }
        Ok(())
    }

    // ========================================================================
    // Admin operations
    // ========================================================================

    /// Remove every metadata row keyed by one of `page_ids`.
    pub fn remove_metadata(&self, page_ids: &[PageId]) -> Result<PurgeStats, DatabaseError> {
        let caps = self.capabilities()?;
        let write_txn = self.begin_write()?;
        let mut stats = PurgeStats::default();

        if caps.forums {
            let mut table = write_txn.open_table(FORUMS)?;
            for id in page_ids {
                if table.remove(*id)?.is_some() {
                    stats.forums += 1;
                }
            }
        }

        if caps.threads {
            let mut table = write_txn.open_table(THREADS)?;
            let mut index = write_txn.open_table(FORUM_THREADS)?;
            for id in page_ids {
                let removed: Option<super::models::ThreadRecord> = {
                    let result = match table.remove(*id)? {
                        Some(data) => Some(rmp_serde::from_slice(data.value())?),
                        None => None,
                    };
                    result
                };
                if let Some(thread) = removed {
                    stats.threads += 1;
                    unlink_thread(&mut index, thread.forum_page_id, *id)?;
                }
                // A removed forum takes its index entry with it
                index.remove(*id)?;
            }
        }

        if caps.thread_properties {
            let mut table = write_txn.open_table(THREAD_PROPERTIES)?;
            for id in page_ids {
                if table.remove(*id)?.is_some() {
                    stats.thread_properties += 1;
                }
            }
        }

        write_txn.commit()?;
        Ok(stats)
    }

    /// Purge all metadata rows (test-mode purge and snapshot restore)
    pub fn purge_all(&self) -> Result<PurgeStats, DatabaseError> {
        let caps = self.capabilities()?;
        let write_txn = self.begin_write()?;
        let mut stats = PurgeStats::default();

        if caps.forums {
            stats.forums = clear_rows(&write_txn, FORUMS)?;
        }
        if caps.threads {
            stats.threads = clear_rows(&write_txn, THREADS)?;
            clear_rows(&write_txn, FORUM_THREADS)?;
        }
        if caps.thread_properties {
            stats.thread_properties = clear_rows(&write_txn, THREAD_PROPERTIES)?;
        }

        write_txn.commit()?;
        Ok(stats)
    }
}

/// Open a row table for reading, treating a missing table as empty.
pub(crate) fn open_rows(
    txn: &ReadTransaction,
    definition: RowTable,
) -> Result<Option<ReadOnlyTable<PageId, &'static [u8]>>, DatabaseError> {
    match txn.open_table(definition) {
        Ok(table) => Ok(Some(table)),
        Err(redb::TableError::TableDoesNotExist(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Drop `thread_id` from a forum's index entry, removing the entry once empty.
pub(crate) fn unlink_thread(
    index: &mut redb::Table<'_, PageId, &'static [u8]>,
    forum_id: PageId,
    thread_id: PageId,
) -> Result<(), DatabaseError> {
    let ids: Option<Vec<PageId>> = {
        let result = match index.get(forum_id)? {
            Some(data) => Some(rmp_serde::from_slice(data.value())?),
            None => None,
        };
        result
    };

    if let Some(mut ids) = ids {
        ids.retain(|id| *id != thread_id);
        if ids.is_empty() {
            index.remove(forum_id)?;
        } else {
            let data = rmp_serde::to_vec_named(&ids)?;
            index.insert(forum_id, data.as_slice())?;
        }
    }
    Ok(())
}

fn clear_rows(write_txn: &WriteTransaction, definition: RowTable) -> Result<u64, DatabaseError> {
    let mut table = write_txn.open_table(definition)?;
    let keys: Vec<PageId> = table
        .iter()?
        .map(|r| r.map(|(k, _)| k.value()))
        .collect::<Result<Vec<_>, _>>()?;

    for key in &keys {
        table.remove(*key)?;
    }
    Ok(keys.len() as u64)
}
