use redb::ReadableTable;

use super::db::{open_rows, Database, DatabaseError};
use super::models::ForumRecord;
use super::tables::*;
use crate::page_store::PageId;

impl Database {
    // ========================================================================
    // Forum operations
    // ========================================================================

    /// Insert a forum row, or refresh only the title of an existing one. Creation
    /// fields are never overwritten.
    pub fn upsert_forum(&self, forum: &ForumRecord) -> Result<(), DatabaseError> {
        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(FORUMS)?;

            let existing: Option<ForumRecord> = {
                let result = match table.get(forum.page_id)? {
                    Some(data) => Some(rmp_serde::from_slice(data.value())?),
                    None => None,
                };
                result
            };

            let row = match existing {
                Some(mut row) => {
                    row.title = forum.title.clone();
                    row
                }
                None => forum.clone(),
            };

            let data = rmp_serde::to_vec_named(&row)?;
            table.insert(forum.page_id, data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Overwrite a forum row as-is (snapshot restore).
    pub fn put_forum_row(&self, forum: &ForumRecord) -> Result<(), DatabaseError> {
        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(FORUMS)?;
            let data = rmp_serde::to_vec_named(forum)?;
            table.insert(forum.page_id, data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn get_forum_row(&self, page_id: PageId) -> Result<Option<ForumRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let Some(table) = open_rows(&read_txn, FORUMS)? else {
            return Ok(None);
        };

        match table.get(page_id)? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    /// All forum rows in page id order.
    pub fn all_forum_rows(&self) -> Result<Vec<ForumRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let Some(table) = open_rows(&read_txn, FORUMS)? else {
            return Ok(Vec::new());
        };

        let mut forums = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            forums.push(rmp_serde::from_slice(value.value())?);
        }
        Ok(forums)
    }
}
