use chrono::{DateTime, Utc};
use redb::ReadableTable;

use super::db::{open_rows, unlink_thread, Database, DatabaseError};
use super::models::ThreadRecord;
use super::tables::*;
use crate::actor::UserId;
use crate::page_store::PageId;

impl Database {
    // ========================================================================
    // Thread operations
    // ========================================================================

    /// Insert a thread row and index it under its forum. An existing row for the
    /// same page is left alone; returns whether a row was written.
    pub fn insert_thread(&self, thread: &ThreadRecord) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;
        let inserted = {
            let mut table = write_txn.open_table(THREADS)?;
            if table.get(thread.page_id)?.is_some() {
                false
            } else {
                let data = rmp_serde::to_vec_named(thread)?;
                table.insert(thread.page_id, data.as_slice())?;

                let mut index = write_txn.open_table(FORUM_THREADS)?;
                link_thread(&mut index, thread.forum_page_id, thread.page_id)?;
                true
            }
        };
        write_txn.commit()?;
        Ok(inserted)
    }

    /// Overwrite a thread row as-is (snapshot restore), moving its index entry if the
    /// forum changed.
    pub fn put_thread_row(&self, thread: &ThreadRecord) -> Result<(), DatabaseError> {
        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(THREADS)?;
            let previous: Option<ThreadRecord> = {
                let result = match table.get(thread.page_id)? {
                    Some(data) => Some(rmp_serde::from_slice(data.value())?),
                    None => None,
                };
                result
            };

            let data = rmp_serde::to_vec_named(thread)?;
            table.insert(thread.page_id, data.as_slice())?;

            let mut index = write_txn.open_table(FORUM_THREADS)?;
            if let Some(previous) = previous {
                if previous.forum_page_id != thread.forum_page_id {
                    unlink_thread(&mut index, previous.forum_page_id, thread.page_id)?;
                }
            }
            link_thread(&mut index, thread.forum_page_id, thread.page_id)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn get_thread_row(&self, page_id: PageId) -> Result<Option<ThreadRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let Some(table) = open_rows(&read_txn, THREADS)? else {
            return Ok(None);
        };

        match table.get(page_id)? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    /// Thread rows indexed under a forum, unordered.
    pub fn thread_rows_for_forum(
        &self,
        forum_page_id: PageId,
    ) -> Result<Vec<ThreadRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let (Some(index), Some(table)) = (
            open_rows(&read_txn, FORUM_THREADS)?,
            open_rows(&read_txn, THREADS)?,
        ) else {
            return Ok(Vec::new());
        };

        let thread_ids: Vec<PageId> = match index.get(forum_page_id)? {
            Some(data) => rmp_serde::from_slice(data.value())?,
            None => return Ok(Vec::new()),
        };

        let mut threads = Vec::with_capacity(thread_ids.len());
        for thread_id in thread_ids {
            if let Some(data) = table.get(thread_id)? {
                threads.push(rmp_serde::from_slice(data.value())?);
            }
        }
        Ok(threads)
    }

    /// Set the last-reply fields of an existing thread row. Returns false when the
    /// thread table or the row is missing.
    pub fn touch_last_reply(
        &self,
        page_id: PageId,
        user: Option<UserId>,
        at: DateTime<Utc>,
    ) -> Result<bool, DatabaseError> {
        if !self.capabilities()?.threads {
            return Ok(false);
        }

        let write_txn = self.begin_write()?;
        let touched = {
            let mut table = write_txn.open_table(THREADS)?;
            let existing: Option<ThreadRecord> = {
                let result = match table.get(page_id)? {
                    Some(data) => Some(rmp_serde::from_slice(data.value())?),
                    None => None,
                };
                result
            };

            match existing {
                Some(mut thread) => {
                    thread.last_reply = Some(at);
                    thread.last_reply_user = user;
                    let data = rmp_serde::to_vec_named(&thread)?;
                    table.insert(page_id, data.as_slice())?;
                    true
                }
                None => false,
            }
        };
        write_txn.commit()?;
        Ok(touched)
    }

    /// All thread rows (for snapshot/restore and pruning).
    pub fn all_thread_rows(&self) -> Result<Vec<ThreadRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let Some(table) = open_rows(&read_txn, THREADS)? else {
            return Ok(Vec::new());
        };

        let mut threads = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            threads.push(rmp_serde::from_slice(value.value())?);
        }
        Ok(threads)
    }
}

fn link_thread(
    index: &mut redb::Table<'_, PageId, &'static [u8]>,
    forum_id: PageId,
    thread_id: PageId,
) -> Result<(), DatabaseError> {
    let mut thread_ids: Vec<PageId> = {
        let result = match index.get(forum_id)? {
            Some(data) => rmp_serde::from_slice(data.value())?,
            None => Vec::new(),
        };
        result
    };

    if !thread_ids.contains(&thread_id) {
        thread_ids.push(thread_id);
        let data = rmp_serde::to_vec_named(&thread_ids)?;
        index.insert(forum_id, data.as_slice())?;
    }
    Ok(())
}
