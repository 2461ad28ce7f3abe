use std::collections::HashMap;

use redb::ReadableTable;

use super::db::{open_rows, Database, DatabaseError};
use super::models::{ThreadFlag, ThreadProps};
use super::tables::*;
use crate::page_store::PageId;

impl Database {
    // ========================================================================
    // Thread property operations
    // ========================================================================

    pub fn get_thread_props(&self, page_id: PageId) -> Result<Option<ThreadProps>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let Some(table) = open_rows(&read_txn, THREAD_PROPERTIES)? else {
            return Ok(None);
        };

        match table.get(page_id)? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    /// Property rows for the given threads, read in one transaction. Threads without a
    /// row are absent from the map.
    pub fn thread_props_for(
        &self,
        page_ids: &[PageId],
    ) -> Result<HashMap<PageId, ThreadProps>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let Some(table) = open_rows(&read_txn, THREAD_PROPERTIES)? else {
            return Ok(HashMap::new());
        };

        let mut props = HashMap::new();
        for page_id in page_ids {
            if let Some(data) = table.get(*page_id)? {
                props.insert(*page_id, rmp_serde::from_slice(data.value())?);
            }
        }
        Ok(props)
    }

    /// Merge one flag into a thread's property row inside a single write transaction,
    /// creating the row with defaults when it is missing.
    pub fn set_thread_flag(
        &self,
        page_id: PageId,
        flag: ThreadFlag,
        value: bool,
    ) -> Result<(), DatabaseError> {
        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(THREAD_PROPERTIES)?;
            let mut props: ThreadProps = {
                let result = match table.get(page_id)? {
                    Some(data) => rmp_serde::from_slice(data.value())?,
                    None => ThreadProps::default(),
                };
                result
            };

            props.set(flag, value);
            let data = rmp_serde::to_vec_named(&props)?;
            table.insert(page_id, data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Overwrite a property row as-is (snapshot restore).
    pub fn put_thread_props(&self, page_id: PageId, props: ThreadProps) -> Result<(), DatabaseError> {
        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(THREAD_PROPERTIES)?;
            let data = rmp_serde::to_vec_named(&props)?;
            table.insert(page_id, data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn all_thread_props(&self) -> Result<Vec<(PageId, ThreadProps)>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let Some(table) = open_rows(&read_txn, THREAD_PROPERTIES)? else {
            return Ok(Vec::new());
        };

        let mut rows = Vec::new();
        for result in table.iter()? {
            let (key, value) = result?;
            rows.push((key.value(), rmp_serde::from_slice(value.value())?));
        }
        Ok(rows)
    }
}
