use async_trait::async_trait;
use chrono::Utc;
use redb::{Database as RedbDatabase, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;

use super::{Page, PageEdit, PageId, PageRef, PageStore, PageStoreError};
use crate::storage::DatabaseError;
use crate::title::{Namespace, Title};

/// Pages: page id -> Page (msgpack)
const PAGES: TableDefinition<PageId, &[u8]> = TableDefinition::new("pages");

/// Title index: prefixed document key -> page id. Enforces title uniqueness.
const PAGE_TITLES: TableDefinition<&str, PageId> = TableDefinition::new("page_titles");

/// Counters: name -> last issued value
const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

const PAGE_ID_SEQUENCE: &str = "page_id";

/// Page store on its own redb file, for single-process deployments and tests.
pub struct RedbPageStore {
    db: Arc<RedbDatabase>,
}

impl RedbPageStore {
    pub fn open<P: AsRef<Path>>(base_path: P) -> Result<Self, DatabaseError> {
        std::fs::create_dir_all(base_path.as_ref())?;
        let db = Arc::new(RedbDatabase::create(base_path.as_ref().join("pages.redb"))?);

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(PAGES)?;
            let _ = write_txn.open_table(PAGE_TITLES)?;
            let _ = write_txn.open_table(SEQUENCES)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    fn read_page(&self, id: PageId) -> Result<Option<Page>, DatabaseError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PAGES)?;
        match table.get(id)? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    fn read_page_by_title(&self, title: &Title) -> Result<Option<Page>, DatabaseError> {
        let read_txn = self.db.begin_read()?;
        let titles = read_txn.open_table(PAGE_TITLES)?;
        let key = title.prefixed_db_key();

        let id = match titles.get(key.as_str())? {
            Some(id) => id.value(),
            None => return Ok(None),
        };

        let pages = read_txn.open_table(PAGES)?;
        match pages.get(id)? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    /// `None` when the title is already taken.
    fn insert_page(&self, title: &Title, edit: PageEdit) -> Result<Option<Page>, DatabaseError> {
        let key = title.prefixed_db_key();
        let write_txn = self.db.begin_write()?;
        let page = {
            let mut titles = write_txn.open_table(PAGE_TITLES)?;
            if titles.get(key.as_str())?.is_some() {
                None
            } else {
                let mut sequences = write_txn.open_table(SEQUENCES)?;
                let last: u64 = {
                    let result = match sequences.get(PAGE_ID_SEQUENCE)? {
                        Some(value) => value.value(),
                        None => 0,
                    };
                    result
                };
                let id = last + 1;
                sequences.insert(PAGE_ID_SEQUENCE, id)?;

                let page = Page {
                    id,
                    title: title.clone(),
                    content: edit.content,
                    revision: 1,
                    touched: Utc::now(),
                    last_editor: edit.author,
                    summary: edit.summary,
                };

                let mut pages = write_txn.open_table(PAGES)?;
                let data = rmp_serde::to_vec_named(&page)?;
                pages.insert(id, data.as_slice())?;
                titles.insert(key.as_str(), id)?;
                Some(page)
            }
        };
        write_txn.commit()?;
        Ok(page)
    }

    /// `None` when the page does not exist.
    fn update_page(&self, id: PageId, edit: PageEdit) -> Result<Option<Page>, DatabaseError> {
        let write_txn = self.db.begin_write()?;
        let page = {
            let mut pages = write_txn.open_table(PAGES)?;
            let existing: Option<Page> = {
                let result = match pages.get(id)? {
                    Some(data) => Some(rmp_serde::from_slice(data.value())?),
                    None => None,
                };
                result
            };

            match existing {
                Some(mut page) => {
                    page.content = edit.content;
                    page.summary = edit.summary;
                    page.last_editor = edit.author;
                    page.revision += 1;
                    page.touched = Utc::now();

                    let data = rmp_serde::to_vec_named(&page)?;
                    pages.insert(id, data.as_slice())?;
                    Some(page)
                }
                None => None,
            }
        };
        write_txn.commit()?;
        Ok(page)
    }

    /// Remove a page and free its title. Returns whether the page existed.
    fn remove_page(&self, id: PageId) -> Result<bool, DatabaseError> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut pages = write_txn.open_table(PAGES)?;
            let existing: Option<Page> = {
                let result = match pages.remove(id)? {
                    Some(data) => Some(rmp_serde::from_slice(data.value())?),
                    None => None,
                };
                result
            };

            match existing {
                Some(page) => {
                    let mut titles = write_txn.open_table(PAGE_TITLES)?;
                    titles.remove(page.title.prefixed_db_key().as_str())?;
                    true
                }
                None => false,
            }
        };
        write_txn.commit()?;
        Ok(removed)
    }

    fn scan_pages(
        &self,
        namespace: Namespace,
        prefix: Option<&str>,
    ) -> Result<Vec<PageRef>, DatabaseError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PAGES)?;

        let mut pages = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            let page: Page = rmp_serde::from_slice(value.value())?;
            if !page.title.in_namespace(namespace) {
                continue;
            }
            if prefix.is_some_and(|p| !page.title.text().starts_with(p)) {
                continue;
            }
            pages.push(page.page_ref());
        }
        Ok(pages)
    }
}

#[async_trait]
impl PageStore for RedbPageStore {
    async fn get(&self, id: PageId) -> Result<Option<Page>, PageStoreError> {
        Ok(self.read_page(id)?)
    }

    async fn get_by_title(&self, title: &Title) -> Result<Option<Page>, PageStoreError> {
        Ok(self.read_page_by_title(title)?)
    }

    async fn create(&self, title: &Title, edit: PageEdit) -> Result<Page, PageStoreError> {
        self.insert_page(title, edit)?
            .ok_or_else(|| PageStoreError::AlreadyExists(title.prefixed_text()))
    }

    async fn save(&self, id: PageId, edit: PageEdit) -> Result<Page, PageStoreError> {
        self.update_page(id, edit)?
            .ok_or(PageStoreError::NotFound(id))
    }

    async fn delete(&self, id: PageId) -> Result<bool, PageStoreError> {
        Ok(self.remove_page(id)?)
    }

    async fn scan(
        &self,
        namespace: Namespace,
        prefix: Option<&str>,
    ) -> Result<Vec<PageRef>, PageStoreError> {
        Ok(self.scan_pages(namespace, prefix)?)
    }
}
