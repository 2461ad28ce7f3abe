use std::sync::Arc;

use tracing::debug;

use crate::error::ForumResult;
use crate::page_store::{PageId, PageStore};
use crate::replication::MetadataWriter;
use crate::storage::models::{ThreadFlag, WriteOp};
use crate::storage::Database;
use crate::title::Namespace;

/// Lock and sticky flags of thread pages. Ids that are not thread pages read as
/// unset, and writes to them are dropped.
#[derive(Clone)]
pub struct ThreadPropertyStore {
    db: Database,
    pages: Arc<dyn PageStore>,
    writer: Arc<dyn MetadataWriter>,
}

impl ThreadPropertyStore {
    pub fn new(db: Database, pages: Arc<dyn PageStore>, writer: Arc<dyn MetadataWriter>) -> Self {
        Self { db, pages, writer }
    }

    pub async fn is_locked(&self, thread_id: PageId) -> ForumResult<bool> {
        self.flag(thread_id, ThreadFlag::Locked).await
    }

    pub async fn is_sticky(&self, thread_id: PageId) -> ForumResult<bool> {
        self.flag(thread_id, ThreadFlag::Sticky).await
    }

    pub async fn set_locked(&self, thread_id: PageId, locked: bool) -> ForumResult<()> {
        self.set_flag(thread_id, ThreadFlag::Locked, locked).await
    }

    pub async fn set_sticky(&self, thread_id: PageId, sticky: bool) -> ForumResult<()> {
        self.set_flag(thread_id, ThreadFlag::Sticky, sticky).await
    }

    pub async fn flag(&self, thread_id: PageId, flag: ThreadFlag) -> ForumResult<bool> {
        if !self.is_thread(thread_id).await? {
            return Ok(false);
        }
        Ok(self
            .db
            .get_thread_props(thread_id)?
            .map(|props| props.get(flag))
            .unwrap_or(false))
    }

    pub async fn set_flag(&self, thread_id: PageId, flag: ThreadFlag, value: bool) -> ForumResult<()> {
        if !self.is_thread(thread_id).await? {
            debug!(page_id = thread_id, ?flag, "ignoring flag write to a non-thread page");
            return Ok(());
        }

        self.writer
            .submit(WriteOp::SetThreadFlag {
                page_id: thread_id,
                flag,
                value,
            })
            .await?;
        Ok(())
    }

    async fn is_thread(&self, page_id: PageId) -> ForumResult<bool> {
        Ok(self
            .pages
            .get(page_id)
            .await?
            .is_some_and(|page| page.title.in_namespace(Namespace::Thread)))
    }
}
