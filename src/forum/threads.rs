use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::forums::{Forum, ForumDirectory};
use super::mode::ListingMode;
use super::paginate;
use crate::actor::UserId;
use crate::error::ForumResult;
use crate::page_store::{PageId, PageRef, PageStore};
use crate::replication::MetadataWriter;
use crate::storage::models::{ThreadProps, ThreadRecord, WriteOp};
use crate::storage::Database;
use crate::title::{Namespace, Title};

/// One thread as listed. Fields other than identity and subject are only populated
/// from metadata rows; a title-scan listing reports them as unknown.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadSummary {
    pub id: PageId,
    pub title: Title,
    pub subject: String,
    pub created: Option<DateTime<Utc>>,
    pub creator: Option<UserId>,
    pub last_reply: Option<DateTime<Utc>>,
    pub last_reply_user: Option<UserId>,
    pub sticky: bool,
    pub locked: bool,
}

impl ThreadSummary {
    /// A summary carrying nothing beyond what the title says.
    fn from_page(page: &PageRef) -> Self {
        Self {
            id: page.id,
            title: page.title.clone(),
            subject: subject_from_title(&page.title),
            created: None,
            creator: None,
            last_reply: None,
            last_reply_user: None,
            sticky: false,
            locked: false,
        }
    }

    fn from_row(page: &PageRef, row: &ThreadRecord, props: ThreadProps) -> Self {
        Self {
            id: page.id,
            title: page.title.clone(),
            subject: row.subject.clone(),
            created: Some(row.created),
            creator: row.creator,
            last_reply: row.last_reply,
            last_reply_user: row.last_reply_user,
            sticky: props.sticky,
            locked: props.locked,
        }
    }

    pub fn activity(&self) -> Option<DateTime<Utc>> {
        self.last_reply.or(self.created)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThreadListing {
    pub threads: Vec<ThreadSummary>,
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThreadDetail {
    pub summary: ThreadSummary,
    /// The parent forum, when it still resolves.
    pub forum: Option<Forum>,
}

#[derive(Clone)]
pub struct ThreadDirectory {
    db: Database,
    pages: Arc<dyn PageStore>,
    writer: Arc<dyn MetadataWriter>,
    forums: ForumDirectory,
}

impl ThreadDirectory {
    pub fn new(
        db: Database,
        pages: Arc<dyn PageStore>,
        writer: Arc<dyn MetadataWriter>,
        forums: ForumDirectory,
    ) -> Self {
        Self {
            db,
            pages,
            writer,
            forums,
        }
    }

    /// Threads of `forum`, one page of them.
    ///
    /// With metadata: sticky first, then latest activity, then newest page id. Without:
    /// newest page id first, every flag false.
    pub async fn list_threads(
        &self,
        forum: &Forum,
        limit: usize,
        offset: usize,
    ) -> ForumResult<ThreadListing> {
        let rows = match ListingMode::for_threads(self.db.capabilities()?) {
            ListingMode::MetadataBacked { properties } => {
                self.from_metadata(forum, properties).await?
            }
            ListingMode::TitleScanOnly => self.from_titles(forum).await?,
        };

        let (threads, has_more) = paginate(rows, limit, offset);
        Ok(ThreadListing { threads, has_more })
    }

    async fn from_metadata(
        &self,
        forum: &Forum,
        with_properties: bool,
    ) -> ForumResult<Vec<ThreadSummary>> {
        let rows = self.db.thread_rows_for_forum(forum.id)?;
        let props: HashMap<PageId, ThreadProps> = if with_properties {
            let ids: Vec<PageId> = rows.iter().map(|row| row.page_id).collect();
            self.db.thread_props_for(&ids)?
        } else {
            HashMap::new()
        };

        let mut threads = Vec::with_capacity(rows.len());
        for row in &rows {
            let Some(page) = self.thread_page(row.page_id).await? else {
                debug!(page_id = row.page_id, "skipping thread row without a thread page");
                continue;
            };
            let flags = props.get(&row.page_id).copied().unwrap_or_default();
            threads.push(ThreadSummary::from_row(&page, row, flags));
        }

        threads.sort_by_key(|t| (Reverse(t.sticky), Reverse(t.activity()), Reverse(t.id)));
        Ok(threads)
    }

    async fn from_titles(&self, forum: &Forum) -> ForumResult<Vec<ThreadSummary>> {
        let prefix = format!("{}/", forum.title.text());
        let mut pages = self.pages.scan(Namespace::Thread, Some(&prefix)).await?;
        pages.sort_by_key(|page| Reverse(page.id));
        Ok(pages.iter().map(ThreadSummary::from_page).collect())
    }

    /// The thread at `thread_id` with whatever metadata is available, or `None` when
    /// the page is missing or not a thread.
    pub async fn get_thread(&self, thread_id: PageId) -> ForumResult<Option<ThreadDetail>> {
        let Some(page) = self.thread_page(thread_id).await? else {
            return Ok(None);
        };

        let caps = self.db.capabilities()?;
        let row = if caps.threads {
            self.db.get_thread_row(thread_id)?
        } else {
            None
        };
        let props = if caps.thread_properties {
            self.db.get_thread_props(thread_id)?.unwrap_or_default()
        } else {
            ThreadProps::default()
        };

        let mut summary = match &row {
            Some(row) => ThreadSummary::from_row(&page, row, props),
            None => ThreadSummary::from_page(&page),
        };
        summary.sticky = props.sticky;
        summary.locked = props.locked;

        let forum = match &row {
            Some(row) => self.forums.get_forum(row.forum_page_id).await?,
            None => match page.title.parent_forum() {
                Some(title) => self.forums.get_forum_by_title(&title).await?,
                None => None,
            },
        };

        Ok(Some(ThreadDetail { summary, forum }))
    }

    /// The page at `page_id` if it is a thread.
    pub async fn thread_page(&self, page_id: PageId) -> ForumResult<Option<PageRef>> {
        Ok(self
            .pages
            .get(page_id)
            .await?
            .filter(|page| page.title.in_namespace(Namespace::Thread))
            .map(|page| page.page_ref()))
    }

    /// Record a thread row. A no-op without the thread table.
    pub async fn register_thread(&self, record: ThreadRecord) -> ForumResult<bool> {
        if !self.db.capabilities()?.threads {
            return Ok(false);
        }
        self.writer.submit(WriteOp::InsertThread(record)).await?;
        Ok(true)
    }

    /// Stamp the latest reply on a thread row. A no-op when the table or the row is
    /// missing; `at` defaults to now.
    pub async fn touch_last_reply(
        &self,
        thread_id: PageId,
        user: Option<UserId>,
        at: Option<DateTime<Utc>>,
    ) -> ForumResult<bool> {
        if !self.db.capabilities()?.threads || self.db.get_thread_row(thread_id)?.is_none() {
            return Ok(false);
        }

        self.writer
            .submit(WriteOp::TouchLastReply {
                page_id: thread_id,
                user,
                at: at.unwrap_or_else(Utc::now),
            })
            .await?;
        Ok(true)
    }
}

fn subject_from_title(title: &Title) -> String {
    title.subpage_text().unwrap_or(title.text()).to_string()
}
