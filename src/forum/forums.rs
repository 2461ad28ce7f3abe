use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::context::{PageContext, PageKind};
use super::mode::ListingMode;
use crate::actor::{Actor, UserId};
use crate::error::ForumResult;
use crate::page_store::{PageId, PageStore};
use crate::replication::MetadataWriter;
use crate::storage::models::{ForumRecord, WriteOp};
use crate::storage::Database;
use crate::title::{Namespace, Title};

/// A forum page, resolved against the page store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Forum {
    pub id: PageId,
    pub title: Title,
}

/// One entry of a forum listing. `created` and `creator` are only known when the
/// listing came from metadata rows.
#[derive(Debug, Clone, PartialEq)]
pub struct ForumSummary {
    pub id: PageId,
    pub title: Title,
    pub created: Option<DateTime<Utc>>,
    pub creator: Option<UserId>,
}

#[derive(Clone)]
pub struct ForumDirectory {
    db: Database,
    pages: Arc<dyn PageStore>,
    writer: Arc<dyn MetadataWriter>,
}

impl ForumDirectory {
    pub fn new(db: Database, pages: Arc<dyn PageStore>, writer: Arc<dyn MetadataWriter>) -> Self {
        Self { db, pages, writer }
    }

    /// Forums ordered by document key ascending.
    pub async fn list_forums(&self, limit: usize, offset: usize) -> ForumResult<Vec<ForumSummary>> {
        let mode = ListingMode::for_forums(self.db.capabilities()?);
        let mut forums = if mode.is_metadata_backed() {
            self.from_metadata().await?
        } else {
            self.from_titles().await?
        };

        forums.sort_by_cached_key(|forum| forum.title.db_key());
        Ok(forums.into_iter().skip(offset).take(limit).collect())
    }

    /// Rows joined with their pages. A row whose page is gone, or no longer a forum,
    /// is left out.
    async fn from_metadata(&self) -> ForumResult<Vec<ForumSummary>> {
        let rows = self.db.all_forum_rows()?;
        let mut forums = Vec::with_capacity(rows.len());

        for row in rows {
            let Some(forum) = self.get_forum(row.page_id).await? else {
                debug!(page_id = row.page_id, "skipping forum row without a forum page");
                continue;
            };
            forums.push(ForumSummary {
                id: forum.id,
                title: forum.title,
                created: Some(row.created),
                creator: row.creator,
            });
        }
        Ok(forums)
    }

    async fn from_titles(&self) -> ForumResult<Vec<ForumSummary>> {
        let pages = self.pages.scan(Namespace::Forum, None).await?;
        Ok(pages
            .into_iter()
            .map(|page| ForumSummary {
                id: page.id,
                title: page.title,
                created: None,
                creator: None,
            })
            .collect())
    }

    /// The forum at `page_id`, or `None` when the page is missing or not a forum.
    pub async fn get_forum(&self, page_id: PageId) -> ForumResult<Option<Forum>> {
        Ok(self
            .pages
            .get(page_id)
            .await?
            .filter(|page| page.title.in_namespace(Namespace::Forum))
            .map(|page| Forum {
                id: page.id,
                title: page.title,
            }))
    }

    pub async fn get_forum_by_title(&self, title: &Title) -> ForumResult<Option<Forum>> {
        if !title.in_namespace(Namespace::Forum) {
            return Ok(None);
        }
        Ok(self.pages.get_by_title(title).await?.map(|page| Forum {
            id: page.id,
            title: page.title,
        }))
    }

    /// Keep the forum row in step with a saved page. Only forum pages count, and only
    /// while the forum table exists. Returns whether a write was submitted.
    pub async fn record_page_save(&self, context: &PageContext, actor: &Actor) -> ForumResult<bool> {
        if context.kind() != PageKind::Forum || !self.db.capabilities()?.forums {
            return Ok(false);
        }

        let page = context.page();
        self.writer
            .submit(WriteOp::UpsertForum(ForumRecord {
                page_id: page.id,
                title: page.title.db_key(),
                created: Utc::now(),
                creator: actor.id,
            }))
            .await?;

        debug!(page_id = page.id, title = %page.title, "forum row recorded");
        Ok(true)
    }
}
