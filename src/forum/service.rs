//! The intents a boundary can express against the forum layer, gated by actor rights and
//! the permission policy.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::context::PageContext;
use super::forums::{Forum, ForumDirectory, ForumSummary};
use super::props::ThreadPropertyStore;
use super::threads::{ThreadDetail, ThreadDirectory, ThreadListing};
use crate::actor::{Actor, RIGHT_EDIT, RIGHT_PROTECT};
use crate::error::{ForumError, ForumResult};
use crate::page_store::{Page, PageEdit, PageId, PageRef, PageStore, PageStoreError};
use crate::permissions::{ForumAction, PermissionPolicy};
use crate::replication::MetadataWriter;
use crate::storage::models::{ThreadFlag, ThreadRecord, WriteOp};
use crate::storage::{Database, PurgeStats};
use crate::title::{Namespace, Title, MAX_TITLE_BYTES};

/// Titles tried for one new thread before giving up.
pub const MAX_TITLE_ATTEMPTS: u32 = 5;

const TIMESTAMP_SUFFIX_FORMAT: &str = "%Y%m%d%H%M%S";
const SIGNATURE_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

/// A posted reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyReceipt {
    pub thread: PageRef,
    pub timestamp: DateTime<Utc>,
}

/// The value a thread flag ended up with.
#[derive(Debug, Clone, PartialEq)]
pub struct FlagChange {
    pub thread: PageRef,
    pub value: bool,
}

#[derive(Clone)]
pub struct ForumThreadService {
    db: Database,
    pages: Arc<dyn PageStore>,
    writer: Arc<dyn MetadataWriter>,
    policy: Arc<PermissionPolicy>,
    forums: ForumDirectory,
    threads: ThreadDirectory,
    props: ThreadPropertyStore,
}

impl ForumThreadService {
    pub fn new(
        db: Database,
        pages: Arc<dyn PageStore>,
        writer: Arc<dyn MetadataWriter>,
        policy: PermissionPolicy,
    ) -> Self {
        let forums = ForumDirectory::new(db.clone(), Arc::clone(&pages), Arc::clone(&writer));
        let threads = ThreadDirectory::new(
            db.clone(),
            Arc::clone(&pages),
            Arc::clone(&writer),
            forums.clone(),
        );
        let props = ThreadPropertyStore::new(db.clone(), Arc::clone(&pages), Arc::clone(&writer));

        Self {
            db,
            pages,
            writer,
            policy: Arc::new(policy),
            forums,
            threads,
            props,
        }
    }

    pub fn forums(&self) -> &ForumDirectory {
        &self.forums
    }

    pub fn threads(&self) -> &ThreadDirectory {
        &self.threads
    }

    pub fn props(&self) -> &ThreadPropertyStore {
        &self.props
    }

    pub fn policy(&self) -> &PermissionPolicy {
        &self.policy
    }

    // ========================================================================
    // Forums
    // ========================================================================

    pub async fn list_forums(&self, limit: usize, offset: usize) -> ForumResult<Vec<ForumSummary>> {
        self.forums.list_forums(limit, offset).await
    }

    pub async fn create_forum(&self, actor: &Actor, title: &str) -> ForumResult<PageRef> {
        require_editor(actor)?;

        if title.trim().is_empty() {
            return Err(ForumError::InvalidInput("Missing forum title".to_string()));
        }
        let title = Title::parse_in(title, Namespace::Forum)?;
        // Thread titles name their forum by the text before the first `/`
        if title.text().contains('/') {
            return Err(ForumError::InvalidInput(
                "Forum title cannot contain '/'".to_string(),
            ));
        }
        if self.pages.exists(&title).await? {
            return Err(ForumError::Conflict("Forum already exists".to_string()));
        }

        let edit = PageEdit::new(
            format!("This is the forum page for ''{}''.\n", title.text()),
            "Created forum",
            actor.id,
        );
        let page = match self.pages.create(&title, edit).await {
            Ok(page) => page,
            Err(PageStoreError::AlreadyExists(_)) => {
                return Err(ForumError::Conflict("Forum already exists".to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        self.page_saved(&page, actor).await?;

        debug!(forum_id = page.id, title = %page.title, "forum created");
        Ok(page.page_ref())
    }

    // ========================================================================
    // Threads
    // ========================================================================

    pub async fn list_threads(
        &self,
        forum_id: PageId,
        limit: usize,
        offset: usize,
    ) -> ForumResult<(Forum, ThreadListing)> {
        let forum = self.require_forum(forum_id).await?;
        let listing = self.threads.list_threads(&forum, limit, offset).await?;
        Ok((forum, listing))
    }

    pub async fn get_thread(&self, thread_id: PageId) -> ForumResult<ThreadDetail> {
        self.threads
            .get_thread(thread_id)
            .await?
            .ok_or_else(|| ForumError::NotFound("Thread not found".to_string()))
    }

    /// Start a thread in a forum. When the natural title is taken the subject gets a
    /// timestamp suffix instead of failing.
    pub async fn create_thread(
        &self,
        actor: &Actor,
        forum_id: PageId,
        subject: &str,
        body: &str,
    ) -> ForumResult<PageRef> {
        require_editor(actor)?;
        let forum = self.require_forum(forum_id).await?;

        if !self
            .policy
            .can_perform(actor, &forum.title.prefixed_text(), ForumAction::Create)
        {
            return Err(ForumError::PermissionDenied(
                "You cannot create threads in this forum".to_string(),
            ));
        }

        let subject = subject.trim();
        if subject.is_empty() {
            return Err(ForumError::InvalidInput("Subject cannot be empty".to_string()));
        }
        let base = Title::thread(&forum.title, subject)?;

        let now = Utc::now();
        let edit = PageEdit::new(
            thread_content(&forum, subject, body, actor, now),
            format!("New thread: {subject}"),
            actor.id,
        );
        let page = self.create_unique(&base, edit, now).await?;
        self.page_saved(&page, actor).await?;

        self.threads
            .register_thread(ThreadRecord {
                page_id: page.id,
                forum_page_id: forum.id,
                subject: subject.to_string(),
                created: now,
                creator: actor.id,
                last_reply: None,
                last_reply_user: None,
            })
            .await?;

        debug!(forum_id = forum.id, thread_id = page.id, title = %page.title, "thread created");
        Ok(page.page_ref())
    }

    async fn create_unique(&self, base: &Title, edit: PageEdit, now: DateTime<Utc>) -> ForumResult<Page> {
        for attempt in 1..=MAX_TITLE_ATTEMPTS {
            let title = if attempt == 1 {
                base.clone()
            } else {
                suffixed_title(base, now, attempt)?
            };

            match self.pages.create(&title, edit.clone()).await {
                Ok(page) => return Ok(page),
                Err(PageStoreError::AlreadyExists(_)) => {
                    debug!(title = %title, attempt, "thread title taken");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ForumError::Conflict(format!(
            "No free title for thread after {MAX_TITLE_ATTEMPTS} attempts"
        )))
    }

    pub async fn reply(&self, actor: &Actor, thread_id: PageId, body: &str) -> ForumResult<ReplyReceipt> {
        require_editor(actor)?;

        if body.trim().is_empty() {
            return Err(ForumError::InvalidInput("Reply body cannot be empty".to_string()));
        }

        let thread = self.get_thread(thread_id).await?;
        let forum = thread
            .forum
            .ok_or_else(|| ForumError::NotFound("Parent forum not found".to_string()))?;

        if !self
            .policy
            .can_perform(actor, &forum.title.prefixed_text(), ForumAction::Reply)
        {
            return Err(ForumError::PermissionDenied(
                "You cannot reply in this forum".to_string(),
            ));
        }
        if self.props.is_locked(thread_id).await? {
            return Err(ForumError::Conflict(
                "Thread is locked and cannot be replied to".to_string(),
            ));
        }

        let page = self
            .pages
            .get(thread_id)
            .await?
            .ok_or_else(|| ForumError::NotFound("Thread not found".to_string()))?;

        let now = Utc::now();
        let content = format!("{}{}", page.content, reply_content(body, actor, now));
        let saved = match self
            .pages
            .save(thread_id, PageEdit::new(content, "Reply", actor.id))
            .await
        {
            Ok(saved) => saved,
            Err(PageStoreError::NotFound(_)) => {
                return Err(ForumError::NotFound("Thread not found".to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        self.page_saved(&saved, actor).await?;
        self.threads.touch_last_reply(thread_id, actor.id, Some(now)).await?;

        debug!(forum_id = forum.id, thread_id, "reply posted");
        Ok(ReplyReceipt {
            thread: saved.page_ref(),
            timestamp: now,
        })
    }

    /// Set or, with `None`, flip the lock on a thread.
    pub async fn set_locked(
        &self,
        actor: &Actor,
        thread_id: PageId,
        locked: Option<bool>,
    ) -> ForumResult<FlagChange> {
        self.toggle(actor, thread_id, ThreadFlag::Locked, locked).await
    }

    /// Set or, with `None`, flip the sticky flag on a thread.
    pub async fn set_sticky(
        &self,
        actor: &Actor,
        thread_id: PageId,
        sticky: Option<bool>,
    ) -> ForumResult<FlagChange> {
        self.toggle(actor, thread_id, ThreadFlag::Sticky, sticky).await
    }

    async fn toggle(
        &self,
        actor: &Actor,
        thread_id: PageId,
        flag: ThreadFlag,
        value: Option<bool>,
    ) -> ForumResult<FlagChange> {
        if !actor.is_allowed(RIGHT_PROTECT) {
            return Err(ForumError::PermissionDenied("Permission denied".to_string()));
        }

        let thread = self
            .threads
            .thread_page(thread_id)
            .await?
            .ok_or_else(|| ForumError::NotFound("Thread not found".to_string()))?;

        let value = match value {
            Some(value) => value,
            None => !self.props.flag(thread_id, flag).await?,
        };
        self.props.set_flag(thread_id, flag, value).await?;

        debug!(thread_id, ?flag, value, "thread flag set");
        Ok(FlagChange { thread, value })
    }

    // ========================================================================
    // Maintenance
    // ========================================================================

    /// Remove metadata rows whose page is gone or no longer in the namespace the row
    /// describes. Returns the number of orphaned rows found per table.
    pub async fn prune_orphans(&self) -> ForumResult<PurgeStats> {
        let mut stats = PurgeStats::default();
        let mut orphans = BTreeSet::new();

        for row in self.db.all_forum_rows()? {
            if self.forums.get_forum(row.page_id).await?.is_none() {
                stats.forums += 1;
                orphans.insert(row.page_id);
            }
        }
        for row in self.db.all_thread_rows()? {
            if self.threads.thread_page(row.page_id).await?.is_none() {
                stats.threads += 1;
                orphans.insert(row.page_id);
            }
        }
        for (page_id, _) in self.db.all_thread_props()? {
            if self.threads.thread_page(page_id).await?.is_none() {
                stats.thread_properties += 1;
                orphans.insert(page_id);
            }
        }

        if !orphans.is_empty() {
            warn!(count = orphans.len(), "pruning orphaned metadata rows");
            self.writer
                .submit(WriteOp::RemoveMetadata {
                    page_ids: orphans.into_iter().collect(),
                })
                .await?;
        }
        Ok(stats)
    }

    async fn require_forum(&self, forum_id: PageId) -> ForumResult<Forum> {
        self.forums
            .get_forum(forum_id)
            .await?
            .ok_or_else(|| ForumError::NotFound("Forum not found".to_string()))
    }

    async fn page_saved(&self, page: &Page, actor: &Actor) -> ForumResult<()> {
        let context = PageContext::for_page(page.page_ref());
        self.forums.record_page_save(&context, actor).await?;
        Ok(())
    }
}

fn require_editor(actor: &Actor) -> ForumResult<()> {
    if actor.is_registered() && actor.is_allowed(RIGHT_EDIT) {
        Ok(())
    } else {
        Err(ForumError::PermissionDenied("Permission denied".to_string()))
    }
}

/// `<subject> (<timestamp>)` on the second attempt, `<subject> (<timestamp>-<n>)` after.
/// A subject too long to carry the suffix is cut short to make room.
fn suffixed_title(base: &Title, now: DateTime<Utc>, attempt: u32) -> ForumResult<Title> {
    let stamp = now.format(TIMESTAMP_SUFFIX_FORMAT);
    let suffix = if attempt == 2 {
        format!(" ({stamp})")
    } else {
        format!(" ({stamp}-{})", attempt - 1)
    };

    let room = MAX_TITLE_BYTES.saturating_sub(suffix.len());
    let text = base.text();
    let mut cut = text.len().min(room);
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    let head = text[..cut].trim_end();

    // Keep the forum prefix and at least one character of subject
    if head.len() <= base.root_text().len() + 1 {
        return Err(ForumError::Conflict(
            "No room for a unique thread title".to_string(),
        ));
    }
    Ok(Title::new(Namespace::Thread, &format!("{head}{suffix}"))?)
}

fn thread_content(forum: &Forum, subject: &str, body: &str, actor: &Actor, now: DateTime<Utc>) -> String {
    format!(
        "''Posted in [[{forum}]]''\n\n== {subject} ==\n\n{body}\n\n----\n''Thread started by {name} at {at}''\n",
        forum = forum.title.prefixed_text(),
        body = body.trim(),
        name = actor.display_name(),
        at = now.format(SIGNATURE_FORMAT),
    )
}

fn reply_content(body: &str, actor: &Actor, now: DateTime<Utc>) -> String {
    format!(
        "\n----\n''Reply by {name} at {at}''\n\n{body}\n",
        name = actor.display_name(),
        at = now.format(SIGNATURE_FORMAT),
        body = body.trim(),
    )
}
