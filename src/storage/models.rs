use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::actor::UserId;
use crate::page_store::PageId;

/// Forum metadata row. A cache over the page store: the page is the source of truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForumRecord {
    pub page_id: PageId,
    /// Document key of the forum page at its last save.
    pub title: String,
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub creator: Option<UserId>,
}

/// Thread metadata row, written once at creation and touched on every reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadRecord {
    pub page_id: PageId,
    pub forum_page_id: PageId,
    pub subject: String,
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub creator: Option<UserId>,
    #[serde(default)]
    pub last_reply: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_reply_user: Option<UserId>,
}

/// Mutable per-thread flags. A missing row reads as `Default`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadProps {
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub sticky: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadFlag {
    Locked,
    Sticky,
}

impl ThreadProps {
    pub fn get(&self, flag: ThreadFlag) -> bool {
        match flag {
            ThreadFlag::Locked => self.locked,
            ThreadFlag::Sticky => self.sticky,
        }
    }

    /// Merge a single flag, leaving the other untouched.
    pub fn set(&mut self, flag: ThreadFlag, value: bool) {
        match flag {
            ThreadFlag::Locked => self.locked = value,
            ThreadFlag::Sticky => self.sticky = value,
        }
    }
}

/// Types of write operations (replicated via muster)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WriteOp {
    /// Insert the row, or refresh only its title when it already exists.
    UpsertForum(ForumRecord),
    /// Insert the row unless one exists for the page.
    InsertThread(ThreadRecord),
    TouchLastReply {
        page_id: PageId,
        user: Option<UserId>,
        at: DateTime<Utc>,
    },
    SetThreadFlag {
        page_id: PageId,
        flag: ThreadFlag,
        value: bool,
    },
    /// Drop every metadata row keyed by these pages.
    RemoveMetadata { page_ids: Vec<PageId> },
}
