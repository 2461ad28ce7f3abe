//! The document store the forum layer sits on.
//!
//! Page identity, existence and content live here; the forum layer only keeps metadata
//! keyed by page id.

mod local;

pub use local::RedbPageStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::actor::UserId;
use crate::storage::DatabaseError;
use crate::title::{Namespace, Title};

pub type PageId = u64;

#[derive(Debug, Error)]
pub enum PageStoreError {
    #[error("Page already exists: {0}")]
    AlreadyExists(String),
    #[error("Page not found: {0}")]
    NotFound(PageId),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// A stored page at its latest revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: PageId,
    pub title: Title,
    pub content: String,
    pub revision: u64,
    pub touched: DateTime<Utc>,
    #[serde(default)]
    pub last_editor: Option<UserId>,
    #[serde(default)]
    pub summary: String,
}

impl Page {
    pub fn page_ref(&self) -> PageRef {
        PageRef {
            id: self.id,
            title: self.title.clone(),
        }
    }
}

/// Identity of a page without its content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRef {
    pub id: PageId,
    pub title: Title,
}

/// New content for a page.
#[derive(Debug, Clone, Default)]
pub struct PageEdit {
    pub content: String,
    pub summary: String,
    pub author: Option<UserId>,
}

impl PageEdit {
    pub fn new(content: impl Into<String>, summary: impl Into<String>, author: Option<UserId>) -> Self {
        Self {
            content: content.into(),
            summary: summary.into(),
            author,
        }
    }
}

#[async_trait]
pub trait PageStore: Send + Sync {
    async fn get(&self, id: PageId) -> Result<Option<Page>, PageStoreError>;

    async fn get_by_title(&self, title: &Title) -> Result<Option<Page>, PageStoreError>;

    async fn exists(&self, title: &Title) -> Result<bool, PageStoreError> {
        Ok(self.get_by_title(title).await?.is_some())
    }

    /// Create a page. Fails with `AlreadyExists` when the title is taken; the check and
    /// the insert are one atomic step.
    async fn create(&self, title: &Title, edit: PageEdit) -> Result<Page, PageStoreError>;

    /// Replace the content of an existing page.
    async fn save(&self, id: PageId, edit: PageEdit) -> Result<Page, PageStoreError>;

    /// Delete a page. Metadata rows keyed by it are left behind until pruned.
    async fn delete(&self, id: PageId) -> Result<bool, PageStoreError>;

    /// Pages in `namespace` whose title text starts with `prefix`, unordered.
    async fn scan(
        &self,
        namespace: Namespace,
        prefix: Option<&str>,
    ) -> Result<Vec<PageRef>, PageStoreError>;
}
