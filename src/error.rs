use thiserror::Error;

use crate::page_store::PageStoreError;
use crate::replication::WriteError;
use crate::storage::DatabaseError;
use crate::title::TitleError;

/// Failures of forum operations. Lookups report absence as `None`; only the service
/// boundary turns absence or denial into one of the first four variants.
#[derive(Debug, Error)]
pub enum ForumError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    PermissionDenied(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    Pages(#[from] PageStoreError),
    #[error(transparent)]
    Write(#[from] WriteError),
}

impl From<TitleError> for ForumError {
    fn from(e: TitleError) -> Self {
        ForumError::InvalidInput(e.to_string())
    }
}

pub type ForumResult<T> = Result<T, ForumError>;
