//! forum-directory - forums and threads layered over a page store
//!
//! This crate provides a forum directory whose structure lives in page titles, with:
//! - Metadata tables on redb for fast listings, and a title-scan fallback without them
//! - Per-forum permission rules for creating threads and replying
//! - Lock and sticky flags as idempotent merges
//! - Metadata writes replicated via muster (Raft-like clustering)
//! - REST API with JSend envelopes

pub mod actor;
pub mod api;
pub mod config;
pub mod error;
pub mod forum;
pub mod page_store;
pub mod permissions;
pub mod replication;
pub mod state_machine;
pub mod storage;
#[cfg(test)]
pub mod testutil;
pub mod title;

use std::sync::Arc;

use config::Config;
use forum::ForumThreadService;
use page_store::PageStore;
use state_machine::ForumStateMachine;
use storage::Database;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub pages: Arc<dyn PageStore>,
    pub service: ForumThreadService,
    /// The cluster node, when metadata writes are replicated.
    pub node: Option<Arc<muster::RedbNode<ForumStateMachine>>>,
}
