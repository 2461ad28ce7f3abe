//! Shared test helpers for forum-directory integration tests.

use std::sync::Arc;

use crate::config::{ClusterConfig, Config, ForumConfig, NodeConfig};
use crate::forum::ForumThreadService;
use crate::page_store::{PageStore, RedbPageStore};
use crate::permissions::PermissionPolicy;
use crate::replication::MetadataWriter;
use crate::storage::Database;
use crate::AppState;

/// Create a test AppState on temporary stores. Metadata writes apply straight to the
/// local database; there is no cluster node.
pub fn test_state(temp_dir: &tempfile::TempDir) -> Arc<AppState> {
    test_state_with(temp_dir, ForumConfig::default())
}

pub fn test_state_with(temp_dir: &tempfile::TempDir, forum: ForumConfig) -> Arc<AppState> {
    let data_dir = temp_dir.path().join("data");
    let pages_dir = temp_dir.path().join("pages");

    let config = Config {
        node: NodeConfig {
            id: uuid::Uuid::new_v4().to_string(),
            bind_address: "127.0.0.1:0".to_string(),
            data_dir: data_dir.to_string_lossy().to_string(),
            page_store_path: pages_dir.to_string_lossy().to_string(),
        },
        cluster: ClusterConfig::default(),
        forum,
        test_mode: true,
    };

    let db = if config.forum.metadata_tables {
        Database::open(&data_dir).expect("Failed to open test database")
    } else {
        Database::open_bare(&data_dir).expect("Failed to open test database")
    };
    let pages: Arc<dyn PageStore> =
        Arc::new(RedbPageStore::open(&pages_dir).expect("Failed to open test page store"));

    let writer: Arc<dyn MetadataWriter> = Arc::new(db.clone());
    let service = ForumThreadService::new(
        db.clone(),
        Arc::clone(&pages),
        writer,
        PermissionPolicy::new(config.forum.permissions.clone()),
    );

    Arc::new(AppState {
        config,
        db,
        pages,
        service,
        node: None,
    })
}
