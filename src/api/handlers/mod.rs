mod admin;
mod forums;
mod threads;

use serde::{Deserialize, Serialize};

use crate::api::response::ApiError;
use crate::config::ForumConfig;
use crate::page_store::{PageId, PageRef};

pub use admin::{admin_purge, cluster_status, health, prune};
pub use forums::{create_forum, create_thread, list_forums, list_threads};
pub use threads::{get_thread, reply, set_lock, set_sticky};

const DEFAULT_FORUM_LIMIT: usize = 50;
const DEFAULT_THREAD_LIMIT: usize = 20;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: usize,
}

impl ListParams {
    /// The requested limit, defaulted and capped. Zero is rejected.
    fn limit(&self, default: usize, config: &ForumConfig) -> Result<usize, ApiError> {
        match self.limit {
            Some(0) => Err(ApiError::bad_request("limit must be greater than 0")),
            Some(limit) => Ok(limit.min(config.max_page_limit)),
            None => Ok(default.min(config.max_page_limit)),
        }
    }
}

/// Identity of a created or referenced page.
#[derive(Debug, Serialize)]
pub struct PageLinkResponse {
    pub id: PageId,
    pub title: String,
    pub url: String,
}

fn page_link(config: &ForumConfig, page: &PageRef) -> PageLinkResponse {
    PageLinkResponse {
        id: page.id,
        title: page.title.prefixed_text(),
        url: config.page_url(&page.title.prefixed_db_key()),
    }
}

/// Fallback for a known path hit with an unsupported method.
pub async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed()
}
