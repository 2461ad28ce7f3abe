use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::threads::{thread_to_response, ThreadResponse};
use super::{page_link, ListParams, PageLinkResponse, DEFAULT_FORUM_LIMIT, DEFAULT_THREAD_LIMIT};
use crate::actor::UserId;
use crate::api::actor::RequestActor;
use crate::api::response::{ApiError, AppJson, AppQuery, JSend};
use crate::config::ForumConfig;
use crate::forum::ForumSummary;
use crate::page_store::{PageId, PageRef};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ForumResponse {
    pub id: PageId,
    pub title: String,
    pub prefixed_title: String,
    pub url: String,
    pub created: Option<String>,
    pub creator: Option<UserId>,
}

#[derive(Debug, Serialize)]
pub struct ForumListResponse {
    pub forums: Vec<ForumResponse>,
}

#[derive(Debug, Serialize)]
pub struct ThreadListResponse {
    pub forum: PageLinkResponse,
    pub threads: Vec<ThreadResponse>,
    pub has_more: bool,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Debug, Deserialize)]
pub struct CreateForumRequest {
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateThreadRequest {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn list_forums(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<ListParams>,
) -> Result<Json<JSend<ForumListResponse>>, ApiError> {
    let limit = params.limit(DEFAULT_FORUM_LIMIT, &state.config.forum)?;
    let forums = state.service.list_forums(limit, params.offset).await?;

    Ok(JSend::success(ForumListResponse {
        forums: forums
            .iter()
            .map(|forum| forum_to_response(&state.config.forum, forum))
            .collect(),
    }))
}

pub async fn create_forum(
    State(state): State<Arc<AppState>>,
    RequestActor(actor): RequestActor,
    AppJson(req): AppJson<CreateForumRequest>,
) -> Result<(StatusCode, Json<JSend<PageLinkResponse>>), ApiError> {
    let title = req.title.unwrap_or_default();
    let page = state.service.create_forum(&actor, &title).await?;

    Ok(JSend::created(page_link(&state.config.forum, &page)))
}

pub async fn list_threads(
    State(state): State<Arc<AppState>>,
    Path(forum_id): Path<PageId>,
    AppQuery(params): AppQuery<ListParams>,
) -> Result<Json<JSend<ThreadListResponse>>, ApiError> {
    let limit = params.limit(DEFAULT_THREAD_LIMIT, &state.config.forum)?;
    let (forum, listing) = state
        .service
        .list_threads(forum_id, limit, params.offset)
        .await?;

    let forum_page = PageRef {
        id: forum.id,
        title: forum.title,
    };
    Ok(JSend::success(ThreadListResponse {
        forum: page_link(&state.config.forum, &forum_page),
        threads: listing
            .threads
            .iter()
            .map(|thread| thread_to_response(&state.config.forum, thread))
            .collect(),
        has_more: listing.has_more,
        limit,
        offset: params.offset,
    }))
}

pub async fn create_thread(
    State(state): State<Arc<AppState>>,
    Path(forum_id): Path<PageId>,
    RequestActor(actor): RequestActor,
    AppJson(req): AppJson<CreateThreadRequest>,
) -> Result<(StatusCode, Json<JSend<PageLinkResponse>>), ApiError> {
    let page = state
        .service
        .create_thread(&actor, forum_id, &req.subject, &req.body)
        .await?;

    Ok(JSend::created(page_link(&state.config.forum, &page)))
}

// ============================================================================
// Helpers
// ============================================================================

fn forum_to_response(config: &ForumConfig, forum: &ForumSummary) -> ForumResponse {
    ForumResponse {
        id: forum.id,
        title: forum.title.text().to_string(),
        prefixed_title: forum.title.prefixed_text(),
        url: config.page_url(&forum.title.prefixed_db_key()),
        created: forum.created.map(|t| t.to_rfc3339()),
        creator: forum.creator,
    }
}
