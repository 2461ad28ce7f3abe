use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{page_link, PageLinkResponse};
use crate::actor::UserId;
use crate::api::actor::RequestActor;
use crate::api::response::{ApiError, AppJson, JSend};
use crate::config::ForumConfig;
use crate::forum::{FlagChange, ThreadSummary};
use crate::page_store::{PageId, PageRef};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ThreadResponse {
    pub id: PageId,
    pub title: String,
    pub subject: String,
    pub url: String,
    pub created: Option<String>,
    pub creator: Option<UserId>,
    pub last_reply: Option<String>,
    pub last_reply_user: Option<UserId>,
    pub locked: bool,
    pub sticky: bool,
}

#[derive(Debug, Serialize)]
pub struct ThreadDetailResponse {
    #[serde(flatten)]
    pub thread: ThreadResponse,
    pub forum: Option<PageLinkResponse>,
}

#[derive(Debug, Serialize)]
pub struct ReplyResponse {
    pub thread_id: PageId,
    pub title: String,
    pub url: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct LockResponse {
    pub id: PageId,
    pub title: String,
    pub locked: bool,
}

#[derive(Debug, Serialize)]
pub struct StickyResponse {
    pub id: PageId,
    pub title: String,
    pub sticky: bool,
}

#[derive(Debug, Deserialize)]
pub struct ReplyRequest {
    #[serde(default)]
    pub body: String,
}

/// An omitted flag flips the current value.
#[derive(Debug, Deserialize)]
pub struct LockRequest {
    #[serde(default)]
    pub locked: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct StickyRequest {
    #[serde(default)]
    pub sticky: Option<bool>,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn get_thread(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<PageId>,
) -> Result<Json<JSend<ThreadDetailResponse>>, ApiError> {
    let detail = state.service.get_thread(thread_id).await?;
    let config = &state.config.forum;

    Ok(JSend::success(ThreadDetailResponse {
        thread: thread_to_response(config, &detail.summary),
        forum: detail.forum.map(|forum| {
            page_link(
                config,
                &PageRef {
                    id: forum.id,
                    title: forum.title,
                },
            )
        }),
    }))
}

pub async fn reply(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<PageId>,
    RequestActor(actor): RequestActor,
    AppJson(req): AppJson<ReplyRequest>,
) -> Result<(StatusCode, Json<JSend<ReplyResponse>>), ApiError> {
    let receipt = state.service.reply(&actor, thread_id, &req.body).await?;
    let link = page_link(&state.config.forum, &receipt.thread);

    Ok(JSend::created(ReplyResponse {
        thread_id: link.id,
        title: link.title,
        url: link.url,
        timestamp: receipt.timestamp.to_rfc3339(),
    }))
}

pub async fn set_lock(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<PageId>,
    RequestActor(actor): RequestActor,
    AppJson(req): AppJson<LockRequest>,
) -> Result<Json<JSend<LockResponse>>, ApiError> {
    let FlagChange { thread, value } = state
        .service
        .set_locked(&actor, thread_id, req.locked)
        .await?;

    Ok(JSend::success(LockResponse {
        id: thread.id,
        title: thread.title.prefixed_text(),
        locked: value,
    }))
}

pub async fn set_sticky(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<PageId>,
    RequestActor(actor): RequestActor,
    AppJson(req): AppJson<StickyRequest>,
) -> Result<Json<JSend<StickyResponse>>, ApiError> {
    let FlagChange { thread, value } = state
        .service
        .set_sticky(&actor, thread_id, req.sticky)
        .await?;

    Ok(JSend::success(StickyResponse {
        id: thread.id,
        title: thread.title.prefixed_text(),
        sticky: value,
    }))
}

// ============================================================================
// Helpers
// ============================================================================

pub(super) fn thread_to_response(config: &ForumConfig, thread: &ThreadSummary) -> ThreadResponse {
    ThreadResponse {
        id: thread.id,
        title: thread.title.prefixed_text(),
        subject: thread.subject.clone(),
        url: config.page_url(&thread.title.prefixed_db_key()),
        created: thread.created.map(|t| t.to_rfc3339()),
        creator: thread.creator,
        last_reply: thread.last_reply.map(|t| t.to_rfc3339()),
        last_reply_user: thread.last_reply_user,
        locked: thread.locked,
        sticky: thread.sticky,
    }
}
