use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use crate::api::response::{ApiError, JSend};
use crate::storage::PurgeStats;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct ClusterStatusResponse {
    pub cluster_info: serde_json::Value,
}

/// Rows removed per metadata table.
#[derive(Debug, Serialize)]
pub struct RowsRemovedResponse {
    pub forums: u64,
    pub threads: u64,
    pub thread_properties: u64,
}

impl From<PurgeStats> for RowsRemovedResponse {
    fn from(stats: PurgeStats) -> Self {
        Self {
            forums: stats.forums,
            threads: stats.threads,
            thread_properties: stats.thread_properties,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn health() -> Json<JSend<HealthResponse>> {
    JSend::success(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn cluster_status(
    State(state): State<Arc<AppState>>,
) -> Json<JSend<ClusterStatusResponse>> {
    let Some(node) = state.node.as_ref() else {
        return JSend::success(ClusterStatusResponse {
            cluster_info: serde_json::json!({
                "node_id": state.config.node.id,
                "role": "Standalone",
                "peers": [],
            }),
        });
    };

    let info = node.cluster_info().await;
    let peers: Vec<serde_json::Value> = info
        .peers
        .iter()
        .map(|p| {
            serde_json::json!({
                "id": p.id,
                "address": p.address,
                "status": format!("{:?}", p.status),
                "sequence": p.sequence,
            })
        })
        .collect();

    JSend::success(ClusterStatusResponse {
        cluster_info: serde_json::json!({
            "node_id": info.node_id,
            "role": format!("{:?}", info.role),
            "term": info.term,
            "leader_id": info.leader_id,
            "peers": peers,
            "sequence": info.sequence,
        }),
    })
}

/// Drop metadata rows whose page is gone or has moved namespace.
pub async fn prune(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JSend<RowsRemovedResponse>>, ApiError> {
    let stats = state.service.prune_orphans().await?;
    Ok(JSend::success(stats.into()))
}

pub async fn admin_purge(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JSend<RowsRemovedResponse>>, ApiError> {
    let stats = state.db.purge_all()?;

    tracing::warn!(
        forums = stats.forums,
        threads = stats.threads,
        thread_properties = stats.thread_properties,
        "Purged all metadata"
    );

    Ok(JSend::success(stats.into()))
}
