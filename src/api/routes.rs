use axum::{
    routing::{delete, get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        // Forums
        .route(
            "/forums",
            get(handlers::list_forums)
                .post(handlers::create_forum)
                .fallback(handlers::method_not_allowed),
        )
        .route(
            "/forums/:id/threads",
            get(handlers::list_threads)
                .post(handlers::create_thread)
                .fallback(handlers::method_not_allowed),
        )
        // Threads
        .route(
            "/threads/:id",
            get(handlers::get_thread).fallback(handlers::method_not_allowed),
        )
        .route(
            "/threads/:id/replies",
            post(handlers::reply).fallback(handlers::method_not_allowed),
        )
        .route(
            "/threads/:id/lock",
            patch(handlers::set_lock).fallback(handlers::method_not_allowed),
        )
        .route(
            "/threads/:id/sticky",
            patch(handlers::set_sticky).fallback(handlers::method_not_allowed),
        )
        // Internal
        .route("/_internal/cluster/status", get(handlers::cluster_status))
        .route("/_internal/health", get(handlers::health))
        .route("/_internal/prune", post(handlers::prune));

    // Test-only routes
    if state.config.test_mode {
        tracing::warn!("Test mode enabled, purge route is available.");
        router = router.route("/admin/purge", delete(handlers::admin_purge));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
