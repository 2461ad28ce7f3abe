use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::actor::{USER_ID_HEADER, USER_NAME_HEADER, USER_RIGHTS_HEADER};
use super::create_router;
use crate::config::ForumConfig;
use crate::testutil::{test_state, test_state_with};

struct Caller {
    id: u64,
    name: &'static str,
    rights: &'static str,
}

const MODERATOR: Caller = Caller {
    id: 1,
    name: "Mod",
    rights: "edit,protect",
};

const EDITOR: Caller = Caller {
    id: 2,
    name: "Alice",
    rights: "edit",
};

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    caller: Option<&Caller>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(caller) = caller {
        builder = builder
            .header(USER_ID_HEADER, caller.id.to_string())
            .header(USER_NAME_HEADER, caller.name)
            .header(USER_RIGHTS_HEADER, caller.rights);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn create_forum(app: &Router, title: &str) -> u64 {
    let (status, body) = send(
        app,
        Method::POST,
        "/forums",
        Some(&MODERATOR),
        Some(json!({ "title": title })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["id"].as_u64().unwrap()
}

async fn create_thread(app: &Router, forum_id: u64, subject: &str) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        &format!("/forums/{forum_id}/threads"),
        Some(&EDITOR),
        Some(json!({ "subject": subject, "body": "Opening post" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"].clone()
}

#[tokio::test]
async fn test_forum_thread_lifecycle() {
    let temp = tempfile::tempdir().unwrap();
    let app = create_router(test_state(&temp));

    let forum_id = create_forum(&app, "General").await;

    let first = create_thread(&app, forum_id, "Hello").await;
    assert_eq!(first["title"], "Thread:General/Hello");
    assert_eq!(
        first["url"],
        "http://localhost:8080/wiki/Thread:General/Hello"
    );
    let first_id = first["id"].as_u64().unwrap();

    let second = create_thread(&app, forum_id, "Hello").await;
    let second_title = second["title"].as_str().unwrap();
    assert!(second_title.starts_with("Thread:General/Hello ("), "{second_title}");
    assert!(second_title.ends_with(')'), "{second_title}");
    let second_id = second["id"].as_u64().unwrap();

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/threads/{first_id}/lock"),
        Some(&MODERATOR),
        Some(json!({ "locked": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["locked"], true);

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/threads/{first_id}/replies"),
        Some(&EDITOR),
        Some(json!({ "body": "Too late" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], "fail");

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/threads/{second_id}/replies"),
        Some(&EDITOR),
        Some(json!({ "body": "Welcome" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["thread_id"], second_id);

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/forums/{forum_id}/threads"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let threads = body["data"]["threads"].as_array().unwrap();
    assert_eq!(threads.len(), 2);
    assert_eq!(threads[0]["id"], second_id);
    assert_eq!(threads[0]["last_reply_user"], EDITOR.id);
    assert!(threads[0]["last_reply"].is_string());
    assert_eq!(threads[1]["id"], first_id);
    assert_eq!(threads[1]["locked"], true);
    assert_eq!(body["data"]["has_more"], false);
    assert_eq!(body["data"]["forum"]["title"], "Forum:General");
}

#[tokio::test]
async fn test_get_thread_detail() {
    let temp = tempfile::tempdir().unwrap();
    let app = create_router(test_state(&temp));

    let forum_id = create_forum(&app, "Help Desk").await;
    let thread = create_thread(&app, forum_id, "Printer on fire").await;
    let thread_id = thread["id"].as_u64().unwrap();

    let (status, body) = send(&app, Method::GET, &format!("/threads/{thread_id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["subject"], "Printer on fire");
    assert_eq!(body["data"]["creator"], EDITOR.id);
    assert_eq!(body["data"]["locked"], false);
    assert_eq!(body["data"]["forum"]["id"], forum_id);
    assert_eq!(
        body["data"]["forum"]["url"],
        "http://localhost:8080/wiki/Forum:Help_Desk"
    );
}

#[tokio::test]
async fn test_list_forums() {
    let temp = tempfile::tempdir().unwrap();
    let app = create_router(test_state(&temp));

    create_forum(&app, "Zebra").await;
    create_forum(&app, "Announcements").await;

    let (status, body) = send(&app, Method::GET, "/forums", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let forums = body["data"]["forums"].as_array().unwrap();
    assert_eq!(forums.len(), 2);
    assert_eq!(forums[0]["title"], "Announcements");
    assert_eq!(forums[0]["creator"], MODERATOR.id);
    assert_eq!(forums[1]["title"], "Zebra");

    let (_, body) = send(&app, Method::GET, "/forums?limit=1&offset=1", None, None).await;
    let forums = body["data"]["forums"].as_array().unwrap();
    assert_eq!(forums.len(), 1);
    assert_eq!(forums[0]["title"], "Zebra");
}

#[tokio::test]
async fn test_sticky_toggle_flips_when_omitted() {
    let temp = tempfile::tempdir().unwrap();
    let app = create_router(test_state(&temp));

    let forum_id = create_forum(&app, "General").await;
    let thread_id = create_thread(&app, forum_id, "Rules").await["id"]
        .as_u64()
        .unwrap();
    let uri = format!("/threads/{thread_id}/sticky");

    let (status, body) = send(&app, Method::PATCH, &uri, Some(&MODERATOR), Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["sticky"], true);

    let (_, body) = send(&app, Method::PATCH, &uri, Some(&MODERATOR), Some(json!({}))).await;
    assert_eq!(body["data"]["sticky"], false);

    let (status, _) = send(&app, Method::PATCH, &uri, Some(&EDITOR), Some(json!({}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_failure_statuses() {
    let temp = tempfile::tempdir().unwrap();
    let app = create_router(test_state(&temp));
    let forum_id = create_forum(&app, "General").await;

    // Anonymous callers cannot create
    let (status, body) = send(
        &app,
        Method::POST,
        "/forums",
        None,
        Some(json!({ "title": "Other" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["status"], "fail");

    let (status, _) = send(
        &app,
        Method::POST,
        "/forums",
        Some(&MODERATOR),
        Some(json!({ "title": "General" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, Method::POST, "/forums", Some(&MODERATOR), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/forums/{forum_id}/threads"),
        Some(&EDITOR),
        Some(json!({ "subject": "   ", "body": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::GET, "/threads/999", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // A forum id is not a thread id
    let (status, _) = send(&app, Method::GET, &format!("/threads/{forum_id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::GET, "/forums/999/threads", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::GET, "/forums?limit=0", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unsupported_method_is_405() {
    let temp = tempfile::tempdir().unwrap();
    let app = create_router(test_state(&temp));

    let (status, body) = send(&app, Method::DELETE, "/forums", Some(&MODERATOR), None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["status"], "fail");

    let (status, _) = send(&app, Method::GET, "/threads/1/lock", None, None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_title_scan_mode_without_metadata() {
    let temp = tempfile::tempdir().unwrap();
    let forum = ForumConfig {
        metadata_tables: false,
        ..ForumConfig::default()
    };
    let app = create_router(test_state_with(&temp, forum));

    let forum_id = create_forum(&app, "General").await;
    let first_id = create_thread(&app, forum_id, "One").await["id"].as_u64().unwrap();
    let second_id = create_thread(&app, forum_id, "Two").await["id"].as_u64().unwrap();

    let (_, body) = send(&app, Method::GET, "/forums", None, None).await;
    let forums = body["data"]["forums"].as_array().unwrap();
    assert_eq!(forums.len(), 1);
    assert_eq!(forums[0]["id"], forum_id);
    assert!(forums[0]["created"].is_null());

    let (_, body) = send(
        &app,
        Method::GET,
        &format!("/forums/{forum_id}/threads?limit=1"),
        None,
        None,
    )
    .await;
    let threads = body["data"]["threads"].as_array().unwrap();
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0]["id"], second_id);
    assert!(threads[0]["created"].is_null());
    assert_eq!(threads[0]["sticky"], false);
    assert_eq!(body["data"]["has_more"], true);

    // Locking still works; the flag table appears on first write
    let (status, _) = send(
        &app,
        Method::PATCH,
        &format!("/threads/{first_id}/lock"),
        Some(&MODERATOR),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/threads/{first_id}/replies"),
        Some(&EDITOR),
        Some(json!({ "body": "hello?" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_purge_and_prune() {
    let temp = tempfile::tempdir().unwrap();
    let app = create_router(test_state(&temp));

    let forum_id = create_forum(&app, "General").await;
    create_thread(&app, forum_id, "Hello").await;

    let (status, body) = send(&app, Method::POST, "/_internal/prune", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["forums"], 0);
    assert_eq!(body["data"]["threads"], 0);

    let (status, body) = send(&app, Method::DELETE, "/admin/purge", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["forums"], 1);
    assert_eq!(body["data"]["threads"], 1);
}

#[tokio::test]
async fn test_health() {
    let temp = tempfile::tempdir().unwrap();
    let app = create_router(test_state(&temp));

    let (status, body) = send(&app, Method::GET, "/_internal/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");

    let (status, body) = send(&app, Method::GET, "/_internal/cluster/status", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["cluster_info"]["role"], "Standalone");
}
