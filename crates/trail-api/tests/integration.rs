//! Integration tests: session lifecycle, fetch, caching, errors, context updates.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, TimeZone, Utc};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tower::util::ServiceExt;
use trail_api::server::{self, AppState};
use trail_source::InMemoryAuditSource;
use trail_types::{AuditEntry, OperationKind};

const OWNER: &str = "0d5e8a1c-1111-4c4c-9a9a-0123456789ab";

fn entry(id: &str, minutes: i64, op: OperationKind, change_data: Option<String>) -> AuditEntry {
    AuditEntry {
        entry_id: id.to_string(),
        created_on: Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap() + Duration::minutes(minutes),
        operation: op,
        action: Some("Update".to_string()),
        actor: Some("Jane Doe".to_string()),
        change_data,
    }
}

async fn seeded_source() -> Arc<InMemoryAuditSource> {
    let source = Arc::new(InMemoryAuditSource::new());
    source
        .insert(OWNER, entry("c0", 0, OperationKind::Create, None))
        .await;
    source
        .insert(
            OWNER,
            entry(
                "u1",
                5,
                OperationKind::Update,
                Some(r#"{"changedAttributes":[{"logicalName":"statuscode","oldValue":"1","newValue":"2"}]}"#.to_string()),
            ),
        )
        .await;
    source
        .insert(
            OWNER,
            entry(
                "u2",
                9,
                OperationKind::Update,
                Some(r#"<changedAttributes><attribute name="statuscode"><oldValue>2</oldValue><newValue>1</newValue></attribute></changedAttributes>"#.to_string()),
            ),
        )
        .await;
    source
}

fn test_app(source: Arc<InMemoryAuditSource>) -> axum::Router {
    server::router(Arc::new(AppState::new(source)))
}

async fn call(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> Value {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

async fn create_session(app: &axum::Router, ctx: Value) -> String {
    let j = call(app, "POST", "/history/sessions", Some(ctx)).await;
    assert_eq!(j["code"], 200);
    j["data"]["session_id"].as_str().unwrap().to_string()
}

fn status_ctx() -> Value {
    json!({
        "field_name": "statuscode",
        "current_value": "1",
        "owner_id": format!("{{{}}}", OWNER),
        "metadata": {
            "Type": "OptionSet",
            "Options": [
                { "Value": 1, "Label": "Open" },
                { "Value": 2, "Label": "Closed" }
            ]
        }
    })
}

/// Trigger a fetch and poll until it settles.
async fn fetch_and_wait(app: &axum::Router, id: &str, force: bool) -> Value {
    let j = call(
        app,
        "POST",
        &format!("/history/sessions/{}/fetch", id),
        Some(json!({ "force": force })),
    )
    .await;
    assert_eq!(j["code"], 200);
    for _ in 0..50 {
        let j = call(app, "GET", &format!("/history/sessions/{}", id), None).await;
        if j["data"]["has_fetched"] == true && j["data"]["loading"] == false {
            return j;
        }
        tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
    }
    panic!("history fetch did not settle");
}

#[tokio::test]
async fn fetch_returns_labeled_history_newest_first() {
    let source = seeded_source().await;
    let app = test_app(Arc::clone(&source));
    let id = create_session(&app, status_ctx()).await;

    let j = fetch_and_wait(&app, &id, false).await;
    let records = j["data"]["records"].as_array().unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0]["entry_id"], "u2");
    assert_eq!(records[0]["old_value"], "Closed");
    assert_eq!(records[0]["new_value"], "Open");
    assert_eq!(records[1]["entry_id"], "u1");
    assert_eq!(records[1]["old_value"], "Open");
    assert_eq!(records[1]["new_value"], "Closed");
    assert_eq!(records[2]["operation"], "Created");
    assert_eq!(records[2]["old_value"], "(initial)");
    assert_eq!(records[2]["new_value"], "Open");
    assert!(j["data"].get("error").is_none());
}

#[tokio::test]
async fn unforced_fetch_is_cached_and_forced_fetch_requeries() {
    let source = seeded_source().await;
    let app = test_app(Arc::clone(&source));
    let id = create_session(&app, status_ctx()).await;

    fetch_and_wait(&app, &id, false).await;
    fetch_and_wait(&app, &id, false).await;
    assert_eq!(source.query_count(), 1);

    source
        .insert(OWNER, entry("u3", 20, OperationKind::Update, Some(
            r#"{"changedAttributes":[{"logicalName":"statuscode","oldValue":"1","newValue":null}]}"#.to_string(),
        )))
        .await;
    call(
        &app,
        "POST",
        &format!("/history/sessions/{}/fetch", id),
        Some(json!({ "force": true })),
    )
    .await;
    for _ in 0..50 {
        if source.query_count() == 2 {
            break;
        }
        tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
    }
    let j = fetch_and_wait(&app, &id, false).await;
    assert_eq!(source.query_count(), 2);
    assert_eq!(j["data"]["records"][0]["entry_id"], "u3");
    assert_eq!(j["data"]["records"][0]["new_value"], "(empty)");
}

#[tokio::test]
async fn query_failure_surfaces_error() {
    let source = seeded_source().await;
    source.fail_with("audit service unavailable").await;
    let app = test_app(Arc::clone(&source));
    let id = create_session(&app, status_ctx()).await;

    let j = fetch_and_wait(&app, &id, false).await;
    assert_eq!(j["data"]["error"], "audit service unavailable");
    assert!(j["data"]["records"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn session_without_owner_settles_without_error() {
    let source = seeded_source().await;
    let app = test_app(Arc::clone(&source));
    let id = create_session(&app, json!({ "field_name": "statuscode", "current_value": "1" })).await;

    let j = fetch_and_wait(&app, &id, false).await;
    assert!(j["data"].get("error").is_none());
    assert!(j["data"]["records"].as_array().unwrap().is_empty());
    assert_eq!(source.query_count(), 0);
}

#[tokio::test]
async fn context_update_then_forced_fetch() {
    let source = seeded_source().await;
    let app = test_app(Arc::clone(&source));
    let id = create_session(&app, json!({ "field_name": "statuscode", "current_value": "2" })).await;

    fetch_and_wait(&app, &id, false).await;
    let j = call(
        &app,
        "PUT",
        &format!("/history/sessions/{}/context", id),
        Some(json!({ "owner_id": OWNER })),
    )
    .await;
    assert_eq!(j["code"], 200);

    call(
        &app,
        "POST",
        &format!("/history/sessions/{}/fetch", id),
        Some(json!({ "force": true })),
    )
    .await;
    for _ in 0..50 {
        if source.query_count() == 1 {
            break;
        }
        tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
    }
    let j = fetch_and_wait(&app, &id, false).await;
    let records = j["data"]["records"].as_array().unwrap();
    assert_eq!(records.len(), 3);
    // Plain metadata: raw codes are shown as-is.
    assert_eq!(records[2]["new_value"], "2");
}

#[tokio::test]
async fn unknown_and_disposed_sessions_are_not_found() {
    let source = seeded_source().await;
    let app = test_app(source);

    let j = call(&app, "GET", "/history/sessions/nope", None).await;
    assert_eq!(j["code"], 404);

    let id = create_session(&app, status_ctx()).await;
    let j = call(&app, "DELETE", &format!("/history/sessions/{}", id), None).await;
    assert_eq!(j["code"], 200);
    let j = call(&app, "GET", &format!("/history/sessions/{}", id), None).await;
    assert_eq!(j["code"], 404);
    let j = call(
        &app,
        "POST",
        &format!("/history/sessions/{}/fetch", id),
        Some(json!({ "force": true })),
    )
    .await;
    assert_eq!(j["code"], 404);
}

#[tokio::test]
async fn health() {
    let app = test_app(Arc::new(InMemoryAuditSource::new()));
    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn malformed_fetch_body_is_rejected() {
    let source = seeded_source().await;
    let app = test_app(Arc::clone(&source));
    let id = create_session(&app, status_ctx()).await;

    let req = Request::builder()
        .method("POST")
        .uri(format!("/history/sessions/{}/fetch", id))
        .header("content-type", "application/json")
        .body(Body::from(r#"{"force": tru"#))
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.into_body().collect().await.unwrap().to_bytes();
    let j: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(j["code"], 400);
    assert!(j["message"].as_str().unwrap().starts_with("invalid fetch request"));

    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
    assert_eq!(source.query_count(), 0);
    let j = call(&app, "GET", &format!("/history/sessions/{}", id), None).await;
    assert_eq!(j["data"]["has_fetched"], false);
}

#[tokio::test]
async fn empty_fetch_body_means_unforced() {
    let source = seeded_source().await;
    let app = test_app(Arc::clone(&source));
    let id = create_session(&app, status_ctx()).await;

    let j = call(&app, "POST", &format!("/history/sessions/{}/fetch", id), None).await;
    assert_eq!(j["code"], 200);
    for _ in 0..50 {
        if source.query_count() == 1 {
            break;
        }
        tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
    }
    assert_eq!(source.query_count(), 1);
}

#[tokio::test]
async fn idle_sessions_are_evicted_on_create() {
    let source = seeded_source().await;
    let app = server::router(Arc::new(
        AppState::new(source).with_idle_ttl(StdDuration::ZERO),
    ));

    let a = create_session(&app, status_ctx()).await;
    let b = create_session(&app, status_ctx()).await;

    let j = call(&app, "GET", &format!("/history/sessions/{}", a), None).await;
    assert_eq!(j["code"], 404);
    let j = call(&app, "GET", &format!("/history/sessions/{}", b), None).await;
    assert_eq!(j["code"], 200);
}
