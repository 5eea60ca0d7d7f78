use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use webapi_storage::Database;

use crate::router::AppState;
use crate::telemetry;

pub async fn setup_state() -> AppState {
    let metrics = telemetry::init_metrics().expect("metrics init");
    let database = Database::connect("sqlite::memory:")
        .await
        .expect("connect");
    database.run_migrations().await.expect("migrations");
    AppState::new(metrics, database)
}

pub async fn send_raw(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, HeaderMap, String) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request should build");

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("handler should respond");
    let status = response.status();
    let headers = response.headers().clone();
    let collected = response
        .into_body()
        .collect()
        .await
        .expect("body should read");
    let text = String::from_utf8(collected.to_bytes().to_vec()).expect("utf-8");
    (status, headers, text)
}

/// Sends a request and parses the response body as JSON (`Null` when empty).
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let (status, _, text) = send_raw(app, method, uri, body).await;
    if text.is_empty() {
        return (status, Value::Null);
    }
    let value = serde_json::from_str(&text).expect("json body");
    (status, value)
}

/// Creates a project through the API and returns its id.
pub async fn create_project(app: &Router, name: &str) -> i64 {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/projects",
        Some(json!({ "name": name, "description": format!("{name} description") })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "unexpected body: {body}");
    body["project"]["id"].as_i64().expect("project id")
}

/// Creates an action through the API and returns its id.
pub async fn create_action(app: &Router, project_id: i64, description: &str) -> i64 {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/projects/actions",
        Some(json!({
            "project_id": project_id,
            "description": description,
            "notes": "some notes",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "unexpected body: {body}");

    let (_, actions) = send(
        app,
        Method::GET,
        &format!("/api/projects/{project_id}/actions"),
        None,
    )
    .await;
    actions
        .as_array()
        .and_then(|list| list.iter().rev().find(|action| action["description"] == description))
        .and_then(|action| action["id"].as_i64())
        .expect("created action is listed")
}
