use crate::app::{build_router, AppState};
use crate::config::Config;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn test_config() -> Config {
    Config {
        auth_jwt_secret: Some("test-secret".into()),
        bcrypt_cost: 4,
        upload_dir: std::env::temp_dir()
            .join(format!("collab-viewer-{}", uuid::Uuid::new_v4()))
            .to_string_lossy()
            .into_owned(),
        ..Config::default()
    }
}

fn app() -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState::in_memory(test_config()));
    (build_router(state.clone()), state)
}

async fn call(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn multipart(field: &str, file_name: &str, content: &str) -> Request<Body> {
    let boundary = "XBOUNDARYX";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: application/pdf\r\n\r\n{content}\r\n--{b}--\r\n",
        b = boundary
    );
    Request::post("/api/upload")
        .header(header::HOST, "viewer.test:3001")
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", boundary))
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn health_and_ready() {
    let (app, _) = app();
    let (status, body) = call(&app, get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = call(&app, get("/api/ready")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["store"], "memory");
}

#[tokio::test]
async fn upload_stores_file_and_returns_its_url() {
    let (app, state) = app();
    let (status, body) = call(&app, multipart("pdf", "report.pdf", "%PDF-1.4 test")).await;
    assert_eq!(status, StatusCode::OK);

    let url = body["url"].as_str().unwrap();
    assert!(url.starts_with("http://viewer.test:3001/uploads/"));
    assert!(url.ends_with("-report.pdf"));

    let stored = url.rsplit('/').next().unwrap();
    let on_disk = std::fs::read_to_string(std::path::Path::new(&state.config.upload_dir).join(stored)).unwrap();
    assert_eq!(on_disk, "%PDF-1.4 test");

    // And it is served back
    let res = app.clone().oneshot(get(&format!("/uploads/{}", stored))).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn upload_without_a_file_is_rejected() {
    let (app, _) = app();
    let (status, body) = call(&app, multipart("comment", "x.txt", "hi")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file uploaded!");
}

#[tokio::test]
async fn register_login_me() {
    let (app, _) = app();
    let creds = json!({"username": "ana", "email": "ana@example.com", "password": "hunter2"});

    let (status, user) = call(&app, post_json("/api/auth/register", creds.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["username"], "ana");
    assert!(user.get("password_hash").is_none());

    let (status, _) = call(&app, post_json("/api/auth/register", creds)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = call(&app, post_json("/api/auth/login", json!({"username": "ana", "password": "nope"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Wrong password!");

    let (status, body) = call(&app, post_json("/api/auth/login", json!({"username": "bob", "password": "x"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User not found!");

    let (status, login) = call(&app, post_json("/api/auth/login", json!({"username": "ana", "password": "hunter2"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(login["username"], "ana");
    let token = login["token"].as_str().unwrap();

    let req = Request::get("/api/auth/me")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let (status, me) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], user["id"]);

    let (status, _) = call(&app, get("/api/auth/me")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_requires_all_fields() {
    let (app, _) = app();
    let (status, _) = call(&app, post_json("/api/auth/register", json!({"username": " ", "email": "a@b", "password": "x"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn room_annotations_come_back_in_sequence_order() {
    use crate::models::{Highlight, Note};

    let (app, state) = app();
    state.persist.append_note("r1", Note { x: 0.0, y: 0.0, text: "second".into(), author: "ana".into(), seq: 2 });
    state.persist.append_highlight("r1", Highlight { x: 1.0, y: 1.0, width: 1.0, height: 1.0, room_id: "r1".into(), seq: 1 });
    state.persist.flush().await;

    let (status, body) = call(&app, get("/api/v1/rooms/r1/annotations")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["roomId"], "r1");
    assert_eq!(body["highlights"][0]["seq"], 1);
    assert_eq!(body["notes"][0]["text"], "second");

    let (status, body) = call(&app, get("/api/v1/rooms/fresh/annotations")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["highlights"], json!([]));
}

#[tokio::test]
async fn diagnostics_reports_counters() {
    let (app, _) = app();
    let (status, body) = call(&app, get("/api/v1/diagnostics")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["n_conn"], 0);
    assert_eq!(body["store_backend"], "memory");
}
