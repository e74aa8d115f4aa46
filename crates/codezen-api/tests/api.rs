use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use codezen_api::{router, AppState};
use codezen_core::LlmConfig;
use codezen_review::llm::LlmClient;
use codezen_review::pipeline::ReviewService;
use codezen_store::Store;
use serde_json::{json, Value};
use tower::ServiceExt;

const USER: &str = "dev@example.com";

/// Start a stand-in generate endpoint that always returns `answer`.
async fn fake_ollama(answer: &'static str) -> String {
    let app = Router::new().route(
        "/api/generate",
        post(move || async move { Json(json!({ "response": answer, "done": true })) }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn app(base_url: &str) -> Router {
    let llm = LlmClient::new(&LlmConfig {
        base_url: base_url.into(),
        model: "codellama:7b".into(),
        timeout_secs: 10,
    })
    .unwrap();
    let service = ReviewService::new(Store::in_memory().unwrap(), llm);
    router(Arc::new(AppState::new(service)))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-email", user);
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
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// POST a raw, possibly broken, JSON body.
async fn post_raw(app: &Router, uri: &str, body: &'static str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("x-user-email", USER)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn create_project(app: &Router, user: &str) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        "/api/v1/projects",
        Some(user),
        Some(json!({ "name": "web", "language": "typescript" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn health_needs_no_principal() {
    let app = app("http://127.0.0.1:1");
    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn missing_principal_is_unauthorized() {
    let app = app("http://127.0.0.1:1");
    let (status, body) = send(&app, "GET", "/api/v1/projects", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = send(&app, "GET", "/api/v1/projects", Some("   "), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn review_flow_end_to_end() {
    let base = fake_ollama(
        r#"{"summary": "Type mismatch on line 1", "findings": [], "effort_estimation": "3/10"}"#,
    )
    .await;
    let app = app(&base);
    let project = create_project(&app, USER).await;

    let (status, guideline) = send(
        &app,
        "POST",
        &format!("/api/v1/projects/{project}/guidelines"),
        Some(USER),
        Some(json!({ "ruleText": "No implicit any" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(guideline["ruleText"], "No implicit any");

    let (status, review) = send(
        &app,
        "POST",
        &format!("/api/v1/projects/{project}/reviews"),
        Some(USER),
        Some(json!({ "code": "const result: string = add(5, 10);" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(review["effortEstimation"], "3/10");
    assert_eq!(review["codeSnapshot"], "const result: string = add(5, 10);");
    let review_id = review["id"].as_i64().unwrap();

    let (status, reply) = send(
        &app,
        "POST",
        &format!("/api/v1/projects/{project}/reviews/{review_id}/comments"),
        Some(USER),
        Some(json!({ "message": "Why line 1?" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reply["role"], "AI");

    let (status, comments) = send(
        &app,
        "GET",
        &format!("/api/v1/projects/{project}/reviews/{review_id}/comments"),
        Some(USER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let roles: Vec<&str> = comments
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["role"].as_str().unwrap())
        .collect();
    assert_eq!(roles, vec!["USER", "AI"]);

    let (status, reviews) = send(
        &app,
        "GET",
        &format!("/api/v1/projects/{project}/reviews"),
        Some(USER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reviews.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unreachable_model_is_persisted_as_text() {
    let app = app("http://127.0.0.1:1");
    let project = create_project(&app, USER).await;

    let (status, review) = send(
        &app,
        "POST",
        &format!("/api/v1/projects/{project}/reviews"),
        Some(USER),
        Some(json!({ "code": "print(1)" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(review["llmResponse"]
        .as_str()
        .unwrap()
        .starts_with("Error: Unable to connect to Ollama"));
    assert!(review["effortEstimation"].is_null());

    let review_id = review["id"].as_i64().unwrap();
    let (status, stored) = send(
        &app,
        "GET",
        &format!("/api/v1/projects/{project}/reviews/{review_id}"),
        Some(USER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored["llmResponse"], review["llmResponse"]);
}

#[tokio::test]
async fn other_users_projects_are_not_found() {
    let app = app("http://127.0.0.1:1");
    let project = create_project(&app, USER).await;

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/v1/projects/{project}"),
        Some("intruder@example.com"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Project not found");

    let (status, list) = send(
        &app,
        "GET",
        "/api/v1/projects",
        Some("intruder@example.com"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_review_and_guideline_are_not_found() {
    let app = app("http://127.0.0.1:1");
    let project = create_project(&app, USER).await;

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/v1/projects/{project}/reviews/42"),
        Some(USER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Review not found");

    let (status, body) = send(
        &app,
        "DELETE",
        &format!("/api/v1/projects/{project}/guidelines/42"),
        Some(USER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Guideline not found");
}

#[tokio::test]
async fn blank_fields_are_bad_requests() {
    let app = app("http://127.0.0.1:1");

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/projects",
        Some(USER),
        Some(json!({ "name": " ", "language": "rust" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let project = create_project(&app, USER).await;
    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/projects/{project}/reviews"),
        Some(USER),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("code"));
}

#[tokio::test]
async fn mistyped_body_is_bad_request_with_json_error() {
    let app = app("http://127.0.0.1:1");

    let (status, body) =
        post_raw(&app, "/api/v1/projects", r#"{"name":5,"language":"rust"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["error"].as_str().unwrap();
    assert!(message.starts_with("invalid request body: "), "{message}");
    assert!(message.contains("name"), "{message}");

    let project = create_project(&app, USER).await;
    let (status, body) = post_raw(
        &app,
        &format!("/api/v1/projects/{project}/guidelines"),
        r#"{"ruleText":["a"]}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn truncated_body_is_bad_request_with_json_error() {
    let app = app("http://127.0.0.1:1");
    let project = create_project(&app, USER).await;

    let (status, body) = post_raw(&app, "/api/v1/projects", r#"{"name":"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("invalid request body: "));

    let (status, body) = post_raw(
        &app,
        &format!("/api/v1/projects/{project}/reviews"),
        r#"{"code": "fn main() {"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, reviews) = send(
        &app,
        "GET",
        &format!("/api/v1/projects/{project}/reviews"),
        Some(USER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(reviews.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn delete_project_returns_no_content() {
    let app = app("http://127.0.0.1:1");
    let project = create_project(&app, USER).await;

    let (status, body) = send(
        &app,
        "DELETE",
        &format!("/api/v1/projects/{project}"),
        Some(USER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/v1/projects/{project}"),
        Some(USER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
